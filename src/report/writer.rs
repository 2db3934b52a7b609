//! Artifact output.
//!
//! Writes the aggregated JSON map and the HTML report into the public
//! directory of the local datasite. Both writes overwrite existing files.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve `<output_root>/<public_dir>`, creating it when missing.
pub fn publish_dir(output_root: &Path, public_dir: &str) -> Result<PathBuf> {
    let dir = output_root.join(public_dir);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(dir)
}

/// Render the date to value map as JSON.
///
/// Fails on infinite or NaN values, which JSON would encode as `null`.
pub fn generate_json(values: &BTreeMap<String, f64>, pretty: bool) -> Result<String> {
    if let Some((date, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
        anyhow::bail!("Aggregated value for {} is not a finite number: {}", date, value);
    }

    let json = if pretty {
        serde_json::to_string_pretty(values)?
    } else {
        serde_json::to_string(values)?
    };
    Ok(json)
}

/// Write the aggregated values to `path`.
pub fn write_json(values: &BTreeMap<String, f64>, path: &Path, pretty: bool) -> Result<()> {
    let content = generate_json(values, pretty)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write aggregated steps to {}", path.display()))?;
    debug!("Wrote {} dates to {}", values.len(), path.display());
    Ok(())
}

/// Write a rendered HTML report to `path`.
pub fn write_html(content: &str, path: &Path) -> Result<()> {
    fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    debug!("Wrote report to {}", path.display());
    Ok(())
}
