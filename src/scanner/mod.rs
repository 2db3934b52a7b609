//! Datasite scanner for discovering peers and loading their step records.
//!
//! Every immediate subdirectory of the datasites root is a peer. A peer
//! publishes its daily step counts as a JSON file at a fixed path inside
//! its own directory.

use crate::error::RecordError;
use crate::models::PeerRecords;
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default location of a peer's record file, relative to the peer directory.
pub const DEFAULT_RECORD_PATH: &str = "api_data/health_steps_counter/health_steps_counter.json";

/// Source of peers and their step records.
pub trait PeerSource {
    /// List peer identifiers.
    fn peers(&self) -> Result<Vec<String>>;

    /// Load one peer's records.
    ///
    /// Returns `Ok(None)` when the peer has published no record file.
    fn read_records(&self, peer: &str) -> std::result::Result<Option<PeerRecords>, RecordError>;
}

/// List the immediate child directories of `root`, sorted by name.
///
/// Fails if `root` does not exist, is not a directory, or cannot be read.
pub fn list_peers(root: &Path) -> Result<Vec<String>> {
    let metadata = fs::metadata(root)
        .with_context(|| format!("Cannot access datasites root: {}", root.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("Datasites root is not a directory: {}", root.display());
    }

    let mut peers = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry
            .with_context(|| format!("Failed to read datasites root: {}", root.display()))?;

        // Follow symlinks so linked peer directories count
        if !entry.path().is_dir() {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) => peers.push(name.to_string()),
            None => warn!("Skipping peer with non UTF-8 name: {}", entry.path().display()),
        }
    }

    Ok(peers)
}

/// Filesystem-backed [`PeerSource`].
#[derive(Debug, Clone)]
pub struct DatasiteScanner {
    root: PathBuf,
    record_path: PathBuf,
}

impl DatasiteScanner {
    /// Create a scanner over `root`; `record_path` is relative to each peer.
    pub fn with_record_path(root: PathBuf, record_path: PathBuf) -> Self {
        Self { root, record_path }
    }

    /// Full path of `peer`'s record file.
    pub fn record_file(&self, peer: &str) -> PathBuf {
        self.root.join(peer).join(&self.record_path)
    }
}

impl PeerSource for DatasiteScanner {
    fn peers(&self) -> Result<Vec<String>> {
        list_peers(&self.root)
    }

    fn read_records(&self, peer: &str) -> std::result::Result<Option<PeerRecords>, RecordError> {
        let path = self.record_file(peer);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(RecordError::Io { path, source }),
        };

        let records: PeerRecords = serde_json::from_str(&content)
            .map_err(|source| RecordError::Json { path: path.clone(), source })?;

        debug!("Loaded {} dates from {}", records.len(), path.display());
        Ok(Some(records))
    }
}
