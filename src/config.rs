//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.stepmean.toml` files.

use crate::models::AggregationPolicy;
use crate::scanner::DEFAULT_RECORD_PATH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".stepmean.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// How per-date totals become published values.
    #[serde(default)]
    pub policy: AggregationPolicy,

    /// Record file location relative to each peer directory.
    #[serde(default = "default_record_path")]
    pub record_path: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            policy: AggregationPolicy::default(),
            record_path: default_record_path(),
        }
    }
}

fn default_record_path() -> String {
    DEFAULT_RECORD_PATH.to_string()
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// HTML page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Participants needed before a date's value is shown.
    #[serde(default = "default_min_participants")]
    pub min_participants: u32,

    /// Directory under the output root that receives the artifacts.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// JSON artifact file name.
    #[serde(default = "default_json_file")]
    pub json_file: String,

    /// HTML artifact file name.
    #[serde(default = "default_html_file")]
    pub html_file: String,

    /// Indent the JSON artifact.
    #[serde(default)]
    pub pretty_json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            min_participants: default_min_participants(),
            public_dir: default_public_dir(),
            json_file: default_json_file(),
            html_file: default_html_file(),
            pretty_json: false,
        }
    }
}

fn default_title() -> String {
    "Daily Steps Report".to_string()
}

fn default_min_participants() -> u32 {
    2
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_json_file() -> String {
    "aggregated_daily_steps.json".to_string()
}

fn default_html_file() -> String {
    "daily_steps_report.html".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(policy) = args.policy {
            self.aggregation.policy = policy;
        }

        if let Some(min) = args.min_participants {
            self.report.min_participants = min;
        }

        if args.pretty {
            self.report.pretty_json = true;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
