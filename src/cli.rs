//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::AggregationPolicy;
use clap::Parser;
use std::path::PathBuf;

/// StepMean - cross-peer daily step aggregation
///
/// Reads every peer's step records under a shared datasites directory,
/// computes the mean step count per day and publishes a JSON summary and
/// an HTML report into your own datasite.
///
/// Examples:
///   stepmean --datasites ~/SyftBox/datasites --output-root ~/SyftBox/datasites/me@example.com
///   stepmean --datasites ./datasites --output-root ./me --policy legacy
///   stepmean --datasites ./datasites --output-root ./me --dry-run
///   stepmean --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing one subdirectory per peer
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "STEPMEAN_DATASITES",
        required_unless_present = "init_config"
    )]
    pub datasites: Option<PathBuf>,

    /// Your own datasite; artifacts go to its public directory
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "STEPMEAN_OUTPUT_ROOT",
        required_unless_present_any = ["init_config", "dry_run"]
    )]
    pub output_root: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .stepmean.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Normalization policy (mean, legacy)
    ///
    /// `legacy` re-divides running totals after every peer, matching older
    /// published numbers. Overrides config file setting.
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<AggregationPolicy>,

    /// Participants a date needs before its value is shown in the report
    #[arg(long, value_name = "COUNT")]
    pub min_participants: Option<u32>,

    /// Pretty-print the JSON artifact
    #[arg(long)]
    pub pretty: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list peers and their record files without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .stepmean.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.min_participants == Some(0) {
            return Err("Min participants must be at least 1".to_string());
        }

        match self.datasites {
            None => return Err("--datasites is required".to_string()),
            Some(ref root) if !root.is_dir() => {
                return Err(format!(
                    "Datasites directory does not exist: {}",
                    root.display()
                ));
            }
            Some(_) => {}
        }

        if self.output_root.is_none() && !self.dry_run {
            return Err("--output-root is required".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
