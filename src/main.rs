//! StepMean - cross-peer daily step aggregation
//!
//! A CLI tool that reads every peer's daily step records from a shared
//! datasites directory, averages them per date, and publishes a JSON
//! summary plus an HTML report.
//!
//! Exit codes:
//!   0 - Success (including runs where some peers were skipped)
//!   1 - Runtime error (invalid arguments, unreadable datasites, unwritable output)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use scanner::{DatasiteScanner, PeerSource};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("StepMean v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    info!("{}", config_source);

    match run(&args, config) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .stepmean.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber is already installed");
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is up, so it returns a description of where the
/// configuration came from for the caller to log.
fn load_config(args: &Args) -> Result<(Config, String)> {
    let mut config;
    let source;

    if let Some(ref config_path) = args.config {
        config = Config::load(config_path)?;
        source = format!("Loaded config from: {}", config_path.display());
    } else {
        match Config::load_default() {
            Ok(Some(loaded)) => {
                config = loaded;
                source = format!("Loaded default config from {}", CONFIG_FILE_NAME);
            }
            Ok(None) => {
                config = Config::default();
                source = "No config file found, using defaults".to_string();
            }
            Err(e) => {
                config = Config::default();
                source = format!("Failed to load config ({:#}), using defaults", e);
            }
        }
    }

    config.merge_with_args(args);
    Ok((config, source))
}

/// Run the aggregation workflow: enumerate, aggregate, publish.
fn run(args: &Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let datasites = args
        .datasites
        .clone()
        .context("--datasites is required")?;

    let scanner = DatasiteScanner::with_record_path(
        datasites.clone(),
        PathBuf::from(&config.aggregation.record_path),
    );

    if args.dry_run {
        return handle_dry_run(&scanner, &datasites);
    }

    let output_root = args
        .output_root
        .clone()
        .context("--output-root is required")?;

    // Step 1: Aggregate every peer
    println!("🔍 Scanning peers in: {}", datasites.display());
    let aggregated = analysis::aggregate(&scanner, config.aggregation.policy)?;

    let stats = aggregated.stats;
    let samples: f64 = aggregated.entries.values().sum();
    debug!("{} step samples behind {} dates", samples, aggregated.date_count());
    if stats.peers_malformed > 0 {
        warn!(
            "{} peer(s) skipped because their records could not be read",
            stats.peers_malformed
        );
    }

    // Step 2: Write the JSON artifact
    let public_dir = report::publish_dir(&output_root, &config.report.public_dir)?;

    let json_path = public_dir.join(&config.report.json_file);
    report::write_json(&aggregated.values, &json_path, config.report.pretty_json)?;
    info!("Aggregated steps written to {}", json_path.display());

    // Step 3: Render and write the HTML report
    let options = report::ReportOptions::from(&config.report);
    let html = report::generate_html_report(
        &aggregated.values,
        &aggregated.participants,
        &options,
        Utc::now(),
    );

    let html_path = public_dir.join(&config.report.html_file);
    report::write_html(&html, &html_path)?;
    info!("Report written to {}", html_path.display());

    // Print summary
    let summary = report::summarize(
        &aggregated.values,
        &aggregated.participants,
        options.min_participants,
    );
    let duration = start_time.elapsed().as_secs_f64();

    if !args.quiet {
        println!("\n📊 Aggregation Summary:");
        println!("   Policy: {}", config.aggregation.policy);
        println!(
            "   Peers: {} scanned | {} contributed | {} without records | {} skipped",
            stats.peers_scanned,
            stats.peers_contributed,
            stats.peers_without_records,
            stats.peers_malformed
        );
        println!(
            "   Dates: {} total | {} with enough participants",
            summary.total_dates, summary.valid_dates
        );
        println!(
            "   Average participants per day: {:.1}",
            summary.average_participants
        );
        println!("   Duration: {:.2}s", duration);
        println!("\n✅ Done!");
        println!("   JSON: {}", json_path.display());
        println!("   HTML: {}", html_path.display());
    }

    Ok(())
}

/// Handle --dry-run: list peers and whether each has a record file.
fn handle_dry_run(scanner: &DatasiteScanner, datasites: &Path) -> Result<()> {
    println!("\n🔍 Dry run: scanning {} (nothing is written)...\n", datasites.display());

    let peers = scanner.peers()?;

    if peers.is_empty() {
        println!("   No peer directories found.");
    } else {
        let mut with_records = 0;
        for peer in &peers {
            let path = scanner.record_file(peer);
            if path.is_file() {
                with_records += 1;
                println!("     📄 {} ({})", peer, path.display());
            } else {
                println!("     ∅  {} (no step records)", peer);
            }
        }
        println!(
            "\n   Total: {} peers, {} with step records",
            peers.len(),
            with_records
        );
    }

    println!("\n✅ Dry run complete.");
    Ok(())
}
