//! Error types for per-peer record loading.
//!
//! Fatal errors (unreadable datasite root, unwritable output) travel as
//! `anyhow::Error`. A peer whose record file cannot be loaded produces a
//! [`RecordError`], which the aggregator logs and absorbs.

use std::path::PathBuf;
use thiserror::Error;

/// Why a peer's record file could not be loaded.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
