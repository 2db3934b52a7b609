//! Data models for step aggregation.
//!
//! This module contains the core data structures shared by the scanner,
//! the aggregator and the report generator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One peer's step entry for a single date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step count for the day.
    pub dp_step_count: f64,
    /// Number of samples behind the step count.
    pub dp_step_entries: f64,
}

/// A peer's record file: ISO date string to step entry.
pub type PeerRecords = BTreeMap<String, StepRecord>;

/// Running totals for one date.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateAggregate {
    /// Sum of `dp_step_count` (or the running partial mean under the legacy policy).
    pub total_steps: f64,
    /// Sum of `dp_step_entries`.
    pub total_entries: f64,
    /// Number of peers that reported this date.
    pub participant_count: u32,
}

impl DateAggregate {
    /// Adds one peer's record for this date.
    pub fn add(&mut self, record: &StepRecord) {
        self.total_steps += record.dp_step_count;
        self.total_entries += record.dp_step_entries;
        self.participant_count += 1;
    }

    /// Mean step count over the participants seen so far.
    pub fn mean(&self) -> f64 {
        if self.participant_count == 0 {
            0.0
        } else {
            self.total_steps / f64::from(self.participant_count)
        }
    }
}

/// How per-date totals are turned into the published value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    /// Sum across all peers, then divide once.
    #[default]
    Mean,
    /// Re-divide every running total after each peer, as older releases did.
    Legacy,
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPolicy::Mean => write!(f, "mean"),
            AggregationPolicy::Legacy => write!(f, "legacy"),
        }
    }
}

/// Per-run peer bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Peers visited.
    pub peers_scanned: usize,
    /// Peers whose record file parsed and contributed.
    pub peers_contributed: usize,
    /// Peers with no record file.
    pub peers_without_records: usize,
    /// Peers whose record file could not be read or parsed.
    pub peers_malformed: usize,
}

/// The result of aggregating every peer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedSteps {
    /// Date to aggregated step value.
    pub values: BTreeMap<String, f64>,
    /// Date to number of contributing peers.
    pub participants: BTreeMap<String, u32>,
    /// Date to summed sample entries.
    pub entries: BTreeMap<String, f64>,
    /// Peer bookkeeping for this run.
    pub stats: AggregationStats,
}

impl AggregatedSteps {
    /// Number of distinct dates seen across all peers.
    pub fn date_count(&self) -> usize {
        self.values.len()
    }
}

/// Headline statistics shown in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportSummary {
    /// Dates with at least the minimum number of participants.
    pub valid_dates: usize,
    /// Mean participant count across valid dates, 0 when there are none.
    pub average_participants: f64,
    /// All dates, valid or not.
    pub total_dates: usize,
}
