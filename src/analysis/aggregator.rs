//! Cross-peer step aggregation.
//!
//! Peers are reduced into per-date running totals and then turned into
//! per-date means. Missing or unreadable record files never abort a run.

use crate::models::{
    AggregatedSteps, AggregationPolicy, AggregationStats, DateAggregate, PeerRecords,
};
use crate::scanner::PeerSource;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Per-date running totals.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    dates: BTreeMap<String, DateAggregate>,
}

impl Accumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every date of one peer's records.
    pub fn add_peer(&mut self, records: &PeerRecords) {
        for (date, record) in records {
            self.dates.entry(date.clone()).or_default().add(record);
        }
    }

    /// Replace each running total with the mean over the participants so far.
    ///
    /// Only the legacy policy calls this, once per contributing peer.
    fn redivide(&mut self) {
        for agg in self.dates.values_mut() {
            agg.total_steps = agg.mean();
        }
    }

    /// Consume the totals and produce the published maps.
    pub fn finalize(self, policy: AggregationPolicy, stats: AggregationStats) -> AggregatedSteps {
        let mut result = AggregatedSteps {
            stats,
            ..Default::default()
        };

        for (date, agg) in self.dates {
            let value = match policy {
                AggregationPolicy::Mean => agg.mean(),
                AggregationPolicy::Legacy => agg.total_steps,
            };

            result.values.insert(date.clone(), value);
            result.entries.insert(date.clone(), agg.total_entries);
            result.participants.insert(date, agg.participant_count);
        }

        result
    }
}

/// Enumerate the source's peers and aggregate them.
///
/// Only the peer listing can fail; per-peer errors are logged and skipped.
pub fn aggregate<S: PeerSource + ?Sized>(
    source: &S,
    policy: AggregationPolicy,
) -> Result<AggregatedSteps> {
    let peers = source.peers()?;
    info!("Found {} peers", peers.len());
    Ok(aggregate_peers(source, &peers, policy))
}

/// Aggregate an explicit list of peers.
pub fn aggregate_peers<S: PeerSource + ?Sized>(
    source: &S,
    peers: &[String],
    policy: AggregationPolicy,
) -> AggregatedSteps {
    let mut acc = Accumulator::new();
    let mut stats = AggregationStats::default();

    for peer in peers {
        stats.peers_scanned += 1;

        match source.read_records(peer) {
            Ok(Some(records)) => {
                debug!("Peer {}: {} dates", peer, records.len());
                acc.add_peer(&records);
                stats.peers_contributed += 1;

                if policy == AggregationPolicy::Legacy {
                    acc.redivide();
                }
            }
            Ok(None) => {
                debug!("Peer {} has no step records", peer);
                stats.peers_without_records += 1;
            }
            Err(e) => {
                warn!("Skipping peer {}: {}", peer, e);
                stats.peers_malformed += 1;
            }
        }
    }

    let result = acc.finalize(policy, stats);
    info!(
        "Aggregated {} dates from {} of {} peers ({} policy)",
        result.date_count(),
        stats.peers_contributed,
        stats.peers_scanned,
        policy
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use crate::models::StepRecord;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// In-memory peer source. `None` entries act as malformed files.
    #[derive(Default)]
    struct MemorySource {
        peers: Vec<String>,
        records: HashMap<String, Option<PeerRecords>>,
    }

    impl MemorySource {
        fn with_peer(mut self, peer: &str, days: &[(&str, f64, f64)]) -> Self {
            let records = days
                .iter()
                .map(|(date, count, entries)| {
                    (
                        date.to_string(),
                        StepRecord {
                            dp_step_count: *count,
                            dp_step_entries: *entries,
                        },
                    )
                })
                .collect();
            self.peers.push(peer.to_string());
            self.records.insert(peer.to_string(), Some(records));
            self
        }

        fn with_missing(mut self, peer: &str) -> Self {
            self.peers.push(peer.to_string());
            self
        }

        fn with_malformed(mut self, peer: &str) -> Self {
            self.peers.push(peer.to_string());
            self.records.insert(peer.to_string(), None);
            self
        }
    }

    impl PeerSource for MemorySource {
        fn peers(&self) -> Result<Vec<String>> {
            Ok(self.peers.clone())
        }

        fn read_records(&self, peer: &str) -> std::result::Result<Option<PeerRecords>, RecordError> {
            match self.records.get(peer) {
                None => Ok(None),
                Some(Some(records)) => Ok(Some(records.clone())),
                Some(None) => Err(RecordError::Json {
                    path: PathBuf::from(peer),
                    source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
                }),
            }
        }
    }

    struct FailingSource;

    impl PeerSource for FailingSource {
        fn peers(&self) -> Result<Vec<String>> {
            anyhow::bail!("root unreadable")
        }

        fn read_records(&self, _peer: &str) -> std::result::Result<Option<PeerRecords>, RecordError> {
            Ok(None)
        }
    }

    #[test]
    fn test_example_scenario_mean() {
        let source = MemorySource::default()
            .with_peer("alice", &[("2024-01-01", 10000.0, 5.0)])
            .with_peer("bob", &[("2024-01-01", 8000.0, 4.0)])
            .with_missing("carol");

        let result = aggregate(&source, AggregationPolicy::Mean).unwrap();

        assert_eq!(result.values["2024-01-01"], 9000.0);
        assert_eq!(result.participants["2024-01-01"], 2);
        assert_eq!(result.entries["2024-01-01"], 9.0);
        assert_eq!(result.stats.peers_scanned, 3);
        assert_eq!(result.stats.peers_contributed, 2);
        assert_eq!(result.stats.peers_without_records, 1);
        assert_eq!(result.stats.peers_malformed, 0);
    }

    #[test]
    fn test_dates_are_union_of_parsed_files() {
        let source = MemorySource::default()
            .with_peer("alice", &[("2024-01-01", 100.0, 1.0), ("2024-01-02", 200.0, 1.0)])
            .with_peer("bob", &[("2024-01-02", 400.0, 1.0), ("2024-01-03", 600.0, 1.0)])
            .with_malformed("mallory");

        let result = aggregate(&source, AggregationPolicy::Mean).unwrap();

        let dates: Vec<_> = result.values.keys().cloned().collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(result.participants["2024-01-01"], 1);
        assert_eq!(result.participants["2024-01-02"], 2);
        assert_eq!(result.participants["2024-01-03"], 1);
        assert_eq!(result.values["2024-01-02"], 300.0);
    }

    #[test]
    fn test_malformed_peer_does_not_abort() {
        let source = MemorySource::default()
            .with_malformed("mallory")
            .with_peer("alice", &[("2024-01-01", 5000.0, 2.0)]);

        let result = aggregate(&source, AggregationPolicy::Mean).unwrap();

        assert_eq!(result.values["2024-01-01"], 5000.0);
        assert_eq!(result.participants["2024-01-01"], 1);
        assert_eq!(result.stats.peers_malformed, 1);
        assert_eq!(result.stats.peers_contributed, 1);
    }

    #[test]
    fn test_missing_peers_contribute_nothing() {
        let source = MemorySource::default()
            .with_missing("carol")
            .with_missing("dave");

        let result = aggregate(&source, AggregationPolicy::Mean).unwrap();

        assert!(result.values.is_empty());
        assert!(result.participants.is_empty());
        assert_eq!(result.stats.peers_without_records, 2);
    }

    #[test]
    fn test_mean_is_order_independent() {
        let forward = MemorySource::default()
            .with_peer("a", &[("2024-01-01", 1000.0, 1.0)])
            .with_peer("b", &[("2024-01-01", 2000.0, 1.0)])
            .with_peer("c", &[("2024-01-01", 6000.0, 1.0)]);
        let backward = MemorySource::default()
            .with_peer("c", &[("2024-01-01", 6000.0, 1.0)])
            .with_peer("b", &[("2024-01-01", 2000.0, 1.0)])
            .with_peer("a", &[("2024-01-01", 1000.0, 1.0)]);

        let a = aggregate(&forward, AggregationPolicy::Mean).unwrap();
        let b = aggregate(&backward, AggregationPolicy::Mean).unwrap();

        assert_eq!(a.values, b.values);
        assert_eq!(a.values["2024-01-01"], 3000.0);
    }

    #[test]
    fn test_legacy_policy_redivides_per_peer() {
        let source = MemorySource::default()
            .with_peer("a", &[("2024-01-01", 1000.0, 1.0)])
            .with_peer("b", &[("2024-01-01", 2000.0, 1.0)])
            .with_missing("x")
            .with_peer("c", &[("2024-01-01", 6000.0, 1.0)]);

        let result = aggregate(&source, AggregationPolicy::Legacy).unwrap();

        // a: 1000/1 = 1000; b: (1000+2000)/2 = 1500; c: (1500+6000)/3 = 2500
        assert_eq!(result.values["2024-01-01"], 2500.0);
        assert_eq!(result.participants["2024-01-01"], 3);
    }

    #[test]
    fn test_legacy_policy_redivides_untouched_dates() {
        let source = MemorySource::default()
            .with_peer("a", &[("2024-01-01", 900.0, 1.0), ("2024-01-02", 400.0, 1.0)])
            .with_peer("b", &[("2024-01-01", 300.0, 1.0), ("2024-01-02", 200.0, 1.0)])
            .with_peer("c", &[("2024-01-01", 600.0, 1.0)]);

        let result = aggregate(&source, AggregationPolicy::Legacy).unwrap();

        // 2024-01-02: 400 -> 600/2 = 300, then halved again after c
        assert_eq!(result.values["2024-01-01"], 400.0);
        assert_eq!(result.values["2024-01-02"], 150.0);
        assert_eq!(result.participants["2024-01-02"], 2);
    }

    #[test]
    fn test_legacy_policy_empty_and_malformed_peers() {
        let source = MemorySource::default()
            .with_peer("a", &[("2024-01-01", 900.0, 1.0)])
            .with_peer("b", &[("2024-01-01", 300.0, 1.0)])
            .with_peer("c", &[("2024-01-02", 5.0, 1.0)])
            .with_malformed("mallory")
            .with_peer("empty", &[]);

        let result = aggregate(&source, AggregationPolicy::Legacy).unwrap();

        // 900 -> 600 -> 300 (c) -> 150 (empty); mallory does not divide
        assert_eq!(result.values["2024-01-01"], 150.0);
        assert_eq!(result.values["2024-01-02"], 5.0);
        assert_eq!(result.participants["2024-01-01"], 2);
        assert_eq!(result.stats.peers_contributed, 4);
        assert_eq!(result.stats.peers_malformed, 1);

        let mean = aggregate(&source, AggregationPolicy::Mean).unwrap();
        assert_eq!(mean.values["2024-01-01"], 600.0);
    }

    #[test]
    fn test_peer_listing_failure_is_fatal() {
        assert!(aggregate(&FailingSource, AggregationPolicy::Mean).is_err());
    }

    #[test]
    fn test_aggregate_explicit_peer_subset() {
        let source = MemorySource::default()
            .with_peer("alice", &[("2024-01-01", 10000.0, 5.0)])
            .with_peer("bob", &[("2024-01-01", 8000.0, 4.0)]);

        let result =
            aggregate_peers(&source, &["bob".to_string()], AggregationPolicy::Mean);

        assert_eq!(result.values["2024-01-01"], 8000.0);
        assert_eq!(result.stats.peers_scanned, 1);
    }
}
