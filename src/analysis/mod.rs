//! Analysis modules.
//!
//! Reduces peer step records into per-date aggregates.

pub mod aggregator;

pub use aggregator::*;
