//! Run statistics module
//!
//! Aggregates completed jobs into outcome counts, rates, and duration
//! distribution statistics.

mod metrics;

pub use metrics::{percentage, RunStats, RunSummary};
