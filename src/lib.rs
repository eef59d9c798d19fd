//! batcher - bounded-parallelism batch command runner
//!
//! Runs a configurable number of identical external commands with at most
//! a configurable number running at once, capturing each job's outcome and
//! aggregating run statistics.
//!
//! ```no_run
//! use batcher::config::RunConfig;
//! use batcher::executor::Scheduler;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = RunConfig::new(5, 2, "job", vec!["true".to_string()])?.with_ticks(5)?;
//! let report = Scheduler::new(config).run().await;
//! assert_eq!(report.stats.completed, 5);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod models;
pub mod output;
pub mod stats;
pub mod utils;
