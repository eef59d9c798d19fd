//! Data models for batch job execution
//!
//! This module contains the job record shared by the runner, scheduler,
//! statistics and output layers.

mod job;

pub use job::{Job, JobOutcome, JobStatus, LaunchError};
