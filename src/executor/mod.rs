//! Job execution engine
//!
//! Provides the single-job runner and the bounded-concurrency scheduler.

mod progress;
mod runner;
mod scheduler;

pub use progress::{ConsoleProgress, ProgressReporter, ProgressTicks};
pub use runner::{JobRunner, JOB_ID_ENV, JOB_NAME_ENV};
pub use scheduler::{RunReport, Scheduler};
