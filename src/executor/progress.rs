//! Progress notification
//!
//! Decides at which completion counts progress is reported and defines the
//! reporter callback interface.

use crate::models::Job;
use crate::output::format_progress;
use crate::stats::RunStats;

/// Receives progress notifications at tick boundaries
pub trait ProgressReporter: Send {
    /// Called with the current statistics and the job that crossed the tick
    fn on_tick(&mut self, stats: &RunStats, job: &Job);
}

impl<F> ProgressReporter for F
where
    F: FnMut(&RunStats, &Job) + Send,
{
    fn on_tick(&mut self, stats: &RunStats, job: &Job) {
        self(stats, job)
    }
}

/// Prints a progress line to stdout
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleProgress;

impl ProgressReporter for ConsoleProgress {
    fn on_tick(&mut self, stats: &RunStats, _job: &Job) {
        println!("{}", format_progress(stats));
    }
}

/// Evenly spaced completion-count boundaries.
///
/// With `step = ceil(total / ticks)` the boundaries are `step, 2*step, ...`
/// capped at `total`; the final boundary is always `total`.
#[derive(Clone, Debug)]
pub struct ProgressTicks {
    total: usize,
    step: usize,
    next: usize,
    exhausted: bool,
}

impl ProgressTicks {
    pub fn new(total: usize, ticks: usize) -> Self {
        let step = total.div_ceil(ticks.max(1)).max(1);
        Self {
            total,
            step,
            next: step.min(total),
            exhausted: total == 0,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns true when `completed` reaches the next boundary, advancing it
    pub fn crossed(&mut self, completed: usize) -> bool {
        if self.exhausted || completed < self.next {
            return false;
        }
        if self.next >= self.total {
            self.exhausted = true;
        } else {
            self.next = (self.next + self.step).min(self.total);
        }
        true
    }
}
