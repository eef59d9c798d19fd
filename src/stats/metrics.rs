//! Run statistics collection and analysis
//!
//! Provides outcome counters, completion rates, and duration distribution
//! moments (mean, variance, standard deviation, root mean square).

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::error;

use crate::models::{Job, JobStatus};

/// Round `fraction / total` to a percentage with three decimals
pub fn percentage(fraction: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rounding_factor = 1000.0;
    ((fraction as f64 / total as f64) * 100.0 * rounding_factor).round() / rounding_factor
}

fn from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Incremental statistics for a single batch run
///
/// Updated once per completed job by the single result consumer, so it
/// carries no internal synchronisation.
#[derive(Clone, Debug)]
pub struct RunStats {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub invalid: usize,
    /// Wall-clock span between `start` and `finish`
    pub active_time: Duration,
    durations: Vec<Duration>,
    min: Option<Duration>,
    max: Option<Duration>,
    started: Option<Instant>,
}

impl RunStats {
    /// Create an accumulator for `total` jobs
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            succeeded: 0,
            failed: 0,
            invalid: 0,
            active_time: Duration::ZERO,
            durations: Vec::with_capacity(total),
            min: None,
            max: None,
            started: None,
        }
    }

    /// Mark the start of the run
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Mark the end of the run, fixing `active_time`
    pub fn finish(&mut self) {
        if let Some(started) = self.started {
            self.active_time = started.elapsed();
        }
    }

    /// Fold one completed job into the counters.
    ///
    /// A job that is still pending is logged and left out of every counter.
    pub fn update(&mut self, job: &Job) {
        match job.status() {
            JobStatus::Succeeded => self.succeeded += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Invalid => self.invalid += 1,
            JobStatus::Pending => {
                error!(id = job.id, name = %job.name, "Pending job reached the result stream");
                return;
            }
        }
        self.completed += 1;
        self.record_duration(job.duration.unwrap_or(Duration::ZERO));
    }

    fn record_duration(&mut self, duration: Duration) {
        self.min = Some(self.min.map_or(duration, |m| m.min(duration)));
        self.max = Some(self.max.map_or(duration, |m| m.max(duration)));
        self.durations.push(duration);
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    pub fn completion_percentage(&self) -> f64 {
        percentage(self.completed, self.total)
    }

    pub fn success_percentage(&self) -> f64 {
        percentage(self.succeeded, self.total)
    }

    pub fn failure_percentage(&self) -> f64 {
        percentage(self.failed, self.total)
    }

    pub fn invalid_percentage(&self) -> f64 {
        percentage(self.invalid, self.total)
    }

    /// Completed jobs per second of active time
    pub fn completion_rate(&self) -> f64 {
        let secs = self.active_time.as_secs_f64();
        if secs > 0.0 && self.completed > 0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }

    /// Sum of all job durations
    pub fn aggregate_run_time(&self) -> Duration {
        self.durations.iter().sum()
    }

    pub fn average_run_time(&self) -> Option<Duration> {
        self.mean_secs().map(from_secs)
    }

    pub fn minimum_run_time(&self) -> Option<Duration> {
        self.min
    }

    pub fn maximum_run_time(&self) -> Option<Duration> {
        self.max
    }

    /// Population variance of the job durations.
    ///
    /// The variance is measured in seconds², which is not a duration. It is
    /// returned as a `Duration` whose `as_secs_f64()` equals the variance in
    /// seconds² so it can be printed alongside the other timings.
    pub fn variance(&self) -> Option<Duration> {
        self.variance_secs().map(from_secs)
    }

    /// Standard deviation of the job durations
    pub fn std_dev(&self) -> Option<Duration> {
        self.variance_secs().map(|v| from_secs(v.sqrt()))
    }

    /// Root mean square of the job durations
    pub fn root_mean_square(&self) -> Option<Duration> {
        if self.durations.is_empty() {
            return None;
        }
        let mean_square = self
            .durations
            .iter()
            .map(|d| d.as_secs_f64().powi(2))
            .sum::<f64>()
            / self.durations.len() as f64;
        Some(from_secs(mean_square.sqrt()))
    }

    fn mean_secs(&self) -> Option<f64> {
        if self.durations.is_empty() {
            return None;
        }
        Some(self.aggregate_run_time().as_secs_f64() / self.durations.len() as f64)
    }

    fn variance_secs(&self) -> Option<f64> {
        let mean = self.mean_secs()?;
        let variance = self
            .durations
            .iter()
            .map(|d| (d.as_secs_f64() - mean).powi(2))
            .sum::<f64>()
            / self.durations.len() as f64;
        Some(variance.max(0.0))
    }

    /// Snapshot every statistic, with timings in seconds
    pub fn summary(&self) -> RunSummary {
        let secs = |d: Option<Duration>| d.map(|d| d.as_secs_f64());
        RunSummary {
            total: self.total,
            completed: self.completed,
            succeeded: self.succeeded,
            failed: self.failed,
            invalid: self.invalid,
            completion_pct: self.completion_percentage(),
            success_pct: self.success_percentage(),
            failure_pct: self.failure_percentage(),
            invalid_pct: self.invalid_percentage(),
            active_time_secs: self.active_time.as_secs_f64(),
            completion_rate: self.completion_rate(),
            aggregate_run_time_secs: self.aggregate_run_time().as_secs_f64(),
            average_run_time_secs: secs(self.average_run_time()),
            minimum_run_time_secs: secs(self.minimum_run_time()),
            maximum_run_time_secs: secs(self.maximum_run_time()),
            variance_secs2: self.variance_secs(),
            std_dev_secs: secs(self.std_dev()),
            root_mean_square_secs: secs(self.root_mean_square()),
        }
    }
}

/// Serialisable snapshot of a run's statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub invalid: usize,
    pub completion_pct: f64,
    pub success_pct: f64,
    pub failure_pct: f64,
    pub invalid_pct: f64,
    pub active_time_secs: f64,
    /// Jobs per second
    pub completion_rate: f64,
    pub aggregate_run_time_secs: f64,
    pub average_run_time_secs: Option<f64>,
    pub minimum_run_time_secs: Option<f64>,
    pub maximum_run_time_secs: Option<f64>,
    /// Seconds squared
    pub variance_secs2: Option<f64>,
    pub std_dev_secs: Option<f64>,
    pub root_mean_square_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobOutcome, LaunchError};

    fn job_with(id: usize, outcome: JobOutcome, duration: Duration) -> Job {
        let mut job = Job::new(id, "bgjob", vec!["true".to_string()]);
        job.mark_started();
        job.complete(outcome, duration);
        job
    }

    fn stats_from_secs(secs: &[f64]) -> RunStats {
        let mut stats = RunStats::new(secs.len());
        stats.start();
        for (i, s) in secs.iter().enumerate() {
            stats.update(&job_with(
                i + 1,
                JobOutcome::Succeeded,
                Duration::from_secs_f64(*s),
            ));
        }
        stats.finish();
        stats
    }

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.333);
        assert_eq!(percentage(2, 3), 66.667);
        assert_eq!(percentage(5, 5), 100.0);
        assert_eq!(percentage(3, 0), 0.0);
    }

    #[test]
    fn test_outcome_counters() {
        let mut stats = RunStats::new(4);
        stats.update(&job_with(1, JobOutcome::Succeeded, Duration::from_millis(10)));
        stats.update(&job_with(
            2,
            JobOutcome::Failed { exit_code: 7 },
            Duration::from_millis(10),
        ));
        stats.update(&job_with(
            3,
            JobOutcome::Invalid {
                cause: LaunchError::EmptyCommand,
            },
            Duration::ZERO,
        ));
        stats.update(&job_with(4, JobOutcome::Succeeded, Duration::from_millis(10)));

        assert_eq!(stats.completed, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.invalid, 1);
        assert_eq!(
            stats.succeeded + stats.failed + stats.invalid,
            stats.completed
        );
        assert_eq!(stats.invalid_percentage(), 25.0);
        assert_eq!(stats.failure_percentage(), 25.0);
        assert!(stats.is_finished());
    }

    #[test]
    fn test_pending_job_is_not_counted() {
        let mut stats = RunStats::new(2);
        stats.update(&Job::new(1, "bgjob", vec!["true".to_string()]));

        assert_eq!(stats.completed, 0);
        assert_eq!(stats.invalid, 0);
        assert_eq!(stats.minimum_run_time(), None);
        assert!(!stats.is_finished());

        stats.update(&job_with(2, JobOutcome::Succeeded, Duration::from_millis(5)));
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.succeeded, 1);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let mut stats = RunStats::new(7);
        for id in 1..=7 {
            let outcome = match id % 3 {
                0 => JobOutcome::Succeeded,
                1 => JobOutcome::Failed { exit_code: 1 },
                _ => JobOutcome::Invalid {
                    cause: LaunchError::EmptyCommand,
                },
            };
            stats.update(&job_with(id, outcome, Duration::from_millis(1)));
        }

        let sum =
            stats.success_percentage() + stats.failure_percentage() + stats.invalid_percentage();
        assert!(approx(sum, 100.0, 0.002), "sum was {sum}");
        assert_eq!(stats.completion_percentage(), 100.0);
    }

    #[test]
    fn test_duration_moments() {
        let stats = stats_from_secs(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(stats.aggregate_run_time(), Duration::from_secs(15));
        assert_eq!(stats.average_run_time(), Some(Duration::from_secs(3)));
        assert_eq!(stats.minimum_run_time(), Some(Duration::from_secs(1)));
        assert_eq!(stats.maximum_run_time(), Some(Duration::from_secs(5)));

        let variance = stats.variance().unwrap().as_secs_f64();
        assert!(approx(variance, 2.0, 1e-9));

        let std_dev = stats.std_dev().unwrap().as_secs_f64();
        assert!(approx(std_dev, 2.0_f64.sqrt(), 1e-9));

        let rms = stats.root_mean_square().unwrap().as_secs_f64();
        assert!(approx(rms, 11.0_f64.sqrt(), 1e-9));
    }

    #[test]
    fn test_average_bounds_and_aggregate() {
        let stats = stats_from_secs(&[0.125, 0.5, 0.03, 1.75, 0.2]);

        let avg = stats.average_run_time().unwrap();
        let min = stats.minimum_run_time().unwrap();
        let max = stats.maximum_run_time().unwrap();
        assert!(min <= avg && avg <= max);

        let reconstructed = avg.as_secs_f64() * stats.completed as f64;
        assert!(approx(
            reconstructed,
            stats.aggregate_run_time().as_secs_f64(),
            1e-6
        ));
    }

    #[test]
    fn test_identical_durations_have_zero_variance() {
        let stats = stats_from_secs(&[0.1; 5]);
        assert!(stats.variance().unwrap().as_secs_f64() < 1e-12);
        assert!(stats.std_dev().unwrap().as_secs_f64() < 1e-6);
    }

    #[test]
    fn test_zero_duration_is_a_real_minimum() {
        let stats = stats_from_secs(&[0.5, 0.0, 0.25]);
        assert_eq!(stats.minimum_run_time(), Some(Duration::ZERO));
        assert_eq!(stats.maximum_run_time(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_empty_stats_are_guarded() {
        let mut stats = RunStats::new(3);
        stats.start();
        stats.finish();

        assert_eq!(stats.completion_rate(), 0.0);
        assert_eq!(stats.aggregate_run_time(), Duration::ZERO);
        assert!(stats.average_run_time().is_none());
        assert!(stats.minimum_run_time().is_none());
        assert!(stats.maximum_run_time().is_none());
        assert!(stats.variance().is_none());
        assert!(stats.std_dev().is_none());
        assert!(stats.root_mean_square().is_none());
        assert!(!stats.is_finished());
    }

    #[test]
    fn test_completion_rate_uses_active_time() {
        let mut stats = stats_from_secs(&[0.1, 0.1, 0.1, 0.1]);
        stats.active_time = Duration::from_secs(2);
        assert!(approx(stats.completion_rate(), 2.0, 1e-12));

        stats.active_time = Duration::ZERO;
        assert_eq!(stats.completion_rate(), 0.0);
    }

    #[test]
    fn test_queries_are_idempotent() {
        let stats = stats_from_secs(&[0.3, 0.7, 1.1]);
        assert_eq!(stats.variance(), stats.variance());
        assert_eq!(stats.root_mean_square(), stats.root_mean_square());
        assert_eq!(stats.completion_rate(), stats.completion_rate());
        assert_eq!(stats.summary(), stats.summary());
    }

    #[test]
    fn test_summary_snapshot() {
        let stats = stats_from_secs(&[1.0, 3.0]);
        let summary = stats.summary();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.success_pct, 100.0);
        assert_eq!(summary.average_run_time_secs, Some(2.0));
        assert_eq!(summary.variance_secs2, Some(1.0));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["succeeded"], 2);
    }
}
