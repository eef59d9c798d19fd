//! Bounded-concurrency job scheduler
//!
//! Launches every job of a run as its own task, admits at most `batch` of
//! them into execution at a time, and drains their completions through a
//! single result stream.

use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

use super::progress::{ProgressReporter, ProgressTicks};
use super::runner::JobRunner;
use crate::config::RunConfig;
use crate::models::{Job, JobOutcome, LaunchError};
use crate::stats::RunStats;

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunReport {
    /// Completed jobs, ordered by id
    pub jobs: Vec<Job>,
    /// Final statistics
    pub stats: RunStats,
    /// Most jobs observed executing at the same time
    pub peak_concurrency: usize,
}

/// Tracks how many jobs are between start and finish
#[derive(Debug, Default)]
struct ConcurrencyGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    fn enter(self: &Arc<Self>) -> ActiveGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(Arc::clone(self))
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveGuard(Arc<ConcurrencyGauge>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs `total` jobs with at most `batch` executing concurrently
pub struct Scheduler {
    config: RunConfig,
    runner: Arc<JobRunner>,
    progress: Option<Box<dyn ProgressReporter>>,
}

impl Scheduler {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            runner: Arc::new(JobRunner::new()),
            progress: None,
        }
    }

    /// Use a specific runner
    pub fn with_runner(mut self, runner: JobRunner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    /// Notify `reporter` at every progress tick
    pub fn with_progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Box::new(reporter));
        self
    }

    /// Run every job and wait for all of them to complete.
    ///
    /// Individual job failures never abort the run; the report always
    /// covers every job that reached the result stream.
    pub async fn run(mut self) -> RunReport {
        let total = self.config.total();
        let batch = self.config.batch();

        let admission = Arc::new(Semaphore::new(batch));
        let gauge = Arc::new(ConcurrencyGauge::default());
        let (results_tx, mut results_rx) = mpsc::channel::<Job>(total);

        let mut stats = RunStats::new(total);
        let mut ticks = ProgressTicks::new(total, self.config.ticks());

        info!(
            total,
            batch,
            prefix = self.config.prefix(),
            command = ?self.config.command(),
            "Starting batch run"
        );
        debug!(step = ticks.step(), ticks = self.config.ticks(), "Progress tick spacing");
        stats.start();

        let mut handles = Vec::with_capacity(total);
        for id in 1..=total {
            let job = Job::new(id, self.config.prefix(), self.config.command().to_vec());
            handles.push(tokio::spawn(execute(
                job,
                Arc::clone(&admission),
                Arc::clone(&self.runner),
                Arc::clone(&gauge),
                results_tx.clone(),
            )));
        }

        // The stream ends when the supervisor drops the last sender, which
        // happens only after every execution task has finished.
        let supervisor = tokio::spawn(async move {
            for (idx, result) in join_all(handles).await.into_iter().enumerate() {
                if let Err(e) = result {
                    error!(id = idx + 1, error = %e, "Job task did not complete");
                }
            }
            drop(results_tx);
        });

        let mut jobs = Vec::with_capacity(total);
        while let Some(job) = results_rx.recv().await {
            stats.update(&job);
            if ticks.crossed(stats.completed) {
                if let Some(progress) = self.progress.as_mut() {
                    progress.on_tick(&stats, &job);
                }
            }
            jobs.push(job);
        }
        stats.finish();

        if let Err(e) = supervisor.await {
            error!(error = %e, "Supervisor task failed");
        }
        if !stats.is_finished() {
            warn!(
                completed = stats.completed,
                total, "Run ended with missing job results"
            );
        }

        jobs.sort_by_key(|job| job.id);

        info!(
            completed = stats.completed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            invalid = stats.invalid,
            active_secs = stats.active_time.as_secs_f64(),
            "Batch run finished"
        );

        RunReport {
            jobs,
            stats,
            peak_concurrency: gauge.peak(),
        }
    }
}

/// Wait for admission, run the job, release admission, publish the result
async fn execute(
    mut job: Job,
    admission: Arc<Semaphore>,
    runner: Arc<JobRunner>,
    gauge: Arc<ConcurrencyGauge>,
    results: mpsc::Sender<Job>,
) {
    job.mark_ready();

    match admission.acquire().await {
        Ok(_permit) => {
            job.mark_started();
            let _active = gauge.enter();
            debug!(id = job.id, name = %job.name, "Job started");
            runner.run(&mut job).await;
        }
        Err(_) => {
            job.complete(
                JobOutcome::Invalid {
                    cause: LaunchError::AdmissionClosed,
                },
                Duration::ZERO,
            );
        }
    }

    if results.send(job).await.is_err() {
        warn!("Result stream closed before job could be published");
    }
}
