//! Job execution runner
//!
//! Runs one job's command as a child process, capturing its output and
//! classifying the result.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::models::{Job, JobOutcome, LaunchError};
use crate::utils::Timer;

/// Environment variable carrying the job id to the child process
pub const JOB_ID_ENV: &str = "BATCHER_JOB_ID";
/// Environment variable carrying the job name to the child process
pub const JOB_NAME_ENV: &str = "BATCHER_JOB_NAME";

/// Runner for a single job's command
#[derive(Clone, Debug, Default)]
pub struct JobRunner {
    quiet: bool,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not log failed or invalid jobs
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Run the job's command to completion.
    ///
    /// Stdout and stderr are captured into separate buffers. The duration
    /// covers launch through exit. Launch failures are recorded on the job
    /// as an invalid outcome rather than returned.
    pub async fn run(&self, job: &mut Job) {
        let Some((program, args)) = job.command.split_first() else {
            job.complete(
                JobOutcome::Invalid {
                    cause: LaunchError::EmptyCommand,
                },
                Duration::ZERO,
            );
            self.log_outcome(job);
            return;
        };
        let program = program.clone();

        debug!(id = job.id, name = %job.name, command = ?job.command, "Launching job");

        let timer = Timer::start(&job.name);
        let result = Command::new(&program)
            .args(args)
            .env(JOB_ID_ENV, job.id.to_string())
            .env(JOB_NAME_ENV, &job.name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;
        let duration = timer.stop();

        let outcome = match result {
            Ok(output) => {
                job.stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                job.stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                JobOutcome::from_exit_code(exit_code(&output.status))
            }
            Err(e) => JobOutcome::Invalid {
                cause: LaunchError::from_io(&program, &e),
            },
        };

        job.complete(outcome, duration);
        self.log_outcome(job);
    }

    fn log_outcome(&self, job: &Job) {
        if self.quiet {
            return;
        }
        match &job.outcome {
            JobOutcome::Failed { exit_code } => warn!(
                id = job.id,
                name = %job.name,
                command = ?job.command,
                exit_status = exit_code,
                "Job failed"
            ),
            JobOutcome::Invalid { cause } => warn!(
                id = job.id,
                name = %job.name,
                command = ?job.command,
                exit_status = job.exit_status(),
                cause = %cause,
                "Job command invalid"
            ),
            _ => debug!(id = job.id, name = %job.name, "Job succeeded"),
        }
    }
}

/// Exit code of a finished process. Processes killed by a signal report
/// `128 + signal`.
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::JobStatus;

    fn job(command: &[&str]) -> Job {
        let mut job = Job::new(1, "test", command.iter().map(|s| s.to_string()).collect());
        job.mark_started();
        job
    }

    #[tokio::test]
    async fn test_zero_exit_succeeds() {
        let mut job = job(&["true"]);
        JobRunner::new().run(&mut job).await;

        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(job.exit_status(), 0);
        assert!(job.launch_error().is_none());
        assert!(job.duration.is_some());
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_with_code() {
        let mut job = job(&["sh", "-c", "exit 7"]);
        JobRunner::new().quiet().run(&mut job).await;

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.exit_status(), 7);
        assert!(job.launch_error().is_none());
    }

    #[tokio::test]
    async fn test_missing_executable_is_invalid() {
        let mut job = job(&["/nonexistent/batcher-test-binary", "--flag"]);
        JobRunner::new().quiet().run(&mut job).await;

        assert_eq!(job.status(), JobStatus::Invalid);
        assert_eq!(job.exit_status(), -1);
        assert_eq!(
            job.launch_error(),
            Some(&LaunchError::NotFound {
                program: "/nonexistent/batcher-test-binary".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_empty_command_is_invalid() {
        let mut job = job(&[]);
        JobRunner::new().quiet().run(&mut job).await;

        assert_eq!(job.launch_error(), Some(&LaunchError::EmptyCommand));
        assert_eq!(job.duration, Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr_separately() {
        let mut job = job(&["sh", "-c", "echo out; echo err >&2; echo more"]);
        JobRunner::new().run(&mut job).await;

        assert_eq!(job.stdout, "out\nmore\n");
        assert_eq!(job.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_exports_job_identity() {
        let mut job = job(&["sh", "-c", "echo $BATCHER_JOB_ID $BATCHER_JOB_NAME"]);
        JobRunner::new().run(&mut job).await;

        assert_eq!(job.stdout.trim(), "1 test_000001");
    }

    #[tokio::test]
    async fn test_signal_termination_is_failure() {
        let mut job = job(&["sh", "-c", "kill -9 $$"]);
        JobRunner::new().quiet().run(&mut job).await;

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.exit_status(), 128 + 9);
    }

    #[tokio::test]
    async fn test_duration_covers_execution() {
        let mut job = job(&["sleep", "0.05"]);
        JobRunner::new().run(&mut job).await;

        assert!(job.duration.unwrap() >= Duration::from_millis(50));
    }
}
