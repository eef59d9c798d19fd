//! Job models for batch execution
//!
//! Defines the job record, its terminal outcome, and launch errors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Reasons a job's command could not be launched at all
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaunchError {
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Executable not found: {program}")]
    NotFound { program: String },

    #[error("Permission denied: {program}")]
    PermissionDenied { program: String },

    #[error("Admission pool closed before the job could start")]
    AdmissionClosed,

    #[error("Failed to launch {program}: {message}")]
    Io { program: String, message: String },
}

impl LaunchError {
    /// Map a spawn failure onto a launch error for the given program
    pub fn from_io(program: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => LaunchError::NotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied {
                program: program.to_string(),
            },
            _ => LaunchError::Io {
                program: program.to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Terminal classification of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
    Invalid,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Succeeded => write!(f, "SUCCEEDED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

/// What happened when a job's command was executed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Not run yet
    Pending,
    /// Ran and exited zero
    Succeeded,
    /// Ran and exited nonzero
    Failed { exit_code: i32 },
    /// Never ran
    Invalid { cause: LaunchError },
}

impl JobOutcome {
    /// Classify a process exit code
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            JobOutcome::Succeeded
        } else {
            JobOutcome::Failed { exit_code: code }
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Pending => JobStatus::Pending,
            JobOutcome::Succeeded => JobStatus::Succeeded,
            JobOutcome::Failed { .. } => JobStatus::Failed,
            JobOutcome::Invalid { .. } => JobStatus::Invalid,
        }
    }

    /// Exit status: 0 on success, the exit code on failure, -1 when the
    /// command never ran (or has not run yet)
    pub fn exit_status(&self) -> i32 {
        match self {
            JobOutcome::Succeeded => 0,
            JobOutcome::Failed { exit_code } => *exit_code,
            JobOutcome::Pending | JobOutcome::Invalid { .. } => -1,
        }
    }
}

/// A single external command execution and its captured outcome
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    pub id: usize,
    pub name: String,
    pub command: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub stdout: String,
    pub stderr: String,
    pub outcome: JobOutcome,
}

impl Job {
    /// Create a pending job named `<prefix>_<id>`
    pub fn new(id: usize, prefix: &str, command: Vec<String>) -> Self {
        Self {
            id,
            name: format!("{prefix}_{id:06}"),
            command,
            created_at: Utc::now(),
            started_at: None,
            duration: None,
            stdout: String::new(),
            stderr: String::new(),
            outcome: JobOutcome::Pending,
        }
    }

    /// Record that the job is queued for admission
    pub fn mark_ready(&mut self) {
        self.created_at = Utc::now();
    }

    /// Record that the job holds an admission token
    pub fn mark_started(&mut self) {
        let now = Utc::now();
        // wall clocks can step backwards; keep started >= created
        self.started_at = Some(now.max(self.created_at));
    }

    /// Record the terminal outcome and elapsed run time
    pub fn complete(&mut self, outcome: JobOutcome, duration: Duration) {
        if self.started_at.is_none() {
            self.mark_started();
        }
        self.outcome = outcome;
        self.duration = Some(duration);
    }

    pub fn status(&self) -> JobStatus {
        self.outcome.status()
    }

    pub fn exit_status(&self) -> i32 {
        self.outcome.exit_status()
    }

    pub fn launch_error(&self) -> Option<&LaunchError> {
        match &self.outcome {
            JobOutcome::Invalid { cause } => Some(cause),
            _ => None,
        }
    }

    /// Time spent waiting for an admission token
    pub fn wait_time(&self) -> Duration {
        self.started_at
            .and_then(|started| (started - self.created_at).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// The command as a single shell-like line
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.status())
    }
}
