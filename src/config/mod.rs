//! Configuration module
//!
//! Builds the immutable, validated run configuration handed to the
//! scheduler from defaults, a config file, the environment and the CLI.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::ConfigFile;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;

/// Default number of jobs per run
pub const DEFAULT_TOTAL: i64 = 50;
/// Default number of concurrently running jobs
pub const DEFAULT_BATCH: i64 = 10;
/// Default job name prefix
pub const DEFAULT_PREFIX: &str = "bgjob";
/// Default number of progress notifications per run
pub const DEFAULT_TICKS: i64 = 20;
/// Minimum job name prefix length
pub const MIN_PREFIX_LEN: usize = 2;

/// Default per-job command
pub fn default_command() -> Vec<String> {
    vec!["sleep".to_string(), "1".to_string()]
}

/// Invalid run configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Total must be > 0 (got {0})")]
    InvalidTotal(i64),

    #[error("Batch must be > 0 (got {0})")]
    InvalidBatch(i64),

    #[error("Batch must be <= Total (batch={batch}, total={total})")]
    BatchExceedsTotal { batch: i64, total: i64 },

    #[error("Prefix must be at least 2 characters (got {0:?})")]
    PrefixTooShort(String),

    #[error("Command must not be empty")]
    EmptyCommand,

    #[error("Ticks must be > 0 (got {0})")]
    InvalidTicks(i64),

    #[error("{var} must be an integer (got {value:?})")]
    InvalidEnv { var: String, value: String },
}

/// Unvalidated run settings, as read from files, environment and flags
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Number of jobs to run
    pub total: i64,

    /// Maximum number of jobs running at the same time
    pub batch: i64,

    /// Prefix used to generate job names
    pub prefix: String,

    /// Command (program followed by arguments) every job runs
    pub command: Vec<String>,

    /// Number of progress notifications over the run
    pub ticks: i64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            total: DEFAULT_TOTAL,
            batch: DEFAULT_BATCH,
            prefix: DEFAULT_PREFIX.to_string(),
            command: default_command(),
            ticks: DEFAULT_TICKS,
        }
    }
}

impl RunSettings {
    /// Merge every source, lowest precedence first: the config file's
    /// settings (themselves defaulted), then the environment, then flags
    /// and the trailing command.
    pub fn layered(file: &ConfigFile, env: &EnvConfig, args: &Args) -> Self {
        let mut settings = file.run.clone();
        settings.apply_env(env);
        args.apply_to(&mut settings);
        settings
    }

    /// Override settings with any values present in the environment
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(total) = env.total {
            self.total = total;
        }
        if let Some(batch) = env.batch {
            self.batch = batch;
        }
        if let Some(prefix) = &env.prefix {
            self.prefix = prefix.clone();
        }
        if let Some(ticks) = env.ticks {
            self.ticks = ticks;
        }
    }

    /// Validate into an immutable run configuration
    pub fn validate(self) -> Result<RunConfig, ConfigError> {
        if self.total <= 0 {
            return Err(ConfigError::InvalidTotal(self.total));
        }
        if self.batch <= 0 {
            return Err(ConfigError::InvalidBatch(self.batch));
        }
        if self.batch > self.total {
            return Err(ConfigError::BatchExceedsTotal {
                batch: self.batch,
                total: self.total,
            });
        }
        if self.prefix.chars().count() < MIN_PREFIX_LEN {
            return Err(ConfigError::PrefixTooShort(self.prefix));
        }
        if self.command.is_empty() || self.command[0].is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        if self.ticks <= 0 {
            return Err(ConfigError::InvalidTicks(self.ticks));
        }

        Ok(RunConfig {
            total: self.total as usize,
            batch: self.batch as usize,
            prefix: self.prefix,
            command: self.command,
            ticks: self.ticks as usize,
        })
    }
}

impl From<&RunConfig> for RunSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            total: config.total as i64,
            batch: config.batch as i64,
            prefix: config.prefix.clone(),
            command: config.command.clone(),
            ticks: config.ticks as i64,
        }
    }
}

/// Validated configuration for a single batch run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    total: usize,
    batch: usize,
    prefix: String,
    command: Vec<String>,
    ticks: usize,
}

impl RunConfig {
    /// Build and validate a configuration with the default tick count
    pub fn new(
        total: i64,
        batch: i64,
        prefix: impl Into<String>,
        command: Vec<String>,
    ) -> Result<Self, ConfigError> {
        RunSettings {
            total,
            batch,
            prefix: prefix.into(),
            command,
            ticks: DEFAULT_TICKS,
        }
        .validate()
    }

    /// Replace the number of progress ticks
    pub fn with_ticks(mut self, ticks: i64) -> Result<Self, ConfigError> {
        if ticks <= 0 {
            return Err(ConfigError::InvalidTicks(ticks));
        }
        self.ticks = ticks as usize;
        Ok(self)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }
}
