//! Logging setup
//!
//! Log records go to stderr so job reports on stdout stay machine readable.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Crate name used as the filter directive target
const LOG_TARGET: &str = "batcher";

/// Unrecognised log level name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown log level: {0} (expected trace, debug, info, warn or error)")]
pub struct UnknownLogLevel(pub String);

/// Verbosity of the batcher's own log records
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// First level name in `candidates` that parses, or the default.
    ///
    /// Unparsable names are skipped so that a bad `BATCHER_LOG` cannot keep
    /// the error explaining it from being logged.
    pub fn first_valid<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        candidates
            .into_iter()
            .flatten()
            .find_map(|name| name.parse().ok())
            .unwrap_or_default()
    }

    fn filter_directive(self) -> String {
        format!("{LOG_TARGET}={}", self.to_tracing_level())
    }
}

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Install the global subscriber, filtered to batcher's records at `level`
pub fn init_logger(level: LogLevel) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.filter_directive()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {e}"))
}
