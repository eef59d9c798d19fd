//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::ConfigError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "BATCHER";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Total from BATCHER_TOTAL
    pub total: Option<i64>,
    /// Batch from BATCHER_BATCH
    pub batch: Option<i64>,
    /// Prefix from BATCHER_PREFIX
    pub prefix: Option<String>,
    /// Ticks from BATCHER_TICKS
    pub ticks: Option<i64>,
    /// Config file from BATCHER_CONFIG
    pub config_file: Option<String>,
    /// Log level from BATCHER_LOG
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Load configuration using a custom variable lookup.
    ///
    /// A numeric variable that is set but does not parse is an error.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));
        let get_number = |name: &str| -> Result<Option<i64>, ConfigError> {
            get(name)
                .map(|value| {
                    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                        var: format!("{ENV_PREFIX}_{name}"),
                        value,
                    })
                })
                .transpose()
        };

        Ok(Self {
            total: get_number("TOTAL")?,
            batch: get_number("BATCH")?,
            prefix: get("PREFIX"),
            ticks: get_number("TICKS")?,
            config_file: get("CONFIG"),
            log_level: get("LOG"),
        })
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.total.is_some()
            || self.batch.is_some()
            || self.prefix.is_some()
            || self.ticks.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
    }
}
