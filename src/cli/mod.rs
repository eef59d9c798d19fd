//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{EnvConfig, RunSettings};

/// Run a batch of identical commands with bounded parallelism
#[derive(Parser, Debug)]
#[command(name = "batcher")]
#[command(version)]
#[command(about = "Run N copies of a command, at most C at a time, and report run statistics")]
#[command(long_about = None)]
pub struct Args {
    /// The total number of jobs to run
    #[arg(short, long, allow_negative_numbers = true)]
    pub total: Option<i64>,

    /// Up to this many jobs will run at the same time
    #[arg(short, long, allow_negative_numbers = true)]
    pub batch: Option<i64>,

    /// The prefix to use when generating job names
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Number of progress reports over the run
    #[arg(long, allow_negative_numbers = true)]
    pub ticks: Option<i64>,

    /// Output format (text, json, json-pretty, csv)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Show stdout/stderr for successful jobs too
    #[arg(short, long)]
    pub detailed: bool,

    /// Disable progress reports and per-job failure warnings
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to this file and exit without running
    #[arg(long, value_name = "FILE")]
    pub write_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run for every job (default: sleep 1)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Args {
    /// Config file path from the flag, falling back to the environment
    pub fn config_path(&self, env: &EnvConfig) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
    }

    /// Override settings with the flags that were given
    pub fn apply_to(&self, settings: &mut RunSettings) {
        if let Some(total) = self.total {
            settings.total = total;
        }
        if let Some(batch) = self.batch {
            settings.batch = batch;
        }
        if let Some(prefix) = &self.prefix {
            settings.prefix = prefix.clone();
        }
        if let Some(ticks) = self.ticks {
            settings.ticks = ticks;
        }
        if !self.command.is_empty() {
            settings.command = self.command.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_options_and_command() {
        let args = Args::try_parse_from([
            "batcher", "--total", "5", "--batch", "2", "--prefix", "load", "--", "sh", "-c",
            "exit 0",
        ])
        .unwrap();

        assert_eq!(args.total, Some(5));
        assert_eq!(args.batch, Some(2));
        assert_eq!(args.prefix.as_deref(), Some("load"));
        assert_eq!(args.command, vec!["sh", "-c", "exit 0"]);
    }

    #[test]
    fn test_trailing_command_keeps_its_flags() {
        let args = Args::try_parse_from(["batcher", "-t", "3", "ls", "-la", "/tmp"]).unwrap();
        assert_eq!(args.total, Some(3));
        assert_eq!(args.command, vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn test_negative_total_reaches_validation() {
        let args = Args::try_parse_from(["batcher", "--total", "-1"]).unwrap();
        let mut settings = RunSettings::default();
        args.apply_to(&mut settings);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_apply_to_keeps_unset_values() {
        let args = Args::try_parse_from(["batcher", "--batch", "4"]).unwrap();
        let mut settings = RunSettings::default();
        args.apply_to(&mut settings);

        assert_eq!(settings.batch, 4);
        assert_eq!(settings.total, RunSettings::default().total);
        assert_eq!(settings.command, RunSettings::default().command);
    }

    #[test]
    fn test_write_config_path() {
        let args = Args::try_parse_from(["batcher", "--write-config", "out.yaml", "-t", "4"]).unwrap();
        assert_eq!(args.write_config, Some(PathBuf::from("out.yaml")));
        assert!(args.command.is_empty());
    }

    #[test]
    fn test_config_path_precedence() {
        let env = EnvConfig {
            config_file: Some("/etc/batcher.yaml".to_string()),
            ..Default::default()
        };

        let args = Args::try_parse_from(["batcher"]).unwrap();
        assert_eq!(
            args.config_path(&env),
            Some(PathBuf::from("/etc/batcher.yaml"))
        );

        let args = Args::try_parse_from(["batcher", "--config", "local.yaml"]).unwrap();
        assert_eq!(args.config_path(&env), Some(PathBuf::from("local.yaml")));
    }
}
