//! batcher - bounded-parallelism batch command runner
//!
//! Runs a configurable number of identical external commands with at most
//! a configurable number running at once, then reports each job's captured
//! output and the run's statistics.
//!
//! ## Usage
//!
//! ```bash
//! # Run 50 copies of `sleep 1`, 10 at a time
//! batcher
//!
//! # Run 200 jobs, 25 at a time, of a custom command
//! batcher --total 200 --batch 25 -- curl -sf http://localhost:8080/health
//!
//! # Machine-readable output
//! batcher -t 20 -b 4 --format json-pretty -- sh -c 'echo $BATCHER_JOB_NAME'
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::{debug, error, info};

use batcher::cli::Args;
use batcher::config::{ConfigFile, EnvConfig, RunSettings};
use batcher::executor::{ConsoleProgress, JobRunner, Scheduler};
use batcher::output::{OutputFormat, ReportFormatter};
use batcher::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Both sources are read before the logger exists; their errors are
    // reported once it is installed.
    let env = EnvConfig::load();
    let file = ConfigFile::resolve(
        args.config_path(env.as_ref().unwrap_or(&EnvConfig::default()))
            .as_deref(),
    );

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::first_valid([
            args.log_level.as_deref(),
            env.as_ref().ok().and_then(|env| env.log_level.as_deref()),
            file.as_ref().ok().and_then(|file| file.log_level.as_deref()),
        ])
    };
    init_logger(level)?;

    let env = env.unwrap_or_else(|e| {
        error!(error = %e, "Invalid environment configuration");
        exit_with_usage()
    });
    let file = file.unwrap_or_else(|e| {
        error!(error = %format_args!("{e:#}"), "Failed to load config file");
        exit_with_usage()
    });

    for name in [args.log_level.as_deref(), env.log_level.as_deref()]
        .into_iter()
        .flatten()
    {
        if let Err(e) = name.parse::<LogLevel>() {
            error!(error = %e, "Invalid log level");
            exit_with_usage();
        }
    }

    if env.has_any() {
        debug!(?env, "Environment overrides present");
    }

    let format_name = args
        .format
        .as_deref()
        .or(file.format.as_deref())
        .unwrap_or("text");
    let format = format_name.parse::<OutputFormat>().unwrap_or_else(|e| {
        error!(error = %e, "Invalid output format");
        exit_with_usage()
    });

    let config = RunSettings::layered(&file, &env, &args)
        .validate()
        .unwrap_or_else(|e| {
            error!(error = %e, "Invalid configuration");
            exit_with_usage()
        });

    if let Some(path) = &args.write_config {
        ConfigFile::snapshot(&config, level, format).save(path)?;
        info!(path = %path.display(), "Wrote effective configuration");
        return Ok(());
    }

    let mut scheduler = Scheduler::new(config);
    if args.quiet {
        scheduler = scheduler.with_runner(JobRunner::new().quiet());
    } else if format == OutputFormat::Text {
        scheduler = scheduler.with_progress(ConsoleProgress);
    }
    let report = scheduler.run().await;

    let formatter = ReportFormatter::new(format).detailed(args.detailed);
    println!("{}", formatter.format_report(&report)?);

    Ok(())
}

fn exit_with_usage() -> ! {
    let _ = Args::command().print_help();
    std::process::exit(1);
}
