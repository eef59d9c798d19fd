//! Output formatters for run results
//!
//! Provides per-job reports and the end-of-run summary as text, JSON or CSV.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::str::FromStr;
use thiserror::Error;

use crate::executor::RunReport;
use crate::models::{Job, JobStatus};
use crate::stats::{RunStats, RunSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
    Csv,
}

/// Unrecognised output format name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown output format: {0} (expected text, json, json-pretty or csv)")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "table" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

/// Progress line printed at each tick
pub fn format_progress(stats: &RunStats) -> String {
    format!(
        "Progress: complete={:6}({:6.2}%) fail={:6}({:6.2}%) invalid={:6}({:6.2}%) success={:6}({:6.2}%)",
        stats.completed,
        stats.completion_percentage(),
        stats.failed,
        stats.failure_percentage(),
        stats.invalid,
        stats.invalid_percentage(),
        stats.succeeded,
        stats.success_percentage(),
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    jobs: &'a [Job],
    summary: RunSummary,
    peak_concurrency: usize,
}

/// Run report formatter
pub struct ReportFormatter {
    format: OutputFormat,
    detailed: bool,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            detailed: false,
        }
    }

    /// Include stdout/stderr of successful jobs in text reports
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Format the complete report
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.format_text(report)),
            OutputFormat::Json => {
                serde_json::to_string(&json_report(report)).context("Failed to serialize report")
            }
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&json_report(report))
                .context("Failed to serialize report"),
            OutputFormat::Csv => format_csv(&report.jobs),
        }
    }

    fn format_text(&self, report: &RunReport) -> String {
        let mut output = String::new();
        for job in &report.jobs {
            output.push_str(&self.format_job(job));
        }
        output.push('\n');
        output.push_str(&format_summary(&report.stats.summary()));
        let _ = writeln!(output, "  Peak concurrency:   {:>10}", report.peak_concurrency);
        output
    }

    /// Format one job as banner-delimited text
    pub fn format_job(&self, job: &Job) -> String {
        let mut output = String::new();

        if job.status() == JobStatus::Invalid {
            output.push_str(&banner(job, "command invalid"));
            let _ = writeln!(output, "Command: {}", job.command_line());
            if let Some(cause) = job.launch_error() {
                let _ = writeln!(output, "Error: {cause}");
            }
            return output;
        }

        if self.detailed || job.status() == JobStatus::Failed {
            push_stream(&mut output, job, "stdout", &job.stdout);
            push_stream(&mut output, job, "stderr", &job.stderr);
        }

        output.push_str(&banner(
            job,
            &format!(
                "exit status: {:3}, times: {:+13.6}s ({:13.6}s)",
                job.exit_status(),
                job.wait_time().as_secs_f64(),
                job.duration.unwrap_or_default().as_secs_f64(),
            ),
        ));
        output
    }
}

fn banner(job: &Job, text: &str) -> String {
    format!("[{} job {}]\n", job.name, text)
}

fn push_stream(output: &mut String, job: &Job, label: &str, content: &str) {
    if content.is_empty() {
        output.push_str(&banner(job, &format!("{label} empty")));
        return;
    }
    output.push_str(&banner(job, label));
    output.push_str(content);
    if !content.ends_with('\n') {
        output.push('\n');
    }
}

fn json_report(report: &RunReport) -> JsonReport<'_> {
    JsonReport {
        jobs: &report.jobs,
        summary: report.stats.summary(),
        peak_concurrency: report.peak_concurrency,
    }
}

fn secs_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.6}s"))
}

/// Format the end-of-run statistics
pub fn format_summary(summary: &RunSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Run Summary");
    let _ = writeln!(output, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let _ = writeln!(output, "  Total jobs:         {:>10}", summary.total);
    let _ = writeln!(
        output,
        "  Completed:          {:>10} ({:7.3}%)",
        summary.completed, summary.completion_pct
    );
    let _ = writeln!(
        output,
        "  Succeeded:          {:>10} ({:7.3}%)",
        summary.succeeded, summary.success_pct
    );
    let _ = writeln!(
        output,
        "  Failed:             {:>10} ({:7.3}%)",
        summary.failed, summary.failure_pct
    );
    let _ = writeln!(
        output,
        "  Invalid:            {:>10} ({:7.3}%)",
        summary.invalid, summary.invalid_pct
    );
    let _ = writeln!(output, "  Active time:        {:>10.6}s", summary.active_time_secs);
    let _ = writeln!(
        output,
        "  Completion rate:    {:>10.3} jobs/s",
        summary.completion_rate
    );
    let _ = writeln!(
        output,
        "  Aggregate run time: {:>10.6}s",
        summary.aggregate_run_time_secs
    );
    let _ = writeln!(
        output,
        "  Average run time:   {:>11}",
        secs_or_na(summary.average_run_time_secs)
    );
    let _ = writeln!(
        output,
        "  Minimum run time:   {:>11}",
        secs_or_na(summary.minimum_run_time_secs)
    );
    let _ = writeln!(
        output,
        "  Maximum run time:   {:>11}",
        secs_or_na(summary.maximum_run_time_secs)
    );
    let _ = writeln!(
        output,
        "  Std deviation:      {:>11}",
        secs_or_na(summary.std_dev_secs)
    );
    let _ = writeln!(
        output,
        "  Variance:           {:>11}",
        summary
            .variance_secs2
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.6}s²"))
    );
    let _ = writeln!(
        output,
        "  Root mean square:   {:>11}",
        secs_or_na(summary.root_mean_square_secs)
    );
    output
}

/// One CSV row per job
fn format_csv(jobs: &[Job]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "id",
        "name",
        "status",
        "exit_status",
        "created_at",
        "started_at",
        "wait_secs",
        "duration_secs",
        "stdout_bytes",
        "stderr_bytes",
        "launch_error",
    ])?;

    for job in jobs {
        writer.write_record([
            job.id.to_string(),
            job.name.clone(),
            job.status().to_string(),
            job.exit_status().to_string(),
            job.created_at.to_rfc3339(),
            job.started_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            format!("{:.6}", job.wait_time().as_secs_f64()),
            job.duration
                .map(|d| format!("{:.6}", d.as_secs_f64()))
                .unwrap_or_default(),
            job.stdout.len().to_string(),
            job.stderr.len().to_string(),
            job.launch_error().map(|e| e.to_string()).unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
