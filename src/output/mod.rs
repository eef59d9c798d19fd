//! Output formatting module
//!
//! Provides various output formats for run results.

mod formatter;

pub use formatter::{format_progress, format_summary, OutputFormat, ReportFormatter, UnknownFormat};
