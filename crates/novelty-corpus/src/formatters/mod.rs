//! Output formatting for run reports and indicator results.

mod json;
mod markdown;

use serde::{Deserialize, Serialize};

pub use json::{compact_paper_report, compact_run_report, compact_window_run, results_json};
pub use markdown::{
    format_correlation_markdown, format_results_markdown, format_run_report_markdown,
    format_window_markdown,
};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Human-readable Markdown.
    #[default]
    Markdown,
    /// Compact JSON.
    Json,
}
