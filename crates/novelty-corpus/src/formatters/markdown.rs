//! Markdown output formatting.

use crate::config::IndicatorKind;
use crate::correlation::Correlation;
use crate::pipeline::{CorrelationStatus, PaperReport, RunReport, WindowRun};
use crate::results::YearSummary;
use crate::scorer::ScoreOutcome;
use crate::window::YearOutcome;

fn number(value: f64) -> String {
    if value.is_nan() { "n/a".to_string() } else { format!("{value:.4}") }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), number)
}

/// Format a full run report as Markdown.
#[must_use]
pub fn format_run_report_markdown(report: &RunReport) -> String {
    let mut output = format!("# Corpus Run: \"{}\"\n\n", report.search.query);

    output.push_str(&format!(
        "**Filter**: {} | **Sampled**: {} | **Scored**: {}\n\n",
        report.search.filter,
        report.papers.len(),
        report.aggregates.len()
    ));

    output.push_str("## Sample\n\n");
    for paper in &report.papers {
        output.push_str(&format_paper_report(paper));
    }

    output.push_str("\n## Correlation\n\n");
    output.push_str(&format_correlation_markdown(&report.correlation));

    output.push_str(&format!(
        "\n## Corpus\n\n**Partitions written**: {} | **Records appended**: {} | **Duplicates dropped**: {}\n",
        report.persisted.partitions, report.persisted.appended, report.persisted.dropped
    ));

    if !report.windows.is_empty() {
        output.push_str("\n## Windows\n\n");
        for window in &report.windows {
            output.push_str(&format_window_markdown(window));
            output.push('\n');
        }
    }

    output
}

fn format_paper_report(paper: &PaperReport) -> String {
    let mut output = format!("### {}. {}\n\n", paper.rank, paper.title);

    let mut meta = Vec::new();
    if let Some(id) = paper.id {
        meta.push(format!("**ID**: {id}"));
    }
    if let Some(year) = paper.year {
        meta.push(format!("**Year**: {year}"));
    }
    meta.push(format!("**Citations**: {}", paper.cited_by_count));
    meta.push(format!("**References fetched**: {}", paper.references_fetched));
    output.push_str(&format!("{}\n\n", meta.join(" | ")));

    if let Some(error) = &paper.error {
        output.push_str(&format!("> Rejected: {error}\n\n"));
        return output;
    }

    if let Some(error) = &paper.persist_error {
        output.push_str(&format!("> Not persisted: {error}\n\n"));
    }

    match &paper.outcome {
        Some(ScoreOutcome::Scored(agg)) => {
            output.push_str(&format!(
                "**Mean**: {} | **Max**: {} | **Min**: {} | **Topics**: {}\n\n",
                number(agg.mean),
                number(agg.max),
                number(agg.min),
                agg.topic_count()
            ));
            if agg.unscored_count > 0 {
                output.push_str(&format!(
                    "_{} of {} references had no percentile._\n\n",
                    agg.unscored_count,
                    agg.scored_count + agg.unscored_count
                ));
            }
        }
        Some(ScoreOutcome::SkippedNoReferences) => {
            output.push_str("_No references, not scored._\n\n");
        }
        None => {}
    }

    output
}

/// Format the correlation phase as a Markdown table.
#[must_use]
pub fn format_correlation_markdown(status: &CorrelationStatus) -> String {
    let report = match status {
        CorrelationStatus::Computed(report) => report,
        CorrelationStatus::Skipped { reason } => return format!("Skipped: {reason}\n"),
    };

    let mut output = String::from("| Citations vs | r | p | n |\n|---|---|---|---|\n");
    let rows: [(&str, &Correlation); 4] = [
        ("Mean percentile", &report.mean),
        ("Min percentile", &report.min),
        ("Max percentile", &report.max),
        ("Topic count", &report.topics),
    ];
    for (label, c) in rows {
        output.push_str(&format!(
            "| {label} | {} | {} | {} |\n",
            number(c.coefficient),
            number(c.p_value),
            c.samples
        ));
    }
    output
}

/// Format one window run as Markdown.
#[must_use]
pub fn format_window_markdown(run: &WindowRun) -> String {
    let mut output = match run.rank {
        Some(rank) => format!("### Focal year {} (paper {rank})\n\n", run.focal_year),
        None => format!("### Focal year {}\n\n", run.focal_year),
    };

    if let Some(error) = &run.error {
        output.push_str(&format!("> Aborted: {error}\n"));
        return output;
    }

    let Some(report) = &run.report else {
        return output;
    };

    output.push_str(&format!(
        "**Window**: {}-{}\n\n",
        report.window.start,
        report.window.end - 1
    ));
    for outcome in &report.years {
        let line = match outcome {
            YearOutcome::Scored { year, .. } => format!("- {year}: scored\n"),
            YearOutcome::SkippedMissingPartition { year } => {
                format!("- {year}: skipped, no partition\n")
            }
            YearOutcome::SkippedMissingReferences { year } => {
                format!("- {year}: skipped, missing reference field\n")
            }
        };
        output.push_str(&line);
    }

    output
}

/// Format per-year indicator averages as a Markdown table.
#[must_use]
pub fn format_results_markdown(indicator: IndicatorKind, summary: &[YearSummary]) -> String {
    if summary.is_empty() {
        return format!("No {indicator} results found.");
    }

    let total: usize = summary.iter().map(|s| s.papers).sum();
    let mut output = format!("# {indicator} results ({total} papers)\n\n");

    if indicator.has_conventionality() {
        output.push_str("| Year | Papers | Novelty | Conventionality |\n|---|---|---|---|\n");
        for s in summary {
            output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                s.year,
                s.papers,
                optional(s.mean_novelty),
                optional(s.mean_conventionality)
            ));
        }
    } else {
        output.push_str("| Year | Papers | Novelty |\n|---|---|---|\n");
        for s in summary {
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                s.year,
                s.papers,
                optional(s.mean_novelty)
            ));
        }
    }

    output
}
