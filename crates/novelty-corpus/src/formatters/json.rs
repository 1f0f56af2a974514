//! Compact JSON output formatting.

use serde_json::{Value, json};

use crate::config::IndicatorKind;
use crate::pipeline::{CorrelationStatus, PaperReport, RunReport, WindowRun};
use crate::results::{IndicatorRow, YearSummary};
use crate::scorer::ScoreOutcome;

/// Non-finite values become `null`.
fn finite(value: f64) -> Value {
    if value.is_finite() { json!(value) } else { Value::Null }
}

/// Create a compact per-paper representation.
///
/// Leaves out the ranked reference list, which can run to hundreds of entries.
#[must_use]
pub fn compact_paper_report(paper: &PaperReport) -> Value {
    let mut obj = json!({
        "rank": paper.rank,
        "title": paper.title,
        "year": paper.year,
        "citations": paper.cited_by_count,
        "referencesFetched": paper.references_fetched,
    });

    if let Some(id) = paper.id {
        obj["id"] = json!(id.to_string());
    }

    if let Some(error) = &paper.error {
        obj["error"] = json!(error);
    }

    if let Some(error) = &paper.persist_error {
        obj["persistError"] = json!(error);
    }

    match &paper.outcome {
        Some(ScoreOutcome::Scored(agg)) => {
            obj["score"] = json!({
                "mean": finite(agg.mean),
                "max": finite(agg.max),
                "min": finite(agg.min),
                "topics": agg.topic_count(),
                "scored": agg.scored_count,
                "unscored": agg.unscored_count,
            });
        }
        Some(ScoreOutcome::SkippedNoReferences) => {
            obj["skipped"] = json!("no_references");
        }
        None => {}
    }

    obj
}

/// Create a compact window representation.
#[must_use]
pub fn compact_window_run(run: &WindowRun) -> Value {
    let mut obj = json!({
        "rank": run.rank,
        "focalYear": run.focal_year,
    });

    if let Some(error) = &run.error {
        obj["error"] = json!(error);
    }

    if let Some(report) = &run.report {
        obj["window"] = json!([report.window.start, report.window.end]);
        obj["years"] = json!(report.years);
    }

    obj
}

/// Create a compact run representation.
#[must_use]
pub fn compact_run_report(report: &RunReport) -> Value {
    let correlation = match &report.correlation {
        CorrelationStatus::Computed(c) => {
            let entry = |c: &crate::correlation::Correlation| {
                json!({"r": finite(c.coefficient), "p": finite(c.p_value), "n": c.samples})
            };
            json!({
                "mean": entry(&c.mean),
                "min": entry(&c.min),
                "max": entry(&c.max),
                "topics": entry(&c.topics),
            })
        }
        CorrelationStatus::Skipped { reason } => json!({"skipped": reason}),
    };

    json!({
        "query": report.search.query,
        "filter": report.search.filter,
        "papers": report.papers.iter().map(compact_paper_report).collect::<Vec<_>>(),
        "correlation": correlation,
        "persisted": report.persisted,
        "windows": report.windows.iter().map(compact_window_run).collect::<Vec<_>>(),
    })
}

/// Indicator rows with their per-year averages.
#[must_use]
pub fn results_json(indicator: IndicatorKind, rows: &[IndicatorRow], summary: &[YearSummary]) -> Value {
    json!({
        "indicator": indicator.as_str(),
        "rows": rows,
        "years": summary,
    })
}
