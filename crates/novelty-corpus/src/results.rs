//! Reader for indicator results written by the novelty engine.
//!
//! Results live at `<root>/<indicator>/<variable>/<year>.json`; each file is a
//! list of `{"id": .., "<variable>_<indicator>": {"score": {..}}}` objects.
//! Non-finite scores are tolerated in the input (`NaN`, `Infinity`) and read
//! as missing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::IndicatorKind;
use crate::error::{CorpusError, CorpusResult};
use crate::models::WorkId;

static NON_FINITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\bInfinity\b|\bNaN\b").expect("valid non-finite pattern"));

/// One scored paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// Work id in `W<digits>` form.
    pub id: String,
    /// Partition year the score was read from.
    pub year: u32,
    /// Novelty score.
    pub novelty: Option<f64>,
    /// Conventionality score (Uzzi only).
    pub conventionality: Option<f64>,
}

/// Per-year averages over the kept rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    /// Year.
    pub year: u32,
    /// Rows kept for the year.
    pub papers: usize,
    /// Mean novelty over rows that have one.
    pub mean_novelty: Option<f64>,
    /// Mean conventionality over rows that have one.
    pub mean_conventionality: Option<f64>,
}

/// Directory holding the result files of one indicator.
#[must_use]
pub fn results_dir(root: &Path, indicator: IndicatorKind, variable: &str) -> PathBuf {
    root.join(indicator.as_str()).join(variable)
}

/// Read all result rows for an indicator, ordered by year.
pub fn read_indicator_results(
    root: &Path,
    indicator: IndicatorKind,
    variable: &str,
) -> CorpusResult<Vec<IndicatorRow>> {
    let dir = results_dir(root, indicator, variable);
    let mut files: Vec<(u32, PathBuf)> = fs::read_dir(&dir)
        .map_err(|e| CorpusError::io(&dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| {
            let year = path.file_stem()?.to_str()?.parse().ok()?;
            Some((year, path))
        })
        .collect();
    files.sort();

    let score_key = format!("{variable}_{indicator}");
    let mut rows = Vec::new();
    for (year, path) in files {
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable results file");
                continue;
            }
        };

        rows.extend(
            entries
                .iter()
                .filter_map(|entry| parse_row(entry, year, &score_key))
                .filter(|row| keep_row(row, indicator)),
        );
    }

    tracing::info!(indicator = %indicator, rows = rows.len(), "Loaded indicator results");
    Ok(rows)
}

fn read_entries(path: &Path) -> CorpusResult<Vec<Value>> {
    let text = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let text = NON_FINITE.replace_all(&text, "null");
    Ok(serde_json::from_str(&text)?)
}

fn parse_row(entry: &Value, year: u32, score_key: &str) -> Option<IndicatorRow> {
    let id = match entry.get("id")? {
        Value::Number(n) => WorkId::new(n.as_u64()?),
        Value::String(s) => WorkId::parse(s).ok()?,
        _ => return None,
    };
    let score = entry.get(score_key).and_then(|v| v.get("score"));
    let field = |name: &str| score.and_then(|s| s.get(name)).and_then(Value::as_f64);

    Some(IndicatorRow {
        id: id.to_string(),
        year,
        novelty: field("novelty"),
        conventionality: field("conventionality"),
    })
}

fn keep_row(row: &IndicatorRow, indicator: IndicatorKind) -> bool {
    if indicator.has_conventionality() {
        row.novelty.is_some() || row.conventionality.is_some()
    } else {
        row.novelty.is_some()
    }
}

/// Average the rows per year.
#[must_use]
pub fn summarize(rows: &[IndicatorRow]) -> Vec<YearSummary> {
    let mut by_year: BTreeMap<u32, Vec<&IndicatorRow>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.year).or_default().push(row);
    }

    by_year
        .into_iter()
        .map(|(year, rows)| YearSummary {
            year,
            papers: rows.len(),
            mean_novelty: mean(rows.iter().filter_map(|r| r.novelty)),
            mean_conventionality: mean(rows.iter().filter_map(|r| r.conventionality)),
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}
