//! Seam to the external novelty engine.

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::config::{CooccurrenceUnit, IndicatorKind, corpus};
use crate::error::EngineResult;

/// Names the engine needs to read the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusLayout {
    /// Collection name.
    pub collection: String,
    /// Directory holding the year partitions.
    pub root: PathBuf,
    /// Field holding a record's id.
    pub id_field: String,
    /// Field holding a record's year.
    pub year_field: String,
    /// Field holding the list of co-occurring items.
    pub variable: String,
    /// Field inside each list item used as the co-occurrence unit.
    pub sub_variable: String,
}

impl CorpusLayout {
    /// Layout of the corpus rooted at `root`, co-occurring on `unit`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, unit: CooccurrenceUnit) -> Self {
        Self {
            collection: corpus::COLLECTION.to_string(),
            root: root.as_ref().to_path_buf(),
            id_field: "id".to_string(),
            year_field: "year".to_string(),
            variable: unit.variable().to_string(),
            sub_variable: unit.sub_variable().to_string(),
        }
    }

    /// Layout of the reference co-occurrence corpus rooted at `root`.
    #[must_use]
    pub fn references(root: impl AsRef<Path>) -> Self {
        Self::new(root, CooccurrenceUnit::References)
    }
}

/// Request to build the co-occurrence network over a time window.
#[derive(Debug, Clone, Serialize)]
pub struct CooccurrenceRequest<'a> {
    /// Corpus layout.
    pub layout: &'a CorpusLayout,
    /// Years covered, end exclusive.
    pub window: Range<i32>,
    /// Weight edges by co-occurrence count.
    pub weighted: bool,
    /// Keep items co-occurring with themselves.
    pub self_loop: bool,
}

/// Request to score one year of the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorRequest<'a> {
    /// Corpus layout.
    pub layout: &'a CorpusLayout,
    /// Indicator to compute.
    pub indicator: IndicatorKind,
    /// Year whose papers are scored.
    pub focal_year: i32,
}

/// External co-occurrence and indicator engine.
///
/// Implementations persist their own results; the returned value is opaque
/// and only logged or reported.
#[async_trait::async_trait]
pub trait NoveltyEngine: Send + Sync {
    /// Build the co-occurrence network for a window.
    async fn build_cooccurrence(&self, request: &CooccurrenceRequest<'_>) -> EngineResult<()>;

    /// Compute the indicator for one year.
    async fn compute_indicator(&self, request: &IndicatorRequest<'_>) -> EngineResult<Value>;
}
