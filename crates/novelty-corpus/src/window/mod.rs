//! Trailing-window orchestration of the external novelty engine.
//!
//! For a focal year `Y` and lookback `L` the orchestrator asks the engine to
//! build the co-occurrence network over `[Y-L, Y)` and then to compute the
//! indicator for every year of that window. A year without a partition, or
//! whose papers lack the reference field, is logged and skipped. Any other
//! engine failure aborts the current focal year only.

mod engine;
mod process;

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use engine::{CooccurrenceRequest, CorpusLayout, IndicatorRequest, NoveltyEngine};
pub use process::{EXIT_MISSING_REFERENCES, EXIT_PARTITION_MISSING, ProcessEngine};

use crate::config::{CooccurrenceUnit, IndicatorKind};
use crate::error::{CorpusError, CorpusResult, EngineError};
use crate::models::PartitionYear;
use crate::store::CorpusStore;

/// Outcome of one year in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum YearOutcome {
    /// The engine scored the year.
    Scored {
        /// Scored year.
        year: i32,
        /// Opaque engine output.
        output: Value,
    },
    /// No partition exists for the year.
    SkippedMissingPartition {
        /// Skipped year.
        year: i32,
    },
    /// Papers in the partition lack the reference field.
    SkippedMissingReferences {
        /// Skipped year.
        year: i32,
    },
}

impl YearOutcome {
    /// Year this outcome is for.
    #[must_use]
    pub const fn year(&self) -> i32 {
        match self {
            Self::Scored { year, .. }
            | Self::SkippedMissingPartition { year }
            | Self::SkippedMissingReferences { year } => *year,
        }
    }

    /// Whether the engine produced a score.
    #[must_use]
    pub const fn is_scored(&self) -> bool {
        matches!(self, Self::Scored { .. })
    }
}

/// Everything attempted for one focal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    /// Focal year.
    pub focal_year: i32,
    /// Window, end exclusive.
    pub window: Range<i32>,
    /// One outcome per window year, ascending.
    pub years: Vec<YearOutcome>,
}

/// Drives the engine across trailing windows.
#[derive(Clone)]
pub struct WindowOrchestrator {
    engine: Arc<dyn NoveltyEngine>,
    store: Arc<CorpusStore>,
    layout: CorpusLayout,
    lookback: i32,
    indicator: IndicatorKind,
}

impl WindowOrchestrator {
    /// Create an orchestrator over the reference layout of `store`.
    #[must_use]
    pub fn new(
        engine: Arc<dyn NoveltyEngine>,
        store: Arc<CorpusStore>,
        lookback: i32,
        indicator: IndicatorKind,
    ) -> Self {
        let layout = CorpusLayout::references(store.root());
        Self { engine, store, layout, lookback, indicator }
    }

    /// Co-occur on `unit` instead of referenced works.
    #[must_use]
    pub fn with_unit(mut self, unit: CooccurrenceUnit) -> Self {
        self.layout = CorpusLayout::new(self.store.root(), unit);
        self
    }

    /// Corpus layout handed to the engine.
    #[must_use]
    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    /// Years of the trailing window for `focal_year`.
    #[must_use]
    pub fn window(&self, focal_year: i32) -> Range<i32> {
        focal_year.saturating_sub(self.lookback)..focal_year
    }

    /// Run the window for one focal year.
    pub async fn run_focal_year(&self, focal_year: i32) -> CorpusResult<WindowReport> {
        let window = self.window(focal_year);
        tracing::info!(focal_year, start = window.start, end = window.end, "Building co-occurrence window");

        let abort = |source: EngineError| CorpusError::Engine { focal_year, source };

        self.engine
            .build_cooccurrence(&CooccurrenceRequest {
                layout: &self.layout,
                window: window.clone(),
                weighted: true,
                self_loop: true,
            })
            .await
            .map_err(abort)?;

        let mut years = Vec::with_capacity(window.len());
        for year in window.clone() {
            let outcome = self.score_year(year).await.map_err(abort)?;
            years.push(outcome);
        }

        let scored = years.iter().filter(|o| o.is_scored()).count();
        tracing::info!(focal_year, scored, attempted = years.len(), "Window complete");
        Ok(WindowReport { focal_year, window, years })
    }

    /// Run several focal years; a failure in one does not stop the others.
    pub async fn run_many<I>(&self, focal_years: I) -> Vec<(i32, CorpusResult<WindowReport>)>
    where
        I: IntoIterator<Item = i32>,
    {
        let mut reports = Vec::new();
        for focal_year in focal_years {
            let result = self.run_focal_year(focal_year).await;
            if let Err(ref e) = result {
                tracing::error!(focal_year, error = %e, "Window aborted");
            }
            reports.push((focal_year, result));
        }
        reports
    }

    async fn score_year(&self, year: i32) -> Result<YearOutcome, EngineError> {
        let present = PartitionYear::known(year).is_some_and(|p| self.store.partition_exists(p));
        if !present {
            tracing::info!(year, "No partition for year, skipping");
            return Ok(YearOutcome::SkippedMissingPartition { year });
        }

        let request = IndicatorRequest { layout: &self.layout, indicator: self.indicator, focal_year: year };
        match self.engine.compute_indicator(&request).await {
            Ok(output) => {
                tracing::info!(year, indicator = %self.indicator, output = %output, "Indicator computed");
                Ok(YearOutcome::Scored { year, output })
            }
            Err(EngineError::PartitionMissing { .. }) => {
                tracing::info!(year, "Engine found no partition for year, skipping");
                Ok(YearOutcome::SkippedMissingPartition { year })
            }
            Err(EngineError::MissingReferenceField { .. }) => {
                tracing::warn!(year, "Reference field missing in partition, skipping");
                Ok(YearOutcome::SkippedMissingReferences { year })
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for WindowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowOrchestrator")
            .field("layout", &self.layout)
            .field("lookback", &self.lookback)
            .field("indicator", &self.indicator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    struct NullEngine;

    #[async_trait::async_trait]
    impl NoveltyEngine for NullEngine {
        async fn build_cooccurrence(&self, _: &CooccurrenceRequest<'_>) -> crate::error::EngineResult<()> {
            Ok(())
        }

        async fn compute_indicator(&self, _: &IndicatorRequest<'_>) -> crate::error::EngineResult<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_window_bounds() {
        let store = Arc::new(CorpusStore::new("corpus"));
        let orchestrator = WindowOrchestrator::new(Arc::new(NullEngine), store, 10, IndicatorKind::Uzzi);
        assert_eq!(orchestrator.window(2020), 2010..2020);
        assert_eq!(orchestrator.window(2020).len(), 10);
        assert_eq!(orchestrator.layout().year_field, "year");
        assert_eq!(orchestrator.layout().variable, "referenced_works");

        let topics = orchestrator.with_unit(CooccurrenceUnit::Topics);
        assert_eq!(topics.layout().variable, "topics");
        assert_eq!(topics.layout().sub_variable, "display_name");
        assert_eq!(topics.layout().root, Path::new("corpus"));
    }

    #[test]
    fn test_year_outcome_serializes_tagged() {
        let value = serde_json::to_value(YearOutcome::SkippedMissingPartition { year: 2013 }).unwrap();
        assert_eq!(value, serde_json::json!({"outcome": "skipped_missing_partition", "year": 2013}));
    }
}
