//! End-to-end run: select, expand, score, correlate, persist, drive windows.
//!
//! Scoring runs for the whole sample before anything is persisted, so the
//! correlation sees every paper. Persistence and the window for a paper then
//! run together, one paper at a time, so each window sees the corpus as it
//! stands after that paper was added.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::OpenAlexClient;
use crate::config::{Config, SearchParams};
use crate::correlation::{self, CorrelationReport};
use crate::error::CorpusResult;
use crate::expander::{ExpansionDepth, ReferenceExpander};
use crate::models::{ExpandedWork, StoredRecord, Work, WorkId};
use crate::scorer::{self, SampleAggregates, ScoreOutcome};
use crate::selector::{self, RankedWork, SampleSet};
use crate::store::{self, CorpusStore, PersistSummary};
use crate::window::{NoveltyEngine, ProcessEngine, WindowOrchestrator, WindowReport};

/// Audit snapshot of the selected sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSnapshot {
    /// When the candidate pool was fetched.
    pub retrieved_at: DateTime<Utc>,
    /// Search text.
    pub query: String,
    /// Filter expression.
    pub filter: String,
    /// Size of the candidate pool.
    pub candidates: usize,
    /// Sampled works as received, with their ranks.
    pub papers: Vec<RankedWork>,
}

/// What happened to one sampled paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperReport {
    /// Rank in the candidate pool.
    pub rank: usize,
    /// Normalized id, if the paper had a usable one.
    pub id: Option<WorkId>,
    /// Title.
    pub title: String,
    /// Publication year.
    pub year: Option<i32>,
    /// Citations received.
    pub cited_by_count: u64,
    /// References fetched at the first level.
    pub references_fetched: usize,
    /// Scoring outcome; absent when the paper was rejected before scoring.
    pub outcome: Option<ScoreOutcome>,
    /// Why the paper was rejected.
    pub error: Option<String>,
    /// Why the paper could not be written to the corpus.
    pub persist_error: Option<String>,
}

/// Correlation phase result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationStatus {
    /// Correlations were computed.
    Computed(CorrelationReport),
    /// Too few scored papers.
    Skipped {
        /// Reason.
        reason: String,
    },
}

/// Window phase result for one paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRun {
    /// Rank of the sampled paper whose year was the focal year.
    pub rank: Option<usize>,
    /// Focal year.
    pub focal_year: i32,
    /// Report, when the window completed.
    pub report: Option<WindowReport>,
    /// Why the window was aborted.
    pub error: Option<String>,
}

/// Summary of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Search that produced the pool.
    pub search: SearchParams,
    /// Per-paper outcomes, in rank order.
    pub papers: Vec<PaperReport>,
    /// Series fed to the correlation.
    pub aggregates: SampleAggregates,
    /// Correlation result.
    pub correlation: CorrelationStatus,
    /// Corpus writes.
    pub persisted: PersistSummary,
    /// Window runs, in rank order.
    pub windows: Vec<WindowRun>,
}

/// The full corpus pipeline.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    client: Arc<OpenAlexClient>,
    store: Arc<CorpusStore>,
    expander: ReferenceExpander,
    orchestrator: Option<WindowOrchestrator>,
}

impl Pipeline {
    /// Assemble a pipeline; without an engine the window phase is skipped.
    #[must_use]
    pub fn new(
        config: Config,
        client: Arc<OpenAlexClient>,
        engine: Option<Arc<dyn NoveltyEngine>>,
    ) -> Self {
        let store = Arc::new(CorpusStore::new(&config.corpus_root));
        let expander = ReferenceExpander::new(Arc::clone(&client), config.concurrency);
        let orchestrator = engine.map(|engine| {
            WindowOrchestrator::new(engine, Arc::clone(&store), config.lookback, config.indicator)
                .with_unit(config.cooccurrence_unit)
        });
        Self { config, client, store, expander, orchestrator }
    }

    /// Build the client and, if configured, the process engine from `config`.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = Arc::new(OpenAlexClient::new(&config)?);
        let engine = config
            .engine_command
            .clone()
            .map(|cmd| Arc::new(ProcessEngine::new(cmd)) as Arc<dyn NoveltyEngine>);
        Ok(Self::new(config, client, engine))
    }

    /// The corpus store.
    #[must_use]
    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    /// Fetch the candidate pool in response order.
    pub async fn fetch_candidates(&self) -> CorpusResult<Vec<Work>> {
        let page = self.client.search_works(&self.config.search).await?;
        tracing::info!(
            query = %self.config.search.query,
            returned = page.results.len(),
            total = page.meta.as_ref().map_or(0, |m| m.count),
            "Fetched candidate pool"
        );
        Ok(page.results)
    }

    /// Run every phase.
    pub async fn run(&self) -> CorpusResult<RunReport> {
        let candidates = self.fetch_candidates().await?;
        let sample = selector::select_sample(&candidates)?;
        self.write_snapshot(&sample, candidates.len())?;

        // Phase 1: expand and score every sampled paper.
        let mut papers = Vec::with_capacity(sample.len());
        let mut expansions = Vec::with_capacity(sample.len());
        for ranked in &sample.papers {
            let (report, expansion) = self.score_paper(ranked.rank, &ranked.work).await;
            papers.push(report);
            expansions.push(expansion);
        }

        let aggregates: SampleAggregates =
            papers.iter().filter_map(|p| p.outcome.as_ref()?.aggregate()).collect();
        let correlation = match correlation::report(&aggregates) {
            Ok(report) => CorrelationStatus::Computed(report),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping correlation");
                CorrelationStatus::Skipped { reason: e.to_string() }
            }
        };

        // Phase 2: persist each paper, then run the window for its year.
        let mut persisted = PersistSummary::default();
        let mut windows = Vec::new();
        for (report, expansion) in papers.iter_mut().zip(expansions) {
            let Some(expansion) = expansion else { continue };

            match self.store.persist(storage_entries(&expansion)) {
                Ok(summary) => persisted += summary,
                Err(e) => {
                    tracing::error!(paper = %report.title, error = %e, "Failed to persist paper");
                    report.persist_error = Some(e.to_string());
                }
            }

            if let Some(ref orchestrator) = self.orchestrator {
                let Some(focal_year) = report.year else {
                    tracing::warn!(paper = %report.title, "No publication year, skipping window");
                    continue;
                };
                let run = match &report.persist_error {
                    Some(error) => WindowRun {
                        rank: Some(report.rank),
                        focal_year,
                        report: None,
                        error: Some(format!("Paper not persisted: {error}")),
                    },
                    None => run_window(orchestrator, report.rank, focal_year).await,
                };
                windows.push(run);
            }
        }

        if self.orchestrator.is_none() {
            tracing::info!("No novelty engine configured, window phase skipped");
        }

        Ok(RunReport {
            search: self.config.search.clone(),
            papers,
            aggregates,
            correlation,
            persisted,
            windows,
        })
    }

    async fn score_paper(&self, rank: usize, work: &Work) -> (PaperReport, Option<ExpandedWork>) {
        let mut report = PaperReport {
            rank,
            id: None,
            title: work.title_or_default().to_string(),
            year: work.publication_year,
            cited_by_count: work.citations(),
            references_fetched: 0,
            outcome: None,
            error: None,
            persist_error: None,
        };

        let id = match work.work_id() {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(paper = %report.title, error = %e, "Rejecting sampled paper");
                report.error = Some(e.to_string());
                return (report, None);
            }
        };
        report.id = Some(id);

        let references = self.expander.expand(work, ExpansionDepth::Nested).await;
        let scoring: Vec<_> = references.iter().map(ExpandedWork::to_scoring).collect();
        report.references_fetched = references.len();
        report.outcome = Some(scorer::score(work, &scoring, &self.config.scoring));

        (report, Some(ExpandedWork { id, work: work.clone(), references }))
    }

    fn write_snapshot(&self, sample: &SampleSet, candidates: usize) -> CorpusResult<()> {
        let snapshot = SampleSnapshot {
            retrieved_at: Utc::now(),
            query: self.config.search.query.clone(),
            filter: self.config.search.filter.clone(),
            candidates,
            papers: sample.papers.clone(),
        };
        store::write_json_atomic(&self.config.sample_snapshot, &snapshot)?;
        tracing::info!(path = %self.config.sample_snapshot.display(), "Wrote sample snapshot");
        Ok(())
    }
}

/// Records persisted for one focal paper: the paper itself with its nested
/// references, plus each first-level reference in its own partition.
#[must_use]
pub fn storage_entries(paper: &ExpandedWork) -> Vec<StoredRecord> {
    std::iter::once(paper.to_stored())
        .chain(paper.references.iter().map(ExpandedWork::to_stored))
        .collect()
}

async fn run_window(orchestrator: &WindowOrchestrator, rank: usize, focal_year: i32) -> WindowRun {
    match orchestrator.run_focal_year(focal_year).await {
        Ok(report) => WindowRun { rank: Some(rank), focal_year, report: Some(report), error: None },
        Err(e) => {
            tracing::error!(focal_year, error = %e, "Window aborted");
            WindowRun { rank: Some(rank), focal_year, report: None, error: Some(e.to_string()) }
        }
    }
}
