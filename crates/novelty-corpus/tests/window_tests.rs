//! Window orchestration tests with an in-process engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use novelty_corpus::config::IndicatorKind;
use novelty_corpus::error::{CorpusError, EngineError, EngineResult};
use novelty_corpus::models::{StoredRecord, WorkId};
use novelty_corpus::store::CorpusStore;
use novelty_corpus::window::{
    CooccurrenceRequest, IndicatorRequest, NoveltyEngine, WindowOrchestrator, YearOutcome,
};

/// Engine with scripted failures per year.
#[derive(Default)]
struct ScriptedEngine {
    cooc_failures: HashMap<i32, String>,
    indicator_failures: HashMap<i32, EngineError>,
    calls: Mutex<Vec<(String, i32)>>,
}

impl ScriptedEngine {
    fn calls(&self) -> Vec<(String, i32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NoveltyEngine for ScriptedEngine {
    async fn build_cooccurrence(&self, request: &CooccurrenceRequest<'_>) -> EngineResult<()> {
        assert!(request.weighted);
        assert!(request.self_loop);
        let focal = request.window.end;
        self.calls.lock().unwrap().push(("cooc".to_string(), focal));
        match self.cooc_failures.get(&focal) {
            Some(message) => Err(EngineError::failed(message.clone())),
            None => Ok(()),
        }
    }

    async fn compute_indicator(&self, request: &IndicatorRequest<'_>) -> EngineResult<Value> {
        let year = request.focal_year;
        self.calls.lock().unwrap().push(("indicator".to_string(), year));
        match self.indicator_failures.get(&year) {
            Some(EngineError::MissingReferenceField { .. }) => {
                Err(EngineError::MissingReferenceField { year })
            }
            Some(EngineError::PartitionMissing { .. }) => Err(EngineError::PartitionMissing { year }),
            Some(other) => Err(EngineError::failed(other.to_string())),
            None => Ok(json!({"indicator": request.indicator.as_str(), "year": year})),
        }
    }
}

/// Store with one record in each of `years`.
fn store_with_years(dir: &tempfile::TempDir, years: &[u32]) -> Arc<CorpusStore> {
    let store = CorpusStore::new(dir.path());
    let records = years.iter().map(|&year| StoredRecord {
        id: WorkId::new(u64::from(year)),
        year: Some(year),
        referenced_works: vec![StoredRecord {
            id: WorkId::new(1),
            year: Some(1990),
            referenced_works: vec![],
            topics: vec![],
        }],
        topics: vec![],
    });
    store.persist(records).unwrap();
    Arc::new(store)
}

fn all_but(skip: u32) -> Vec<u32> {
    (2010..2020).filter(|&y| y != skip).collect()
}

#[tokio::test]
async fn test_missing_partition_is_skipped_without_engine_call() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_years(&dir, &all_but(2013));
    let engine = Arc::new(ScriptedEngine::default());
    let orchestrator = WindowOrchestrator::new(engine.clone(), store, 10, IndicatorKind::Uzzi);

    let report = orchestrator.run_focal_year(2020).await.unwrap();

    assert_eq!(report.window, 2010..2020);
    assert_eq!(report.years.len(), 10);
    assert_eq!(report.years[3], YearOutcome::SkippedMissingPartition { year: 2013 });
    assert_eq!(report.years.iter().filter(|o| o.is_scored()).count(), 9);

    let calls = engine.calls();
    assert_eq!(calls[0], ("cooc".to_string(), 2020));
    assert!(!calls.contains(&("indicator".to_string(), 2013)));
    assert_eq!(calls.len(), 10);
}

#[tokio::test]
async fn test_engine_reported_skips_continue_the_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_years(&dir, &all_but(0));
    let mut engine = ScriptedEngine::default();
    engine.indicator_failures.insert(2011, EngineError::MissingReferenceField { year: 2011 });
    engine.indicator_failures.insert(2012, EngineError::PartitionMissing { year: 2012 });
    let engine = Arc::new(engine);
    let orchestrator = WindowOrchestrator::new(engine, store, 10, IndicatorKind::Foster);

    let report = orchestrator.run_focal_year(2020).await.unwrap();

    assert_eq!(report.years[1], YearOutcome::SkippedMissingReferences { year: 2011 });
    assert_eq!(report.years[2], YearOutcome::SkippedMissingPartition { year: 2012 });
    match &report.years[9] {
        YearOutcome::Scored { year, output } => {
            assert_eq!(*year, 2019);
            assert_eq!(output["indicator"], "foster");
        }
        other => panic!("expected scored, got {other:?}"),
    }
}

#[tokio::test]
async fn test_indicator_failure_aborts_focal_year() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_years(&dir, &all_but(0));
    let mut engine = ScriptedEngine::default();
    engine.indicator_failures.insert(2014, EngineError::failed("segfault"));
    let engine = Arc::new(engine);
    let orchestrator = WindowOrchestrator::new(engine.clone(), store, 10, IndicatorKind::Uzzi);

    let err = orchestrator.run_focal_year(2020).await.unwrap_err();
    assert!(matches!(err, CorpusError::Engine { focal_year: 2020, .. }));

    // Nothing after the failing year was attempted.
    let last = engine.calls().last().cloned().unwrap();
    assert_eq!(last, ("indicator".to_string(), 2014));
}

#[tokio::test]
async fn test_run_many_continues_after_failed_focal_year() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_years(&dir, &[2005, 2006, 2015]);
    let mut engine = ScriptedEngine::default();
    engine.cooc_failures.insert(2012, "network too large".to_string());
    let engine = Arc::new(engine);
    let orchestrator = WindowOrchestrator::new(engine, store, 10, IndicatorKind::Uzzi);

    let results = orchestrator.run_many([2012, 2016]).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, 2012);
    let err = results[0].1.as_ref().unwrap_err();
    assert!(err.to_string().contains("network too large"));

    let report = results[1].1.as_ref().unwrap();
    let scored: Vec<i32> =
        report.years.iter().filter(|o| o.is_scored()).map(YearOutcome::year).collect();
    assert_eq!(scored, vec![2006, 2015]);
}

#[tokio::test]
async fn test_short_lookback() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_years(&dir, &[2018, 2019]);
    let engine = Arc::new(ScriptedEngine::default());
    let orchestrator = WindowOrchestrator::new(engine, store, 2, IndicatorKind::Uzzi);

    let report = orchestrator.run_focal_year(2020).await.unwrap();
    let years: Vec<i32> = report.years.iter().map(YearOutcome::year).collect();
    assert_eq!(years, vec![2018, 2019]);
    assert!(report.years.iter().all(YearOutcome::is_scored));
}
