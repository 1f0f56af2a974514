//! Reference expansion tests using wiremock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use novelty_corpus::client::OpenAlexClient;
use novelty_corpus::config::Config;
use novelty_corpus::expander::{ExpansionDepth, ReferenceExpander};
use novelty_corpus::models::{Work, WorkId};

fn reference_json(id: u64, year: i32, refs: &[u64]) -> serde_json::Value {
    json!({
        "id": format!("https://openalex.org/W{id}"),
        "display_name": format!("Reference {id}"),
        "publication_year": year,
        "cited_by_count": id,
        "referenced_works": refs.iter().map(|r| format!("https://openalex.org/W{r}")).collect::<Vec<_>>(),
    })
}

fn paper_citing(refs: &[&str]) -> Work {
    Work {
        id: Some("https://openalex.org/W1".to_string()),
        display_name: Some("Focal".to_string()),
        publication_year: Some(2021),
        referenced_works: Some(refs.iter().map(|r| (*r).to_string()).collect()),
        ..Work::default()
    }
}

async fn mount_work(server: &MockServer, id: u64, body: serde_json::Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/works/W{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

fn expander(server: &MockServer, concurrency: usize) -> ReferenceExpander {
    let client = OpenAlexClient::new(&Config::for_testing(&server.uri())).unwrap();
    ReferenceExpander::new(Arc::new(client), concurrency)
}

#[tokio::test]
async fn test_concurrent_fetch_preserves_reference_order() {
    let mock_server = MockServer::start().await;

    // The first reference answers last.
    mount_work(&mock_server, 11, reference_json(11, 2010, &[]), Duration::from_millis(300)).await;
    mount_work(&mock_server, 12, reference_json(12, 2011, &[]), Duration::ZERO).await;
    mount_work(&mock_server, 13, reference_json(13, 2012, &[]), Duration::from_millis(50)).await;

    let paper = paper_citing(&[
        "https://openalex.org/W11",
        "https://openalex.org/W12",
        "https://openalex.org/W13",
    ]);
    let references = expander(&mock_server, 3).expand(&paper, ExpansionDepth::Shallow).await;

    let ids: Vec<WorkId> = references.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![WorkId::new(11), WorkId::new(12), WorkId::new(13)]);
}

#[tokio::test]
async fn test_failed_and_malformed_references_are_skipped() {
    let mock_server = MockServer::start().await;

    mount_work(&mock_server, 21, reference_json(21, 2000, &[]), Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/works/W22"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_work(&mock_server, 23, reference_json(23, 2002, &[]), Duration::ZERO).await;

    let paper = paper_citing(&[
        "https://openalex.org/W21",
        "https://openalex.org/W22",
        "not-a-work-id",
        "W23",
    ]);
    let references = expander(&mock_server, 1).expand(&paper, ExpansionDepth::Nested).await;

    let ids: Vec<u64> = references.iter().map(|r| r.id.get()).collect();
    assert_eq!(ids, vec![21, 23]);
}

#[tokio::test]
async fn test_nested_expansion_fetches_second_level() {
    let mock_server = MockServer::start().await;

    mount_work(&mock_server, 31, reference_json(31, 2015, &[41, 42]), Duration::ZERO).await;
    mount_work(&mock_server, 41, reference_json(41, 1999, &[99]), Duration::ZERO).await;
    mount_work(&mock_server, 42, reference_json(42, 2001, &[]), Duration::ZERO).await;
    // W99 is below the expansion depth and must never be requested.
    Mock::given(method("GET"))
        .and(path("/works/W99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reference_json(99, 1980, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let paper = paper_citing(&["https://openalex.org/W31"]);
    let references = expander(&mock_server, 2).expand(&paper, ExpansionDepth::Nested).await;

    assert_eq!(references.len(), 1);
    let nested: Vec<u64> = references[0].references.iter().map(|r| r.id.get()).collect();
    assert_eq!(nested, vec![41, 42]);
    assert!(references[0].references.iter().all(|r| r.references.is_empty()));

    let stored = references[0].to_stored();
    assert_eq!(stored.year, Some(2015));
    assert_eq!(stored.referenced_works[0].year, Some(1999));
}

#[tokio::test]
async fn test_second_level_fetches_overlap_across_references() {
    let mock_server = MockServer::start().await;

    mount_work(&mock_server, 71, reference_json(71, 2015, &[81]), Duration::ZERO).await;
    mount_work(&mock_server, 72, reference_json(72, 2016, &[82, 83]), Duration::ZERO).await;
    mount_work(&mock_server, 81, reference_json(81, 2001, &[]), Duration::from_millis(400)).await;
    mount_work(&mock_server, 82, reference_json(82, 2002, &[]), Duration::from_millis(400)).await;
    mount_work(&mock_server, 83, reference_json(83, 2003, &[]), Duration::ZERO).await;

    let paper = paper_citing(&["https://openalex.org/W71", "https://openalex.org/W72"]);
    let started = std::time::Instant::now();
    let references = expander(&mock_server, 3).expand(&paper, ExpansionDepth::Nested).await;
    let elapsed = started.elapsed();

    // W81 and W82 belong to different references but are in flight together.
    assert!(elapsed < Duration::from_millis(750), "second level ran serially: {elapsed:?}");

    let nested: Vec<Vec<u64>> = references
        .iter()
        .map(|r| r.references.iter().map(|n| n.id.get()).collect())
        .collect();
    assert_eq!(nested, vec![vec![81], vec![82, 83]]);
}

#[tokio::test]
async fn test_shallow_expansion_stops_at_first_level() {
    let mock_server = MockServer::start().await;

    mount_work(&mock_server, 51, reference_json(51, 2015, &[61]), Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/works/W61"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reference_json(61, 2000, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let paper = paper_citing(&["https://openalex.org/W51"]);
    let references = expander(&mock_server, 1).expand(&paper, ExpansionDepth::Shallow).await;

    assert_eq!(references.len(), 1);
    assert!(references[0].references.is_empty());
}

#[tokio::test]
async fn test_paper_without_references_makes_no_requests() {
    let mock_server = MockServer::start().await;

    let paper = Work { id: Some("W1".to_string()), ..Work::default() };
    let references = expander(&mock_server, 4).expand(&paper, ExpansionDepth::Nested).await;

    assert!(references.is_empty());
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
}
