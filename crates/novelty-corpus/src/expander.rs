//! Recursive reference expansion.
//!
//! A reference that cannot be fetched is logged and skipped; one bad reference
//! never aborts the rest of the expansion. Fetches may run concurrently but the
//! output always follows the order of the paper's reference list.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::client::OpenAlexClient;
use crate::models::{ExpandedWork, Work, WorkId};

/// How far references are followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpansionDepth {
    /// Fetch the paper's references only.
    Shallow,
    /// Also fetch each reference's own references.
    #[default]
    Nested,
}

/// Fetches and normalizes the references of a paper.
#[derive(Debug, Clone)]
pub struct ReferenceExpander {
    client: Arc<OpenAlexClient>,
    concurrency: usize,
}

impl ReferenceExpander {
    /// Create an expander with at most `concurrency` fetches in flight.
    #[must_use]
    pub fn new(client: Arc<OpenAlexClient>, concurrency: usize) -> Self {
        Self { client, concurrency: concurrency.max(1) }
    }

    /// Expand the references of `paper` to the given depth.
    pub async fn expand(&self, paper: &Work, depth: ExpansionDepth) -> Vec<ExpandedWork> {
        tracing::info!(
            paper = paper.title_or_default(),
            references = paper.reference_ids().len(),
            ?depth,
            "Fetching references"
        );

        let mut references = self.fetch_all(paper.reference_ids()).await;

        if depth == ExpansionDepth::Nested {
            for (parent, nested) in self.fetch_second_level(&references).await {
                references[parent].references.push(nested);
            }
        }

        tracing::info!(
            paper = paper.title_or_default(),
            fetched = references.len(),
            skipped = paper.reference_ids().len() - references.len(),
            "References fetched"
        );
        references
    }

    async fn fetch_all(&self, raw_ids: &[String]) -> Vec<ExpandedWork> {
        stream::iter(raw_ids)
            .map(|raw| self.fetch_one(raw))
            .buffered(self.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await
    }

    /// References of every first-level reference as one ordered stream,
    /// each tagged with the index of the reference that cites it.
    async fn fetch_second_level(&self, references: &[ExpandedWork]) -> Vec<(usize, ExpandedWork)> {
        let pending: Vec<(usize, &str)> = references
            .iter()
            .enumerate()
            .flat_map(|(parent, reference)| {
                reference.work.reference_ids().iter().map(move |raw| (parent, raw.as_str()))
            })
            .collect();

        stream::iter(pending)
            .map(|(parent, raw)| async move { self.fetch_one(raw).await.map(|work| (parent, work)) })
            .buffered(self.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await
    }

    async fn fetch_one(&self, raw: &str) -> Option<ExpandedWork> {
        let id = match WorkId::parse(raw) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(reference = raw, error = %e, "Skipping malformed reference");
                return None;
            }
        };

        match self.client.get_work(id).await {
            // Merged works come back under their canonical id.
            Ok(work) => Some(ExpandedWork::leaf(work.work_id().unwrap_or(id), work)),
            Err(e) => {
                tracing::warn!(reference = %id, error = %e, "Skipping reference that failed to fetch");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_depth_is_nested() {
        assert_eq!(ExpansionDepth::default(), ExpansionDepth::Nested);
    }

    #[test]
    fn test_concurrency_floor() {
        let client = OpenAlexClient::new(&crate::config::Config::default()).unwrap();
        let expander = ReferenceExpander::new(Arc::new(client), 0);
        assert_eq!(expander.concurrency, 1);
    }
}
