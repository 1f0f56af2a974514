//! Citation-percentile aggregation over a paper's references.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::{MeanDivisor, MinPolicy, ScoringPolicy};
use crate::models::{ScoringRecord, Work};

/// Percentile statistics for one focal paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationAggregate {
    /// Title of the focal paper.
    pub title: String,
    /// Citations received by the focal paper.
    pub cited_by_count: u64,
    /// Mean percentile over the scored references (NaN when there are none).
    pub mean: f64,
    /// Highest percentile.
    pub max: f64,
    /// Lowest percentile.
    pub min: f64,
    /// Union of the references' topic labels.
    pub topics: BTreeSet<String>,
    /// References that carried a percentile.
    pub scored_count: usize,
    /// References excluded for lack of a percentile.
    pub unscored_count: usize,
    /// Scored references by percentile (descending), unscored ones at the tail.
    pub ranked: Vec<ScoringRecord>,
}

impl CitationAggregate {
    /// Number of distinct topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

/// Result of scoring one paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScoreOutcome {
    /// The paper was scored.
    Scored(CitationAggregate),
    /// The paper advertises no references and is left out of every accumulator.
    SkippedNoReferences,
}

impl ScoreOutcome {
    /// The aggregate, if the paper was scored.
    #[must_use]
    pub const fn aggregate(&self) -> Option<&CitationAggregate> {
        match self {
            Self::Scored(agg) => Some(agg),
            Self::SkippedNoReferences => None,
        }
    }
}

/// Score `paper` from its fetched references.
#[must_use]
pub fn score(paper: &Work, references: &[ScoringRecord], policy: &ScoringPolicy) -> ScoreOutcome {
    let advertised = paper.advertised_references();
    if advertised == 0 {
        tracing::info!(paper = paper.title_or_default(), "Paper has no references, skipping");
        return ScoreOutcome::SkippedNoReferences;
    }

    let (mut scored, unscored): (Vec<ScoringRecord>, Vec<ScoringRecord>) =
        references.iter().cloned().partition(ScoringRecord::is_scored);

    let sum: f64 = scored.iter().filter_map(|r| r.percentile).sum();
    let divisor = match policy.mean_divisor {
        MeanDivisor::Scored => scored.len() as f64,
        MeanDivisor::Advertised => advertised as f64,
    };
    let mean = sum / divisor;

    // Stable sort keeps fetch order among equal percentiles.
    scored.sort_by(|a, b| {
        let (a, b) = (a.percentile.unwrap_or_default(), b.percentile.unwrap_or_default());
        b.total_cmp(&a)
    });

    let sentinel = policy.missing_sentinel;
    let max = scored.first().and_then(|r| r.percentile).unwrap_or(sentinel);
    let scored_tail = scored.last().and_then(|r| r.percentile).unwrap_or(sentinel);
    let min = match policy.min_policy {
        MinPolicy::ScoredTail => scored_tail,
        MinPolicy::RankedTail if !unscored.is_empty() => sentinel,
        MinPolicy::RankedTail => scored_tail,
    };

    let topics: BTreeSet<String> =
        references.iter().flat_map(|r| r.topics.iter().cloned()).collect();

    let scored_count = scored.len();
    let unscored_count = unscored.len();
    let mut ranked = scored;
    ranked.extend(unscored);

    tracing::info!(
        paper = paper.title_or_default(),
        scored = scored_count,
        unscored = unscored_count,
        mean,
        max,
        min,
        topics = topics.len(),
        "Scored references"
    );

    ScoreOutcome::Scored(CitationAggregate {
        title: paper.title_or_default().to_string(),
        cited_by_count: paper.citations(),
        mean,
        max,
        min,
        topics,
        scored_count,
        unscored_count,
        ranked,
    })
}

/// Per-run series collected from scored papers, in sample order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleAggregates {
    /// Citations received by each focal paper.
    pub citation_counts: Vec<f64>,
    /// Mean reference percentile.
    pub means: Vec<f64>,
    /// Minimum reference percentile.
    pub mins: Vec<f64>,
    /// Maximum reference percentile.
    pub maxes: Vec<f64>,
    /// Distinct topics across the reference list.
    pub topic_counts: Vec<f64>,
}

impl SampleAggregates {
    /// Append one paper's aggregate.
    pub fn push(&mut self, aggregate: &CitationAggregate) {
        self.citation_counts.push(aggregate.cited_by_count as f64);
        self.means.push(aggregate.mean);
        self.mins.push(aggregate.min);
        self.maxes.push(aggregate.max);
        self.topic_counts.push(aggregate.topic_count() as f64);
    }

    /// Number of papers collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.citation_counts.len()
    }

    /// Whether nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.citation_counts.is_empty()
    }
}

impl<'a> FromIterator<&'a CitationAggregate> for SampleAggregates {
    fn from_iter<I: IntoIterator<Item = &'a CitationAggregate>>(iter: I) -> Self {
        let mut aggregates = Self::default();
        for aggregate in iter {
            aggregates.push(aggregate);
        }
        aggregates
    }
}
