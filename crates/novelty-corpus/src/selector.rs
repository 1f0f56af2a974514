//! Sample selection from the citation-ranked candidate pool.

use serde::{Deserialize, Serialize};

use crate::config::corpus::SAMPLE_RANKS;
use crate::error::{CorpusError, CorpusResult};
use crate::models::Work;

/// A sampled paper together with its 1-indexed rank in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedWork {
    /// Rank under descending citation order.
    pub rank: usize,
    /// The paper.
    pub work: Work,
}

/// The fixed sample drawn from one candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    /// Sampled papers, in rank order.
    pub papers: Vec<RankedWork>,
}

impl SampleSet {
    /// Number of sampled papers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    /// Whether the sample is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Iterate over the sampled works.
    pub fn works(&self) -> impl Iterator<Item = &Work> {
        self.papers.iter().map(|p| &p.work)
    }
}

/// Rank candidates by citation count, descending. Ties keep response order.
#[must_use]
pub fn rank_candidates(candidates: &[Work]) -> Vec<&Work> {
    let mut ranked: Vec<&Work> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.citations().cmp(&a.citations()));
    ranked
}

/// Pick the papers at the fixed sample ranks.
///
/// The input is not modified; sampled works are cloned.
pub fn select_sample(candidates: &[Work]) -> CorpusResult<SampleSet> {
    select_ranks(candidates, &SAMPLE_RANKS)
}

/// Pick the papers at arbitrary 1-indexed ranks.
pub fn select_ranks(candidates: &[Work], ranks: &[usize]) -> CorpusResult<SampleSet> {
    let required = ranks.iter().copied().max().unwrap_or(0);
    if candidates.len() < required {
        return Err(CorpusError::InsufficientCandidates {
            required,
            available: candidates.len(),
        });
    }

    let ranked = rank_candidates(candidates);
    let papers = ranks
        .iter()
        .filter(|&&rank| rank > 0)
        .map(|&rank| RankedWork { rank, work: ranked[rank - 1].clone() })
        .collect();

    Ok(SampleSet { papers })
}
