//! Projections of fetched works.
//!
//! One fetch yields two independent shapes: [`StoredRecord`] for the year
//! partitions and [`ScoringRecord`] for the citation scorer. Both are built by
//! pure functions over [`ExpandedWork`]; neither is ever written back into the
//! raw [`Work`].

use serde::{Deserialize, Serialize};

use super::{PartitionYear, Work, WorkId};

/// A fetched work with its validated id and expanded references.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedWork {
    /// Normalized id.
    pub id: WorkId,
    /// Raw record as returned by the API.
    pub work: Work,
    /// Expanded references, in fetch order. Empty below the expansion depth.
    pub references: Vec<ExpandedWork>,
}

impl ExpandedWork {
    /// Wrap a work without expanded references.
    #[must_use]
    pub const fn leaf(id: WorkId, work: Work) -> Self {
        Self { id, work, references: Vec::new() }
    }

    /// Storage projection of this work and everything below it.
    #[must_use]
    pub fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            id: self.id,
            year: self.work.partition().year(),
            referenced_works: self.references.iter().map(Self::to_stored).collect(),
            topics: self
                .work
                .topic_names()
                .into_iter()
                .map(|display_name| StoredTopic { display_name })
                .collect(),
        }
    }

    /// Scoring projection of this work alone.
    #[must_use]
    pub fn to_scoring(&self) -> ScoringRecord {
        ScoringRecord {
            id: self.id,
            display_name: self.work.title_or_default().to_string(),
            percentile: self.work.percentile(),
            year: self.work.publication_year,
            topics: self.work.topic_names(),
        }
    }
}

/// A work as persisted in a year partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Bare numeric id.
    pub id: WorkId,
    /// Publication year, `null` when unknown.
    pub year: Option<u32>,
    /// Nested references.
    #[serde(default)]
    pub referenced_works: Vec<StoredRecord>,
    /// Topic labels, for topic co-occurrence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<StoredTopic>,
}

/// A topic label as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTopic {
    /// Label.
    pub display_name: String,
}

impl StoredRecord {
    /// Partition this record is written to.
    #[must_use]
    pub fn partition(&self) -> PartitionYear {
        self.year.map_or(PartitionYear::Unknown, PartitionYear::Year)
    }
}

/// A reference as seen by the citation scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRecord {
    /// Normalized id.
    pub id: WorkId,
    /// Title.
    pub display_name: String,
    /// Normalized percentile; `None` marks an unscored reference.
    pub percentile: Option<f64>,
    /// Publication year.
    pub year: Option<i32>,
    /// Topic labels.
    pub topics: Vec<String>,
}

impl ScoringRecord {
    /// Whether this reference contributes to mean/min/max.
    #[must_use]
    pub const fn is_scored(&self) -> bool {
        self.percentile.is_some()
    }
}
