//! Work data model matching the OpenAlex API schema.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CorpusError, CorpusResult};

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[Ww]?(\d+)$").expect("valid work id pattern"));

/// A scholarly work as returned by OpenAlex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// OpenAlex id, usually a URL such as `https://openalex.org/W2741809807`.
    #[serde(default)]
    pub id: Option<String>,

    /// Work title.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Publication year.
    #[serde(default)]
    pub publication_year: Option<i32>,

    /// Number of works citing this one.
    #[serde(default)]
    pub cited_by_count: Option<u64>,

    /// Citation percentile normalized by field and year.
    #[serde(default)]
    pub citation_normalized_percentile: Option<NormalizedPercentile>,

    /// Topics assigned to the work.
    #[serde(default)]
    pub topics: Option<Vec<Topic>>,

    /// Ids of the works this one cites.
    #[serde(default)]
    pub referenced_works: Option<Vec<String>>,

    /// Number of references advertised by the API.
    #[serde(default)]
    pub referenced_works_count: Option<u64>,
}

impl Work {
    /// Get the title, falling back to "Untitled" if not available.
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Untitled")
    }

    /// Get citation count or 0 if not available.
    #[must_use]
    pub fn citations(&self) -> u64 {
        self.cited_by_count.unwrap_or(0)
    }

    /// Get the normalized percentile value if the API supplied one.
    #[must_use]
    pub fn percentile(&self) -> Option<f64> {
        self.citation_normalized_percentile.as_ref()?.value
    }

    /// Topic labels in API order.
    #[must_use]
    pub fn topic_names(&self) -> Vec<String> {
        self.topics
            .iter()
            .flatten()
            .filter_map(|t| t.display_name.clone())
            .collect()
    }

    /// Raw reference ids, empty when the field is absent.
    #[must_use]
    pub fn reference_ids(&self) -> &[String] {
        self.referenced_works.as_deref().unwrap_or(&[])
    }

    /// Advertised reference count, falling back to the length of the id list.
    #[must_use]
    pub fn advertised_references(&self) -> u64 {
        self.referenced_works_count.unwrap_or(self.reference_ids().len() as u64)
    }

    /// Validate and normalize the id of this work.
    pub fn work_id(&self) -> CorpusResult<WorkId> {
        let raw = self
            .id
            .as_deref()
            .ok_or_else(|| CorpusError::missing_field("id", self.title_or_default()))?;
        WorkId::parse(raw)
    }

    /// Partition this work belongs to.
    #[must_use]
    pub fn partition(&self) -> PartitionYear {
        PartitionYear::from_publication_year(self.publication_year)
    }
}

/// Citation-normalized percentile block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPercentile {
    /// Percentile in 0..1.
    #[serde(default)]
    pub value: Option<f64>,

    /// Whether the work is in the top 1%.
    #[serde(default)]
    pub is_in_top_1_percent: Option<bool>,

    /// Whether the work is in the top 10%.
    #[serde(default)]
    pub is_in_top_10_percent: Option<bool>,
}

/// A topic label attached to a work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Topic id.
    #[serde(default)]
    pub id: Option<String>,

    /// Human-readable label.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Assignment score.
    #[serde(default)]
    pub score: Option<f64>,
}

/// Page metadata of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total number of matching works.
    #[serde(default)]
    pub count: u64,

    /// Current page.
    #[serde(default)]
    pub page: Option<u32>,

    /// Page size.
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Search result wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorksPage {
    /// Page metadata.
    #[serde(default)]
    pub meta: Option<PageMeta>,

    /// Works in this page, in response order.
    #[serde(default)]
    pub results: Vec<Work>,
}

/// Bare numeric OpenAlex work id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(u64);

impl WorkId {
    /// Wrap a numeric id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Parse any of `https://openalex.org/W123`, `W123` or `123`.
    pub fn parse(raw: &str) -> CorpusResult<Self> {
        let trimmed = raw.trim();
        let tail = match Url::parse(trimmed) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string(),
            Err(_) => trimmed.to_string(),
        };

        ID_PATTERN
            .captures(&tail)
            .and_then(|caps| caps[1].parse().ok())
            .map(Self)
            .ok_or_else(|| CorpusError::InvalidId(raw.to_string()))
    }

    /// Numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

/// Key of a year partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartitionYear {
    /// A known, non-negative publication year.
    Year(u32),
    /// Works without a usable publication year.
    Unknown,
}

impl PartitionYear {
    const UNKNOWN_STEM: &'static str = "unknown";

    /// Bucket a publication year; absent or negative years are `Unknown`.
    #[must_use]
    pub fn from_publication_year(year: Option<i32>) -> Self {
        year.and_then(Self::known).unwrap_or(Self::Unknown)
    }

    /// A known partition, if the year is representable.
    #[must_use]
    pub fn known(year: i32) -> Option<Self> {
        u32::try_from(year).ok().map(Self::Year)
    }

    /// File name of the partition under the corpus root.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{self}.json")
    }

    /// Inverse of [`Self::file_name`], taking the file stem.
    #[must_use]
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        if stem == Self::UNKNOWN_STEM {
            return Some(Self::Unknown);
        }
        stem.parse().ok().map(Self::Year)
    }

    /// The year, if known.
    #[must_use]
    pub const fn year(self) -> Option<u32> {
        match self {
            Self::Year(y) => Some(y),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for PartitionYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(y) => write!(f, "{y}"),
            Self::Unknown => f.write_str(Self::UNKNOWN_STEM),
        }
    }
}
