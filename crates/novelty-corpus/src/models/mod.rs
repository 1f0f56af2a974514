//! Data models for OpenAlex works and their corpus projections.
//!
//! Raw API models use `#[serde(default)]` for optional fields so that missing
//! data becomes `None` at the boundary instead of failing deep in aggregation.

mod records;
mod work;

pub use records::{ExpandedWork, ScoringRecord, StoredRecord, StoredTopic};
pub use work::{NormalizedPercentile, PageMeta, PartitionYear, Topic, Work, WorkId, WorksPage};
