//! Year-partitioned, id-deduplicated JSON corpus.
//!
//! Each partition is a file `<root>/<year>.json` holding a JSON list. Writes
//! merge by id and existing entries always win: a later record with an id
//! already on disk is dropped, never used to update the stored payload.
//! A missing or unparsable partition reads as empty.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CorpusError, CorpusResult};
use crate::models::{PartitionYear, StoredRecord, WorkId};

/// Counts from one [`CorpusStore::persist`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistSummary {
    /// Partitions touched.
    pub partitions: usize,
    /// Records newly written.
    pub appended: usize,
    /// Records dropped because their id was already present.
    pub dropped: usize,
}

impl std::ops::AddAssign for PersistSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.partitions += rhs.partitions;
        self.appended += rhs.appended;
        self.dropped += rhs.dropped;
    }
}

/// Flat-file corpus store.
#[derive(Debug)]
pub struct CorpusStore {
    root: PathBuf,
    /// Serializes read-merge-write cycles; concurrent writers to one
    /// partition would otherwise duplicate ids.
    write_lock: Mutex<()>,
}

impl CorpusStore {
    /// Open a store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_lock: Mutex::new(()) }
    }

    /// Corpus root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a partition file.
    #[must_use]
    pub fn partition_path(&self, year: PartitionYear) -> PathBuf {
        self.root.join(year.file_name())
    }

    /// Whether a partition file exists.
    #[must_use]
    pub fn partition_exists(&self, year: PartitionYear) -> bool {
        self.partition_path(year).is_file()
    }

    /// Partitions currently on disk, in ascending order.
    pub fn years(&self) -> CorpusResult<Vec<PartitionYear>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CorpusError::io(&self.root, e)),
        };

        let mut years: Vec<PartitionYear> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem().and_then(|s| s.to_str()).and_then(PartitionYear::from_file_stem)
            })
            .collect();
        years.sort_unstable();
        Ok(years)
    }

    /// Read the typed records of a partition. Entries that do not match the
    /// record shape are ignored.
    #[must_use]
    pub fn read_partition(&self, year: PartitionYear) -> Vec<StoredRecord> {
        self.load_raw(year)
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect()
    }

    /// Append records to their partitions, skipping ids already present.
    pub fn persist<I>(&self, entries: I) -> CorpusResult<PersistSummary>
    where
        I: IntoIterator<Item = StoredRecord>,
    {
        let mut by_year: BTreeMap<PartitionYear, Vec<StoredRecord>> = BTreeMap::new();
        for record in entries {
            by_year.entry(record.partition()).or_default().push(record);
        }

        if by_year.is_empty() {
            return Ok(PersistSummary::default());
        }

        fs::create_dir_all(&self.root).map_err(|e| CorpusError::io(&self.root, e))?;

        let mut summary = PersistSummary::default();
        for (year, records) in by_year {
            summary += self.merge_partition(year, records)?;
        }

        tracing::debug!(
            root = %self.root.display(),
            partitions = summary.partitions,
            appended = summary.appended,
            dropped = summary.dropped,
            "Persisted corpus records"
        );
        Ok(summary)
    }

    fn merge_partition(
        &self,
        year: PartitionYear,
        records: Vec<StoredRecord>,
    ) -> CorpusResult<PersistSummary> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut merged = self.load_raw(year);
        let mut seen: HashSet<u64> = merged.iter().filter_map(entry_id).collect();

        let mut summary = PersistSummary { partitions: 1, ..PersistSummary::default() };
        for record in records {
            if seen.insert(record.id.get()) {
                merged.push(serde_json::to_value(&record)?);
                summary.appended += 1;
            } else {
                summary.dropped += 1;
            }
        }

        if summary.appended > 0 {
            write_json_atomic(&self.partition_path(year), &merged)?;
        }
        Ok(summary)
    }

    /// Raw entries of a partition, or empty when missing or unparsable.
    fn load_raw(&self, year: PartitionYear) -> Vec<Value> {
        let path = self.partition_path(year);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable partition, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&text) {
            Ok(Value::Array(entries)) => entries,
            Ok(single @ Value::Object(_)) => vec![single],
            Ok(_) | Err(_) => {
                tracing::warn!(path = %path.display(), "Corrupt partition, treating as empty");
                Vec::new()
            }
        }
    }
}

/// Id of a raw partition entry, accepting numeric and OpenAlex string forms.
fn entry_id(entry: &Value) -> Option<u64> {
    match entry.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => WorkId::parse(s).ok().map(WorkId::get),
        _ => None,
    }
}

/// Write pretty JSON through a temporary file and rename it into place.
pub fn write_json_atomic<T>(path: &Path, value: &T) -> CorpusResult<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CorpusError::io(parent, e))?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|e| CorpusError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CorpusError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, year: Option<u32>, refs: Vec<StoredRecord>) -> StoredRecord {
        StoredRecord { id: WorkId::new(id), year, referenced_works: refs, topics: vec![] }
    }

    #[test]
    fn test_missing_partition_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("papers"));
        assert!(store.read_partition(PartitionYear::Year(2001)).is_empty());
        assert!(store.years().unwrap().is_empty());
        assert!(!store.partition_exists(PartitionYear::Year(2001)));
    }

    #[test]
    fn test_persist_partitions_by_year() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());

        let summary = store
            .persist(vec![
                record(1, Some(2020), vec![record(2, Some(2015), vec![])]),
                record(2, Some(2015), vec![]),
                record(3, None, vec![]),
            ])
            .unwrap();

        assert_eq!(summary, PersistSummary { partitions: 3, appended: 3, dropped: 0 });
        assert_eq!(
            store.years().unwrap(),
            vec![PartitionYear::Year(2015), PartitionYear::Year(2020), PartitionYear::Unknown]
        );
        let stored = store.read_partition(PartitionYear::Year(2020));
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].referenced_works[0].id, WorkId::new(2));
        assert!(dir.path().join("unknown.json").is_file());
    }

    #[test]
    fn test_existing_entry_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());

        store.persist(vec![record(7, Some(2010), vec![])]).unwrap();
        let summary = store
            .persist(vec![record(7, Some(2010), vec![record(8, Some(2000), vec![])])])
            .unwrap();

        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.appended, 0);
        let stored = store.read_partition(PartitionYear::Year(2010));
        assert_eq!(stored, vec![record(7, Some(2010), vec![])]);
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());

        let summary = store
            .persist(vec![record(4, Some(2011), vec![]), record(4, Some(2011), vec![])])
            .unwrap();
        assert_eq!(summary.appended, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(store.read_partition(PartitionYear::Year(2011)).len(), 1);
    }

    #[test]
    fn test_corrupt_partition_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());
        fs::write(dir.path().join("2012.json"), "{ not json").unwrap();

        assert!(store.read_partition(PartitionYear::Year(2012)).is_empty());
        store.persist(vec![record(9, Some(2012), vec![])]).unwrap();
        assert_eq!(store.read_partition(PartitionYear::Year(2012)).len(), 1);
    }

    #[test]
    fn test_single_object_partition_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());
        fs::write(
            dir.path().join("2013.json"),
            r#"{"id": 1, "year": 2013, "referenced_works": []}"#,
        )
        .unwrap();

        store.persist(vec![record(1, Some(2013), vec![]), record(2, Some(2013), vec![])]).unwrap();
        let ids: Vec<u64> =
            store.read_partition(PartitionYear::Year(2013)).iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_foreign_entries_survive_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());
        fs::write(dir.path().join("2014.json"), r#"["free text", {"id": 3, "extra": true}]"#)
            .unwrap();

        store.persist(vec![record(3, Some(2014), vec![]), record(5, Some(2014), vec![])]).unwrap();

        let raw: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("2014.json")).unwrap())
                .unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0], Value::String("free text".into()));
        assert_eq!(raw[1]["extra"], Value::Bool(true));
    }

    #[test]
    fn test_string_ids_on_disk_deduplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());
        fs::write(
            dir.path().join("2015.json"),
            r#"[{"id": "https://openalex.org/W5", "year": 2015}, {"id": "W6"}]"#,
        )
        .unwrap();

        let summary = store
            .persist(vec![
                record(5, Some(2015), vec![]),
                record(6, Some(2015), vec![]),
                record(7, Some(2015), vec![]),
            ])
            .unwrap();

        assert_eq!(summary.appended, 1);
        assert_eq!(summary.dropped, 2);
        let raw: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("2015.json")).unwrap())
                .unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[2]["id"], Value::from(7));
    }

    #[test]
    fn test_years_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path());
        fs::write(dir.path().join("notes.json"), "[]").unwrap();
        fs::write(dir.path().join("2016.txt"), "[]").unwrap();
        fs::write(dir.path().join("2016.json"), "[]").unwrap();
        assert_eq!(store.years().unwrap(), vec![PartitionYear::Year(2016)]);
    }
}
