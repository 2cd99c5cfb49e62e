use std::path::{Path, PathBuf};

use heapsql_core::error::EngineResult;
use heapsql_core::{Rid, Value};
use heapsql_helpers::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    entries: IndexMap<String, Vec<Rid>>,
}

/// A persisted hash index mapping an encoded column value to the RIDs
/// of every live row holding it. Rewritten atomically as a whole
/// document on every mutation, unlike the heap's append-only log,
/// because entries must support removal.
pub struct HashIndex {
    path: PathBuf,
    doc: IndexDocument,
}

impl HashIndex {
    pub fn open(dir: &Path, name: &str) -> EngineResult<Self> {
        let path = dir.join("indexes").join(format!("{name}.json"));
        let doc = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            IndexDocument::default()
        };
        Ok(HashIndex { path, doc })
    }

    fn persist(&self) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.doc)?;
        heapsql_core::fsutil::write_atomic(&self.path, text.as_bytes())?;
        Ok(())
    }

    /// NULL values are never inserted into an index.
    pub fn insert(&mut self, value: &Value, rid: Rid) -> EngineResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let key = value.encode_key();
        self.doc.entries.entry(key).or_default().push(rid);
        self.persist()
    }

    pub fn remove(&mut self, value: &Value, rid: Rid) -> EngineResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let key = value.encode_key();
        if let Some(rids) = self.doc.entries.get_mut(&key) {
            rids.retain(|r| *r != rid);
            if rids.is_empty() {
                self.doc.entries.shift_remove(&key);
            }
        }
        self.persist()
    }

    /// Returns the RIDs stored under `value`, an empty slice if none.
    pub fn lookup(&self, value: &Value) -> &[Rid] {
        if value.is_null() {
            return &[];
        }
        self.doc
            .entries
            .get(&value.encode_key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, value: &Value) -> bool {
        !self.lookup(value).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut idx = HashIndex::open(dir.path(), "by_id").unwrap();
        idx.insert(&Value::Int(1), 0).unwrap();
        idx.insert(&Value::Int(1), 5).unwrap();
        assert_eq!(idx.lookup(&Value::Int(1)), &[0, 5]);
        assert!(idx.lookup(&Value::Int(2)).is_empty());
    }

    #[test]
    fn null_values_are_never_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let mut idx = HashIndex::open(dir.path(), "by_id").unwrap();
        idx.insert(&Value::Null, 0).unwrap();
        assert!(!idx.contains(&Value::Null));
    }

    #[test]
    fn remove_drops_empty_entries_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut idx = HashIndex::open(dir.path(), "by_id").unwrap();
            idx.insert(&Value::Int(1), 0).unwrap();
            idx.remove(&Value::Int(1), 0).unwrap();
        }
        let idx = HashIndex::open(dir.path(), "by_id").unwrap();
        assert!(!idx.contains(&Value::Int(1)));
    }
}
