use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use heapsql_core::codec::{decode, encode};
use heapsql_core::fsutil::append_and_sync;
use heapsql_core::{EngineResult, HeapRecord, Rid, Row};
use heapsql_helpers::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct DirEntry {
    rid: Rid,
    offset: u64,
}

#[derive(Serialize, Deserialize)]
struct TombEntry {
    rid: Rid,
}

/// One table's durable storage: the append-only heap plus its two
/// satellite append-only logs, the RID directory and the tombstone set,
/// each mirrored in memory for O(1) access.
///
/// The directory and tombstone set are kept as their own append-only
/// files rather than rebuilt by rescanning the heap: replaying two
/// short logs on open is cheaper than a full heap scan once the heap
/// has grown large.
pub struct HeapTable {
    heap_path: PathBuf,
    dir_path: PathBuf,
    tomb_path: PathBuf,
    directory: IndexMap<Rid, u64>,
    tombstones: heapsql_helpers::IndexSet<Rid>,
    fsync: bool,
}

impl HeapTable {
    pub fn open(dir: &Path, table: &str, fsync: bool) -> EngineResult<Self> {
        let heap_path = dir.join(format!("{table}.jsonl"));
        let dir_path = dir.join(format!("{table}.dir"));
        let tomb_path = dir.join(format!("{table}.tomb"));
        for path in [&heap_path, &dir_path, &tomb_path] {
            if !path.exists() {
                File::create(path)?;
            }
        }

        let mut directory = IndexMap::default();
        for line in read_lines(&dir_path)? {
            let entry: DirEntry = serde_json::from_str(&line)?;
            directory.insert(entry.rid, entry.offset);
        }

        let mut tombstones = heapsql_helpers::IndexSet::default();
        for line in read_lines(&tomb_path)? {
            let entry: TombEntry = serde_json::from_str(&line)?;
            tombstones.insert(entry.rid);
        }

        Ok(HeapTable {
            heap_path,
            dir_path,
            tomb_path,
            directory,
            tombstones,
            fsync,
        })
    }

    /// Appends a new live row: heap first, fsync, then the directory
    /// entry. A mid-crash record with no directory entry is simply
    /// ignored on next open.
    pub fn append_row(&mut self, row: &Row) -> EngineResult<()> {
        let line = encode(&HeapRecord::Row(row.clone()));
        let offset = append_and_sync(&self.heap_path, &line, self.fsync)?;
        let entry = DirEntry {
            rid: row.rid,
            offset,
        };
        let mut entry_line = serde_json::to_string(&entry)?;
        entry_line.push('\n');
        append_and_sync(&self.dir_path, &entry_line, self.fsync)?;
        self.directory.insert(row.rid, offset);
        tracing::trace!(rid = row.rid, offset, "appended row");
        Ok(())
    }

    /// Appends a tombstone record to the heap and adds `rid` to the
    /// tombstone set.
    pub fn append_tombstone(&mut self, rid: Rid) -> EngineResult<()> {
        let line = encode(&HeapRecord::Tombstone(rid));
        let offset = append_and_sync(&self.heap_path, &line, self.fsync)?;
        let mut entry_line = serde_json::to_string(&TombEntry { rid })?;
        entry_line.push('\n');
        append_and_sync(&self.tomb_path, &entry_line, self.fsync)?;
        self.tombstones.insert(rid);
        tracing::trace!(rid, offset, "appended tombstone");
        Ok(())
    }

    pub fn is_live(&self, rid: Rid) -> bool {
        self.directory.contains_key(&rid) && !self.tombstones.contains(&rid)
    }

    /// Directory lookup + offset read; `None` if the RID is absent,
    /// tombstoned, or the record at its offset turns out to be a
    /// tombstone marker.
    pub fn get(&self, rid: Rid) -> EngineResult<Option<Row>> {
        if !self.is_live(rid) {
            return Ok(None);
        }
        let offset = *self.directory.get(&rid).expect("checked by is_live");
        self.read_row_at(offset)
    }

    fn read_row_at(&self, offset: u64) -> EngineResult<Option<Row>> {
        let mut file = File::open(&self.heap_path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(&mut file);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        match decode(&line)? {
            HeapRecord::Row(row) => Ok(Some(row)),
            HeapRecord::Tombstone(_) => Ok(None),
        }
    }

    /// Enumerates directory entries in insertion order, yielding only
    /// live rows: the full-table-scan plan used when no applicable
    /// index exists.
    pub fn scan(&self) -> EngineResult<Vec<Row>> {
        let mut rows = Vec::with_capacity(self.directory.len());
        for (&rid, &offset) in &self.directory {
            if self.tombstones.contains(&rid) {
                continue;
            }
            if let Some(row) = self.read_row_at(offset)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    pub fn len_live(&self) -> usize {
        self.directory
            .keys()
            .filter(|rid| !self.tombstones.contains(*rid))
            .count()
    }
}

fn read_lines(path: &Path) -> EngineResult<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}
