use std::path::{Path, PathBuf};

use heapsql_core::error::EngineResult;
use heapsql_core::Value;
use heapsql_helpers::IndexMap;

use crate::catalog::Catalog;
use crate::heap::HeapTable;
use crate::index::HashIndex;

/// Tuning knobs for a database handle. Only `fsync` exists today: it
/// lets integration tests trade durability for speed while the
/// production path always enables it.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub fsync: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { fsync: true }
    }
}

/// The kind of DDL/DML statement an `Ack` reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    CreateTable,
    CreateIndex,
    Insert,
    Update,
    Delete,
}

/// The result of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    RowSet {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Ack {
        kind: AckKind,
        affected: u64,
    },
}

/// A single open database directory: the catalog plus every heap table
/// and hash index touched so far in this session. `Database` is
/// deliberately `!Sync`: it holds raw file handles with no internal
/// locking, so callers sharing one handle across threads must
/// serialize access themselves rather than relying on a runtime mutex.
pub struct Database {
    dir: PathBuf,
    options: EngineOptions,
    catalog: Catalog,
    heaps: IndexMap<String, HeapTable>,
    indexes: IndexMap<String, HashIndex>,
}

impl Database {
    pub fn open(dir: impl AsRef<Path>) -> EngineResult<Self> {
        Self::open_with(dir, EngineOptions::default())
    }

    pub fn open_with(dir: impl AsRef<Path>, options: EngineOptions) -> EngineResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        std::fs::create_dir_all(dir.join("data"))?;
        std::fs::create_dir_all(dir.join("indexes"))?;
        let catalog = Catalog::open(&dir)?;
        tracing::debug!(dir = %dir.display(), "database opened");
        Ok(Database {
            dir,
            options,
            catalog,
            heaps: IndexMap::default(),
            indexes: IndexMap::default(),
        })
    }

    /// Lexes, parses, and executes every statement in `sql` in order,
    /// returning every statement's result.
    pub fn execute_many(&mut self, sql: &str) -> EngineResult<Vec<StatementResult>> {
        let statements = heapsql_parser::parse(sql)?;
        let mut results = Vec::with_capacity(statements.len());
        for stmt in statements {
            tracing::debug!(statement = ?stmt, "executing statement");
            results.push(crate::executor::execute(self, stmt)?);
        }
        Ok(results)
    }

    /// Executes `sql` and returns the last statement's result.
    pub fn execute(&mut self, sql: &str) -> EngineResult<StatementResult> {
        let mut results = self.execute_many(sql)?;
        results
            .pop()
            .ok_or_else(|| heapsql_core::error::EngineError::NotImplemented("empty statement".to_string()))
    }

    /// Flushes and releases every open file. Dropping the handle has
    /// the same effect; this exists for callers that want an explicit,
    /// named close point.
    pub fn close(self) {
        tracing::debug!(dir = %self.dir.display(), "database closed");
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub(crate) fn heap_table(&mut self, table: &str) -> EngineResult<&mut HeapTable> {
        if !self.heaps.contains_key(table) {
            let heap = HeapTable::open(&self.dir.join("data"), table, self.options.fsync)?;
            self.heaps.insert(table.to_string(), heap);
        }
        Ok(self.heaps.get_mut(table).expect("just inserted"))
    }

    pub(crate) fn hash_index(&mut self, name: &str) -> EngineResult<&mut HashIndex> {
        if !self.indexes.contains_key(name) {
            let idx = HashIndex::open(&self.dir, name)?;
            self.indexes.insert(name.to_string(), idx);
        }
        Ok(self.indexes.get_mut(name).expect("just inserted"))
    }
}
