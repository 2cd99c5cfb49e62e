//! heapsql: a small embedded relational engine with a SQL-like front
//! end, an append-only heap store, a persisted catalog, and persisted
//! equality indexes.
//!
//! ```no_run
//! use heapsql::Database;
//!
//! let mut db = Database::open("./mydb")?;
//! db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
//! db.execute("INSERT INTO t (id, name) VALUES (1, 'a')")?;
//! let result = db.execute("SELECT * FROM t WHERE id = 1")?;
//! db.close();
//! # Ok::<(), heapsql_core::error::EngineError>(())
//! ```

pub mod catalog;
mod db;
mod executor;
mod heap;
mod index;
mod join;

pub use catalog::{Catalog, ColumnSchema, IndexSchema, TableSchema};
pub use db::{AckKind, Database, EngineOptions, StatementResult};
pub use heap::HeapTable;
pub use index::HashIndex;

pub use heapsql_core::error::{EngineError, EngineResult};
pub use heapsql_core::{ColumnType, Rid, Value};
