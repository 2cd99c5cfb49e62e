use std::path::{Path, PathBuf};

use heapsql_core::error::{CatalogError, EngineResult};
use heapsql_core::value::ColumnType;
use heapsql_core::Rid;
use serde::{Deserialize, Serialize};

/// One declared column: its name, declared type, and constraint flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub ty: ColumnType,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
}

impl ColumnSchema {
    /// PRIMARY_KEY implies NOT_NULL and UNIQUE.
    pub fn is_not_null(&self) -> bool {
        self.not_null || self.primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique || self.primary_key
    }
}

/// A table's durable schema, including its RID allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub next_rid: Rid,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_column(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// A named equality index over one column of one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    tables: Vec<TableSchema>,
    #[serde(default)]
    indexes: Vec<IndexSchema>,
}

/// The durable catalog document at `catalog.json`, rewritten atomically
/// after every DDL statement or `next_rid` bump.
pub struct Catalog {
    path: PathBuf,
    doc: CatalogDocument,
}

impl Catalog {
    pub fn open(dir: &Path) -> EngineResult<Self> {
        let path = dir.join("catalog.json");
        let doc = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            CatalogDocument::default()
        };
        let mut catalog = Catalog { path, doc };
        catalog.persist()?;
        Ok(catalog)
    }

    fn persist(&self) -> EngineResult<()> {
        let text = serde_json::to_string_pretty(&self.doc)?;
        heapsql_core::fsutil::write_atomic(&self.path, text.as_bytes())?;
        Ok(())
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.doc.tables.iter()
    }

    pub fn indexes(&self) -> impl Iterator<Item = &IndexSchema> {
        self.doc.indexes.iter()
    }

    pub fn lookup_table(&self, name: &str) -> Option<&TableSchema> {
        self.doc.tables.iter().find(|t| t.name == name)
    }

    pub fn lookup_table_mut(&mut self, name: &str) -> Option<&mut TableSchema> {
        self.doc.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn lookup_index(&self, name: &str) -> Option<&IndexSchema> {
        self.doc.indexes.iter().find(|i| i.name == name)
    }

    pub fn list_indexes(&self, table: &str) -> impl Iterator<Item = &IndexSchema> {
        self.doc.indexes.iter().filter(move |i| i.table == table)
    }

    pub fn list_indexes_on(&self, table: &str, column: &str) -> impl Iterator<Item = &IndexSchema> {
        self.doc
            .indexes
            .iter()
            .filter(move |i| i.table == table && i.column == column)
    }

    /// Validates and registers a new table: the name must be unique
    /// and at most one column may be PRIMARY KEY.
    pub fn create_table(&mut self, name: String, columns: Vec<ColumnSchema>) -> EngineResult<()> {
        if self.lookup_table(&name).is_some() {
            return Err(CatalogError::new(format!("table '{name}' already exists"))
                .table(name)
                .into());
        }
        let pk_count = columns.iter().filter(|c| c.primary_key).count();
        if pk_count > 1 {
            return Err(CatalogError::new("at most one PRIMARY KEY column is allowed")
                .table(name)
                .into());
        }
        self.doc.tables.push(TableSchema {
            name,
            columns,
            next_rid: 0,
        });
        self.persist()
    }

    /// Validates and registers a new index: the table and column must
    /// exist and the index name must be globally unique. Building the
    /// index content from a full scan is the executor's job, since the
    /// catalog has no access to heap files.
    pub fn create_index(&mut self, name: String, table: String, column: String) -> EngineResult<()> {
        if self.lookup_index(&name).is_some() {
            return Err(CatalogError::new(format!("index '{name}' already exists")).into());
        }
        let schema = self
            .lookup_table(&table)
            .ok_or_else(|| CatalogError::new(format!("unknown table '{table}'")).table(&table))?;
        if schema.column(&column).is_none() {
            return Err(CatalogError::new(format!("unknown column '{column}'"))
                .table(&table)
                .column(&column)
                .into());
        }
        self.doc.indexes.push(IndexSchema {
            name,
            table,
            column,
        });
        self.persist()
    }

    /// Allocates the next RID for `table` and persists the bump. The
    /// counter only ever increases, so no RID is ever reused.
    pub fn bump_next_rid(&mut self, table: &str) -> EngineResult<Rid> {
        let schema = self
            .lookup_table_mut(table)
            .ok_or_else(|| CatalogError::new(format!("unknown table '{table}'")).table(table))?;
        let rid = schema.next_rid;
        schema.next_rid += 1;
        self.persist()?;
        Ok(rid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: ColumnType) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            ty,
            not_null: false,
            unique: false,
            primary_key: false,
        }
    }

    #[test]
    fn rejects_duplicate_table_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(dir.path()).unwrap();
        cat.create_table("t".into(), vec![col("id", ColumnType::Integer)])
            .unwrap();
        assert!(cat
            .create_table("t".into(), vec![col("id", ColumnType::Integer)])
            .is_err());
    }

    #[test]
    fn rejects_more_than_one_primary_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(dir.path()).unwrap();
        let mut a = col("a", ColumnType::Integer);
        a.primary_key = true;
        let mut b = col("b", ColumnType::Integer);
        b.primary_key = true;
        assert!(cat.create_table("t".into(), vec![a, b]).is_err());
    }

    #[test]
    fn create_index_validates_table_and_column_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(dir.path()).unwrap();
        assert!(cat
            .create_index("idx".into(), "nope".into(), "id".into())
            .is_err());
        cat.create_table("t".into(), vec![col("id", ColumnType::Integer)])
            .unwrap();
        assert!(cat
            .create_index("idx".into(), "t".into(), "missing".into())
            .is_err());
        cat.create_index("idx".into(), "t".into(), "id".into())
            .unwrap();
    }

    #[test]
    fn next_rid_is_monotonic_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cat = Catalog::open(dir.path()).unwrap();
            cat.create_table("t".into(), vec![col("id", ColumnType::Integer)])
                .unwrap();
            assert_eq!(cat.bump_next_rid("t").unwrap(), 0);
            assert_eq!(cat.bump_next_rid("t").unwrap(), 1);
        }
        let cat = Catalog::open(dir.path()).unwrap();
        assert_eq!(cat.lookup_table("t").unwrap().next_rid, 2);
    }
}
