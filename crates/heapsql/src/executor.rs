use heapsql_core::error::{CatalogError, ConstraintError, ConstraintKind, EngineError, EngineResult};
use heapsql_core::{Rid, Row, Value};
use heapsql_helpers::{IndexMap, IndexSet};
use heapsql_parser::{
    Assignment, ColFlag, ColRef, Equality, JoinClause, Literal, SelectList, Statement,
};

use crate::catalog::{ColumnSchema, TableSchema};
use crate::db::{AckKind, Database, StatementResult};
use crate::join;

/// Dispatches one parsed statement against an open database.
pub(crate) fn execute(db: &mut Database, stmt: Statement) -> EngineResult<StatementResult> {
    match stmt {
        Statement::CreateTable { table, columns } => {
            let schema_columns = columns
                .into_iter()
                .map(|c| ColumnSchema {
                    name: c.name,
                    ty: c.ty,
                    not_null: c.has(&ColFlag::NotNull),
                    unique: c.has(&ColFlag::Unique),
                    primary_key: c.has(&ColFlag::PrimaryKey),
                })
                .collect();
            db.catalog_mut().create_table(table, schema_columns)?;
            Ok(StatementResult::Ack {
                kind: AckKind::CreateTable,
                affected: 0,
            })
        }
        Statement::CreateIndex {
            index,
            table,
            column,
        } => create_index(db, index, table, column),
        Statement::Insert {
            table,
            columns,
            values,
        } => insert(db, table, columns, values),
        Statement::Select {
            select_list,
            from,
            joins,
            where_clause,
        } => select(db, select_list, from, joins, where_clause),
        Statement::Update {
            table,
            assignments,
            where_clause,
        } => update(db, table, assignments, where_clause),
        Statement::Delete {
            table,
            where_clause,
        } => delete(db, table, where_clause),
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::Int(*i),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn unknown_table(table: &str) -> EngineError {
    CatalogError::new(format!("unknown table '{table}'")).table(table).into()
}

fn matches_all(row: &Row, predicates: &[Equality]) -> bool {
    predicates.iter().all(|eq| {
        let value = literal_to_value(&eq.value);
        row.get(&eq.col.column) == Some(&value)
    })
}

/// Populates `index` from a full scan: creating an index over a
/// non-empty table builds it immediately rather than lazily.
fn create_index(db: &mut Database, index: String, table: String, column: String) -> EngineResult<StatementResult> {
    db.catalog_mut().create_index(index.clone(), table.clone(), column.clone())?;
    let rows = db.heap_table(&table)?.scan()?;
    let idx = db.hash_index(&index)?;
    for row in &rows {
        let value = row.get(&column).cloned().unwrap_or(Value::Null);
        idx.insert(&value, row.rid)?;
    }
    tracing::debug!(index = %index, table = %table, rows = rows.len(), "populated new index from full scan");
    Ok(StatementResult::Ack {
        kind: AckKind::CreateIndex,
        affected: 0,
    })
}

/// Checks whether `value` already appears in a live row of `table`'s
/// `column`, using an index if one exists on that column (the index is
/// authoritative for uniqueness probes), falling back to a scan of
/// `live_rows` otherwise. RIDs in `exclude` are not counted as
/// collisions: an UPDATE checks uniqueness against the rows it is
/// about to replace, not against itself.
fn value_collides(
    db: &mut Database,
    table: &str,
    column: &str,
    value: &Value,
    live_rows: &[Row],
    exclude: &IndexSet<Rid>,
) -> EngineResult<bool> {
    let indexed = db
        .catalog()
        .list_indexes_on(table, column)
        .next()
        .map(|i| i.name.clone());
    if let Some(idx_name) = indexed {
        let rids = db.hash_index(&idx_name)?.lookup(value).to_vec();
        Ok(rids.iter().any(|rid| !exclude.contains(rid)))
    } else {
        Ok(live_rows
            .iter()
            .any(|r| !exclude.contains(&r.rid) && r.get(column) == Some(value)))
    }
}

fn insert(db: &mut Database, table: String, columns: Vec<String>, values: Vec<Literal>) -> EngineResult<StatementResult> {
    let schema = db
        .catalog()
        .lookup_table(&table)
        .cloned()
        .ok_or_else(|| unknown_table(&table))?;

    let mut fields: IndexMap<String, Value> = IndexMap::default();
    for col in &schema.columns {
        fields.insert(col.name.clone(), Value::Null);
    }
    for (col_name, literal) in columns.iter().zip(values.iter()) {
        let col_schema = schema.column(col_name).ok_or_else(|| {
            CatalogError::new(format!("unknown column '{col_name}'"))
                .table(&table)
                .column(col_name)
        })?;
        let value = literal_to_value(literal);
        col_schema.ty.check(col_name, &value)?;
        fields.insert(col_name.clone(), value);
    }

    let live_rows = db.heap_table(&table)?.scan()?;
    for col in &schema.columns {
        let value = fields.get(&col.name).cloned().unwrap_or(Value::Null);
        if col.is_not_null() && value.is_null() {
            return Err(ConstraintError::new(ConstraintKind::NotNull, &table, &col.name).into());
        }
        if col.primary_key && value.is_null() {
            return Err(ConstraintError::new(ConstraintKind::PrimaryKey, &table, &col.name).into());
        }
        if col.is_unique()
            && !value.is_null()
            && value_collides(db, &table, &col.name, &value, &live_rows, &IndexSet::default())?
        {
            let kind = if col.primary_key {
                ConstraintKind::PrimaryKey
            } else {
                ConstraintKind::Unique
            };
            return Err(ConstraintError::new(kind, &table, &col.name)
                .with_value(value.to_string())
                .into());
        }
    }

    let rid = db.catalog_mut().bump_next_rid(&table)?;
    let row = Row::new(rid, fields);
    db.heap_table(&table)?.append_row(&row)?;

    let index_targets: Vec<(String, String)> = db
        .catalog()
        .list_indexes(&table)
        .map(|i| (i.name.clone(), i.column.clone()))
        .collect();
    for (idx_name, idx_col) in index_targets {
        let value = row.get(&idx_col).cloned().unwrap_or(Value::Null);
        db.hash_index(&idx_name)?.insert(&value, rid)?;
    }

    Ok(StatementResult::Ack {
        kind: AckKind::Insert,
        affected: 1,
    })
}

/// Resolves which table (among `schemas`) a column reference belongs
/// to, qualifying via its explicit table name or, if unqualified, by
/// finding the single participating table declaring that column.
/// Unqualified references that match more than one participating
/// table are rejected as ambiguous.
fn resolve_ref_table<'a>(schemas: &'a [(String, TableSchema)], col_ref: &ColRef) -> EngineResult<&'a str> {
    if let Some(t) = &col_ref.table {
        let (name, schema) = schemas
            .iter()
            .find(|(name, _)| name == t)
            .ok_or_else(|| unknown_table(t))?;
        if schema.column(&col_ref.column).is_none() {
            return Err(CatalogError::new(format!("unknown column '{t}.{}'", col_ref.column))
                .table(t)
                .column(&col_ref.column)
                .into());
        }
        Ok(name.as_str())
    } else {
        let matches: Vec<&str> = schemas
            .iter()
            .filter(|(_, schema)| schema.column(&col_ref.column).is_some())
            .map(|(name, _)| name.as_str())
            .collect();
        match matches.len() {
            0 => Err(CatalogError::new(format!("unknown column '{}'", col_ref.column))
                .column(&col_ref.column)
                .into()),
            1 => Ok(matches[0]),
            _ => Err(CatalogError::new(format!("ambiguous column '{}'", col_ref.column))
                .column(&col_ref.column)
                .into()),
        }
    }
}

fn per_table_predicates(
    schemas: &[(String, TableSchema)],
    where_clause: &[Equality],
) -> EngineResult<IndexMap<String, Vec<Equality>>> {
    let mut map: IndexMap<String, Vec<Equality>> = IndexMap::default();
    for eq in where_clause {
        let table = resolve_ref_table(schemas, &eq.col)?.to_string();
        map.entry(table).or_default().push(eq.clone());
    }
    Ok(map)
}

/// Selects a plan for `table` given its per-table equality predicates:
/// index lookup when an indexed column has an equality predicate, full
/// scan otherwise; remaining predicates are then applied in memory.
fn resolve_candidates(db: &mut Database, table: &str, predicates: &[Equality]) -> EngineResult<Vec<Row>> {
    let mut indexed: Option<(String, Value)> = None;
    for eq in predicates {
        if db.catalog().list_indexes_on(table, &eq.col.column).next().is_some() {
            indexed = Some((eq.col.column.clone(), literal_to_value(&eq.value)));
            break;
        }
    }

    let rows = if let Some((col, value)) = indexed {
        let idx_name = db
            .catalog()
            .list_indexes_on(table, &col)
            .next()
            .expect("just checked")
            .name
            .clone();
        tracing::debug!(table, column = %col, plan = "index_lookup", "select plan chosen");
        let rids = db.hash_index(&idx_name)?.lookup(&value).to_vec();
        let heap = db.heap_table(table)?;
        let mut out = Vec::with_capacity(rids.len());
        for rid in rids {
            if let Some(row) = heap.get(rid)? {
                out.push(row);
            }
        }
        out
    } else {
        tracing::debug!(table, plan = "full_scan", "select plan chosen");
        db.heap_table(table)?.scan()?
    };

    Ok(rows.into_iter().filter(|row| matches_all(row, predicates)).collect())
}

fn select(
    db: &mut Database,
    select_list: SelectList,
    from: String,
    joins: Vec<JoinClause>,
    where_clause: Vec<Equality>,
) -> EngineResult<StatementResult> {
    let mut schemas: Vec<(String, TableSchema)> = Vec::with_capacity(1 + joins.len());
    let from_schema = db.catalog().lookup_table(&from).cloned().ok_or_else(|| unknown_table(&from))?;
    schemas.push((from.clone(), from_schema));
    for j in &joins {
        let schema = db.catalog().lookup_table(&j.table).cloned().ok_or_else(|| unknown_table(&j.table))?;
        schemas.push((j.table.clone(), schema));
    }

    let predicates = per_table_predicates(&schemas, &where_clause)?;

    let from_predicates = predicates.get(&from).cloned().unwrap_or_default();
    let from_rows = resolve_candidates(db, &from, &from_predicates)?;
    let mut current: Vec<join::CompositeRow> = from_rows
        .into_iter()
        .map(|row| {
            let mut composite = IndexMap::default();
            composite.insert(from.clone(), row);
            composite
        })
        .collect();

    for j in &joins {
        current = join_one(db, &schemas, &predicates, current, j)?;
    }

    project(&schemas, select_list, &current)
}

/// Joins `current` with `join.table`: index-nested-loop when either
/// side of the ON equality is indexed, nested-loop otherwise. An index
/// can live on the join-target table's column or on the already
/// accumulated (outer) side's column; whichever side has the index
/// becomes the probed side, and the other is iterated.
fn join_one(
    db: &mut Database,
    schemas: &[(String, TableSchema)],
    predicates: &IndexMap<String, Vec<Equality>>,
    current: Vec<join::CompositeRow>,
    j: &JoinClause,
) -> EngineResult<Vec<join::CompositeRow>> {
    let inner_table = j.table.clone();
    let inner_predicates = predicates.get(&inner_table).cloned().unwrap_or_default();

    let left_table = resolve_ref_table(schemas, &j.left)?.to_string();
    let right_table = resolve_ref_table(schemas, &j.right)?.to_string();
    let (outer_ref, inner_ref) = if left_table == inner_table {
        (j.right.clone(), j.left.clone())
    } else if right_table == inner_table {
        (j.left.clone(), j.right.clone())
    } else {
        return Err(EngineError::NotImplemented(format!(
            "join condition does not reference '{inner_table}'"
        )));
    };
    let outer_table = resolve_ref_table(schemas, &outer_ref)?.to_string();

    let indexed_on_inner = db
        .catalog()
        .list_indexes_on(&inner_table, &inner_ref.column)
        .next()
        .map(|i| i.name.clone());
    let indexed_on_outer = db
        .catalog()
        .list_indexes_on(&outer_table, &outer_ref.column)
        .next()
        .map(|i| i.name.clone());

    if let Some(idx_name) = indexed_on_inner {
        tracing::debug!(table = %inner_table, column = %inner_ref.column, plan = "index_nested_loop", "join plan chosen");
        let outer_column = outer_ref.column.clone();
        let outer_table_key = outer_table.clone();
        let outer_value = move |composite: &join::CompositeRow| -> Option<Value> {
            composite.get(&outer_table_key).and_then(|r| r.get(&outer_column)).cloned()
        };
        let probe = |value: &Value| -> EngineResult<Vec<Row>> {
            let rids = db.hash_index(&idx_name)?.lookup(value).to_vec();
            let mut rows = Vec::with_capacity(rids.len());
            for rid in rids {
                if let Some(row) = db.heap_table(&inner_table)?.get(rid)? {
                    if matches_all(&row, &inner_predicates) {
                        rows.push(row);
                    }
                }
            }
            Ok(rows)
        };
        join::index_nested_loop(current, &j.table, outer_value, probe)
    } else if let Some(idx_name) = indexed_on_outer {
        // The index lives on the already-accumulated side's column, not
        // on the join target. Drive the loop from the join target's own
        // filtered rows instead, probing the outer side's index with
        // each one's join value, and keep only the composites already
        // in `current` whose outer-table row is among the probe hits.
        tracing::debug!(table = %outer_table, column = %outer_ref.column, plan = "index_nested_loop", "join plan chosen");
        let driving_rows = resolve_candidates(db, &inner_table, &inner_predicates)?;
        let inner_column = inner_ref.column.clone();
        let mut out = Vec::new();
        for driving_row in driving_rows {
            let Some(probe_value) = driving_row.get(&inner_column).cloned() else {
                continue;
            };
            if probe_value.is_null() {
                continue;
            }
            let rids = db.hash_index(&idx_name)?.lookup(&probe_value).to_vec();
            for composite in &current {
                let hit = composite
                    .get(&outer_table)
                    .map(|r| rids.contains(&r.rid))
                    .unwrap_or(false);
                if hit {
                    let mut combined = composite.clone();
                    combined.insert(inner_table.clone(), driving_row.clone());
                    out.push(combined);
                }
            }
        }
        Ok(out)
    } else {
        tracing::debug!(table = %inner_table, plan = "nested_loop", "join plan chosen");
        let inner_rows = resolve_candidates(db, &inner_table, &inner_predicates)?;
        let outer_column = outer_ref.column.clone();
        let outer_table_key = outer_table.clone();
        let inner_column = inner_ref.column.clone();
        let outer_value = move |composite: &join::CompositeRow| -> Option<Value> {
            composite.get(&outer_table_key).and_then(|r| r.get(&outer_column)).cloned()
        };
        let inner_value = move |row: &Row| -> Option<Value> { row.get(&inner_column).cloned() };
        Ok(join::nested_loop(current, &inner_rows, &j.table, outer_value, inner_value))
    }
}

/// Expands `*` and projects the final column list: qualified names are
/// only used for columns whose bare name is ambiguous among
/// participating tables.
fn project(
    schemas: &[(String, TableSchema)],
    select_list: SelectList,
    current: &[join::CompositeRow],
) -> EngineResult<StatementResult> {
    let columns: Vec<ColRef> = match select_list {
        SelectList::Star => schemas
            .iter()
            .flat_map(|(t, s)| s.columns.iter().map(move |c| ColRef::qualified(t.clone(), c.name.clone())))
            .collect(),
        SelectList::Columns(cols) => cols,
    };

    let mut name_counts: IndexMap<String, usize> = IndexMap::default();
    for c in &columns {
        *name_counts.entry(c.column.clone()).or_insert(0) += 1;
    }

    let mut out_columns = Vec::with_capacity(columns.len());
    let mut owner_tables = Vec::with_capacity(columns.len());
    for c in &columns {
        let table = match &c.table {
            Some(t) => t.clone(),
            None => resolve_ref_table(schemas, c)?.to_string(),
        };
        let ambiguous = name_counts.get(&c.column).copied().unwrap_or(0) > 1;
        out_columns.push(if ambiguous {
            format!("{table}.{}", c.column)
        } else {
            c.column.clone()
        });
        owner_tables.push(table);
    }

    let mut rows_out = Vec::with_capacity(current.len());
    for composite in current {
        let mut values = Vec::with_capacity(columns.len());
        for (c, table) in columns.iter().zip(owner_tables.iter()) {
            let row = composite
                .get(table)
                .ok_or_else(|| CatalogError::new(format!("table '{table}' missing from joined row")).table(table))?;
            values.push(row.get(&c.column).cloned().unwrap_or(Value::Null));
        }
        rows_out.push(values);
    }

    Ok(StatementResult::RowSet {
        columns: out_columns,
        rows: rows_out,
    })
}

fn update(
    db: &mut Database,
    table: String,
    assignments: Vec<Assignment>,
    where_clause: Vec<Equality>,
) -> EngineResult<StatementResult> {
    let schema = db.catalog().lookup_table(&table).cloned().ok_or_else(|| unknown_table(&table))?;
    let candidates = resolve_candidates(db, &table, &where_clause)?;
    if candidates.is_empty() {
        return Ok(StatementResult::Ack {
            kind: AckKind::Update,
            affected: 0,
        });
    }

    let mut prospective: Vec<IndexMap<String, Value>> = Vec::with_capacity(candidates.len());
    for row in &candidates {
        let mut fields = row.fields.clone();
        for a in &assignments {
            let col_schema = schema.column(&a.column).ok_or_else(|| {
                CatalogError::new(format!("unknown column '{}'", a.column))
                    .table(&table)
                    .column(&a.column)
            })?;
            let value = literal_to_value(&a.value);
            col_schema.ty.check(&a.column, &value)?;
            fields.insert(a.column.clone(), value);
        }
        prospective.push(fields);
    }

    let old_rids: IndexSet<Rid> = candidates.iter().map(|r| r.rid).collect();
    let live_rows = db.heap_table(&table)?.scan()?;

    // Two-phase batch validate: a violation anywhere in the batch
    // aborts before any row is touched.
    for col in &schema.columns {
        let not_null = col.is_not_null();
        let unique = col.is_unique();
        if !not_null && !unique {
            continue;
        }
        let mut seen_in_batch: Vec<Value> = Vec::new();
        for fields in &prospective {
            let value = fields.get(&col.name).cloned().unwrap_or(Value::Null);
            if not_null && value.is_null() {
                return Err(ConstraintError::new(ConstraintKind::NotNull, &table, &col.name).into());
            }
            if unique && !value.is_null() {
                let collides_live = value_collides(db, &table, &col.name, &value, &live_rows, &old_rids)?;
                let collides_batch = seen_in_batch.contains(&value);
                if collides_live || collides_batch {
                    let kind = if col.primary_key {
                        ConstraintKind::PrimaryKey
                    } else {
                        ConstraintKind::Unique
                    };
                    return Err(ConstraintError::new(kind, &table, &col.name)
                        .with_value(value.to_string())
                        .into());
                }
                seen_in_batch.push(value);
            }
        }
    }

    let index_targets: Vec<(String, String)> = db
        .catalog()
        .list_indexes(&table)
        .map(|i| (i.name.clone(), i.column.clone()))
        .collect();

    let mut affected = 0u64;
    for (old_row, new_fields) in candidates.iter().zip(prospective.into_iter()) {
        let new_rid = db.catalog_mut().bump_next_rid(&table)?;
        let new_row = Row::new(new_rid, new_fields);
        db.heap_table(&table)?.append_row(&new_row)?;
        db.heap_table(&table)?.append_tombstone(old_row.rid)?;
        for (idx_name, idx_col) in &index_targets {
            let old_value = old_row.get(idx_col).cloned().unwrap_or(Value::Null);
            db.hash_index(idx_name)?.remove(&old_value, old_row.rid)?;
            let new_value = new_row.get(idx_col).cloned().unwrap_or(Value::Null);
            db.hash_index(idx_name)?.insert(&new_value, new_rid)?;
        }
        affected += 1;
    }

    Ok(StatementResult::Ack {
        kind: AckKind::Update,
        affected,
    })
}

fn delete(db: &mut Database, table: String, where_clause: Vec<Equality>) -> EngineResult<StatementResult> {
    if db.catalog().lookup_table(&table).is_none() {
        return Err(unknown_table(&table));
    }
    let candidates = resolve_candidates(db, &table, &where_clause)?;
    let index_targets: Vec<(String, String)> = db
        .catalog()
        .list_indexes(&table)
        .map(|i| (i.name.clone(), i.column.clone()))
        .collect();

    let mut affected = 0u64;
    for row in &candidates {
        db.heap_table(&table)?.append_tombstone(row.rid)?;
        for (idx_name, idx_col) in &index_targets {
            let value = row.get(idx_col).cloned().unwrap_or(Value::Null);
            db.hash_index(idx_name)?.remove(&value, row.rid)?;
        }
        affected += 1;
    }

    Ok(StatementResult::Ack {
        kind: AckKind::Delete,
        affected,
    })
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    use super::*;

    #[test]
    fn not_null_violation_is_rejected_and_leaves_no_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        db.execute("CREATE TABLE t (id INTEGER, name TEXT NOT NULL)").unwrap();
        let err = db.execute("INSERT INTO t (id) VALUES (1)").unwrap_err();
        assert!(matches!(err, EngineError::Constraint(_)));
        match db.execute("SELECT * FROM t").unwrap() {
            StatementResult::RowSet { rows, .. } => assert!(rows.is_empty()),
            other => panic!("expected RowSet, got {other:?}"),
        }
    }

    #[test]
    fn delete_on_no_matches_affects_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        db.execute("CREATE TABLE t (id INTEGER)").unwrap();
        db.execute("INSERT INTO t (id) VALUES (1)").unwrap();
        db.execute("DELETE FROM t WHERE id=1").unwrap();
        let ack = db.execute("DELETE FROM t WHERE id=1").unwrap();
        assert_eq!(
            ack,
            StatementResult::Ack {
                kind: AckKind::Delete,
                affected: 0
            }
        );
    }

    #[test]
    fn plan_equivalence_between_full_scan_and_index_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        db.execute("CREATE TABLE t (id INTEGER, tag TEXT)").unwrap();
        db.execute("INSERT INTO t (id,tag) VALUES (1,'x')").unwrap();
        db.execute("INSERT INTO t (id,tag) VALUES (2,'x')").unwrap();
        db.execute("INSERT INTO t (id,tag) VALUES (3,'y')").unwrap();

        let before = db.execute("SELECT id FROM t WHERE tag='x'").unwrap();
        db.execute("CREATE INDEX idx_t_tag ON t(tag)").unwrap();
        let after = db.execute("SELECT id FROM t WHERE tag='x'").unwrap();

        let (StatementResult::RowSet { mut rows, .. }, StatementResult::RowSet { rows: mut rows2, .. }) =
            (before, after)
        else {
            panic!("expected two RowSets");
        };
        rows.sort_by_key(|r| format!("{r:?}"));
        rows2.sort_by_key(|r| format!("{r:?}"));
        assert_eq!(rows, rows2);
    }
}
