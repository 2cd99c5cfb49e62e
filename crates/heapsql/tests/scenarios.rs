//! End-to-end scenarios covering the statement language end to end:
//! DDL, INSERT/SELECT/UPDATE/DELETE, joins, and index plan selection.

use heapsql::{AckKind, Database, EngineError, StatementResult, Value};
use pretty_assertions::assert_eq;

#[test]
fn s1_create_insert_select() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open(dir.path()).unwrap();
    let results = db
        .execute_many(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             INSERT INTO t (id,name) VALUES (1,'a');
             INSERT INTO t (id,name) VALUES (2,'b');
             SELECT * FROM t WHERE id=2;",
        )
        .unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(
        results[0],
        StatementResult::Ack {
            kind: AckKind::CreateTable,
            affected: 0
        }
    );
    assert_eq!(
        results[1],
        StatementResult::Ack {
            kind: AckKind::Insert,
            affected: 1
        }
    );
    assert_eq!(
        results[2],
        StatementResult::Ack {
            kind: AckKind::Insert,
            affected: 1
        }
    );
    assert_eq!(
        results[3],
        StatementResult::RowSet {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![Value::Int(2), Value::Str("b".to_string())]],
        }
    );
}

#[test]
fn s2_primary_key_violation_leaves_table_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open(dir.path()).unwrap();
    db.execute_many(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO t (id,name) VALUES (1,'a');
         INSERT INTO t (id,name) VALUES (2,'b');",
    )
    .unwrap();

    let err = db.execute("INSERT INTO t (id,name) VALUES (1,'c')").unwrap_err();
    assert!(matches!(err, EngineError::Constraint(_)));

    match db.execute("SELECT * FROM t").unwrap() {
        StatementResult::RowSet { rows, .. } => assert_eq!(rows.len(), 2),
        other => panic!("expected RowSet, got {other:?}"),
    }
}

#[test]
fn s3_unique_allows_multiple_nulls_but_rejects_duplicate_value() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open(dir.path()).unwrap();
    db.execute("CREATE TABLE u (x INTEGER UNIQUE)").unwrap();
    db.execute("INSERT INTO u (x) VALUES (NULL)").unwrap();
    db.execute("INSERT INTO u (x) VALUES (NULL)").unwrap();
    db.execute("INSERT INTO u (x) VALUES (5)").unwrap();
    assert!(db.execute("INSERT INTO u (x) VALUES (5)").is_err());

    match db.execute("SELECT * FROM u").unwrap() {
        StatementResult::RowSet { rows, .. } => assert_eq!(rows.len(), 3),
        other => panic!("expected RowSet, got {other:?}"),
    }
}

#[test]
fn s4_update_replaces_rid_and_tombstones_old_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open(dir.path()).unwrap();
    db.execute_many(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO t (id,name) VALUES (1,'a');
         INSERT INTO t (id,name) VALUES (2,'b');",
    )
    .unwrap();

    let ack = db.execute("UPDATE t SET name='A' WHERE id=1").unwrap();
    assert_eq!(
        ack,
        StatementResult::Ack {
            kind: AckKind::Update,
            affected: 1
        }
    );

    let result = db.execute("SELECT * FROM t WHERE id=1").unwrap();
    assert_eq!(
        result,
        StatementResult::RowSet {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![Value::Int(1), Value::Str("A".to_string())]],
        }
    );
}

fn populate_t_and_o(db: &mut Database) {
    db.execute_many(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO t (id,name) VALUES (1,'a');
         INSERT INTO t (id,name) VALUES (2,'b');
         CREATE INDEX idx_t_id ON t(id);
         CREATE TABLE o (tid INTEGER, amt INTEGER);
         INSERT INTO o (tid,amt) VALUES (1,10);
         INSERT INTO o (tid,amt) VALUES (2,20);",
    )
    .unwrap();
}

#[test]
fn s5_index_accelerated_select_and_join() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open(dir.path()).unwrap();
    populate_t_and_o(&mut db);

    let result = db
        .execute("SELECT t.name, o.amt FROM t JOIN o ON t.id=o.tid WHERE o.amt=20")
        .unwrap();
    assert_eq!(
        result,
        StatementResult::RowSet {
            columns: vec!["name".to_string(), "amt".to_string()],
            rows: vec![vec![Value::Str("b".to_string()), Value::Int(20)]],
        }
    );
}

#[test]
fn s6_reopen_preserves_state() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut db = Database::open(dir.path()).unwrap();
        populate_t_and_o(&mut db);
        db.close();
    }

    let mut db = Database::open(dir.path()).unwrap();
    let result = db
        .execute("SELECT t.name, o.amt FROM t JOIN o ON t.id=o.tid WHERE o.amt=20")
        .unwrap();
    assert_eq!(
        result,
        StatementResult::RowSet {
            columns: vec!["name".to_string(), "amt".to_string()],
            rows: vec![vec![Value::Str("b".to_string()), Value::Int(20)]],
        }
    );
}
