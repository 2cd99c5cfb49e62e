use heapsql_core::error::EngineResult;
use heapsql_core::{Row, Value};
use heapsql_helpers::IndexMap;

/// One result row spanning several participating tables, keyed by
/// table name. Multi-way joins are a left-deep composition of two-way
/// joins starting from the FROM table.
pub type CompositeRow = IndexMap<String, Row>;

/// Nested-loop equi-join: for each outer composite row, scan the
/// pre-fetched, already per-table-filtered `inner_rows` and keep the
/// pairs whose join columns are equal and non-NULL.
pub fn nested_loop(
    outer: Vec<CompositeRow>,
    inner_rows: &[Row],
    inner_table: &str,
    outer_value: impl Fn(&CompositeRow) -> Option<Value>,
    inner_value: impl Fn(&Row) -> Option<Value>,
) -> Vec<CompositeRow> {
    let mut out = Vec::new();
    for composite in outer {
        let Some(ov) = outer_value(&composite) else {
            continue;
        };
        if ov.is_null() {
            continue;
        }
        for inner_row in inner_rows {
            let Some(iv) = inner_value(inner_row) else {
                continue;
            };
            if ov == iv {
                let mut combined = composite.clone();
                combined.insert(inner_table.to_string(), inner_row.clone());
                out.push(combined);
            }
        }
    }
    out
}

/// Index-nested-loop equi-join: for each outer row, probe the inner
/// table's index with the outer join value via `probe` (which performs
/// the index lookup, RID fetch, and per-table predicate filtering
/// together, since those all require access to the database that this
/// module has no handle on).
pub fn index_nested_loop(
    outer: Vec<CompositeRow>,
    inner_table: &str,
    outer_value: impl Fn(&CompositeRow) -> Option<Value>,
    mut probe: impl FnMut(&Value) -> EngineResult<Vec<Row>>,
) -> EngineResult<Vec<CompositeRow>> {
    let mut out = Vec::new();
    for composite in outer {
        let Some(ov) = outer_value(&composite) else {
            continue;
        };
        if ov.is_null() {
            continue;
        }
        for inner_row in probe(&ov)? {
            let mut combined = composite.clone();
            combined.insert(inner_table.to_string(), inner_row);
            out.push(combined);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapsql_core::Value;

    fn row(rid: u64, col: &str, v: Value) -> Row {
        let mut fields = IndexMap::default();
        fields.insert(col.to_string(), v);
        Row::new(rid, fields)
    }

    #[test]
    fn nested_loop_keeps_only_equal_non_null_pairs() {
        let mut outer_row = IndexMap::default();
        outer_row.insert("t".to_string(), row(0, "id", Value::Int(1)));
        let outer = vec![outer_row];
        let inner_rows = vec![
            row(0, "tid", Value::Int(1)),
            row(1, "tid", Value::Int(2)),
            row(2, "tid", Value::Null),
        ];
        let joined = nested_loop(
            outer,
            &inner_rows,
            "o",
            |c| c.get("t").and_then(|r| r.get("id")).cloned(),
            |r| r.get("tid").cloned(),
        );
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].get("o").unwrap().rid, 0);
    }

    #[test]
    fn index_nested_loop_combines_every_probe_result() {
        let mut outer_row = IndexMap::default();
        outer_row.insert("t".to_string(), row(0, "id", Value::Int(7)));
        let outer = vec![outer_row];
        let joined = index_nested_loop(
            outer,
            "o",
            |c| c.get("t").and_then(|r| r.get("id")).cloned(),
            |_v| Ok(vec![row(5, "tid", Value::Int(7))]),
        )
        .unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].get("o").unwrap().rid, 5);
    }
}
