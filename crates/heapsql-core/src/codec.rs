use heapsql_helpers::IndexMap;
use serde_json::{Map, Value as Json};

use crate::error::EngineResult;
use crate::value::Value;

pub type Rid = u64;

/// One decoded heap record: a live row or a tombstone marker.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapRecord {
    Row(Row),
    Tombstone(Rid),
}

/// An ordered mapping from declared column names to values, plus the
/// engine-reserved `_rid` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub rid: Rid,
    pub fields: IndexMap<String, Value>,
}

impl Row {
    pub fn new(rid: Rid, fields: IndexMap<String, Value>) -> Self {
        Self { rid, fields }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }
}

/// Encodes one heap record as a single JSON-Lines line: UTF-8,
/// LF-terminated, self-describing. JSON's own number/string/bool/null
/// distinction already preserves type tags (`1` vs. `"1"`), so no
/// custom tagging scheme is needed on top of it.
pub fn encode(record: &HeapRecord) -> String {
    let mut map = Map::new();
    match record {
        HeapRecord::Tombstone(rid) => {
            map.insert("_op".to_string(), Json::from("DELETE"));
            map.insert("_rid".to_string(), Json::from(*rid));
        }
        HeapRecord::Row(row) => {
            map.insert("_rid".to_string(), Json::from(row.rid));
            for (col, val) in &row.fields {
                map.insert(col.clone(), val.to_json());
            }
        }
    }
    let mut line = serde_json::to_string(&Json::Object(map)).expect("map serializes to json");
    line.push('\n');
    line
}

/// Decodes one line back into a `HeapRecord`. Unknown object keys
/// other than `_rid`/`_op` are simply carried into `fields` as regular
/// columns, so a reader from an older schema just sees extra fields it
/// doesn't recognize instead of failing to decode.
pub fn decode(line: &str) -> EngineResult<HeapRecord> {
    let json: Json = serde_json::from_str(line.trim_end_matches('\n'))?;
    let Json::Object(mut map) = json else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "heap record is not a JSON object",
        )
        .into());
    };

    let rid = map
        .remove("_rid")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "heap record missing _rid")
        })?;

    if let Some(Json::String(op)) = map.get("_op") {
        if op == "DELETE" {
            return Ok(HeapRecord::Tombstone(rid));
        }
    }
    map.remove("_op");

    let mut fields = IndexMap::default();
    for (k, v) in map {
        fields.insert(k, Value::from_json(&v));
    }
    Ok(HeapRecord::Row(Row::new(rid, fields)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rid: Rid, pairs: &[(&str, Value)]) -> Row {
        let mut fields = IndexMap::default();
        for (k, v) in pairs {
            fields.insert((*k).to_string(), v.clone());
        }
        Row::new(rid, fields)
    }

    #[test]
    fn round_trips_a_row_including_type_tags() {
        let r = row(
            1,
            &[
                ("id", Value::Int(1)),
                ("name", Value::Str("1".into())),
                ("active", Value::Bool(true)),
                ("nick", Value::Null),
            ],
        );
        let encoded = encode(&HeapRecord::Row(r.clone()));
        assert!(encoded.ends_with('\n'));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, HeapRecord::Row(r));
    }

    #[test]
    fn round_trips_a_tombstone() {
        let encoded = encode(&HeapRecord::Tombstone(42));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, HeapRecord::Tombstone(42));
    }

    #[test]
    fn tolerates_unknown_fields() {
        let line = r#"{"_rid":3,"id":3,"future_field":"x"}"#;
        let decoded = decode(line).unwrap();
        match decoded {
            HeapRecord::Row(r) => {
                assert_eq!(r.get("future_field"), Some(&Value::Str("x".into())));
            }
            _ => panic!("expected row"),
        }
    }
}
