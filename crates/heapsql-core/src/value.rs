use std::fmt;

use serde::Deserialize;

use crate::error::{EngineError, TypeError};

/// A tagged atom: the engine's dynamic value kind, kept as a closed
/// Rust enum rather than threading `serde_json::Value` through the
/// engine so that INTEGER/STRING/BOOLEAN/NULL stay distinct at every
/// layer, not just on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INTEGER",
            Value::Str(_) => "STRING",
            Value::Bool(_) => "BOOLEAN",
            Value::Null => "NULL",
        }
    }

    /// Encodes the value preserving its type tag, used both for JSON
    /// row records and for hash-index keys, so `INTEGER 7` and
    /// `STRING "7"` never collide.
    pub fn encode_key(&self) -> String {
        match self {
            Value::Int(i) => format!("i:{i}"),
            Value::Str(s) => format!("s:{s}"),
            Value::Bool(b) => format!("b:{b}"),
            Value::Null => "n:".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Str(s) => serde_json::Value::from(s.clone()),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Null => serde_json::Value::Null,
        }
    }

    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Str(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// The declared type of a column. `Varchar` carries its declared max
/// character length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Varchar(u32),
    Text,
    Date,
    Boolean,
}

impl ColumnType {
    /// Checks a value against the declared type without coercion: a
    /// BOOLEAN column never accepts an INTEGER and vice versa.
    pub fn check(&self, column: &str, value: &Value) -> Result<(), EngineError> {
        match (self, value) {
            (_, Value::Null) => Ok(()),
            (ColumnType::Integer, Value::Int(_)) => Ok(()),
            (ColumnType::Boolean, Value::Bool(_)) => Ok(()),
            (ColumnType::Text, Value::Str(_)) => Ok(()),
            (ColumnType::Date, Value::Str(_)) => Ok(()),
            (ColumnType::Varchar(max), Value::Str(s)) => {
                if s.chars().count() as u32 > *max {
                    Err(TypeError::new(column, "VARCHAR within declared length", format!("{} chars", s.chars().count())).into())
                } else {
                    Ok(())
                }
            }
            (expected, found) => Err(TypeError::new(column, expected.name(), found.type_name()).into()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Varchar(_) => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    /// Renders the type the way it appears in DDL, e.g. `VARCHAR(32)`.
    /// Used as the catalog's on-disk representation so `catalog.json`
    /// stays human-readable.
    pub fn to_spec_string(self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Varchar(n) => format!("VARCHAR({n})"),
        }
    }

    pub fn from_spec_string(s: &str) -> Option<Self> {
        if let Some(rest) = s.strip_prefix("VARCHAR(").and_then(|r| r.strip_suffix(')')) {
            return rest.parse::<u32>().ok().map(ColumnType::Varchar);
        }
        match s {
            "INTEGER" => Some(ColumnType::Integer),
            "TEXT" => Some(ColumnType::Text),
            "DATE" => Some(ColumnType::Date),
            "BOOLEAN" => Some(ColumnType::Boolean),
            _ => None,
        }
    }
}

impl serde::Serialize for ColumnType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_spec_string())
    }
}

impl<'de> serde::Deserialize<'de> for ColumnType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ColumnType::from_spec_string(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown column type '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_json_round_trip_preserves_type_tags() {
        let values = [
            Value::Int(7),
            Value::Str("7".to_string()),
            Value::Bool(true),
            Value::Null,
        ];
        for v in values {
            let json = v.to_json();
            let back = Value::from_json(&json);
            assert_eq!(v, back);
        }
        // INTEGER 7 and STRING "7" must not collapse to the same key.
        assert_ne!(Value::Int(7).encode_key(), Value::Str("7".into()).encode_key());
    }

    #[test]
    fn column_type_spec_string_round_trips() {
        for ty in [
            ColumnType::Integer,
            ColumnType::Text,
            ColumnType::Date,
            ColumnType::Boolean,
            ColumnType::Varchar(32),
        ] {
            let s = ty.to_spec_string();
            assert_eq!(ColumnType::from_spec_string(&s), Some(ty));
        }
    }

    #[test]
    fn varchar_rejects_overlong_strings() {
        let ty = ColumnType::Varchar(3);
        assert!(ty.check("name", &Value::Str("abc".into())).is_ok());
        assert!(ty.check("name", &Value::Str("abcd".into())).is_err());
    }

    #[test]
    fn no_coercion_between_int_and_bool() {
        let ty = ColumnType::Integer;
        assert!(ty.check("n", &Value::Bool(true)).is_err());
    }
}
