//! Conversions between core `Value`s and SQLite column values.
//!
//! Strings, timestamps (RFC 3339) and UUIDs (hyphenated lowercase) are
//! stored as TEXT, numbers as REAL, booleans as INTEGER 0/1.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use trellis_core::value::{FieldType, Value};
use uuid::Uuid;

use crate::{Error, Result};

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn encode_value(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::String(s) => SqlValue::Text(s.clone()),
    Value::Number(n) => SqlValue::Real(*n),
    Value::Bool(b) => SqlValue::Integer(*b as i64),
    Value::Timestamp(t) => SqlValue::Text(t.to_rfc3339()),
    Value::Reference(id) => SqlValue::Text(encode_uuid(*id)),
  }
}

/// Decode one raw column back into a typed `Value` per the schema field
/// type.
pub fn decode_value(field_type: FieldType, raw: SqlValue) -> Result<Value> {
  match (field_type, raw) {
    (_, SqlValue::Null) => Ok(Value::Null),
    (FieldType::String, SqlValue::Text(s)) => Ok(Value::String(s)),
    (FieldType::Number, SqlValue::Real(n)) => Ok(Value::Number(n)),
    (FieldType::Number, SqlValue::Integer(n)) => Ok(Value::Number(n as f64)),
    (FieldType::Boolean, SqlValue::Integer(n)) => Ok(Value::Bool(n != 0)),
    (FieldType::Timestamp, SqlValue::Text(s)) => {
      decode_dt(&s).map(Value::Timestamp)
    }
    (FieldType::Reference, SqlValue::Text(s)) => {
      Ok(Value::Reference(Uuid::parse_str(&s)?))
    }
    (field_type, other) => Err(Error::Decode(format!(
      "unexpected {other:?} in a {field_type:?} column"
    ))),
  }
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}
