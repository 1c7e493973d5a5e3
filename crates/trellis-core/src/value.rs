//! Tagged field values and their semantic types.
//!
//! Records carry a [`Value`] per field instead of an untyped JSON bag; the
//! conversion from JSON happens exactly once, at the service boundary,
//! validated against the entity schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── FieldType ───────────────────────────────────────────────────────────────

/// The semantic type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  String,
  Number,
  Boolean,
  Timestamp,
  Reference,
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  String(String),
  Number(f64),
  Bool(bool),
  Timestamp(DateTime<Utc>),
  Reference(Uuid),
}

impl Value {
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  /// Render as JSON for transport. Timestamps become RFC 3339 strings,
  /// references hyphenated lowercase UUIDs.
  pub fn to_json(&self) -> serde_json::Value {
    match self {
      Value::Null => serde_json::Value::Null,
      Value::String(s) => serde_json::Value::String(s.clone()),
      Value::Number(n) => serde_json::json!(n),
      Value::Bool(b) => serde_json::Value::Bool(*b),
      Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
      Value::Reference(id) => {
        serde_json::Value::String(id.hyphenated().to_string())
      }
    }
  }

  /// Coerce a JSON value into a `Value` of the given type.
  ///
  /// `Err` carries a human-readable reason; the caller wraps it into its own
  /// error context (payload validation or filter parsing).
  pub fn from_json(
    field_type: FieldType,
    json: &serde_json::Value,
  ) -> Result<Self, String> {
    use serde_json::Value as Json;
    match (field_type, json) {
      (_, Json::Null) => Ok(Value::Null),
      (FieldType::String, Json::String(s)) => Ok(Value::String(s.clone())),
      (FieldType::Number, Json::Number(n)) => n
        .as_f64()
        .map(Value::Number)
        .ok_or_else(|| format!("number out of range: {n}")),
      (FieldType::Boolean, Json::Bool(b)) => Ok(Value::Bool(*b)),
      (FieldType::Timestamp, Json::String(s)) => parse_timestamp(s),
      (FieldType::Reference, Json::String(s)) => parse_reference(s),
      (expected, other) => {
        Err(format!("expected a {expected:?} value, got {other}"))
      }
    }
  }

  /// Parse a bare (unquoted) filter-expression token into a `Value` of the
  /// given type.
  pub fn parse_literal(field_type: FieldType, raw: &str) -> Result<Self, String> {
    match field_type {
      FieldType::String => Ok(Value::String(raw.to_string())),
      FieldType::Number => raw
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| format!("not a number: {raw:?}")),
      FieldType::Boolean => match raw {
        "true" | "1" => Ok(Value::Bool(true)),
        "false" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("not a boolean: {raw:?}")),
      },
      FieldType::Timestamp => parse_timestamp(raw),
      FieldType::Reference => parse_reference(raw),
    }
  }
}

fn parse_timestamp(s: &str) -> Result<Value, String> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
    .map_err(|_| format!("not an RFC 3339 timestamp: {s:?}"))
}

fn parse_reference(s: &str) -> Result<Value, String> {
  Uuid::parse_str(s)
    .map(Value::Reference)
    .map_err(|_| format!("not a valid id: {s:?}"))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
