//! Record: a generic instance of an entity.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{schema::EntitySchema, value::Value};

/// A single row of an entity, keyed by schema field name.
///
/// Records are only ever built from schema-validated input, so every key
/// present here names a field of the owning schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
  fields: BTreeMap<String, Value>,
}

impl Record {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, field: &str) -> Option<&Value> {
    self.fields.get(field)
  }

  pub fn set(&mut self, field: impl Into<String>, value: Value) {
    self.fields.insert(field.into(), value);
  }

  pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.fields.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// The primary-key value, if set.
  pub fn id(&self, schema: &EntitySchema) -> Option<Uuid> {
    match self.get(schema.primary_key()) {
      Some(Value::Reference(id)) => Some(*id),
      _ => None,
    }
  }

  /// Render as a JSON object for transport.
  pub fn to_json(&self) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = self
      .fields
      .iter()
      .map(|(k, v)| (k.clone(), v.to_json()))
      .collect();
    serde_json::Value::Object(map)
  }
}
