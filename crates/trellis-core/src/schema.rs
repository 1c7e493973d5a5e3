//! Entity schemas and the process-wide registry.
//!
//! A schema is the immutable descriptor of one entity type: its field list,
//! its primary key, and its capability flags (soft delete, team visibility).
//! The registry is built once at startup and never mutated afterwards, so
//! concurrent reads need no locking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  value::FieldType,
};

/// Field name of the soft-delete flag.
pub const FIELD_DELETED: &str = "deleted";
/// Field name of the owning user reference.
pub const FIELD_ASSIGNED_USER: &str = "assignedUser";
/// Field name of the creation timestamp, set by the service when present.
pub const FIELD_CREATED_AT: &str = "createdAt";

// ─── FieldDef ────────────────────────────────────────────────────────────────

/// A single field of an entity schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
  pub name: String,
  #[serde(rename = "type")]
  pub field_type: FieldType,
  /// Required fields must be present and non-null on create, and may not be
  /// set to null on update.
  #[serde(default)]
  pub required: bool,
}

impl FieldDef {
  pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
    Self { name: name.into(), field_type, required: false }
  }

  pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
    Self { name: name.into(), field_type, required: true }
  }
}

// ─── EntitySchema ────────────────────────────────────────────────────────────

/// Immutable descriptor for one entity type.
#[derive(Debug, Clone)]
pub struct EntitySchema {
  name:            String,
  fields:          Vec<FieldDef>,
  primary_key:     String,
  soft_delete:     bool,
  team_visibility: bool,
}

impl EntitySchema {
  /// Build and validate a schema.
  ///
  /// Fails if the primary key is not a declared reference field, if a field
  /// name is duplicated, or if a capability flag is set without the field it
  /// relies on (`deleted` for soft delete, `assignedUser` for team
  /// visibility).
  pub fn new(
    name: impl Into<String>,
    fields: Vec<FieldDef>,
    primary_key: impl Into<String>,
    soft_delete: bool,
    team_visibility: bool,
  ) -> Result<Self> {
    let name = name.into();
    let primary_key = primary_key.into();

    let mut seen = HashMap::new();
    for def in &fields {
      if seen.insert(def.name.as_str(), def.field_type).is_some() {
        return Err(Error::Validation(format!(
          "duplicate field {:?} on entity {name:?}",
          def.name
        )));
      }
    }

    match seen.get(primary_key.as_str()) {
      Some(FieldType::Reference) => {}
      Some(_) => {
        return Err(Error::Validation(format!(
          "primary key {primary_key:?} of entity {name:?} must be a reference \
           field"
        )));
      }
      None => {
        return Err(Error::Validation(format!(
          "entity {name:?} does not declare its primary key {primary_key:?}"
        )));
      }
    }

    if soft_delete && seen.get(FIELD_DELETED) != Some(&FieldType::Boolean) {
      return Err(Error::Validation(format!(
        "soft-deleting entity {name:?} needs a boolean {FIELD_DELETED:?} field"
      )));
    }

    if team_visibility
      && seen.get(FIELD_ASSIGNED_USER) != Some(&FieldType::Reference)
    {
      return Err(Error::Validation(format!(
        "team-visible entity {name:?} needs a reference \
         {FIELD_ASSIGNED_USER:?} field"
      )));
    }

    Ok(Self { name, fields, primary_key, soft_delete, team_visibility })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Ordered field list. The order is stable and drives column order in
  /// storage backends.
  pub fn fields(&self) -> &[FieldDef] {
    &self.fields
  }

  pub fn field(&self, name: &str) -> Option<&FieldDef> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn primary_key(&self) -> &str {
    &self.primary_key
  }

  pub fn soft_delete(&self) -> bool {
    self.soft_delete
  }

  pub fn team_visibility(&self) -> bool {
    self.team_visibility
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Process-wide table of entity schemas; immutable after construction.
#[derive(Debug, Default)]
pub struct Registry {
  entities: HashMap<String, EntitySchema>,
}

impl Registry {
  pub fn new(schemas: impl IntoIterator<Item = EntitySchema>) -> Result<Self> {
    let mut entities = HashMap::new();
    for schema in schemas {
      let name = schema.name().to_string();
      if entities.insert(name.clone(), schema).is_some() {
        return Err(Error::Validation(format!(
          "entity {name:?} registered twice"
        )));
      }
    }
    Ok(Self { entities })
  }

  /// Resolve an entity name to its schema. Lookup is case-sensitive; an
  /// unregistered name is a client error.
  pub fn resolve(&self, name: &str) -> Result<&EntitySchema> {
    self
      .entities
      .get(name)
      .ok_or_else(|| Error::UnknownEntity(name.to_string()))
  }

  pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
    self.entities.values()
  }

  pub fn len(&self) -> usize {
    self.entities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entities.is_empty()
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn account() -> EntitySchema {
    EntitySchema::new(
      "Account",
      vec![
        FieldDef::new("id", FieldType::Reference),
        FieldDef::required("name", FieldType::String),
        FieldDef::new(FIELD_ASSIGNED_USER, FieldType::Reference),
        FieldDef::new(FIELD_DELETED, FieldType::Boolean),
      ],
      "id",
      true,
      true,
    )
    .unwrap()
  }

  #[test]
  fn resolve_is_case_sensitive() {
    let registry = Registry::new([account()]).unwrap();
    assert!(registry.resolve("Account").is_ok());
    assert!(matches!(
      registry.resolve("account"),
      Err(Error::UnknownEntity(name)) if name == "account"
    ));
  }

  #[test]
  fn resolve_unknown_name_is_a_client_error() {
    let registry = Registry::new([account()]).unwrap();
    assert!(matches!(
      registry.resolve("Bogus"),
      Err(Error::UnknownEntity(_))
    ));
  }

  #[test]
  fn soft_delete_requires_deleted_field() {
    let result = EntitySchema::new(
      "Note",
      vec![FieldDef::new("id", FieldType::Reference)],
      "id",
      true,
      false,
    );
    assert!(matches!(result, Err(Error::Validation(_))));
  }

  #[test]
  fn team_visibility_requires_assigned_user_field() {
    let result = EntitySchema::new(
      "Note",
      vec![
        FieldDef::new("id", FieldType::Reference),
        FieldDef::new(FIELD_DELETED, FieldType::Boolean),
      ],
      "id",
      true,
      true,
    );
    assert!(matches!(result, Err(Error::Validation(_))));
  }

  #[test]
  fn primary_key_must_be_declared_reference() {
    let result = EntitySchema::new(
      "Note",
      vec![FieldDef::new("id", FieldType::String)],
      "id",
      false,
      false,
    );
    assert!(matches!(result, Err(Error::Validation(_))));
  }

  #[test]
  fn duplicate_registration_fails() {
    assert!(matches!(
      Registry::new([account(), account()]),
      Err(Error::Validation(_))
    ));
  }
}
