//! Built-in entity catalog.
//!
//! The standard entity types shipped with the server. Every one of them
//! soft-deletes and is team-visible; deployments can register additional
//! types through configuration.

use crate::{
  error::Result,
  schema::{
    EntitySchema, FieldDef, FIELD_ASSIGNED_USER, FIELD_CREATED_AT,
    FIELD_DELETED,
  },
  value::FieldType::{Boolean, Number, Reference, String, Timestamp},
};

/// Schemas for the built-in entity types.
pub fn standard() -> Result<Vec<EntitySchema>> {
  Ok(vec![account()?, contact()?, lead()?, meeting()?, task()?])
}

/// The fields every catalog entity carries: primary key, owner, soft-delete
/// flag, creation timestamp.
fn base_fields() -> Vec<FieldDef> {
  vec![
    FieldDef::new("id", Reference),
    FieldDef::new(FIELD_ASSIGNED_USER, Reference),
    FieldDef::new(FIELD_DELETED, Boolean),
    FieldDef::new(FIELD_CREATED_AT, Timestamp),
  ]
}

fn entity(name: &str, extra: Vec<FieldDef>) -> Result<EntitySchema> {
  let mut fields = base_fields();
  fields.extend(extra);
  EntitySchema::new(name, fields, "id", true, true)
}

fn account() -> Result<EntitySchema> {
  entity(
    "Account",
    vec![
      FieldDef::required("name", String),
      FieldDef::new("website", String),
      FieldDef::new("billingAddressCity", String),
      FieldDef::new("billingAddressCountry", String),
    ],
  )
}

fn contact() -> Result<EntitySchema> {
  entity(
    "Contact",
    vec![
      FieldDef::required("lastName", String),
      FieldDef::new("firstName", String),
      FieldDef::new("accountId", Reference),
      FieldDef::new("emailAddress", String),
      FieldDef::new("phoneNumber", String),
    ],
  )
}

fn lead() -> Result<EntitySchema> {
  entity(
    "Lead",
    vec![
      FieldDef::required("lastName", String),
      FieldDef::new("firstName", String),
      FieldDef::new("status", String),
      FieldDef::new("source", String),
      FieldDef::new("emailAddress", String),
    ],
  )
}

fn meeting() -> Result<EntitySchema> {
  entity(
    "Meeting",
    vec![
      FieldDef::required("name", String),
      FieldDef::new("status", String),
      FieldDef::new("dateStart", Timestamp),
      FieldDef::new("dateEnd", Timestamp),
      FieldDef::new("description", String),
    ],
  )
}

fn task() -> Result<EntitySchema> {
  entity(
    "Task",
    vec![
      FieldDef::required("name", String),
      FieldDef::new("status", String),
      FieldDef::new("priority", Number),
      FieldDef::new("dateEnd", Timestamp),
      FieldDef::new("description", String),
    ],
  )
}
