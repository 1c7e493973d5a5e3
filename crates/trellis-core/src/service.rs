//! The record service: the public façade over registry, predicate builder,
//! planner, visibility filter, and storage.
//!
//! Every operation resolves the entity name first, so an unregistered name
//! fails before any other validation or storage access. Visibility is
//! applied exactly once per operation, here.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
  acl,
  error::{Error, Result},
  filter::{self, Predicate},
  plan::{self, PlanLimits},
  principal::Principal,
  record::Record,
  schema::{
    EntitySchema, Registry, FIELD_ASSIGNED_USER, FIELD_CREATED_AT,
    FIELD_DELETED,
  },
  store::{Changes, RecordStore},
  value::{FieldType, Value},
};

// ─── Parameters & results ────────────────────────────────────────────────────

/// Caller-supplied parameters of a list operation.
#[derive(Debug, Clone)]
pub struct ListParams {
  /// Filter expression; see [`crate::filter::parse`] for the grammar.
  pub filter:    Option<String>,
  pub sort_by:   Option<String>,
  pub ascending: bool,
  pub offset:    u64,
  /// Requested page size; defaulted and clamped by the planner.
  pub page_size: Option<u64>,
}

impl Default for ListParams {
  fn default() -> Self {
    Self {
      filter:    None,
      sort_by:   None,
      ascending: true,
      offset:    0,
      page_size: None,
    }
  }
}

/// A page of records plus the total match count ignoring pagination.
#[derive(Debug)]
pub struct ListResult {
  pub records: Vec<Record>,
  pub total:   u64,
}

/// JSON object supplied as a create or update payload.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ─── Service ─────────────────────────────────────────────────────────────────

/// Generic CRUD over every registered entity type.
pub struct RecordService<S> {
  store:    Arc<S>,
  registry: Arc<Registry>,
  limits:   PlanLimits,
}

// Manual impl: `Arc<S>` clones regardless of whether `S` does.
impl<S> Clone for RecordService<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      registry: Arc::clone(&self.registry),
      limits:   self.limits,
    }
  }
}

impl<S> RecordService<S>
where
  S: RecordStore,
{
  pub fn new(store: Arc<S>, registry: Arc<Registry>, limits: PlanLimits) -> Self {
    Self { store, registry, limits }
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  // ── list ──────────────────────────────────────────────────────────────

  /// Filtered, sorted, paginated listing with the unpaginated total.
  pub async fn list(
    &self,
    principal: &Principal,
    entity: &str,
    params: &ListParams,
  ) -> Result<ListResult> {
    let schema = self.registry.resolve(entity)?;

    let parsed = match params.filter.as_deref() {
      Some(expression) => filter::parse(schema, expression)?,
      None => Predicate::True,
    };
    let restricted = acl::restrict(principal, schema, parsed);

    let query = plan::plan(
      schema,
      restricted,
      params.sort_by.as_deref(),
      params.ascending,
      params.offset,
      params.page_size,
      &self.limits,
    )?;

    let records = self
      .store
      .select(schema, &query)
      .await
      .map_err(Error::storage)?;
    // Same predicate as the page, bounds dropped.
    let total = self
      .store
      .count(schema, &query.predicate)
      .await
      .map_err(Error::storage)?;

    Ok(ListResult { records, total })
  }

  // ── create ────────────────────────────────────────────────────────────

  /// Validate `payload` against the schema and persist a new record with a
  /// fresh primary key, owned by the principal unless permissibly
  /// overridden.
  pub async fn create(
    &self,
    principal: &Principal,
    entity: &str,
    payload: &Payload,
  ) -> Result<Record> {
    let schema = self.registry.resolve(entity)?;
    let mut supplied = coerce_payload(schema, payload)?;

    for def in schema.fields() {
      if def.required && supplied.get(&def.name).is_none_or(Value::is_null) {
        return Err(Error::Validation(format!(
          "missing required field {:?}",
          def.name
        )));
      }
    }

    if schema.team_visibility() {
      check_owner_override(principal, supplied.get(FIELD_ASSIGNED_USER))?;
    }

    let mut record = Record::new();
    for def in schema.fields() {
      let value = supplied.remove(&def.name).unwrap_or(Value::Null);
      record.set(def.name.clone(), value);
    }

    record.set(schema.primary_key(), Value::Reference(Uuid::new_v4()));
    if schema.soft_delete() {
      record.set(FIELD_DELETED, Value::Bool(false));
    }
    if schema.team_visibility()
      && record.get(FIELD_ASSIGNED_USER).is_none_or(Value::is_null)
    {
      record.set(FIELD_ASSIGNED_USER, Value::Reference(principal.id));
    }
    if let Some(def) = schema.field(FIELD_CREATED_AT)
      && def.field_type == FieldType::Timestamp
      && record.get(FIELD_CREATED_AT).is_none_or(Value::is_null)
    {
      record.set(FIELD_CREATED_AT, Value::Timestamp(Utc::now()));
    }

    self
      .store
      .insert(schema, &record)
      .await
      .map_err(Error::storage)?;
    Ok(record)
  }

  // ── read ──────────────────────────────────────────────────────────────

  /// Visibility-gated single-record fetch. Absent, soft-deleted, and
  /// forbidden rows are all the same `NotFound`.
  pub async fn read(
    &self,
    principal: &Principal,
    entity: &str,
    id: Uuid,
  ) -> Result<Record> {
    let schema = self.registry.resolve(entity)?;

    let query = plan::plan(
      schema,
      self.gate(principal, schema, id),
      None,
      true,
      0,
      Some(1),
      &self.limits,
    )?;
    let mut records = self
      .store
      .select(schema, &query)
      .await
      .map_err(Error::storage)?;

    records.pop().ok_or(Error::NotFound)
  }

  // ── update ────────────────────────────────────────────────────────────

  /// Partial update: only the supplied fields change, re-validated against
  /// the schema. The visibility gate is the UPDATE's own row predicate, so
  /// there is no read-then-write window.
  pub async fn update(
    &self,
    principal: &Principal,
    entity: &str,
    id: Uuid,
    payload: &Payload,
  ) -> Result<Record> {
    let schema = self.registry.resolve(entity)?;

    let changes = coerce_payload(schema, payload)?;
    if changes.is_empty() {
      return Err(Error::Validation("no fields to update".into()));
    }
    for def in schema.fields() {
      if def.required && changes.get(&def.name).is_some_and(Value::is_null) {
        return Err(Error::Validation(format!(
          "required field {:?} may not be null",
          def.name
        )));
      }
    }
    if schema.team_visibility()
      && let Some(value) = changes.get(FIELD_ASSIGNED_USER)
    {
      check_owner_override(principal, Some(value))?;
    }

    let gated = plan::guard(schema, self.gate(principal, schema, id));
    self
      .store
      .update_where(schema, &gated, &changes)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::NotFound)
  }

  // ── delete ────────────────────────────────────────────────────────────

  /// Soft delete (`deleted = true`) under the visibility gate. A second
  /// delete of the same id is `NotFound` because the gate excludes deleted
  /// rows. Schemas without the capability fall back to a physical delete.
  pub async fn delete(
    &self,
    principal: &Principal,
    entity: &str,
    id: Uuid,
  ) -> Result<()> {
    let schema = self.registry.resolve(entity)?;
    let gated = plan::guard(schema, self.gate(principal, schema, id));

    if schema.soft_delete() {
      let mut changes = Changes::new();
      changes.insert(FIELD_DELETED.to_string(), Value::Bool(true));
      self
        .store
        .update_where(schema, &gated, &changes)
        .await
        .map_err(Error::storage)?
        .map(|_| ())
        .ok_or(Error::NotFound)
    } else {
      let removed = self
        .store
        .delete_where(schema, &gated)
        .await
        .map_err(Error::storage)?;
      if removed { Ok(()) } else { Err(Error::NotFound) }
    }
  }

  /// The visibility-gated id predicate shared by read/update/delete.
  fn gate(
    &self,
    principal: &Principal,
    schema: &EntitySchema,
    id: Uuid,
  ) -> Predicate {
    let by_id = Predicate::eq(schema.primary_key(), Value::Reference(id));
    acl::restrict(principal, schema, by_id)
  }
}

// ─── Payload validation ──────────────────────────────────────────────────────

/// Coerce a JSON payload into typed changes, rejecting unknown fields and
/// values of the wrong shape. The primary key and the soft-delete flag are
/// never writable through a payload.
fn coerce_payload(schema: &EntitySchema, payload: &Payload) -> Result<Changes> {
  let mut changes = Changes::new();
  for (name, json) in payload {
    let def = schema.field(name).ok_or_else(|| {
      Error::Validation(format!(
        "unknown field {name:?} on entity {:?}",
        schema.name()
      ))
    })?;
    if name == schema.primary_key() || name == FIELD_DELETED {
      return Err(Error::Validation(format!("field {name:?} is not writable")));
    }
    let value = Value::from_json(def.field_type, json)
      .map_err(|reason| Error::Validation(format!("field {name:?}: {reason}")))?;
    changes.insert(name.clone(), value);
  }
  Ok(changes)
}

/// Ownership assignment rule: a non-admin may only assign a record to
/// themselves; admins may assign anyone (or clear the owner).
fn check_owner_override(
  principal: &Principal,
  assigned: Option<&Value>,
) -> Result<()> {
  match assigned {
    None | Some(Value::Null) if principal.is_admin => Ok(()),
    None => Ok(()),
    Some(Value::Null) => Err(Error::Validation(
      "only administrators may clear the assigned user".into(),
    )),
    Some(Value::Reference(other)) => {
      if *other == principal.id || principal.is_admin {
        Ok(())
      } else {
        Err(Error::Validation(
          "only administrators may assign a record to another user".into(),
        ))
      }
    }
    // Coercion guarantees a reference or null here.
    Some(_) => Err(Error::Validation("invalid assigned user".into())),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{catalog, plan::BoundedQuery};

  /// A store whose every method panics: proves the service fails before
  /// touching storage.
  struct UnreachableStore;

  impl RecordStore for UnreachableStore {
    type Error = std::convert::Infallible;

    async fn select(
      &self,
      _: &EntitySchema,
      _: &BoundedQuery,
    ) -> Result<Vec<Record>, Self::Error> {
      unreachable!("storage touched")
    }
    async fn count(
      &self,
      _: &EntitySchema,
      _: &Predicate,
    ) -> Result<u64, Self::Error> {
      unreachable!("storage touched")
    }
    async fn insert(
      &self,
      _: &EntitySchema,
      _: &Record,
    ) -> Result<(), Self::Error> {
      unreachable!("storage touched")
    }
    async fn update_where(
      &self,
      _: &EntitySchema,
      _: &Predicate,
      _: &Changes,
    ) -> Result<Option<Record>, Self::Error> {
      unreachable!("storage touched")
    }
    async fn delete_where(
      &self,
      _: &EntitySchema,
      _: &Predicate,
    ) -> Result<bool, Self::Error> {
      unreachable!("storage touched")
    }
    async fn link_team(
      &self,
      _: &EntitySchema,
      _: Uuid,
      _: Uuid,
    ) -> Result<(), Self::Error> {
      unreachable!("storage touched")
    }
    async fn unlink_team(
      &self,
      _: &EntitySchema,
      _: Uuid,
      _: Uuid,
    ) -> Result<(), Self::Error> {
      unreachable!("storage touched")
    }
    async fn add_team_member(&self, _: Uuid, _: Uuid) -> Result<(), Self::Error> {
      unreachable!("storage touched")
    }
    async fn teams_of(&self, _: Uuid) -> Result<Vec<Uuid>, Self::Error> {
      unreachable!("storage touched")
    }
  }

  fn service() -> RecordService<UnreachableStore> {
    let registry = Registry::new(catalog::standard().unwrap()).unwrap();
    RecordService::new(
      Arc::new(UnreachableStore),
      Arc::new(registry),
      PlanLimits::default(),
    )
  }

  fn payload(json: serde_json::Value) -> Payload {
    json.as_object().cloned().unwrap()
  }

  #[tokio::test]
  async fn unknown_entity_fails_before_storage_on_every_operation() {
    let svc = service();
    let admin = Principal::admin(Uuid::new_v4());
    let id = Uuid::new_v4();

    let err = svc.list(&admin, "Bogus", &ListParams::default()).await;
    assert!(matches!(err, Err(Error::UnknownEntity(_))));

    let err = svc
      .create(&admin, "Bogus", &payload(serde_json::json!({"name": "x"})))
      .await;
    assert!(matches!(err, Err(Error::UnknownEntity(_))));

    let err = svc.read(&admin, "Bogus", id).await;
    assert!(matches!(err, Err(Error::UnknownEntity(_))));

    let err = svc
      .update(&admin, "Bogus", id, &payload(serde_json::json!({"name": "x"})))
      .await;
    assert!(matches!(err, Err(Error::UnknownEntity(_))));

    let err = svc.delete(&admin, "Bogus", id).await;
    assert!(matches!(err, Err(Error::UnknownEntity(_))));
  }

  #[tokio::test]
  async fn invalid_payload_fails_before_storage() {
    let svc = service();
    let admin = Principal::admin(Uuid::new_v4());

    // Unknown field.
    let err = svc
      .create(&admin, "Account", &payload(serde_json::json!({"bogus": 1})))
      .await;
    assert!(matches!(err, Err(Error::Validation(_))));

    // Wrong type for a declared field.
    let err = svc
      .create(&admin, "Account", &payload(serde_json::json!({"name": 42})))
      .await;
    assert!(matches!(err, Err(Error::Validation(_))));

    // Missing required field.
    let err = svc
      .create(
        &admin,
        "Account",
        &payload(serde_json::json!({"website": "https://acme.test"})),
      )
      .await;
    assert!(matches!(err, Err(Error::Validation(_))));

    // The soft-delete flag is not writable.
    let err = svc
      .update(
        &admin,
        "Account",
        Uuid::new_v4(),
        &payload(serde_json::json!({"deleted": false})),
      )
      .await;
    assert!(matches!(err, Err(Error::Validation(_))));
  }

  #[tokio::test]
  async fn invalid_filter_fails_before_storage() {
    let svc = service();
    let admin = Principal::admin(Uuid::new_v4());

    let params = ListParams {
      filter: Some("bogusField=1".into()),
      ..ListParams::default()
    };
    let err = svc.list(&admin, "Account", &params).await;
    assert!(matches!(err, Err(Error::InvalidFilter(_))));
  }

  #[test]
  fn owner_override_rules() {
    let user = Principal::user(Uuid::new_v4(), []);
    let admin = Principal::admin(Uuid::new_v4());
    let other = Uuid::new_v4();

    assert!(check_owner_override(&user, None).is_ok());
    assert!(
      check_owner_override(&user, Some(&Value::Reference(user.id))).is_ok()
    );
    assert!(
      check_owner_override(&user, Some(&Value::Reference(other))).is_err()
    );
    assert!(check_owner_override(&user, Some(&Value::Null)).is_err());

    assert!(
      check_owner_override(&admin, Some(&Value::Reference(other))).is_ok()
    );
    assert!(check_owner_override(&admin, Some(&Value::Null)).is_ok());
  }
}
