//! The `RecordStore` trait, the storage collaborator of the record service.
//!
//! The trait is implemented by storage backends (e.g.
//! `trellis-store-sqlite`). Higher layers depend on this abstraction, not on
//! any concrete backend. Each mutation method is a single logical
//! transaction: committed on success, fully rolled back on failure.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{collections::BTreeMap, future::Future};

use uuid::Uuid;

use crate::{
  filter::Predicate,
  plan::BoundedQuery,
  record::Record,
  schema::EntitySchema,
  value::Value,
};

/// Field changes applied by [`RecordStore::update_where`].
pub type Changes = BTreeMap<String, Value>;

/// Abstraction over a relational storage backend.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Execute a bounded, ordered query and return the matching records.
  fn select<'a>(
    &'a self,
    schema: &'a EntitySchema,
    query: &'a BoundedQuery,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Count all rows under `predicate`, ignoring any bounds.
  fn count<'a>(
    &'a self,
    schema: &'a EntitySchema,
    predicate: &'a Predicate,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Persist a fully-validated record.
  fn insert<'a>(
    &'a self,
    schema: &'a EntitySchema,
    record: &'a Record,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Apply `changes` to the single row matching `predicate` and read the
  /// updated row back, all inside one transaction. Returns `None` when no
  /// row matches.
  fn update_where<'a>(
    &'a self,
    schema: &'a EntitySchema,
    predicate: &'a Predicate,
    changes: &'a Changes,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// Physically remove the rows matching `predicate`; returns whether any
  /// row was removed. Only reached for schemas without soft delete.
  fn delete_where<'a>(
    &'a self,
    schema: &'a EntitySchema,
    predicate: &'a Predicate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Team relations ────────────────────────────────────────────────────

  /// Link a record to a team. Idempotent: linking twice is a no-op.
  fn link_team<'a>(
    &'a self,
    schema: &'a EntitySchema,
    entity_id: Uuid,
    team_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove a record-team link if present.
  fn unlink_team<'a>(
    &'a self,
    schema: &'a EntitySchema,
    entity_id: Uuid,
    team_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Add a user to a team. Idempotent.
  fn add_team_member(
    &self,
    team_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Team memberships of a user; consumed by the auth layer to build a
  /// [`crate::principal::Principal`].
  fn teams_of(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}
