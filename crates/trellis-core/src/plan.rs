//! Query planning: bounded, ordered, soft-delete-aware query descriptions.
//!
//! A plan is pure data: predicate, order, offset, limit. Execution belongs
//! to the storage backend. The planner always conjoins the soft-delete guard
//! and clamps the page size, so no caller can bypass either.

use crate::{
  error::{Error, Result},
  filter::Predicate,
  schema::{EntitySchema, FIELD_DELETED},
  value::Value,
};

// ─── Limits ──────────────────────────────────────────────────────────────────

/// Pagination limits, fixed at startup from configuration and passed in
/// explicitly, never looked up ambiently.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
  /// Page size used when the caller does not supply one.
  pub default_page_size: u64,
  /// Hard ceiling on any caller-supplied page size.
  pub max_page_size: u64,
}

impl Default for PlanLimits {
  fn default() -> Self {
    Self { default_page_size: 20, max_page_size: 200 }
  }
}

// ─── BoundedQuery ────────────────────────────────────────────────────────────

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
  pub field:     String,
  pub ascending: bool,
}

/// A side-effect-free description of an ordered, bounded query.
#[derive(Debug, Clone)]
pub struct BoundedQuery {
  pub predicate: Predicate,
  /// Never empty; the last term is always the primary key, giving a stable
  /// tie-break.
  pub order:  Vec<OrderTerm>,
  pub offset: u64,
  pub limit:  u64,
}

// ─── Planner ─────────────────────────────────────────────────────────────────

/// Conjoin the soft-delete guard (`deleted = false`) when the schema has the
/// capability.
pub fn guard(schema: &EntitySchema, predicate: Predicate) -> Predicate {
  if schema.soft_delete() {
    predicate.and(Predicate::eq(FIELD_DELETED, Value::Bool(false)))
  } else {
    predicate
  }
}

/// Combine predicate, sort key, and bounds into a [`BoundedQuery`].
///
/// `sort_by` must name a schema field; absent, the primary key ascending is
/// used. The page size defaults and is clamped per `limits`.
pub fn plan(
  schema: &EntitySchema,
  predicate: Predicate,
  sort_by: Option<&str>,
  ascending: bool,
  offset: u64,
  page_size: Option<u64>,
  limits: &PlanLimits,
) -> Result<BoundedQuery> {
  let mut order = Vec::new();
  if let Some(field) = sort_by {
    if schema.field(field).is_none() {
      return Err(Error::InvalidFilter(format!(
        "unknown sort field {field:?} on entity {:?}",
        schema.name()
      )));
    }
    order.push(OrderTerm { field: field.to_string(), ascending });
  }
  if order.iter().all(|term| term.field != schema.primary_key()) {
    order.push(OrderTerm {
      field:     schema.primary_key().to_string(),
      ascending: true,
    });
  }

  let limit = page_size
    .unwrap_or(limits.default_page_size)
    .min(limits.max_page_size);

  Ok(BoundedQuery { predicate: guard(schema, predicate), order, offset, limit })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    filter::CompareOp,
    schema::FieldDef,
    value::FieldType,
  };

  fn soft_schema() -> EntitySchema {
    EntitySchema::new(
      "Account",
      vec![
        FieldDef::new("id", FieldType::Reference),
        FieldDef::new("name", FieldType::String),
        FieldDef::new("deleted", FieldType::Boolean),
      ],
      "id",
      true,
      false,
    )
    .unwrap()
  }

  fn plain_schema() -> EntitySchema {
    EntitySchema::new(
      "Counter",
      vec![
        FieldDef::new("id", FieldType::Reference),
        FieldDef::new("value", FieldType::Number),
      ],
      "id",
      false,
      false,
    )
    .unwrap()
  }

  fn limits() -> PlanLimits {
    PlanLimits { default_page_size: 20, max_page_size: 200 }
  }

  #[test]
  fn soft_delete_guard_is_always_conjoined() {
    let q = plan(
      &soft_schema(),
      Predicate::True,
      None,
      true,
      0,
      None,
      &limits(),
    )
    .unwrap();
    assert_eq!(
      q.predicate,
      Predicate::eq(FIELD_DELETED, Value::Bool(false))
    );
  }

  #[test]
  fn no_guard_without_the_capability() {
    let q = plan(
      &plain_schema(),
      Predicate::True,
      None,
      true,
      0,
      None,
      &limits(),
    )
    .unwrap();
    assert_eq!(q.predicate, Predicate::True);
  }

  #[test]
  fn default_sort_is_primary_key_ascending() {
    let q = plan(
      &soft_schema(),
      Predicate::True,
      None,
      false,
      0,
      None,
      &limits(),
    )
    .unwrap();
    assert_eq!(
      q.order,
      vec![OrderTerm { field: "id".into(), ascending: true }]
    );
  }

  #[test]
  fn explicit_sort_gets_primary_key_tie_break() {
    let q = plan(
      &soft_schema(),
      Predicate::True,
      Some("name"),
      false,
      0,
      None,
      &limits(),
    )
    .unwrap();
    assert_eq!(
      q.order,
      vec![
        OrderTerm { field: "name".into(), ascending: false },
        OrderTerm { field: "id".into(), ascending: true },
      ]
    );
  }

  #[test]
  fn sorting_by_primary_key_does_not_duplicate_it() {
    let q = plan(
      &soft_schema(),
      Predicate::True,
      Some("id"),
      false,
      0,
      None,
      &limits(),
    )
    .unwrap();
    assert_eq!(
      q.order,
      vec![OrderTerm { field: "id".into(), ascending: false }]
    );
  }

  #[test]
  fn unknown_sort_field_is_rejected() {
    let result = plan(
      &soft_schema(),
      Predicate::True,
      Some("bogus"),
      true,
      0,
      None,
      &limits(),
    );
    assert!(matches!(result, Err(Error::InvalidFilter(_))));
  }

  #[test]
  fn page_size_defaults_and_clamps() {
    let l = PlanLimits { default_page_size: 25, max_page_size: 100 };

    let q =
      plan(&plain_schema(), Predicate::True, None, true, 0, None, &l).unwrap();
    assert_eq!(q.limit, 25);

    let q =
      plan(&plain_schema(), Predicate::True, None, true, 0, Some(10_000), &l)
        .unwrap();
    assert_eq!(q.limit, 100);

    let q =
      plan(&plain_schema(), Predicate::True, None, true, 40, Some(5), &l)
        .unwrap();
    assert_eq!(q.limit, 5);
    assert_eq!(q.offset, 40);
  }

  #[test]
  fn caller_predicate_is_preserved_under_the_guard() {
    let caller = Predicate::Compare {
      field: "name".into(),
      op:    CompareOp::Eq,
      value: Value::String("Acme".into()),
    };
    let q = plan(
      &soft_schema(),
      caller.clone(),
      None,
      true,
      0,
      None,
      &limits(),
    )
    .unwrap();
    assert_eq!(
      q.predicate,
      Predicate::And(vec![
        caller,
        Predicate::eq(FIELD_DELETED, Value::Bool(false)),
      ])
    );
  }
}
