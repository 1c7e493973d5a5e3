//! Filter expressions and the abstract predicate tree.
//!
//! The predicate tree is storage-agnostic: the builder validates field names
//! and literal types against a schema and never touches storage. Backends
//! compile the tree into their own query form.

use uuid::Uuid;

use crate::{
  error::{Error, Result},
  schema::EntitySchema,
  value::{FieldType, Value},
};

// ─── Predicate ───────────────────────────────────────────────────────────────

/// Comparison operator of a single filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
  Eq,
  Ne,
  Gt,
  Ge,
  Lt,
  Le,
}

impl CompareOp {
  /// Ordering comparisons are meaningless on booleans and are rejected by
  /// the parser.
  pub fn is_ordering(self) -> bool {
    !matches!(self, CompareOp::Eq | CompareOp::Ne)
  }
}

/// An abstract boolean condition over a record's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  /// Matches every row.
  True,
  Compare {
    field: String,
    op:    CompareOp,
    value: Value,
  },
  And(Vec<Predicate>),
  Or(Vec<Predicate>),
  /// Row is linked, via the entity-team relation, to at least one of these
  /// teams. Compiled by the storage backend into a membership subquery.
  SharedWithTeams(Vec<Uuid>),
}

impl Predicate {
  pub fn eq(field: impl Into<String>, value: Value) -> Self {
    Predicate::Compare { field: field.into(), op: CompareOp::Eq, value }
  }

  /// Conjoin two predicates. `True` is the identity; nested `And`s are
  /// flattened.
  pub fn and(self, other: Predicate) -> Predicate {
    match (self, other) {
      (Predicate::True, p) | (p, Predicate::True) => p,
      (Predicate::And(mut left), Predicate::And(right)) => {
        left.extend(right);
        Predicate::And(left)
      }
      (Predicate::And(mut left), p) => {
        left.push(p);
        Predicate::And(left)
      }
      (p, Predicate::And(mut right)) => {
        right.insert(0, p);
        Predicate::And(right)
      }
      (p, q) => Predicate::And(vec![p, q]),
    }
  }
}

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Parse a filter expression against `schema` into a [`Predicate`].
///
/// Grammar: comma-separated clauses `field OP value` with OP one of
/// `=  !=  >=  <=  >  <`, all conjoined with logical AND. Values are coerced
/// to the field's declared type. An empty expression is the always-true
/// predicate. Referencing an unknown field is an error, never a silent
/// no-op.
pub fn parse(schema: &EntitySchema, expression: &str) -> Result<Predicate> {
  let expression = expression.trim();
  if expression.is_empty() {
    return Ok(Predicate::True);
  }

  let mut clauses = Vec::new();
  for raw in expression.split(',') {
    clauses.push(parse_clause(schema, raw.trim())?);
  }

  Ok(if clauses.len() == 1 {
    clauses.remove(0)
  } else {
    Predicate::And(clauses)
  })
}

fn parse_clause(schema: &EntitySchema, raw: &str) -> Result<Predicate> {
  let (field_raw, op, value_raw) = split_operator(raw).ok_or_else(|| {
    Error::InvalidFilter(format!("malformed clause: {raw:?}"))
  })?;

  let field = field_raw.trim();
  let def = schema.field(field).ok_or_else(|| {
    Error::InvalidFilter(format!(
      "unknown field {field:?} on entity {:?}",
      schema.name()
    ))
  })?;

  if op.is_ordering() && def.field_type == FieldType::Boolean {
    return Err(Error::InvalidFilter(format!(
      "field {field:?} does not support ordering comparisons"
    )));
  }

  let value = Value::parse_literal(def.field_type, value_raw.trim())
    .map_err(|reason| {
      Error::InvalidFilter(format!("field {field:?}: {reason}"))
    })?;

  Ok(Predicate::Compare { field: field.to_string(), op, value })
}

/// Split a clause at its operator. Two-character operators are tried first
/// so `>=` is never read as `>` followed by a stray `=`.
fn split_operator(raw: &str) -> Option<(&str, CompareOp, &str)> {
  const OPS: [(&str, CompareOp); 6] = [
    ("!=", CompareOp::Ne),
    (">=", CompareOp::Ge),
    ("<=", CompareOp::Le),
    ("=", CompareOp::Eq),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
  ];
  for (symbol, op) in OPS {
    if let Some(idx) = raw.find(symbol) {
      let field = &raw[..idx];
      let value = &raw[idx + symbol.len()..];
      if field.trim().is_empty() {
        return None;
      }
      return Some((field, op, value));
    }
  }
  None
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::FieldDef;

  fn schema() -> EntitySchema {
    EntitySchema::new(
      "Account",
      vec![
        FieldDef::new("id", FieldType::Reference),
        FieldDef::required("name", FieldType::String),
        FieldDef::new("balance", FieldType::Number),
        FieldDef::new("active", FieldType::Boolean),
        FieldDef::new("createdAt", FieldType::Timestamp),
        FieldDef::new("assignedUser", FieldType::Reference),
        FieldDef::new("deleted", FieldType::Boolean),
      ],
      "id",
      true,
      true,
    )
    .unwrap()
  }

  #[test]
  fn empty_expression_is_always_true() {
    assert_eq!(parse(&schema(), "").unwrap(), Predicate::True);
    assert_eq!(parse(&schema(), "   ").unwrap(), Predicate::True);
  }

  #[test]
  fn single_equality_clause() {
    let p = parse(&schema(), "name=Acme").unwrap();
    assert_eq!(p, Predicate::eq("name", Value::String("Acme".into())));
  }

  #[test]
  fn clauses_conjoin_with_and() {
    let p = parse(&schema(), "name=Acme, balance>=100").unwrap();
    assert_eq!(
      p,
      Predicate::And(vec![
        Predicate::eq("name", Value::String("Acme".into())),
        Predicate::Compare {
          field: "balance".into(),
          op:    CompareOp::Ge,
          value: Value::Number(100.0),
        },
      ])
    );
  }

  #[test]
  fn unknown_field_is_invalid_filter() {
    assert!(matches!(
      parse(&schema(), "bogusField=1"),
      Err(Error::InvalidFilter(_))
    ));
  }

  #[test]
  fn malformed_clause_is_invalid_filter() {
    assert!(matches!(
      parse(&schema(), "name Acme"),
      Err(Error::InvalidFilter(_))
    ));
    assert!(matches!(parse(&schema(), "=Acme"), Err(Error::InvalidFilter(_))));
  }

  #[test]
  fn bad_literal_is_invalid_filter() {
    assert!(matches!(
      parse(&schema(), "balance=abc"),
      Err(Error::InvalidFilter(_))
    ));
    assert!(matches!(
      parse(&schema(), "createdAt=yesterday"),
      Err(Error::InvalidFilter(_))
    ));
  }

  #[test]
  fn ordering_on_boolean_is_rejected() {
    assert!(matches!(
      parse(&schema(), "active>=true"),
      Err(Error::InvalidFilter(_))
    ));
    assert!(parse(&schema(), "active=true").is_ok());
  }

  #[test]
  fn not_equal_is_not_read_as_equality() {
    let p = parse(&schema(), "name!=Acme").unwrap();
    assert_eq!(
      p,
      Predicate::Compare {
        field: "name".into(),
        op:    CompareOp::Ne,
        value: Value::String("Acme".into()),
      }
    );
  }

  #[test]
  fn and_flattens_and_keeps_true_as_identity() {
    let a = Predicate::eq("name", Value::String("a".into()));
    let b = Predicate::eq("name", Value::String("b".into()));
    let c = Predicate::eq("name", Value::String("c".into()));

    assert_eq!(Predicate::True.and(a.clone()), a.clone());
    assert_eq!(a.clone().and(Predicate::True), a.clone());

    let nested = a.clone().and(b.clone()).and(c.clone());
    assert_eq!(nested, Predicate::And(vec![a, b, c]));
  }
}
