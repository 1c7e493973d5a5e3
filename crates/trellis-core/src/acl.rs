//! Row-level visibility restriction.
//!
//! A single chokepoint: the record service calls [`restrict`] exactly once
//! per operation, so no operation can forget the visibility rule and none
//! can apply it twice.

use uuid::Uuid;

use crate::{
  filter::Predicate,
  principal::Principal,
  schema::{EntitySchema, FIELD_ASSIGNED_USER},
  value::Value,
};

/// Narrow `predicate` to rows `principal` may see.
///
/// Administrators and schemas without the team-visibility capability pass
/// through unchanged. Otherwise the caller's predicate is conjoined with
/// "owned by the principal, or linked to at least one of the principal's
/// teams".
pub fn restrict(
  principal: &Principal,
  schema: &EntitySchema,
  predicate: Predicate,
) -> Predicate {
  if principal.is_admin || !schema.team_visibility() {
    return predicate;
  }

  let owned = Predicate::eq(FIELD_ASSIGNED_USER, Value::Reference(principal.id));

  // Sorted for deterministic backend output; `teams` is a HashSet.
  let mut teams: Vec<Uuid> = principal.teams.iter().copied().collect();
  teams.sort();

  let visible = if teams.is_empty() {
    owned
  } else {
    Predicate::Or(vec![owned, Predicate::SharedWithTeams(teams)])
  };

  predicate.and(visible)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    schema::{FieldDef, FIELD_DELETED},
    value::FieldType,
  };

  fn visible_schema() -> EntitySchema {
    EntitySchema::new(
      "Account",
      vec![
        FieldDef::new("id", FieldType::Reference),
        FieldDef::new("name", FieldType::String),
        FieldDef::new(FIELD_ASSIGNED_USER, FieldType::Reference),
        FieldDef::new(FIELD_DELETED, FieldType::Boolean),
      ],
      "id",
      true,
      true,
    )
    .unwrap()
  }

  fn open_schema() -> EntitySchema {
    EntitySchema::new(
      "Stream",
      vec![
        FieldDef::new("id", FieldType::Reference),
        FieldDef::new("post", FieldType::String),
      ],
      "id",
      false,
      false,
    )
    .unwrap()
  }

  #[test]
  fn admin_passes_through_unchanged() {
    let admin = Principal::admin(Uuid::new_v4());
    let p = Predicate::eq("name", Value::String("Acme".into()));
    assert_eq!(restrict(&admin, &visible_schema(), p.clone()), p);
  }

  #[test]
  fn schema_without_capability_passes_through_unchanged() {
    let user = Principal::user(Uuid::new_v4(), []);
    let p = Predicate::True;
    assert_eq!(restrict(&user, &open_schema(), p.clone()), p);
  }

  #[test]
  fn teamless_user_is_restricted_to_owned_rows() {
    let user = Principal::user(Uuid::new_v4(), []);
    let restricted = restrict(&user, &visible_schema(), Predicate::True);
    assert_eq!(
      restricted,
      Predicate::eq(FIELD_ASSIGNED_USER, Value::Reference(user.id))
    );
  }

  #[test]
  fn user_with_teams_gets_ownership_or_membership() {
    let team_a = Uuid::new_v4();
    let team_b = Uuid::new_v4();
    let user = Principal::user(Uuid::new_v4(), [team_a, team_b]);

    let restricted = restrict(&user, &visible_schema(), Predicate::True);

    let mut expected_teams = vec![team_a, team_b];
    expected_teams.sort();
    assert_eq!(
      restricted,
      Predicate::Or(vec![
        Predicate::eq(FIELD_ASSIGNED_USER, Value::Reference(user.id)),
        Predicate::SharedWithTeams(expected_teams),
      ])
    );
  }

  #[test]
  fn caller_predicate_is_conjoined_not_replaced() {
    let user = Principal::user(Uuid::new_v4(), []);
    let caller = Predicate::eq("name", Value::String("Acme".into()));
    let restricted = restrict(&user, &visible_schema(), caller.clone());
    assert_eq!(
      restricted,
      Predicate::And(vec![
        caller,
        Predicate::eq(FIELD_ASSIGNED_USER, Value::Reference(user.id)),
      ])
    );
  }
}
