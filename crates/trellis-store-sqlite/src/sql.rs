//! SQL generation: schema DDL, predicate compilation, ordered and bounded
//! SELECTs.
//!
//! Identifiers (table and column names) are interpolated directly; they only
//! ever come from a validated `EntitySchema`, never from raw caller input.
//! All values travel as positional parameters.

use rusqlite::types::Value as SqlValue;
use trellis_core::{
  filter::{CompareOp, Predicate},
  plan::BoundedQuery,
  schema::EntitySchema,
  store::Changes,
  value::FieldType,
};

use crate::encode;

// ─── DDL ─────────────────────────────────────────────────────────────────────

/// Relation tables shared by all entity types.
pub const LINK_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Many-to-many record <-> team visibility links.
CREATE TABLE IF NOT EXISTS entity_team (
    entity_id   TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    team_id     TEXT NOT NULL,
    UNIQUE (entity_id, entity_type, team_id)
);

-- Team memberships of principals.
CREATE TABLE IF NOT EXISTS team_user (
    team_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    UNIQUE (team_id, user_id)
);

CREATE INDEX IF NOT EXISTS entity_team_team_idx ON entity_team(team_id);
CREATE INDEX IF NOT EXISTS team_user_user_idx   ON team_user(user_id);
";

/// Entity tables are named after the lowercased entity type, mirroring the
/// relational model the schemas describe.
pub fn table_name(schema: &EntitySchema) -> String {
  schema.name().to_lowercase()
}

fn affinity(field_type: FieldType) -> &'static str {
  match field_type {
    FieldType::String | FieldType::Timestamp | FieldType::Reference => "TEXT",
    FieldType::Number => "REAL",
    FieldType::Boolean => "INTEGER",
  }
}

/// `CREATE TABLE IF NOT EXISTS` DDL for one entity schema.
pub fn create_table(schema: &EntitySchema) -> String {
  let columns: Vec<String> = schema
    .fields()
    .iter()
    .map(|def| {
      let mut column = format!("\"{}\" {}", def.name, affinity(def.field_type));
      if def.name == schema.primary_key() {
        column.push_str(" PRIMARY KEY");
      }
      column
    })
    .collect();

  format!(
    "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n);\n",
    table_name(schema),
    columns.join(",\n    ")
  )
}

// ─── Predicate compilation ───────────────────────────────────────────────────

fn op_symbol(op: CompareOp) -> &'static str {
  match op {
    CompareOp::Eq => "=",
    CompareOp::Ne => "<>",
    CompareOp::Gt => ">",
    CompareOp::Ge => ">=",
    CompareOp::Lt => "<",
    CompareOp::Le => "<=",
  }
}

/// Compile a predicate into a SQL condition, pushing its values onto
/// `params` as positional parameters.
pub fn compile_predicate(
  schema: &EntitySchema,
  predicate: &Predicate,
  params: &mut Vec<SqlValue>,
) -> String {
  match predicate {
    Predicate::True => "1".to_string(),

    Predicate::Compare { field, op, value } => {
      if value.is_null() {
        return match op {
          CompareOp::Eq => format!("\"{field}\" IS NULL"),
          CompareOp::Ne => format!("\"{field}\" IS NOT NULL"),
          _ => "0".to_string(),
        };
      }
      params.push(encode::encode_value(value));
      format!("\"{field}\" {} ?{}", op_symbol(*op), params.len())
    }

    Predicate::And(items) => combine(schema, items, " AND ", "1", params),
    Predicate::Or(items) => combine(schema, items, " OR ", "0", params),

    Predicate::SharedWithTeams(teams) => {
      if teams.is_empty() {
        return "0".to_string();
      }
      params.push(SqlValue::Text(schema.name().to_string()));
      let type_param = params.len();

      let mut placeholders = Vec::with_capacity(teams.len());
      for team in teams {
        params.push(SqlValue::Text(encode::encode_uuid(*team)));
        placeholders.push(format!("?{}", params.len()));
      }

      format!(
        "EXISTS (SELECT 1 FROM entity_team et \
         WHERE et.entity_id = \"{table}\".\"{pk}\" \
         AND et.entity_type = ?{type_param} \
         AND et.team_id IN ({placeholders}))",
        table = table_name(schema),
        pk = schema.primary_key(),
        placeholders = placeholders.join(", "),
      )
    }
  }
}

fn combine(
  schema: &EntitySchema,
  items: &[Predicate],
  joiner: &str,
  empty: &str,
  params: &mut Vec<SqlValue>,
) -> String {
  if items.is_empty() {
    return empty.to_string();
  }
  let parts: Vec<String> = items
    .iter()
    .map(|item| compile_predicate(schema, item, params))
    .collect();
  format!("({})", parts.join(joiner))
}

// ─── Statements ──────────────────────────────────────────────────────────────

fn column_list(schema: &EntitySchema) -> String {
  schema
    .fields()
    .iter()
    .map(|def| format!("\"{}\"", def.name))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Full SELECT for a bounded, ordered query.
pub fn select(
  schema: &EntitySchema,
  query: &BoundedQuery,
  params: &mut Vec<SqlValue>,
) -> String {
  let condition = compile_predicate(schema, &query.predicate, params);

  let order = query
    .order
    .iter()
    .map(|term| {
      format!(
        "\"{}\" {}",
        term.field,
        if term.ascending { "ASC" } else { "DESC" }
      )
    })
    .collect::<Vec<_>>()
    .join(", ");

  params.push(SqlValue::Integer(query.limit as i64));
  let limit_param = params.len();
  params.push(SqlValue::Integer(query.offset as i64));
  let offset_param = params.len();

  format!(
    "SELECT {columns} FROM \"{table}\" WHERE {condition} \
     ORDER BY {order} LIMIT ?{limit_param} OFFSET ?{offset_param}",
    columns = column_list(schema),
    table = table_name(schema),
  )
}

pub fn count(
  schema: &EntitySchema,
  predicate: &Predicate,
  params: &mut Vec<SqlValue>,
) -> String {
  let condition = compile_predicate(schema, predicate, params);
  format!(
    "SELECT COUNT(*) FROM \"{}\" WHERE {condition}",
    table_name(schema)
  )
}

/// INSERT with one placeholder per schema field, in field order.
pub fn insert(schema: &EntitySchema) -> String {
  let placeholders = (1..=schema.fields().len())
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  format!(
    "INSERT INTO \"{}\" ({}) VALUES ({placeholders})",
    table_name(schema),
    column_list(schema),
  )
}

/// SELECT just the primary key of the first row matching `predicate`.
pub fn select_primary_key(
  schema: &EntitySchema,
  predicate: &Predicate,
  params: &mut Vec<SqlValue>,
) -> String {
  let condition = compile_predicate(schema, predicate, params);
  format!(
    "SELECT \"{}\" FROM \"{}\" WHERE {condition} LIMIT 1",
    schema.primary_key(),
    table_name(schema),
  )
}

/// UPDATE by primary key. The key is the last positional parameter, pushed
/// by the caller after the change values.
pub fn update_by_primary_key(
  schema: &EntitySchema,
  changes: &Changes,
  params: &mut Vec<SqlValue>,
) -> String {
  let mut sets = Vec::with_capacity(changes.len());
  for (name, value) in changes {
    params.push(encode::encode_value(value));
    sets.push(format!("\"{name}\" = ?{}", params.len()));
  }
  format!(
    "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{}",
    table_name(schema),
    sets.join(", "),
    schema.primary_key(),
    params.len() + 1,
  )
}

/// SELECT one full row by primary key (`?1`).
pub fn select_by_primary_key(schema: &EntitySchema) -> String {
  format!(
    "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1",
    column_list(schema),
    table_name(schema),
    schema.primary_key(),
  )
}

pub fn delete(
  schema: &EntitySchema,
  predicate: &Predicate,
  params: &mut Vec<SqlValue>,
) -> String {
  let condition = compile_predicate(schema, predicate, params);
  format!("DELETE FROM \"{}\" WHERE {condition}", table_name(schema))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
