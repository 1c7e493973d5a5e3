//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use rusqlite::{types::Value as SqlValue, OptionalExtension as _};
use trellis_core::{
  filter::Predicate,
  plan::BoundedQuery,
  record::Record,
  schema::{EntitySchema, Registry},
  store::{Changes, RecordStore},
};
use uuid::Uuid;

use crate::{encode, sql, Error, Result};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Trellis record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and create a table for every schema
  /// in `registry`, plus the shared relation tables.
  pub async fn open(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema(registry).await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory(registry: &Registry) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema(registry).await?;
    Ok(store)
  }

  async fn init_schema(&self, registry: &Registry) -> Result<()> {
    let mut ddl = String::from(sql::LINK_SCHEMA);
    for schema in registry.schemas() {
      ddl.push_str(&sql::create_table(schema));
    }
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Decode one raw row (columns in schema field order) into a [`Record`].
  fn decode_row(schema: &EntitySchema, raw: Vec<SqlValue>) -> Result<Record> {
    let mut record = Record::new();
    for (def, value) in schema.fields().iter().zip(raw) {
      record.set(def.name.clone(), encode::decode_value(def.field_type, value)?);
    }
    Ok(record)
  }
}

fn row_values(
  row: &rusqlite::Row<'_>,
  width: usize,
) -> rusqlite::Result<Vec<SqlValue>> {
  (0..width).map(|i| row.get::<_, SqlValue>(i)).collect()
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn select(
    &self,
    schema: &EntitySchema,
    query: &BoundedQuery,
  ) -> Result<Vec<Record>> {
    let mut params: Vec<SqlValue> = Vec::new();
    let statement = sql::select(schema, query, &mut params);
    let width = schema.fields().len();

    let raws: Vec<Vec<SqlValue>> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&statement)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            row_values(row, width)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| Self::decode_row(schema, raw))
      .collect()
  }

  async fn count(
    &self,
    schema: &EntitySchema,
    predicate: &Predicate,
  ) -> Result<u64> {
    let mut params: Vec<SqlValue> = Vec::new();
    let statement = sql::count(schema, predicate, &mut params);

    let total: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &statement,
          rusqlite::params_from_iter(params),
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(total as u64)
  }

  async fn insert(&self, schema: &EntitySchema, record: &Record) -> Result<()> {
    let statement = sql::insert(schema);
    let params: Vec<SqlValue> = schema
      .fields()
      .iter()
      .map(|def| {
        record
          .get(&def.name)
          .map(encode::encode_value)
          .unwrap_or(SqlValue::Null)
      })
      .collect();

    self
      .conn
      .call(move |conn| {
        conn.execute(&statement, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_where(
    &self,
    schema: &EntitySchema,
    predicate: &Predicate,
    changes: &Changes,
  ) -> Result<Option<Record>> {
    // Find the matching row's key, update it, and read it back, all in one
    // transaction, so the predicate cannot go stale in between.
    let mut find_params: Vec<SqlValue> = Vec::new();
    let find = sql::select_primary_key(schema, predicate, &mut find_params);

    let mut update_params: Vec<SqlValue> = Vec::new();
    let update = sql::update_by_primary_key(schema, changes, &mut update_params);

    let read = sql::select_by_primary_key(schema);
    let width = schema.fields().len();

    let raw: Option<Vec<SqlValue>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let key: Option<String> = tx
          .query_row(&find, rusqlite::params_from_iter(find_params), |row| {
            row.get(0)
          })
          .optional()?;
        let Some(key) = key else {
          return Ok(None);
        };

        update_params.push(SqlValue::Text(key.clone()));
        tx.execute(&update, rusqlite::params_from_iter(update_params))?;

        let raw = tx.query_row(&read, rusqlite::params![key], |row| {
          row_values(row, width)
        })?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(|raw| Self::decode_row(schema, raw)).transpose()
  }

  async fn delete_where(
    &self,
    schema: &EntitySchema,
    predicate: &Predicate,
  ) -> Result<bool> {
    let mut params: Vec<SqlValue> = Vec::new();
    let statement = sql::delete(schema, predicate, &mut params);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&statement, rusqlite::params_from_iter(params))?)
      })
      .await?;

    Ok(affected > 0)
  }

  // ── Team relations ────────────────────────────────────────────────────

  async fn link_team(
    &self,
    schema: &EntitySchema,
    entity_id: Uuid,
    team_id: Uuid,
  ) -> Result<()> {
    let entity_type = schema.name().to_string();
    let entity_id = encode::encode_uuid(entity_id);
    let team_id = encode::encode_uuid(team_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO entity_team (entity_id, entity_type, team_id)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![entity_id, entity_type, team_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn unlink_team(
    &self,
    schema: &EntitySchema,
    entity_id: Uuid,
    team_id: Uuid,
  ) -> Result<()> {
    let entity_type = schema.name().to_string();
    let entity_id = encode::encode_uuid(entity_id);
    let team_id = encode::encode_uuid(team_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM entity_team
           WHERE entity_id = ?1 AND entity_type = ?2 AND team_id = ?3",
          rusqlite::params![entity_id, entity_type, team_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn add_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<()> {
    let team_id = encode::encode_uuid(team_id);
    let user_id = encode::encode_uuid(user_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO team_user (team_id, user_id) VALUES (?1, ?2)",
          rusqlite::params![team_id, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn teams_of(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
    let user_id = encode::encode_uuid(user_id);

    let raw: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT team_id FROM team_user WHERE user_id = ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raw
      .into_iter()
      .map(|s| Uuid::parse_str(&s).map_err(Error::Uuid))
      .collect()
  }
}
