//! Handlers for the generic record endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{entity}` | `?where=`, `?sortBy=`, `?asc=`, `?offset=`, `?maxSize=` |
//! | `POST`   | `/{entity}` | Body: JSON object of field values |
//! | `GET`    | `/{entity}/{id}` | 404 if absent or not visible |
//! | `PUT`    | `/{entity}/{id}` | Partial update despite the verb |
//! | `PATCH`  | `/{entity}/{id}` | Same as PUT |
//! | `DELETE` | `/{entity}/{id}` | Soft delete; body `true` on success |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use trellis_core::{
  service::{ListParams, Payload, RecordService},
  store::RecordStore,
};
use uuid::Uuid;

use crate::{error::ApiError, identity::Identity};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
  /// Filter expression, e.g. `status=New,priority>=2`.
  #[serde(rename = "where")]
  pub filter:   Option<String>,
  pub sort_by:  Option<String>,
  pub asc:      Option<bool>,
  pub offset:   Option<u64>,
  pub max_size: Option<u64>,
}

/// `GET /{entity}`
pub async fn list<S>(
  State(service): State<RecordService<S>>,
  Identity(principal): Identity,
  Path(entity): Path<String>,
  Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RecordStore,
{
  let params = ListParams {
    filter:    query.filter,
    sort_by:   query.sort_by,
    ascending: query.asc.unwrap_or(true),
    offset:    query.offset.unwrap_or(0),
    page_size: query.max_size,
  };
  let result = service.list(&principal, &entity, &params).await?;

  let list: Vec<serde_json::Value> =
    result.records.iter().map(|r| r.to_json()).collect();
  Ok(Json(json!({ "list": list, "total": result.total })))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /{entity}`
pub async fn create<S>(
  State(service): State<RecordService<S>>,
  Identity(principal): Identity,
  Path(entity): Path<String>,
  Json(payload): Json<Payload>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
{
  let record = service.create(&principal, &entity, &payload).await?;
  Ok((StatusCode::CREATED, Json(record.to_json())))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /{entity}/{id}`
pub async fn read<S>(
  State(service): State<RecordService<S>>,
  Identity(principal): Identity,
  Path((entity, id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RecordStore,
{
  let record = service.read(&principal, &entity, id).await?;
  Ok(Json(record.to_json()))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /{entity}/{id}` and `PATCH /{entity}/{id}`
pub async fn update<S>(
  State(service): State<RecordService<S>>,
  Identity(principal): Identity,
  Path((entity, id)): Path<(String, Uuid)>,
  Json(payload): Json<Payload>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RecordStore,
{
  let record = service.update(&principal, &entity, id, &payload).await?;
  Ok(Json(record.to_json()))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /{entity}/{id}`
pub async fn delete<S>(
  State(service): State<RecordService<S>>,
  Identity(principal): Identity,
  Path((entity, id)): Path<(String, Uuid)>,
) -> Result<Json<bool>, ApiError>
where
  S: RecordStore,
{
  service.delete(&principal, &entity, id).await?;
  Ok(Json(true))
}
