//! The authenticated principal as a handler extractor.
//!
//! Auth middleware in the server binary validates credentials and inserts a
//! [`Principal`] into request extensions; handlers pull it out through this
//! extractor. A request that somehow reaches a handler without one is
//! rejected, not defaulted.

use axum::{Json, extract::FromRequestParts, http::request::Parts};
use trellis_core::principal::Principal;

use crate::error::ApiError;

/// Extractor for the principal the request runs on behalf of.
#[derive(Debug, Clone)]
pub struct Identity(pub Principal);

impl<S> FromRequestParts<S> for Identity
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Principal>()
      .cloned()
      .map(Identity)
      .ok_or(ApiError::Unauthorized)
  }
}

/// `GET /App/user`: who am I.
pub async fn app_user(Identity(principal): Identity) -> Json<serde_json::Value> {
  let mut teams: Vec<String> = principal
    .teams
    .iter()
    .map(|id| id.hyphenated().to_string())
    .collect();
  teams.sort();

  Json(serde_json::json!({
    "id":      principal.id.hyphenated().to_string(),
    "isAdmin": principal.is_admin,
    "teams":   teams,
  }))
}
