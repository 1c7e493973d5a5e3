//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use trellis_core::Error as CoreError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
      }
      // Unknown entity types and forbidden records alike surface as a plain
      // 404, so responses never betray what exists.
      ApiError::Core(CoreError::UnknownEntity(_) | CoreError::NotFound) => {
        (StatusCode::NOT_FOUND, "not found".to_string())
      }
      ApiError::Core(e @ (CoreError::InvalidFilter(_) | CoreError::Validation(_))) => {
        (StatusCode::BAD_REQUEST, e.to_string())
      }
      ApiError::Core(CoreError::Storage(e)) => {
        tracing::error!(error = %e, "storage failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal error".to_string(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
