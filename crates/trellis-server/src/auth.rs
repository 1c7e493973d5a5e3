//! HTTP Basic authentication and principal construction.
//!
//! Every request passes through [`authenticate`]: credentials are checked
//! against the configured accounts, the matching user's team memberships are
//! loaded from the store, and the resulting
//! [`Principal`] is handed to the API layer through request extensions.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use trellis_core::{principal::Principal, store::RecordStore as _};
use trellis_store_sqlite::SqliteStore;

use crate::config::UserConfig;

/// Shared state of the auth middleware.
#[derive(Clone)]
pub struct AuthState {
  pub users: Arc<Vec<UserConfig>>,
  /// Team memberships live next to the records.
  pub store: Arc<SqliteStore>,
}

/// Middleware: reject the request or attach a [`Principal`] to it.
pub async fn authenticate(
  State(state): State<AuthState>,
  mut req: Request,
  next: Next,
) -> Response {
  let Some(user) = verify_basic(req.headers(), &state.users) else {
    return unauthorized();
  };

  let principal = if user.is_admin {
    Principal::admin(user.id)
  } else {
    match state.store.teams_of(user.id).await {
      Ok(teams) => Principal::user(user.id, teams),
      Err(e) => {
        tracing::error!(error = %e, "failed to load team memberships");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
      }
    }
  };

  req.extensions_mut().insert(principal);
  next.run(req).await
}

/// Check a Basic Authorization header against the configured accounts.
pub fn verify_basic<'a>(
  headers: &HeaderMap,
  users: &'a [UserConfig],
) -> Option<&'a UserConfig> {
  let header_val = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let encoded = header_val.strip_prefix("Basic ")?;

  let decoded = B64.decode(encoded).ok()?;
  let creds = std::str::from_utf8(&decoded).ok()?;
  let (username, password) = creds.split_once(':')?;

  let user = users.iter().find(|u| u.username == username)?;
  let parsed_hash = PasswordHash::new(&user.password_hash).ok()?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .ok()?;

  Some(user)
}

fn unauthorized() -> Response {
  (
    StatusCode::UNAUTHORIZED,
    [(header::WWW_AUTHENTICATE, "Basic realm=\"trellis\"")],
    "unauthorized",
  )
    .into_response()
}
