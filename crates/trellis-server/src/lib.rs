//! Trellis server assembly: configuration, authentication, and the
//! fully-layered HTTP application.

pub mod auth;
pub mod config;

pub use config::ServerConfig;

use axum::{Router, middleware};
use tower_http::trace::TraceLayer;
use trellis_core::service::RecordService;
use trellis_store_sqlite::SqliteStore;

use auth::AuthState;

/// The complete application: record API behind Basic auth, with request
/// tracing outermost.
pub fn app(
  service: RecordService<SqliteStore>,
  auth_state: AuthState,
) -> Router {
  trellis_api::api_router(service)
    .layer(middleware::from_fn_with_state(auth_state, auth::authenticate))
    .layer(TraceLayer::new_for_http())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
