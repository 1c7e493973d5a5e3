//! JSON REST API for Trellis.
//!
//! Exposes an axum [`Router`] backed by any
//! [`trellis_core::store::RecordStore`] through a
//! [`trellis_core::service::RecordService`]. Authentication, TLS, and
//! transport concerns are the caller's responsibility: handlers expect a
//! validated [`trellis_core::principal::Principal`] in request extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", trellis_api::api_router(service.clone()))
//! ```

pub mod error;
pub mod identity;
pub mod records;

use axum::{
  Router,
  routing::{delete, get},
};
use trellis_core::{service::RecordService, store::RecordStore};

pub use error::ApiError;
pub use identity::Identity;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: RecordService<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    // Who am I. Registered before the generic routes, but axum prefers the
    // static path either way.
    .route("/App/user", get(identity::app_user))
    // Generic record CRUD over every registered entity type.
    .route("/{entity}", get(records::list::<S>).post(records::create::<S>))
    .route(
      "/{entity}/{id}",
      delete(records::delete::<S>)
        .get(records::read::<S>)
        .put(records::update::<S>)
        .patch(records::update::<S>),
    )
    .with_state(service)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
