//! Error types for `trellis-core`.

use thiserror::Error;

/// The full error taxonomy of the record subsystem.
///
/// `UnknownEntity` and `NotFound` both render as a 404-equivalent at the
/// transport boundary; `NotFound` deliberately does not distinguish an absent
/// row from a row the principal is not allowed to see.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown entity type: {0:?}")]
  UnknownEntity(String),

  #[error("record not found")]
  NotFound,

  #[error("invalid filter: {0}")]
  InvalidFilter(String),

  #[error("validation failed: {0}")]
  Validation(String),

  /// A transaction could not complete. Retryable by the caller, never
  /// retried inside the core.
  #[error("storage failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error as a storage failure.
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
