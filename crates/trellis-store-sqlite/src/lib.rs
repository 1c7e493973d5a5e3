//! SQLite backend for the Trellis record store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Entity tables are generated
//! from the schema registry at startup; predicates compile to parameterised
//! SQL.

mod encode;
mod sql;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
