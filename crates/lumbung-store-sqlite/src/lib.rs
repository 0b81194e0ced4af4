//! SQLite backend for the Lumbung assistance store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Every mutating operation is a
//! single transaction; the tombstone recovery and lifecycle cascades never
//! leave the database half-applied.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
