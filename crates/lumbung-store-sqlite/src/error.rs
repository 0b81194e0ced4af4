//! Error type for `lumbung-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Domain error from the core taxonomy (duplicates, mode mismatch,
  /// invalid transitions, missing rows). Constraint violations raised by
  /// SQLite at insert time are normalised into this variant too, so a race
  /// that slips past the in-transaction existence check surfaces the same
  /// way as one caught by it.
  #[error("core error: {0}")]
  Core(#[from] lumbung_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored value could not be decoded into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
