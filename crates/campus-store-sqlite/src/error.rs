//! Error type for `campus-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// Equality queries only compare scalars.
  #[error("unsupported query value: {0}")]
  UnsupportedQueryValue(String),

  #[error("invalid field name: {0:?}")]
  InvalidField(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
