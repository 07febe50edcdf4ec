//! Error type for `campus-identity`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("token error: {0}")]
  Token(#[from] jsonwebtoken::errors::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The token is well-formed but its subject has been removed.
  #[error("unknown subject: {0}")]
  UnknownSubject(String),

  #[error("cannot issue a token for an empty subject")]
  EmptySubject,

  #[error("attribute {0:?} collides with a registered claim")]
  ReservedAttribute(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
