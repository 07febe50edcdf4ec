//! JWT claims carried by campus tokens.

use campus_core::identity::Attributes;
use serde::{Deserialize, Serialize};

/// Registered claim names; attributes may not shadow them.
pub(crate) const RESERVED: &[&str] = &["sub", "iat", "exp", "iss", "aud", "nbf", "jti"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
  /// Subject (user id).
  pub sub:        String,
  /// Issued at, Unix seconds.
  pub iat:        u64,
  /// Expires at, Unix seconds.
  pub exp:        u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub iss:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub aud:        Option<String>,
  /// Subject attributes as of issue time (e.g. `role`).
  #[serde(flatten)]
  pub attributes: Attributes,
}
