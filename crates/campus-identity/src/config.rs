//! Token provider configuration.

use serde::Deserialize;

fn default_ttl() -> u64 { 3600 }

/// Signing and validation settings for [`TokenIdentity`](crate::TokenIdentity).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
  /// HMAC secret shared by issuer and verifier.
  pub secret:      String,
  /// Required `iss` claim, when set.
  #[serde(default)]
  pub issuer:      Option<String>,
  /// Required `aud` claim, when set.
  #[serde(default)]
  pub audience:    Option<String>,
  /// Lifetime of issued tokens.
  #[serde(default = "default_ttl")]
  pub ttl_seconds: u64,
}

impl TokenConfig {
  pub fn new(secret: impl Into<String>) -> Self {
    Self {
      secret:      secret.into(),
      issuer:      None,
      audience:    None,
      ttl_seconds: default_ttl(),
    }
  }
}
