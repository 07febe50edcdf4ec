//! The `IdentityVerifier` trait.
//!
//! An identity provider validates opaque bearer tokens and keeps a small set
//! of named attributes per subject (notably `role`). Attributes it reports
//! are informational: the stored user record is authoritative.

use std::{collections::BTreeMap, future::Future};

/// Named string attributes attached to a subject.
pub type Attributes = BTreeMap<String, String>;

/// Attribute key the provider uses to carry a subject's role.
pub const ROLE_ATTRIBUTE: &str = "role";

/// The result of a successful token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
  /// May be empty if the provider is misbehaving; callers must check.
  pub subject_id: String,
  pub attributes: Attributes,
}

impl VerifiedIdentity {
  pub fn role_attribute(&self) -> Option<&str> {
    self.attributes.get(ROLE_ATTRIBUTE).map(String::as_str)
  }
}

pub trait IdentityVerifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Validate `token`. Any failure, whatever the cause, is an `Err`.
  fn verify<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<VerifiedIdentity, Self::Error>> + Send + 'a;

  /// Merge `attributes` into the subject's stored attributes. Tokens issued
  /// afterwards carry the new values.
  fn set_attributes<'a>(
    &'a self,
    subject_id: &'a str,
    attributes: Attributes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Forget a subject entirely. Removing an unknown subject succeeds.
  fn remove_subject<'a>(
    &'a self,
    subject_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
