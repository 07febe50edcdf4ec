//! Bearer-token authentication and self-service registration.
//!
//! The identity provider only vouches for *who* is calling. The role, and
//! every attribute authorization depends on, is re-read from the stored user
//! record on each request, so a token minted before a role change grants
//! nothing the caller no longer holds.

use std::sync::Arc;

use campus_core::{
  Error, Result,
  identity::{Attributes, IdentityVerifier, ROLE_ATTRIBUTE, VerifiedIdentity},
  principal::Principal,
  store::DocumentStore,
  user::{RoleKind, User},
};

use crate::{
  secret,
  users::{NewProfile, NewUser, UserStore},
};

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively. Anything other than a
/// non-empty `Bearer` credential counts as missing.
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
  header
    .and_then(|h| h.trim_start().split_once(' '))
    .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
    .map(|(_, token)| token.trim())
    .filter(|t| !t.is_empty())
    .ok_or(Error::MissingToken)
}

/// Set the provider's `role` attribute for a subject.
pub(crate) async fn publish_role<V: IdentityVerifier>(
  verifier: &V,
  user: &User,
) -> Result<()> {
  let attributes = Attributes::from([(ROLE_ATTRIBUTE.to_owned(), user.role().to_string())]);
  verifier
    .set_attributes(&user.id, attributes)
    .await
    .map_err(Error::identity_provider)
}

/// Turns bearer tokens into principals.
pub struct Authenticator<S, V> {
  users:           UserStore<S>,
  verifier:        Arc<V>,
  /// Argon2 PHC string of the admin verification code; admin login is
  /// disabled without it.
  admin_code_hash: Option<String>,
}

impl<S, V> Authenticator<S, V>
where
  S: DocumentStore,
  V: IdentityVerifier,
{
  pub fn new(users: UserStore<S>, verifier: Arc<V>) -> Self {
    Self {
      users,
      verifier,
      admin_code_hash: None,
    }
  }

  pub fn with_admin_code_hash(mut self, admin_code_hash: Option<String>) -> Self {
    self.admin_code_hash = admin_code_hash;
    self
  }

  /// Verify a token down to a non-empty subject.
  async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
    if token.trim().is_empty() {
      return Err(Error::MissingToken);
    }

    let identity = self
      .verifier
      .verify(token)
      .await
      .map_err(|e| Error::TokenInvalid(e.to_string()))?;

    if identity.subject_id.is_empty() {
      return Err(Error::EmptySubject);
    }
    Ok(identity)
  }

  /// Resolve the principal behind `token`. Read-only.
  pub async fn resolve(&self, token: &str) -> Result<Principal> {
    let identity = self.verify(token).await?;
    let user = self.users.get(&identity.subject_id).await?;

    if let Some(claimed) = identity.role_attribute()
      && claimed != user.role().as_ref()
    {
      tracing::debug!(
        user_id = %user.id,
        claimed,
        stored = %user.role(),
        "token role attribute is stale; using stored role"
      );
    }

    Ok(Principal::from_user(&user))
  }

  /// [`Authenticator::resolve`], then stamp `lastLogin`.
  pub async fn login(&self, token: &str) -> Result<Principal> {
    let principal = self.resolve(token).await?;
    self.users.touch_last_login(&principal.subject_id).await?;
    Ok(principal)
  }

  /// [`Authenticator::login`] for administrators, who must also present the
  /// configured verification code.
  pub async fn admin_login(&self, token: &str, code: &str) -> Result<Principal> {
    let principal = self.resolve(token).await?;
    principal.require_role(RoleKind::Admin)?;

    let Some(hash) = &self.admin_code_hash else {
      return Err(Error::Forbidden("admin login is not configured".to_owned()));
    };
    if !secret::verify_secret(code, hash)? {
      tracing::warn!(user_id = %principal.subject_id, "rejected admin verification code");
      return Err(Error::Forbidden("invalid admin verification code".to_owned()));
    }

    self.users.touch_last_login(&principal.subject_id).await?;
    Ok(principal)
  }

  // ── Registration ──────────────────────────────────────────────────────────

  async fn register(
    &self,
    token: &str,
    email: String,
    display_name: String,
    profile: NewProfile,
  ) -> Result<User> {
    let identity = self.verify(token).await?;
    if self.users.find(&identity.subject_id).await?.is_some() {
      return Err(Error::InvalidInput(format!(
        "subject {} is already registered",
        identity.subject_id
      )));
    }

    let user = NewUser {
      id: identity.subject_id,
      email,
      display_name,
      profile,
    }
    .into_user();

    publish_role(self.verifier.as_ref(), &user).await?;
    self.users.create(&user).await?;
    Ok(user)
  }

  /// Create a student record for the token's subject.
  pub async fn register_student(
    &self,
    token: &str,
    email: impl Into<String>,
    display_name: impl Into<String>,
    year: i32,
  ) -> Result<User> {
    let profile = NewProfile::Student { year, student_id: None };
    self
      .register(token, email.into(), display_name.into(), profile)
      .await
  }

  /// Create a teacher record, pending approval, for the token's subject.
  pub async fn register_teacher(
    &self,
    token: &str,
    email: impl Into<String>,
    display_name: impl Into<String>,
    department: impl Into<String>,
    qualification: impl Into<String>,
  ) -> Result<User> {
    let profile = NewProfile::Teacher {
      department:    department.into(),
      qualification: qualification.into(),
      specialty:     None,
    };
    self
      .register(token, email.into(), display_name.into(), profile)
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bearer_token_extraction() {
    assert_eq!(bearer_token(Some("Bearer abc123")).unwrap(), "abc123");
    assert!(matches!(bearer_token(None), Err(Error::MissingToken)));
    assert!(matches!(bearer_token(Some("abc123")), Err(Error::MissingToken)));
    assert!(matches!(bearer_token(Some("Basic abc123")), Err(Error::MissingToken)));
    assert!(matches!(bearer_token(Some("Bearer   ")), Err(Error::MissingToken)));
  }

  #[test]
  fn bearer_scheme_ignores_case() {
    assert_eq!(bearer_token(Some("bearer xyz")).unwrap(), "xyz");
    assert_eq!(bearer_token(Some("BEARER xyz")).unwrap(), "xyz");
    assert!(matches!(bearer_token(Some("Bearerxyz")), Err(Error::MissingToken)));
  }
}
