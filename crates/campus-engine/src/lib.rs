//! The campus engine: role-polymorphic user storage, principal resolution,
//! and the teacher-approval and enrollment workflows.
//!
//! Everything here is generic over a [`DocumentStore`] and an
//! [`IdentityVerifier`] and holds no mutable state of its own; all state
//! lives in the store.

use std::sync::Arc;

use campus_core::{identity::IdentityVerifier, store::DocumentStore};

mod records;

pub mod admin;
pub mod auth;
pub mod courses;
pub mod enrollment;
pub mod secret;
pub mod users;

pub use admin::{Admin, NewAdmin};
pub use auth::{Authenticator, bearer_token};
pub use courses::{ApprovalState, Courses};
pub use enrollment::EnrollmentEngine;
pub use users::{NewProfile, NewUser, UserStore};

/// All engine components wired to one store and one identity provider.
pub struct Campus<S, V> {
  pub users:      UserStore<S>,
  pub auth:       Authenticator<S, V>,
  pub courses:    Courses<S>,
  pub enrollment: EnrollmentEngine<S>,
  pub admin:      Admin<S, V>,
}

impl<S, V> Campus<S, V>
where
  S: DocumentStore,
  V: IdentityVerifier,
{
  pub fn new(store: Arc<S>, verifier: Arc<V>, setup_key_hash: Option<String>) -> Self {
    let users = UserStore::new(Arc::clone(&store));
    Self {
      auth: Authenticator::new(users.clone(), Arc::clone(&verifier)),
      courses: Courses::new(Arc::clone(&store), users.clone()),
      enrollment: EnrollmentEngine::new(store, users.clone()),
      admin: Admin::new(users.clone(), verifier, setup_key_hash),
      users,
    }
  }

  /// Enable [`Authenticator::admin_login`] with an argon2 hash of the code.
  pub fn with_admin_code_hash(mut self, admin_code_hash: Option<String>) -> Self {
    self.auth = self.auth.with_admin_code_hash(admin_code_hash);
    self
  }
}
