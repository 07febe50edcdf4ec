//! Administrative operations: user lifecycle, role changes, and teacher
//! approval.
//!
//! Anything that changes a role updates the identity provider first, so a
//! failure there leaves the stored record untouched.

use std::sync::Arc;

use campus_core::{
  Error, Result,
  identity::IdentityVerifier,
  principal::Principal,
  store::{Document, DocumentStore},
  user::{ApprovalStatus, Profile, RoleKind, User},
  workflow::{ReviewState, Transition},
};
use serde_json::Value;

use crate::{
  auth::publish_role,
  secret,
  users::{NewProfile, NewUser, UserStore},
};

/// Details for the first administrator.
#[derive(Debug, Clone)]
pub struct NewAdmin {
  pub id:           String,
  pub email:        String,
  pub display_name: String,
}

pub struct Admin<S, V> {
  users:          UserStore<S>,
  verifier:       Arc<V>,
  /// Argon2 PHC string of the setup key; bootstrap is disabled without it.
  setup_key_hash: Option<String>,
}

impl<S, V> Admin<S, V>
where
  S: DocumentStore,
  V: IdentityVerifier,
{
  pub fn new(users: UserStore<S>, verifier: Arc<V>, setup_key_hash: Option<String>) -> Self {
    Self {
      users,
      verifier,
      setup_key_hash,
    }
  }

  /// Create a user under an externally issued subject id.
  pub async fn create_user(&self, principal: &Principal, input: NewUser) -> Result<User> {
    principal.require_role(RoleKind::Admin)?;
    if self.users.find(&input.id).await?.is_some() {
      return Err(Error::InvalidInput(format!("user {} already exists", input.id)));
    }

    let user = input.into_user();
    publish_role(self.verifier.as_ref(), &user).await?;
    self.users.create(&user).await?;
    Ok(user)
  }

  /// Move a user to another role. The stored variant fields are replaced by
  /// the new role's defaults; fields of the old variant linger in the
  /// document but are never read.
  pub async fn update_user_role(
    &self,
    principal: &Principal,
    id: &str,
    role: RoleKind,
  ) -> Result<User> {
    principal.require_role(RoleKind::Admin)?;
    let mut user = self.users.get(id).await?;
    let previous = user.role();

    if previous != role {
      user.profile = Profile::default_for(role);
    }
    publish_role(self.verifier.as_ref(), &user).await?;
    self.users.update(&user).await?;

    tracing::info!(user_id = %id, from = %previous, to = %role, "changed role");
    Ok(user)
  }

  /// Remove the subject from the identity provider, then the user record.
  /// Courses and enrollments referencing the user are kept.
  pub async fn delete_user(&self, principal: &Principal, id: &str) -> Result<()> {
    principal.require_role(RoleKind::Admin)?;
    self.users.get(id).await?;

    self
      .verifier
      .remove_subject(id)
      .await
      .map_err(Error::identity_provider)?;
    self.users.delete(id).await
  }

  /// Teachers still awaiting a decision.
  pub async fn pending_teachers(&self, principal: &Principal) -> Result<Vec<User>> {
    principal.require_role(RoleKind::Admin)?;
    let mut teachers = self.users.list_by_role(RoleKind::Teacher).await?;
    teachers.retain(|u| {
      u.profile
        .as_teacher()
        .is_some_and(|t| t.approval_status == ApprovalStatus::Pending)
    });
    Ok(teachers)
  }

  /// Approve or reject a teacher. Repeating the current decision is a
  /// no-op.
  pub async fn set_teacher_approval(
    &self,
    principal: &Principal,
    teacher_id: &str,
    status: ApprovalStatus,
  ) -> Result<Transition> {
    principal.require_role(RoleKind::Admin)?;
    let teacher = self.users.get(teacher_id).await?;
    let Some(profile) = teacher.profile.as_teacher() else {
      return Err(Error::RoleMismatch {
        expected: RoleKind::Teacher,
        actual:   teacher.role(),
      });
    };

    let transition = profile.approval_status.transition_to(status)?;
    if transition == Transition::Changed {
      let mut fields = Document::new();
      fields.insert("approvalStatus".to_owned(), Value::String(status.to_string()));
      self.users.merge_fields(teacher_id, fields).await?;
      tracing::info!(teacher_id, %status, "teacher reviewed");
    }
    Ok(transition)
  }

  /// Create the first super-admin. Requires the configured setup key and
  /// refuses once any admin exists.
  pub async fn bootstrap_admin(&self, setup_key: &str, input: NewAdmin) -> Result<User> {
    let Some(hash) = &self.setup_key_hash else {
      return Err(Error::Forbidden("no setup key is configured".to_owned()));
    };
    if !secret::verify_secret(setup_key, hash)? {
      return Err(Error::Forbidden("invalid setup key".to_owned()));
    }
    if !self.users.list_by_role(RoleKind::Admin).await?.is_empty() {
      return Err(Error::Forbidden("an administrator already exists".to_owned()));
    }

    let user = NewUser {
      id:           input.id,
      email:        input.email,
      display_name: input.display_name,
      profile:      NewProfile::Admin {
        access_level:   "full".to_owned(),
        is_super_admin: true,
      },
    }
    .into_user();

    publish_role(self.verifier.as_ref(), &user).await?;
    self.users.create(&user).await?;
    tracing::info!(user_id = %user.id, "bootstrapped first administrator");
    Ok(user)
  }
}
