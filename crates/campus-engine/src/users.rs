//! The role-polymorphic user store.
//!
//! Documents accumulate under several historical schema versions, so reads
//! never fail on shape: a document the strict decoder rejects is rebuilt
//! field by field and a warning is logged.

use std::sync::Arc;

use campus_core::{
  Entity, Error, Result,
  store::{Collection, Document, DocumentStore},
  user::{AdminProfile, Profile, ROLE_FIELD, RoleKind, StudentProfile, TeacherProfile, User},
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Role-specific details for a user about to be created.
#[derive(Debug, Clone)]
pub enum NewProfile {
  Admin {
    access_level:   String,
    is_super_admin: bool,
  },
  Teacher {
    department:    String,
    qualification: String,
    specialty:     Option<String>,
  },
  Student {
    year:       i32,
    /// Generated when absent.
    student_id: Option<String>,
  },
  Basic,
}

impl NewProfile {
  pub fn role(&self) -> RoleKind {
    match self {
      Self::Admin { .. } => RoleKind::Admin,
      Self::Teacher { .. } => RoleKind::Teacher,
      Self::Student { .. } => RoleKind::Student,
      Self::Basic => RoleKind::User,
    }
  }

  /// Build the stored profile. Teachers always start pending.
  pub fn into_profile(self) -> Profile {
    match self {
      Self::Admin { access_level, is_super_admin } => Profile::Admin(AdminProfile {
        is_super_admin,
        access_level,
      }),
      Self::Teacher { department, qualification, specialty } => {
        let mut teacher = TeacherProfile::new(department, qualification);
        teacher.specialty = specialty;
        Profile::Teacher(teacher)
      }
      Self::Student { year, student_id } => {
        let mut student = StudentProfile::new(year);
        if let Some(id) = student_id {
          student.student_id = id;
        }
        Profile::Student(student)
      }
      Self::Basic => Profile::Basic,
    }
  }
}

/// A user about to be created under an externally issued subject id.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub id:           String,
  pub email:        String,
  pub display_name: String,
  pub profile:      NewProfile,
}

impl NewUser {
  pub fn into_user(self) -> User {
    User::new(self.id, self.email, self.display_name, self.profile.into_profile())
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Typed user access over any [`DocumentStore`].
pub struct UserStore<S> {
  store: Arc<S>,
}

impl<S> Clone for UserStore<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

fn stamp(fields: &mut Document, key: &str) {
  let now = Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
  fields.insert(key.to_owned(), Value::String(now));
}

/// Decode strictly, or reconstruct when the stored shape is off.
fn convert(id: &str, doc: &Document) -> User {
  match User::decode(id, doc) {
    Ok(user) => user,
    Err(e) => {
      tracing::warn!(
        user_id = %id,
        error = %e,
        "user document failed to decode; reconstructing field by field"
      );
      User::reconstruct(id, doc)
    }
  }
}

impl<S: DocumentStore> UserStore<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn find(&self, id: &str) -> Result<Option<User>> {
    let doc = self
      .store
      .get(Collection::Users, id)
      .await
      .map_err(Error::store)?;
    Ok(doc.map(|d| convert(id, &d)))
  }

  pub async fn get(&self, id: &str) -> Result<User> {
    self
      .find(id)
      .await?
      .ok_or_else(|| Error::not_found(Entity::User, id))
  }

  /// Every user. One bad document never aborts the listing.
  pub async fn list(&self) -> Result<Vec<User>> {
    let docs = self
      .store
      .scan(Collection::Users)
      .await
      .map_err(Error::store)?;
    Ok(docs.iter().map(|d| convert(&d.id, &d.body)).collect())
  }

  /// Users holding `role`, after permissive discriminant parsing.
  pub async fn list_by_role(&self, role: RoleKind) -> Result<Vec<User>> {
    let mut users = self.list().await?;
    users.retain(|u| u.role() == role);
    Ok(users)
  }

  /// Write a full user document. `createdAt` is taken from `user`;
  /// `updatedAt` is stamped now.
  pub async fn create(&self, user: &User) -> Result<()> {
    let mut doc = user.to_document()?;
    stamp(&mut doc, "updatedAt");
    self
      .store
      .put(Collection::Users, &user.id, doc)
      .await
      .map_err(Error::store)?;
    tracing::info!(user_id = %user.id, role = %user.role(), "created user");
    Ok(())
  }

  /// Merge `user` into its stored document. Stored fields the user no
  /// longer carries survive, and so does the stored `createdAt`.
  pub async fn update(&self, user: &User) -> Result<()> {
    let mut doc = user.to_document()?;
    doc.remove("createdAt");
    self.merge_fields(&user.id, doc).await
  }

  /// Merge raw top-level fields, stamping `updatedAt`.
  pub async fn merge_fields(&self, id: &str, mut fields: Document) -> Result<()> {
    stamp(&mut fields, "updatedAt");
    self
      .store
      .merge(Collection::Users, id, fields)
      .await
      .map_err(Error::store)
  }

  pub async fn touch_last_login(&self, id: &str) -> Result<()> {
    let mut fields = Document::new();
    stamp(&mut fields, "lastLogin");
    self.merge_fields(id, fields).await
  }

  /// Remove a user document. References held by courses and enrollments
  /// are left dangling.
  pub async fn delete(&self, id: &str) -> Result<()> {
    self
      .store
      .delete(Collection::Users, id)
      .await
      .map_err(Error::store)?;
    tracing::info!(user_id = %id, "deleted user");
    Ok(())
  }

  /// Rewrite every non-canonical `role` discriminant (ordinals, odd casing,
  /// missing) as its canonical name. Returns how many documents changed.
  pub async fn normalize_roles(&self) -> Result<usize> {
    let docs = self
      .store
      .scan(Collection::Users)
      .await
      .map_err(Error::store)?;

    let mut rewritten = 0;
    for doc in docs.iter().filter(|d| !User::has_canonical_role(&d.body)) {
      let role = convert(&doc.id, &doc.body).role();
      let mut fields = Document::new();
      fields.insert(ROLE_FIELD.to_owned(), Value::String(role.to_string()));
      self.merge_fields(&doc.id, fields).await?;
      tracing::info!(user_id = %doc.id, %role, "normalised role");
      rewritten += 1;
    }
    Ok(rewritten)
  }
}
