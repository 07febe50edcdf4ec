//! Error types for `campus-core`.

use std::fmt;

use thiserror::Error;

use crate::{
  enrollment::EnrollmentStatus,
  user::{ApprovalStatus, RoleKind},
};

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  User,
  Course,
  Lecture,
  Enrollment,
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::User => "user",
      Self::Course => "course",
      Self::Lecture => "lecture",
      Self::Enrollment => "enrollment",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing bearer token")]
  MissingToken,

  #[error("token verification failed: {0}")]
  TokenInvalid(String),

  #[error("verified token carries an empty subject")]
  EmptySubject,

  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: String },

  #[error("{entity} {id} is not owned by the caller")]
  NotOwner { entity: Entity, id: String },

  #[error("teacher account is pending approval (status: {0})")]
  NotApproved(ApprovalStatus),

  #[error("already enrolled in course {course_id} (status: {status})")]
  DuplicateEnrollment {
    course_id: String,
    status:    EnrollmentStatus,
  },

  #[error("course {0} is not active")]
  CourseInactive(String),

  #[error("course {course_id} has reached its capacity of {max} approved enrollments")]
  CapacityExceeded { course_id: String, max: u32 },

  #[error("student id does not match enrollment record")]
  StudentMismatch,

  #[error("operation requires the {expected} role, caller is {actual}")]
  RoleMismatch {
    expected: RoleKind,
    actual:   RoleKind,
  },

  #[error("cannot move from {from} to {to}")]
  InvalidTransition { from: String, to: String },

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("store failure: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The identity provider failed outside of token verification.
  #[error("identity provider failure: {0}")]
  IdentityProvider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
    Self::NotFound { entity, id: id.into() }
  }

  pub fn not_owner(entity: Entity, id: impl Into<String>) -> Self {
    Self::NotOwner { entity, id: id.into() }
  }

  /// Box a backend error as an opaque [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub fn identity_provider<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::IdentityProvider(Box::new(err))
  }
}

impl From<serde_json::Error> for Error {
  fn from(err: serde_json::Error) -> Self { Self::store(err) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
