//! The per-request authenticated principal.

use std::collections::BTreeMap;

use crate::{
  Error, Result,
  lenient,
  user::{ApprovalStatus, Profile, RoleKind, User},
};

pub const EMAIL: &str = "email";
pub const DISPLAY_NAME: &str = "displayName";
pub const APPROVAL_STATUS: &str = "approvalStatus";
pub const STUDENT_ID: &str = "studentId";
pub const YEAR: &str = "year";
pub const ACCESS_LEVEL: &str = "accessLevel";
pub const IS_SUPER_ADMIN: &str = "isSuperAdmin";

/// Who is calling, with the role taken from their stored user record.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub subject_id: String,
  pub role:       RoleKind,
  pub attributes: BTreeMap<String, String>,
}

impl Principal {
  /// Build a principal from the authoritative user record.
  pub fn from_user(user: &User) -> Self {
    let mut attributes = BTreeMap::new();
    attributes.insert(EMAIL.to_owned(), user.email.clone());
    attributes.insert(DISPLAY_NAME.to_owned(), user.display_name.clone());

    match &user.profile {
      Profile::Admin(admin) => {
        attributes.insert(ACCESS_LEVEL.to_owned(), admin.access_level.clone());
        attributes.insert(IS_SUPER_ADMIN.to_owned(), admin.is_super_admin.to_string());
      }
      Profile::Teacher(teacher) => {
        attributes.insert(APPROVAL_STATUS.to_owned(), teacher.approval_status.to_string());
      }
      Profile::Student(student) => {
        attributes.insert(STUDENT_ID.to_owned(), student.student_id.clone());
        attributes.insert(YEAR.to_owned(), student.year.to_string());
      }
      Profile::Basic => {}
    }

    Self {
      subject_id: user.id.clone(),
      role: user.role(),
      attributes,
    }
  }

  pub fn attribute(&self, key: &str) -> Option<&str> {
    self.attributes.get(key).map(String::as_str)
  }

  pub fn display_name(&self) -> &str { self.attribute(DISPLAY_NAME).unwrap_or_default() }

  pub fn is_admin(&self) -> bool { self.role == RoleKind::Admin }

  pub fn is_super_admin(&self) -> bool {
    self.is_admin() && self.attribute(IS_SUPER_ADMIN) == Some("true")
  }

  /// Fail with [`Error::RoleMismatch`] unless the principal holds `expected`.
  pub fn require_role(&self, expected: RoleKind) -> Result<()> {
    if self.role != expected {
      return Err(Error::RoleMismatch {
        expected,
        actual: self.role,
      });
    }
    Ok(())
  }

  /// The teacher approval status, if this principal is a teacher.
  pub fn approval_status(&self) -> Option<ApprovalStatus> {
    if self.role != RoleKind::Teacher {
      return None;
    }
    Some(
      self
        .attribute(APPROVAL_STATUS)
        .and_then(lenient::parse_name)
        .unwrap_or_default(),
    )
  }

  /// The gate in front of every teacher-only operation: the role check
  /// first, then approval.
  pub fn require_approved_teacher(&self) -> Result<()> {
    self.require_role(RoleKind::Teacher)?;
    match self.approval_status().unwrap_or_default() {
      ApprovalStatus::Approved => Ok(()),
      other => Err(Error::NotApproved(other)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::user::{AdminProfile, StudentProfile, TeacherProfile};

  fn teacher(status: ApprovalStatus) -> User {
    let mut profile = TeacherProfile::new("CS", "PhD");
    profile.approval_status = status;
    User::new("t-1", "t@example.com", "Tess", Profile::Teacher(profile))
  }

  #[test]
  fn attributes_follow_the_variant() {
    let student = User::new("s-1", "s@example.com", "Sam", Profile::Student(StudentProfile::new(3)));
    let p = Principal::from_user(&student);
    assert_eq!(p.role, RoleKind::Student);
    assert_eq!(p.attribute(YEAR), Some("3"));
    assert!(p.attribute(STUDENT_ID).is_some_and(|id| id.starts_with("STU")));
    assert_eq!(p.display_name(), "Sam");
    assert!(p.approval_status().is_none());

    let admin = User::new(
      "a-1",
      "a@example.com",
      "Ada",
      Profile::Admin(AdminProfile { is_super_admin: true, access_level: "full".into() }),
    );
    let p = Principal::from_user(&admin);
    assert!(p.is_admin());
    assert!(p.is_super_admin());
  }

  #[test]
  fn teacher_gate_checks_role_then_approval() {
    let pending = Principal::from_user(&teacher(ApprovalStatus::Pending));
    assert!(matches!(
      pending.require_approved_teacher(),
      Err(Error::NotApproved(ApprovalStatus::Pending))
    ));

    let approved = Principal::from_user(&teacher(ApprovalStatus::Approved));
    assert!(approved.require_approved_teacher().is_ok());

    let student = User::new("s", "s@x", "S", Profile::Student(StudentProfile::new(1)));
    assert!(matches!(
      Principal::from_user(&student).require_approved_teacher(),
      Err(Error::RoleMismatch { expected: RoleKind::Teacher, actual: RoleKind::Student })
    ));
  }
}
