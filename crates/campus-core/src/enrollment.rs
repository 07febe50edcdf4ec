//! Enrollment requests linking a student to a course.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, FromRepr};

use crate::{
  course::Course,
  lenient::{self, Lenient},
  workflow::ReviewState,
};

/// Enrollment workflow state.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  FromRepr,
)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum EnrollmentStatus {
  #[default]
  Pending  = 0,
  Approved = 1,
  Rejected = 2,
}

impl Lenient for EnrollmentStatus {
  fn from_ordinal(ordinal: i64) -> Option<Self> {
    u8::try_from(ordinal).ok().and_then(Self::from_repr)
  }
}

impl ReviewState for EnrollmentStatus {
  const PENDING: Self = Self::Pending;
}

/// One student's request to join one course. At most one exists per
/// `(course_id, student_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
  pub id:            String,
  pub course_id:     String,
  /// The student's user id (subject id), not their `STU…` number.
  pub student_id:    String,
  /// Snapshot of the student's display name at request time.
  #[serde(default)]
  pub student_name:  String,
  #[serde(default, deserialize_with = "lenient::deserialize")]
  pub status:        EnrollmentStatus,
  pub request_date:  DateTime<Utc>,
  #[serde(default)]
  pub approval_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub grade:         String,
  #[serde(default)]
  pub teacher_id:    String,
}

impl Enrollment {
  /// The id a request for `(course_id, student_id)` is stored under. Older
  /// records may carry random ids instead.
  pub fn id_for(course_id: &str, student_id: &str) -> String {
    format!("{course_id}:{student_id}")
  }

  /// A fresh pending request for `course`.
  pub fn request(
    course: &Course,
    student_id: impl Into<String>,
    student_name: impl Into<String>,
  ) -> Self {
    let student_id = student_id.into();
    Self {
      id:            Self::id_for(&course.id, &student_id),
      course_id:     course.id.clone(),
      student_id,
      student_name:  student_name.into(),
      status:        EnrollmentStatus::Pending,
      request_date:  Utc::now(),
      approval_date: None,
      grade:         String::new(),
      teacher_id:    course.teacher_id.clone(),
    }
  }

  pub fn is_approved(&self) -> bool { self.status == EnrollmentStatus::Approved }
}
