//! The enrollment workflow: requests, reviews, and grading.
//!
//! An approval writes two documents, the enrollment and the student's
//! roster, without a transaction between them. Readers treat enrollment
//! status and roster membership as independent facts. Re-approving an
//! approved enrollment is a no-op on the enrollment but re-runs the roster
//! append, which repairs a roster write lost to a crash.
//!
//! Capacity is checked without holding any lock, so concurrent approvals can
//! overshoot `maxEnrollment` by the number in flight.

use std::sync::Arc;

use campus_core::{
  Entity, Error, Result,
  course::Course,
  enrollment::{Enrollment, EnrollmentStatus},
  principal::Principal,
  store::{Collection, Document, DocumentStore},
  user::RoleKind,
  workflow::{ReviewState, Transition},
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::{records, users::UserStore};

const COURSE_ID_FIELD: &str = "courseId";

/// Owns the enrollment state machine.
pub struct EnrollmentEngine<S> {
  store: Arc<S>,
  users: UserStore<S>,
}

impl<S: DocumentStore> EnrollmentEngine<S> {
  pub fn new(store: Arc<S>, users: UserStore<S>) -> Self { Self { store, users } }

  async fn course(&self, id: &str) -> Result<Course> {
    records::load(self.store.as_ref(), Collection::Courses, Entity::Course, id).await
  }

  async fn enrollment(&self, id: &str) -> Result<Enrollment> {
    records::load(
      self.store.as_ref(),
      Collection::Enrollments,
      Entity::Enrollment,
      id,
    )
    .await
  }

  async fn save(&self, enrollment: &Enrollment) -> Result<()> {
    records::save(
      self.store.as_ref(),
      Collection::Enrollments,
      &enrollment.id,
      enrollment,
    )
    .await
  }

  /// Every enrollment for a course, in any status.
  pub(crate) async fn for_course(&self, course_id: &str) -> Result<Vec<Enrollment>> {
    records::query(
      self.store.as_ref(),
      Collection::Enrollments,
      COURSE_ID_FIELD,
      json!(course_id),
    )
    .await
  }

  async fn ensure_capacity(&self, course: &Course) -> Result<()> {
    let approved = self
      .for_course(&course.id)
      .await?
      .iter()
      .filter(|e| e.is_approved())
      .count();

    if approved >= course.max_enrollment as usize {
      return Err(Error::CapacityExceeded {
        course_id: course.id.clone(),
        max:       course.max_enrollment,
      });
    }
    Ok(())
  }

  /// The enrollment's course, provided the caller owns it.
  async fn owned_course(
    &self,
    principal: &Principal,
    enrollment: &Enrollment,
  ) -> Result<Course> {
    let course = self.course(&enrollment.course_id).await?;
    if !course.is_owned_by(&principal.subject_id) {
      return Err(Error::not_owner(Entity::Enrollment, &enrollment.id));
    }
    Ok(course)
  }

  /// Add `course_id` to the student's enrolled courses unless present.
  /// A student whose record has gone is skipped.
  async fn add_to_roster(&self, student_id: &str, course_id: &str) -> Result<()> {
    let Some(mut student) = self.users.find(student_id).await? else {
      tracing::warn!(student_id, course_id, "approved enrollment for a missing student");
      return Ok(());
    };
    let Some(profile) = student.profile.as_student_mut() else {
      tracing::warn!(student_id, course_id, "approved enrollment for a non-student");
      return Ok(());
    };
    if !profile.enrolled_course_ids.insert(course_id.to_owned()) {
      return Ok(());
    }

    let mut fields = Document::new();
    fields.insert(
      "enrolledCourseIds".to_owned(),
      serde_json::to_value(&profile.enrolled_course_ids)?,
    );
    self.users.merge_fields(student_id, fields).await
  }

  // ── Student side ──────────────────────────────────────────────────────────

  /// Ask to join a course. Returns the new enrollment's id.
  pub async fn request_enrollment(
    &self,
    principal: &Principal,
    course_id: &str,
  ) -> Result<String> {
    principal.require_role(RoleKind::Student)?;

    let course = self.course(course_id).await?;
    if !course.is_active {
      return Err(Error::CourseInactive(course.id));
    }

    let existing = self.for_course(course_id).await?;
    if let Some(prior) = existing
      .iter()
      .find(|e| e.student_id == principal.subject_id)
    {
      return Err(Error::DuplicateEnrollment {
        course_id: course.id,
        status:    prior.status,
      });
    }

    let approved = existing.iter().filter(|e| e.is_approved()).count();
    if approved >= course.max_enrollment as usize {
      return Err(Error::CapacityExceeded {
        course_id: course.id,
        max:       course.max_enrollment,
      });
    }

    // The id is keyed by the pair, so of two racing requests only one lands.
    let enrollment =
      Enrollment::request(&course, &principal.subject_id, principal.display_name());
    let created = records::create(
      self.store.as_ref(),
      Collection::Enrollments,
      &enrollment.id,
      &enrollment,
    )
    .await?;
    if !created {
      let status = records::find::<_, Enrollment>(
        self.store.as_ref(),
        Collection::Enrollments,
        &enrollment.id,
      )
      .await?
      .map_or(EnrollmentStatus::Pending, |e| e.status);
      return Err(Error::DuplicateEnrollment {
        course_id: course.id,
        status,
      });
    }
    tracing::info!(
      enrollment_id = %enrollment.id,
      course_id,
      student_id = %principal.subject_id,
      "enrollment requested"
    );
    Ok(enrollment.id)
  }

  // ── Teacher side ──────────────────────────────────────────────────────────

  /// Approve or reject a pending enrollment for one of the caller's courses.
  pub async fn review_enrollment(
    &self,
    principal: &Principal,
    enrollment_id: &str,
    status: EnrollmentStatus,
  ) -> Result<Enrollment> {
    principal.require_approved_teacher()?;

    let mut enrollment = self.enrollment(enrollment_id).await?;
    let course = self.owned_course(principal, &enrollment).await?;

    if enrollment.status.transition_to(status)? == Transition::Changed {
      if status == EnrollmentStatus::Approved {
        self.ensure_capacity(&course).await?;
      }
      enrollment.status = status;
      enrollment.approval_date = Some(Utc::now());
      self.save(&enrollment).await?;
      tracing::info!(enrollment_id, %status, "enrollment reviewed");
    }

    if enrollment.is_approved() {
      self
        .add_to_roster(&enrollment.student_id, &enrollment.course_id)
        .await?;
    }
    Ok(enrollment)
  }

  /// Record a grade. Any status may be graded.
  pub async fn set_grade(
    &self,
    principal: &Principal,
    enrollment_id: &str,
    student_id: &str,
    grade: impl Into<String>,
  ) -> Result<()> {
    principal.require_approved_teacher()?;

    let mut enrollment = self.enrollment(enrollment_id).await?;
    self.owned_course(principal, &enrollment).await?;
    if enrollment.student_id != student_id {
      return Err(Error::StudentMismatch);
    }

    enrollment.grade = grade.into();
    self.save(&enrollment).await?;
    tracing::info!(enrollment_id, "grade recorded");
    Ok(())
  }

  /// All enrollments for one of the caller's courses.
  pub async fn course_enrollments(
    &self,
    principal: &Principal,
    course_id: &str,
  ) -> Result<Vec<Enrollment>> {
    principal.require_approved_teacher()?;
    let course = self.course(course_id).await?;
    if !course.is_owned_by(&principal.subject_id) {
      return Err(Error::not_owner(Entity::Course, course_id));
    }
    self.for_course(course_id).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// The calling student's enrollments.
  pub async fn student_enrollments(&self, principal: &Principal) -> Result<Vec<Enrollment>> {
    principal.require_role(RoleKind::Student)?;
    records::query(
      self.store.as_ref(),
      Collection::Enrollments,
      "studentId",
      Value::String(principal.subject_id.clone()),
    )
    .await
  }

  /// One of the calling student's own enrollments.
  pub async fn enrollment_for_student(
    &self,
    principal: &Principal,
    enrollment_id: &str,
  ) -> Result<Enrollment> {
    principal.require_role(RoleKind::Student)?;
    let enrollment = self.enrollment(enrollment_id).await?;
    if enrollment.student_id != principal.subject_id {
      return Err(Error::not_owner(Entity::Enrollment, enrollment_id));
    }
    Ok(enrollment)
  }
}
