//! Course and lecture management, plus catalogue reads.
//!
//! Every mutation is gated on an approved teacher who owns the course. The
//! teacher's `courseIds` list is maintained with a second write after the
//! course itself, with no transaction between them.

use std::sync::Arc;

use campus_core::{
  Entity, Error, Result,
  course::{Course, CourseUpdate, Lecture, LectureInput, NewCourse},
  principal::Principal,
  store::{Collection, Document, DocumentStore},
  user::{ApprovalStatus, RoleKind},
};
use chrono::Utc;
use serde_json::Value;

use crate::{records, users::UserStore};

/// A teacher's approval status with a message suitable for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalState {
  pub status:  ApprovalStatus,
  pub message: &'static str,
}

impl From<ApprovalStatus> for ApprovalState {
  fn from(status: ApprovalStatus) -> Self {
    let message = match status {
      ApprovalStatus::Pending => "Your teacher account is pending approval",
      ApprovalStatus::Approved => "Your teacher account is approved",
      ApprovalStatus::Rejected => "Your teacher account has been rejected",
    };
    Self { status, message }
  }
}

pub struct Courses<S> {
  store: Arc<S>,
  users: UserStore<S>,
}

impl<S: DocumentStore> Courses<S> {
  pub fn new(store: Arc<S>, users: UserStore<S>) -> Self { Self { store, users } }

  async fn find(&self, id: &str) -> Result<Option<Course>> {
    records::find(self.store.as_ref(), Collection::Courses, id).await
  }

  async fn load(&self, id: &str) -> Result<Course> {
    records::load(self.store.as_ref(), Collection::Courses, Entity::Course, id).await
  }

  async fn save(&self, course: &mut Course) -> Result<()> {
    course.updated_at = Utc::now();
    records::save(self.store.as_ref(), Collection::Courses, &course.id, course).await
  }

  /// Gate, load, and check ownership: the preamble of every mutation.
  async fn owned(&self, principal: &Principal, id: &str) -> Result<Course> {
    principal.require_approved_teacher()?;
    let course = self.load(id).await?;
    if !course.is_owned_by(&principal.subject_id) {
      return Err(Error::not_owner(Entity::Course, id));
    }
    Ok(course)
  }

  /// Add or remove `course_id` in the teacher's `courseIds`.
  async fn update_teacher_courses(
    &self,
    teacher_id: &str,
    course_id: &str,
    add: bool,
  ) -> Result<()> {
    let mut teacher = self.users.get(teacher_id).await?;
    let actual = teacher.role();
    let Some(profile) = teacher.profile.as_teacher_mut() else {
      return Err(Error::RoleMismatch {
        expected: RoleKind::Teacher,
        actual,
      });
    };

    let changed = if add {
      profile.course_ids.insert(course_id.to_owned())
    } else {
      profile.course_ids.remove(course_id)
    };
    if !changed {
      return Ok(());
    }

    let mut fields = Document::new();
    fields.insert("courseIds".to_owned(), serde_json::to_value(&profile.course_ids)?);
    self.users.merge_fields(teacher_id, fields).await
  }

  // ── Teacher status ────────────────────────────────────────────────────────

  /// The caller's approval status. Not gated on approval.
  pub async fn approval_state(&self, principal: &Principal) -> Result<ApprovalState> {
    principal.require_role(RoleKind::Teacher)?;
    let teacher = self.users.get(&principal.subject_id).await?;
    let status = teacher
      .profile
      .as_teacher()
      .map(|t| t.approval_status)
      .unwrap_or_default();
    Ok(status.into())
  }

  // ── Courses ───────────────────────────────────────────────────────────────

  pub async fn create_course(
    &self,
    principal: &Principal,
    input: NewCourse,
  ) -> Result<Course> {
    principal.require_approved_teacher()?;
    let teacher = self.users.get(&principal.subject_id).await?;

    let mut course = Course::new(&teacher, input)?;
    self.save(&mut course).await?;
    self
      .update_teacher_courses(&teacher.id, &course.id, true)
      .await?;

    tracing::info!(course_id = %course.id, teacher_id = %teacher.id, "created course");
    Ok(course)
  }

  pub async fn update_course(
    &self,
    principal: &Principal,
    id: &str,
    update: CourseUpdate,
  ) -> Result<Course> {
    let mut course = self.owned(principal, id).await?;
    course.apply(update)?;
    self.save(&mut course).await?;
    Ok(course)
  }

  /// Delete a course. Its enrollments are left in place.
  pub async fn delete_course(&self, principal: &Principal, id: &str) -> Result<()> {
    let course = self.owned(principal, id).await?;
    self
      .store
      .delete(Collection::Courses, id)
      .await
      .map_err(Error::store)?;
    self
      .update_teacher_courses(&course.teacher_id, id, false)
      .await?;
    tracing::info!(course_id = %id, "deleted course");
    Ok(())
  }

  pub async fn teacher_courses(&self, principal: &Principal) -> Result<Vec<Course>> {
    principal.require_approved_teacher()?;
    records::query(
      self.store.as_ref(),
      Collection::Courses,
      "teacherId",
      Value::String(principal.subject_id.clone()),
    )
    .await
  }

  pub async fn teacher_course(&self, principal: &Principal, id: &str) -> Result<Course> {
    self.owned(principal, id).await
  }

  // ── Lectures ──────────────────────────────────────────────────────────────

  pub async fn add_lecture(
    &self,
    principal: &Principal,
    course_id: &str,
    input: LectureInput,
  ) -> Result<Lecture> {
    let mut course = self.owned(principal, course_id).await?;
    let lecture = course.add_lecture(input)?;
    self.save(&mut course).await?;
    Ok(lecture)
  }

  pub async fn update_lecture(
    &self,
    principal: &Principal,
    course_id: &str,
    lecture_id: &str,
    input: LectureInput,
  ) -> Result<Lecture> {
    let mut course = self.owned(principal, course_id).await?;
    let lecture = course.replace_lecture(lecture_id, input)?;
    self.save(&mut course).await?;
    Ok(lecture)
  }

  pub async fn delete_lecture(
    &self,
    principal: &Principal,
    course_id: &str,
    lecture_id: &str,
  ) -> Result<()> {
    let mut course = self.owned(principal, course_id).await?;
    course.remove_lecture(lecture_id)?;
    self.save(&mut course).await
  }

  // ── Catalogue ─────────────────────────────────────────────────────────────

  /// Every course open for enrollment.
  pub async fn active_courses(&self) -> Result<Vec<Course>> {
    records::query(
      self.store.as_ref(),
      Collection::Courses,
      "isActive",
      Value::Bool(true),
    )
    .await
  }

  /// One course. Inactive courses are visible only to their owner and to
  /// admins.
  pub async fn course(&self, principal: &Principal, id: &str) -> Result<Course> {
    let course = self.load(id).await?;
    let privileged = course.is_owned_by(&principal.subject_id) || principal.is_admin();
    if !course.is_active && !privileged {
      return Err(Error::CourseInactive(course.id));
    }
    Ok(course)
  }

  /// The courses on the calling student's roster. Ids that no longer
  /// resolve are skipped.
  pub async fn enrolled_courses(&self, principal: &Principal) -> Result<Vec<Course>> {
    principal.require_role(RoleKind::Student)?;
    let student = self.users.get(&principal.subject_id).await?;
    let Some(profile) = student.profile.as_student() else {
      return Ok(Vec::new());
    };

    let mut courses = Vec::with_capacity(profile.enrolled_course_ids.len());
    for id in &profile.enrolled_course_ids {
      match self.find(id).await? {
        Some(course) => courses.push(course),
        None => tracing::debug!(course_id = %id, "skipping missing enrolled course"),
      }
    }
    Ok(courses)
  }
}
