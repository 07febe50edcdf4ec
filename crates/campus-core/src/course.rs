//! Courses and their embedded lectures.
//!
//! All instants are normalised to UTC before they reach a [`Course`]; inputs
//! carry whatever offset the caller supplied.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Entity, Error, Result, user::User};

/// One scheduled session of a course. Lives only inside
/// [`Course::lectures`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
  /// Unique within the owning course.
  pub id:          String,
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub start_time:  DateTime<Utc>,
  pub end_time:    DateTime<Utc>,
  #[serde(default)]
  pub location:    String,
}

/// Caller-supplied lecture fields, used for both creation and replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureInput {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub start_time:  DateTime<FixedOffset>,
  pub end_time:    DateTime<FixedOffset>,
  #[serde(default)]
  pub location:    String,
}

impl LectureInput {
  fn validate(&self) -> Result<()> {
    if self.end_time < self.start_time {
      return Err(Error::InvalidInput(
        "lecture cannot end before it starts".to_owned(),
      ));
    }
    Ok(())
  }

  fn into_lecture(self, id: String) -> Lecture {
    Lecture {
      id,
      title: self.title,
      description: self.description,
      start_time: self.start_time.with_timezone(&Utc),
      end_time: self.end_time.with_timezone(&Utc),
      location: self.location,
    }
  }
}

fn default_active() -> bool { true }

/// A course, owned exclusively by one teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
  pub id:             String,
  pub title:          String,
  #[serde(default)]
  pub description:    String,
  pub teacher_id:     String,
  /// Snapshot of the owning teacher's display name at creation.
  #[serde(default)]
  pub teacher_name:   String,
  /// Maximum number of approved enrollments; always positive.
  pub max_enrollment: u32,
  pub start_date:     DateTime<Utc>,
  pub end_date:       DateTime<Utc>,
  #[serde(default)]
  pub lectures:       Vec<Lecture>,
  #[serde(default = "default_active")]
  pub is_active:      bool,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Input to course creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
  pub title:          String,
  #[serde(default)]
  pub description:    String,
  pub max_enrollment: u32,
  pub start_date:     DateTime<FixedOffset>,
  pub end_date:       DateTime<FixedOffset>,
}

/// Partial course update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
  pub title:          Option<String>,
  pub description:    Option<String>,
  pub max_enrollment: Option<u32>,
  pub start_date:     Option<DateTime<FixedOffset>>,
  pub end_date:       Option<DateTime<FixedOffset>>,
  pub is_active:      Option<bool>,
}

fn check_capacity(max_enrollment: u32) -> Result<()> {
  if max_enrollment == 0 {
    return Err(Error::InvalidInput(
      "maxEnrollment must be greater than zero".to_owned(),
    ));
  }
  Ok(())
}

impl Course {
  /// Build an active course owned by `teacher`, with a fresh id.
  pub fn new(teacher: &User, input: NewCourse) -> Result<Self> {
    check_capacity(input.max_enrollment)?;
    let now = Utc::now();
    Ok(Self {
      id:             Uuid::new_v4().to_string(),
      title:          input.title,
      description:    input.description,
      teacher_id:     teacher.id.clone(),
      teacher_name:   teacher.display_name.clone(),
      max_enrollment: input.max_enrollment,
      start_date:     input.start_date.with_timezone(&Utc),
      end_date:       input.end_date.with_timezone(&Utc),
      lectures:       Vec::new(),
      is_active:      true,
      created_at:     now,
      updated_at:     now,
    })
  }

  pub fn is_owned_by(&self, teacher_id: &str) -> bool { self.teacher_id == teacher_id }

  /// Apply a partial update. Nothing changes if validation fails.
  pub fn apply(&mut self, update: CourseUpdate) -> Result<()> {
    if let Some(max) = update.max_enrollment {
      check_capacity(max)?;
    }
    if let Some(title) = update.title {
      self.title = title;
    }
    if let Some(description) = update.description {
      self.description = description;
    }
    if let Some(max) = update.max_enrollment {
      self.max_enrollment = max;
    }
    if let Some(start) = update.start_date {
      self.start_date = start.with_timezone(&Utc);
    }
    if let Some(end) = update.end_date {
      self.end_date = end.with_timezone(&Utc);
    }
    if let Some(active) = update.is_active {
      self.is_active = active;
    }
    Ok(())
  }

  /// Append a lecture with a generated id.
  pub fn add_lecture(&mut self, input: LectureInput) -> Result<Lecture> {
    input.validate()?;
    let lecture = input.into_lecture(Uuid::new_v4().to_string());
    self.lectures.push(lecture.clone());
    Ok(lecture)
  }

  /// Replace a lecture's fields in place, keeping its id and position.
  pub fn replace_lecture(
    &mut self,
    lecture_id: &str,
    input: LectureInput,
  ) -> Result<Lecture> {
    input.validate()?;
    let slot = self
      .lectures
      .iter_mut()
      .find(|l| l.id == lecture_id)
      .ok_or_else(|| Error::not_found(Entity::Lecture, lecture_id))?;
    *slot = input.into_lecture(lecture_id.to_owned());
    Ok(slot.clone())
  }

  pub fn remove_lecture(&mut self, lecture_id: &str) -> Result<Lecture> {
    let index = self
      .lectures
      .iter()
      .position(|l| l.id == lecture_id)
      .ok_or_else(|| Error::not_found(Entity::Lecture, lecture_id))?;
    Ok(self.lectures.remove(index))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::user::{Profile, TeacherProfile};

  fn teacher() -> User {
    User::new(
      "t-1",
      "t@example.com",
      "Grace",
      Profile::Teacher(TeacherProfile::new("CS", "MSc")),
    )
  }

  fn at(hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(5 * 3600)
      .unwrap()
      .with_ymd_and_hms(2025, 9, 1, hour, 0, 0)
      .unwrap()
  }

  fn new_course(max: u32) -> NewCourse {
    NewCourse {
      title:          "Compilers".to_owned(),
      description:    String::new(),
      max_enrollment: max,
      start_date:     at(9),
      end_date:       at(17),
    }
  }

  fn lecture(start: u32, end: u32) -> LectureInput {
    LectureInput {
      title:       "Parsing".to_owned(),
      description: String::new(),
      start_time:  at(start),
      end_time:    at(end),
      location:    "Room 1".to_owned(),
    }
  }

  #[test]
  fn new_course_normalises_dates_to_utc() {
    let course = Course::new(&teacher(), new_course(10)).unwrap();
    assert_eq!(course.start_date, Utc.with_ymd_and_hms(2025, 9, 1, 4, 0, 0).unwrap());
    assert_eq!(course.teacher_name, "Grace");
    assert!(course.is_active);
  }

  #[test]
  fn zero_capacity_is_rejected() {
    assert!(matches!(
      Course::new(&teacher(), new_course(0)),
      Err(Error::InvalidInput(_))
    ));

    let mut course = Course::new(&teacher(), new_course(5)).unwrap();
    let update = CourseUpdate {
      title: Some("Renamed".to_owned()),
      max_enrollment: Some(0),
      ..CourseUpdate::default()
    };
    assert!(course.apply(update).is_err());
    assert_eq!(course.title, "Compilers");
    assert_eq!(course.max_enrollment, 5);
  }

  #[test]
  fn lecture_lifecycle() {
    let mut course = Course::new(&teacher(), new_course(5)).unwrap();
    let first = course.add_lecture(lecture(9, 10)).unwrap();
    let second = course.add_lecture(lecture(11, 12)).unwrap();
    assert_ne!(first.id, second.id);

    let replaced = course.replace_lecture(&first.id, lecture(13, 14)).unwrap();
    assert_eq!(replaced.id, first.id);
    assert_eq!(course.lectures[0].start_time, at(13).with_timezone(&Utc));

    course.remove_lecture(&first.id).unwrap();
    assert_eq!(course.lectures.len(), 1);
    assert!(matches!(
      course.remove_lecture(&first.id),
      Err(Error::NotFound { entity: Entity::Lecture, .. })
    ));
  }

  #[test]
  fn lecture_may_not_end_before_it_starts() {
    let mut course = Course::new(&teacher(), new_course(5)).unwrap();
    assert!(course.add_lecture(lecture(12, 11)).is_err());
    assert!(course.lectures.is_empty());
  }
}
