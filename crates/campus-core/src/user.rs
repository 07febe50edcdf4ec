//! Users: a tagged union over roles, persisted as one flat document.
//!
//! The stored `role` field is the discriminant. It decides which
//! variant-specific fields a document is expected to carry; readers never
//! look at a variant field unless the role implies it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString, FromRepr};

use crate::{
  lenient::{self, Lenient},
  store::{Document, from_document, to_document},
  workflow::ReviewState,
};

/// Name of the discriminant field in stored user documents.
pub const ROLE_FIELD: &str = "role";

// ─── Enums ───────────────────────────────────────────────────────────────────

/// The role a user holds. Ordinals match the legacy integer encoding.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
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
pub enum RoleKind {
  Admin   = 0,
  Teacher = 1,
  Student = 2,
  /// Least-privileged role; what unreadable discriminants decode to.
  #[default]
  User    = 3,
}

impl Lenient for RoleKind {
  fn from_ordinal(ordinal: i64) -> Option<Self> {
    u8::try_from(ordinal).ok().and_then(Self::from_repr)
  }
}

/// Teacher approval workflow state.
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
pub enum ApprovalStatus {
  #[default]
  Pending  = 0,
  Approved = 1,
  Rejected = 2,
}

impl Lenient for ApprovalStatus {
  fn from_ordinal(ordinal: i64) -> Option<Self> {
    u8::try_from(ordinal).ok().and_then(Self::from_repr)
  }
}

impl ReviewState for ApprovalStatus {
  const PENDING: Self = Self::Pending;
}

// ─── Variant profiles ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
  /// May create other admins.
  pub is_super_admin: bool,
  #[serde(default)]
  pub access_level:   String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfile {
  pub department:      String,
  pub qualification:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub specialty:       Option<String>,
  #[serde(default, deserialize_with = "lenient::deserialize")]
  pub approval_status: ApprovalStatus,
  /// Courses this teacher owns.
  #[serde(default)]
  pub course_ids:      BTreeSet<String>,
}

impl TeacherProfile {
  /// A freshly registered teacher, awaiting approval.
  pub fn new(department: impl Into<String>, qualification: impl Into<String>) -> Self {
    Self {
      department: department.into(),
      qualification: qualification.into(),
      ..Self::default()
    }
  }

  pub fn is_approved(&self) -> bool {
    self.approval_status == ApprovalStatus::Approved
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
  /// Human-facing id, `"STU"` followed by five digits.
  pub student_id:          String,
  pub year:                i32,
  /// Courses whose enrollment has been approved.
  #[serde(default)]
  pub enrolled_course_ids: BTreeSet<String>,
}

impl StudentProfile {
  /// A new student profile with a generated [`StudentProfile::student_id`].
  pub fn new(year: i32) -> Self {
    Self {
      student_id: generate_student_id(),
      year,
      enrolled_course_ids: BTreeSet::new(),
    }
  }
}

/// `"STU"` followed by a random five-digit number.
pub fn generate_student_id() -> String {
  format!("STU{}", 10_000 + OsRng.next_u32() % 90_000)
}

pub fn is_student_id(candidate: &str) -> bool {
  candidate
    .strip_prefix("STU")
    .is_some_and(|digits| digits.len() == 5 && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// The role-specific part of a user.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
  Admin(AdminProfile),
  Teacher(TeacherProfile),
  Student(StudentProfile),
  /// A plain user with no role-specific fields.
  Basic,
}

impl Profile {
  pub fn role(&self) -> RoleKind {
    match self {
      Self::Admin(_) => RoleKind::Admin,
      Self::Teacher(_) => RoleKind::Teacher,
      Self::Student(_) => RoleKind::Student,
      Self::Basic => RoleKind::User,
    }
  }

  /// The profile a user receives when assigned `role` without further
  /// details.
  pub fn default_for(role: RoleKind) -> Self {
    match role {
      RoleKind::Admin => Self::Admin(AdminProfile::default()),
      RoleKind::Teacher => Self::Teacher(TeacherProfile::default()),
      RoleKind::Student => Self::Student(StudentProfile::new(1)),
      RoleKind::User => Self::Basic,
    }
  }

  pub fn as_teacher(&self) -> Option<&TeacherProfile> {
    match self {
      Self::Teacher(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_teacher_mut(&mut self) -> Option<&mut TeacherProfile> {
    match self {
      Self::Teacher(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_student(&self) -> Option<&StudentProfile> {
    match self {
      Self::Student(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_student_mut(&mut self) -> Option<&mut StudentProfile> {
    match self {
      Self::Student(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_admin(&self) -> Option<&AdminProfile> {
    match self {
      Self::Admin(a) => Some(a),
      _ => None,
    }
  }

  fn to_fields(&self) -> serde_json::Result<Document> {
    match self {
      Self::Admin(a) => to_document(a),
      Self::Teacher(t) => to_document(t),
      Self::Student(s) => to_document(s),
      Self::Basic => Ok(Document::new()),
    }
  }
}

// ─── Discriminant dispatch ───────────────────────────────────────────────────

/// Strict decoder for the variant-specific fields of one role.
type ProfileDecoder = fn(&Document) -> serde_json::Result<Profile>;

fn decode_fields<T: DeserializeOwned>(doc: &Document) -> serde_json::Result<T> {
  from_document(doc.clone())
}

fn decode_admin(doc: &Document) -> serde_json::Result<Profile> {
  decode_fields(doc).map(Profile::Admin)
}

fn decode_teacher(doc: &Document) -> serde_json::Result<Profile> {
  decode_fields(doc).map(Profile::Teacher)
}

fn decode_student(doc: &Document) -> serde_json::Result<Profile> {
  decode_fields(doc).map(Profile::Student)
}

fn decode_basic(_: &Document) -> serde_json::Result<Profile> { Ok(Profile::Basic) }

/// The decoder to use for a stored discriminant.
fn decoder_for(role: RoleKind) -> ProfileDecoder {
  match role {
    RoleKind::Admin => decode_admin,
    RoleKind::Teacher => decode_teacher,
    RoleKind::Student => decode_student,
    RoleKind::User => decode_basic,
  }
}

/// Field-by-field salvage of the variant fields; never fails.
fn salvage_profile(role: RoleKind, doc: &Document) -> Profile {
  match role {
    RoleKind::Admin => Profile::Admin(AdminProfile {
      is_super_admin: lenient::bool_field(doc, "isSuperAdmin"),
      access_level:   lenient::string_field(doc, "accessLevel"),
    }),
    RoleKind::Teacher => Profile::Teacher(TeacherProfile {
      department:      lenient::string_field(doc, "department"),
      qualification:   lenient::string_field(doc, "qualification"),
      specialty:       lenient::optional_string_field(doc, "specialty"),
      approval_status: ApprovalStatus::from_value(lenient::field(doc, "approvalStatus")),
      course_ids:      lenient::string_set_field(doc, "courseIds"),
    }),
    RoleKind::Student => Profile::Student(StudentProfile {
      student_id:          lenient::string_field(doc, "studentId"),
      year:                i32::try_from(lenient::int_field(doc, "year")).unwrap_or_default(),
      enrolled_course_ids: lenient::string_set_field(doc, "enrolledCourseIds"),
    }),
    RoleKind::User => Profile::Basic,
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// Fields common to every role, in their stored shape.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommonFields {
  email:        String,
  display_name: String,
  created_at:   DateTime<Utc>,
  updated_at:   DateTime<Utc>,
  last_login:   DateTime<Utc>,
}

/// A persisted user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
  /// The identity provider's subject id; never regenerated.
  pub id:           String,
  pub email:        String,
  pub display_name: String,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
  pub last_login:   DateTime<Utc>,
  pub profile:      Profile,
}

impl User {
  /// A new user with every timestamp set to now.
  pub fn new(
    id: impl Into<String>,
    email: impl Into<String>,
    display_name: impl Into<String>,
    profile: Profile,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: id.into(),
      email: email.into(),
      display_name: display_name.into(),
      created_at: now,
      updated_at: now,
      last_login: now,
      profile,
    }
  }

  /// The role is always derived from the profile variant.
  pub fn role(&self) -> RoleKind { self.profile.role() }

  /// Encode as a flat document: common fields, the `role` discriminant, and
  /// the variant's own fields.
  pub fn to_document(&self) -> serde_json::Result<Document> {
    let mut doc = to_document(&CommonFields {
      email:        self.email.clone(),
      display_name: self.display_name.clone(),
      created_at:   self.created_at,
      updated_at:   self.updated_at,
      last_login:   self.last_login,
    })?;
    doc.insert("id".to_owned(), Value::String(self.id.clone()));
    doc.insert(ROLE_FIELD.to_owned(), Value::String(self.role().to_string()));
    doc.extend(self.profile.to_fields()?);
    Ok(doc)
  }

  /// Strict decode: the permissively-parsed discriminant selects a variant
  /// decoder, which must succeed.
  pub fn decode(id: &str, doc: &Document) -> serde_json::Result<Self> {
    let role = RoleKind::from_value(lenient::field(doc, ROLE_FIELD));
    let common: CommonFields = decode_fields(doc)?;
    let profile = decoder_for(role)(doc)?;
    Ok(Self {
      id: id.to_owned(),
      email: common.email,
      display_name: common.display_name,
      created_at: common.created_at,
      updated_at: common.updated_at,
      last_login: common.last_login,
      profile,
    })
  }

  /// Manual reconstruction for documents the strict decoder rejects.
  /// Missing strings become empty, unreadable timestamps become now.
  pub fn reconstruct(id: &str, doc: &Document) -> Self {
    let now = Utc::now();
    let role = RoleKind::from_value(lenient::field(doc, ROLE_FIELD));
    Self {
      id:           id.to_owned(),
      email:        lenient::string_field(doc, "email"),
      display_name: lenient::string_field(doc, "displayName"),
      created_at:   lenient::timestamp_field(doc, "createdAt", now),
      updated_at:   lenient::timestamp_field(doc, "updatedAt", now),
      last_login:   lenient::timestamp_field(doc, "lastLogin", now),
      profile:      salvage_profile(role, doc),
    }
  }

  /// Whether the stored discriminant is already the canonical name string.
  pub fn has_canonical_role(doc: &Document) -> bool {
    let role = RoleKind::from_value(lenient::field(doc, ROLE_FIELD));
    matches!(doc.get(ROLE_FIELD), Some(Value::String(s)) if s == role.as_ref())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn doc(value: Value) -> Document {
    match value {
      Value::Object(map) => map,
      _ => panic!("test document must be an object"),
    }
  }

  #[test]
  fn student_id_has_expected_format() {
    for _ in 0..100 {
      let id = generate_student_id();
      assert!(is_student_id(&id), "bad student id {id}");
    }
    assert!(!is_student_id("STU1234"));
    assert!(!is_student_id("ABC12345"));
  }

  #[test]
  fn document_carries_discriminant_and_variant_fields() {
    let user = User::new(
      "t-1",
      "t@example.com",
      "Teach",
      Profile::Teacher(TeacherProfile::new("Maths", "PhD")),
    );
    let d = user.to_document().unwrap();
    assert_eq!(d["role"], json!("Teacher"));
    assert_eq!(d["approvalStatus"], json!("Pending"));
    assert_eq!(d["department"], json!("Maths"));
    assert!(d.get("specialty").is_none());
  }

  #[test]
  fn decode_dispatches_on_legacy_ordinal() {
    let user = User::new("s-1", "s@example.com", "Stu", Profile::Student(StudentProfile::new(2)));
    let mut d = user.to_document().unwrap();
    d.insert("role".into(), json!(2));

    let decoded = User::decode("s-1", &d).unwrap();
    assert_eq!(decoded.role(), RoleKind::Student);
    assert_eq!(decoded.profile, user.profile);
  }

  #[test]
  fn decode_rejects_missing_variant_fields() {
    let d = doc(json!({
      "role": "Teacher",
      "email": "t@example.com",
      "displayName": "T",
      "createdAt": "2024-01-01T00:00:00Z",
      "updatedAt": "2024-01-01T00:00:00Z",
      "lastLogin": "2024-01-01T00:00:00Z",
    }));
    assert!(User::decode("t", &d).is_err());
  }

  #[test]
  fn reconstruct_salvages_what_it_can() {
    let d = doc(json!({
      "Role": "teacher",
      "Email": "t@example.com",
      "department": "Physics",
      "approvalStatus": 1,
      "courseIds": ["c1", "c2"],
      "createdAt": {"seconds": 12},
    }));
    let user = User::reconstruct("t", &d);
    assert_eq!(user.role(), RoleKind::Teacher);
    assert_eq!(user.email, "t@example.com");
    assert_eq!(user.display_name, "");
    let teacher = user.profile.as_teacher().unwrap();
    assert_eq!(teacher.department, "Physics");
    assert_eq!(teacher.approval_status, ApprovalStatus::Approved);
    assert_eq!(teacher.course_ids.len(), 2);
  }

  #[test]
  fn missing_discriminant_decodes_as_plain_user() {
    let d = doc(json!({
      "email": "u@example.com",
      "displayName": "U",
      "createdAt": "2024-01-01T00:00:00Z",
      "updatedAt": "2024-01-01T00:00:00Z",
      "lastLogin": "2024-01-01T00:00:00Z",
    }));
    assert_eq!(User::decode("u", &d).unwrap().role(), RoleKind::User);
    assert_eq!(User::reconstruct("u", &d).role(), RoleKind::User);
  }

  #[test]
  fn canonical_role_detection() {
    assert!(User::has_canonical_role(&doc(json!({ "role": "Admin" }))));
    assert!(!User::has_canonical_role(&doc(json!({ "role": "admin" }))));
    assert!(!User::has_canonical_role(&doc(json!({ "role": 0 }))));
    assert!(!User::has_canonical_role(&doc(json!({}))));
  }
}
