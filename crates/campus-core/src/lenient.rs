//! Permissive decoding for documents written under older schema versions.
//!
//! Stored enums show up as integer ordinals, names in any casing, numeric
//! strings, or not at all. Field names show up in camelCase (current) or
//! PascalCase (legacy). Nothing in this module fails: every helper falls
//! back to a default.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::store::Document;

// ─── Enum discriminants ──────────────────────────────────────────────────────

/// An enum that can be decoded from any historical encoding.
///
/// `Default` must be the least-privileged (or least-advanced) variant; it is
/// what unparseable values decode to.
pub trait Lenient: FromStr + Default + Copy {
  /// Map an integer ordinal to a variant, if in range.
  fn from_ordinal(ordinal: i64) -> Option<Self>;

  /// Decode a stored value, returning `None` when it is missing or not
  /// recognised.
  fn try_from_value(value: Option<&Value>) -> Option<Self> {
    match value? {
      Value::Number(n) => n.as_i64().and_then(Self::from_ordinal),
      Value::String(s) => parse_name(s),
      _ => None,
    }
  }

  /// Decode a stored value, falling back to `Default`.
  fn from_value(value: Option<&Value>) -> Self {
    Self::try_from_value(value).unwrap_or_default()
  }
}

/// Parse a variant name case-insensitively; numeric strings are treated as
/// ordinals.
pub fn parse_name<T: Lenient>(raw: &str) -> Option<T> {
  let raw = raw.trim();
  if let Ok(ordinal) = raw.parse::<i64>() {
    return T::from_ordinal(ordinal);
  }
  raw.parse().ok()
}

/// `deserialize_with` adapter for [`Lenient`] fields. Pair it with
/// `#[serde(default)]` so a missing field also decodes.
pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Lenient,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(T::from_value(value.as_ref()))
}

// ─── Field access ────────────────────────────────────────────────────────────

/// Look up `key`, falling back to its PascalCase spelling.
pub fn field<'a>(doc: &'a Document, key: &str) -> Option<&'a Value> {
  doc.get(key).or_else(|| {
    let mut chars = key.chars();
    let first = chars.next()?;
    let legacy: String = first.to_uppercase().chain(chars).collect();
    doc.get(&legacy)
  })
}

/// A string field; non-string scalars are stringified, anything else is
/// empty.
pub fn string_field(doc: &Document, key: &str) -> String {
  match field(doc, key) {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    _ => String::new(),
  }
}

pub fn optional_string_field(doc: &Document, key: &str) -> Option<String> {
  match field(doc, key) {
    Some(Value::String(s)) => Some(s.clone()),
    _ => None,
  }
}

pub fn bool_field(doc: &Document, key: &str) -> bool {
  match field(doc, key) {
    Some(Value::Bool(b)) => *b,
    Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
    _ => false,
  }
}

pub fn int_field(doc: &Document, key: &str) -> i64 {
  match field(doc, key) {
    Some(Value::Number(n)) => n
      .as_i64()
      .or_else(|| n.as_f64().map(|f| f as i64))
      .unwrap_or_default(),
    Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
    _ => 0,
  }
}

/// A set of strings; non-string members are dropped.
pub fn string_set_field(doc: &Document, key: &str) -> BTreeSet<String> {
  match field(doc, key) {
    Some(Value::Array(items)) => items
      .iter()
      .filter_map(|v| v.as_str().map(str::to_owned))
      .collect(),
    _ => BTreeSet::new(),
  }
}

/// An RFC 3339 string or integer Unix seconds; anything else yields
/// `default`.
pub fn timestamp_field(
  doc: &Document,
  key: &str,
  default: DateTime<Utc>,
) -> DateTime<Utc> {
  match field(doc, key) {
    Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
      .map(|dt| dt.with_timezone(&Utc))
      .unwrap_or(default),
    Some(Value::Number(n)) => n
      .as_i64()
      .and_then(|secs| DateTime::from_timestamp(secs, 0))
      .unwrap_or(default),
    _ => default,
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;
  use crate::user::RoleKind;

  fn doc(value: Value) -> Document {
    match value {
      Value::Object(map) => map,
      _ => panic!("test document must be an object"),
    }
  }

  #[test]
  fn role_accepts_ordinals_names_and_numeric_strings() {
    assert_eq!(RoleKind::from_value(Some(&json!(1))), RoleKind::Teacher);
    assert_eq!(RoleKind::from_value(Some(&json!("student"))), RoleKind::Student);
    assert_eq!(RoleKind::from_value(Some(&json!(" ADMIN "))), RoleKind::Admin);
    assert_eq!(RoleKind::from_value(Some(&json!("2"))), RoleKind::Student);
  }

  #[test]
  fn role_defaults_to_least_privileged() {
    assert_eq!(RoleKind::from_value(None), RoleKind::User);
    assert_eq!(RoleKind::from_value(Some(&json!(42))), RoleKind::User);
    assert_eq!(RoleKind::from_value(Some(&json!(-1))), RoleKind::User);
    assert_eq!(RoleKind::from_value(Some(&json!("superuser"))), RoleKind::User);
    assert_eq!(RoleKind::from_value(Some(&json!(["Admin"]))), RoleKind::User);
  }

  #[test]
  fn field_falls_back_to_pascal_case() {
    let d = doc(json!({ "DisplayName": "Ada", "email": "ada@example.com" }));
    assert_eq!(string_field(&d, "displayName"), "Ada");
    assert_eq!(string_field(&d, "email"), "ada@example.com");
    assert_eq!(string_field(&d, "missing"), "");
  }

  #[test]
  fn timestamps_accept_rfc3339_and_unix_seconds() {
    let fallback = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    let d = doc(json!({
      "a": "2024-03-01T10:00:00+02:00",
      "b": 1_700_000_000,
      "c": "yesterday",
    }));

    assert_eq!(
      timestamp_field(&d, "a", fallback),
      Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    );
    assert_eq!(timestamp_field(&d, "b", fallback).timestamp(), 1_700_000_000);
    assert_eq!(timestamp_field(&d, "c", fallback), fallback);
    assert_eq!(timestamp_field(&d, "d", fallback), fallback);
  }

  #[test]
  fn scalar_helpers_coerce_or_default() {
    let d = doc(json!({
      "year": "3",
      "flag": "TRUE",
      "ids": ["a", 1, "b"],
      "float": 2.9,
    }));
    assert_eq!(int_field(&d, "year"), 3);
    assert_eq!(int_field(&d, "float"), 2);
    assert!(bool_field(&d, "flag"));
    assert!(!bool_field(&d, "nope"));
    assert_eq!(
      string_set_field(&d, "ids").into_iter().collect::<Vec<_>>(),
      vec!["a".to_owned(), "b".to_owned()]
    );
  }
}
