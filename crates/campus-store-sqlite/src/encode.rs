//! Encoding helpers between documents and the values stored in SQLite
//! columns.
//!
//! Timestamps are stored as RFC 3339 strings and bodies as compact JSON.
//! Query values are bound as native SQLite scalars so they compare equal to
//! what `json_extract` returns.

use campus_core::store::{Document, StoredDocument};
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Bodies ──────────────────────────────────────────────────────────────────

pub fn encode_body(body: &Document) -> Result<String> {
  Ok(serde_json::to_string(body)?)
}

pub fn decode_body(s: &str) -> serde_json::Result<Document> { serde_json::from_str(s) }

// ─── Queries ─────────────────────────────────────────────────────────────────

/// The `json_extract` path for a top-level field.
///
/// Field names are restricted to ASCII identifiers so they can be embedded
/// in the path literal.
pub fn field_path(field: &str) -> Result<String> {
  let valid = !field.is_empty()
    && field
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'_');
  if !valid {
    return Err(Error::InvalidField(field.to_owned()));
  }
  Ok(format!("$.{field}"))
}

/// Convert a JSON scalar to the SQLite value `json_extract` yields for it.
/// JSON booleans come back from SQLite as integers.
pub fn query_param(value: Value) -> Result<SqlValue> {
  match value {
    Value::String(s) => Ok(SqlValue::Text(s)),
    Value::Bool(b) => Ok(SqlValue::Integer(i64::from(b))),
    Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        Ok(SqlValue::Integer(i))
      } else if let Some(f) = n.as_f64() {
        Ok(SqlValue::Real(f))
      } else {
        Err(Error::UnsupportedQueryValue(n.to_string()))
      }
    }
    other => Err(Error::UnsupportedQueryValue(other.to_string())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub id:   String,
  pub body: String,
}

impl RawDocument {
  pub fn into_stored(self) -> Result<StoredDocument> {
    Ok(StoredDocument {
      body: decode_body(&self.body)?,
      id:   self.id,
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn scalars_bind_natively() {
    assert_eq!(query_param(json!("a")).unwrap(), SqlValue::Text("a".into()));
    assert_eq!(query_param(json!(true)).unwrap(), SqlValue::Integer(1));
    assert_eq!(query_param(json!(7)).unwrap(), SqlValue::Integer(7));
    assert_eq!(query_param(json!(1.5)).unwrap(), SqlValue::Real(1.5));
    assert!(query_param(json!(null)).is_err());
    assert!(query_param(json!(["x"])).is_err());
  }

  #[test]
  fn field_paths_are_restricted() {
    assert_eq!(field_path("courseId").unwrap(), "$.courseId");
    assert!(field_path("").is_err());
    assert!(field_path("a.b").is_err());
    assert!(field_path("x') OR 1=1 --").is_err());
  }
}
