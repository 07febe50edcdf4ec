//! The `DocumentStore` trait and document helpers.
//!
//! The trait is implemented by storage backends (e.g. `campus-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.
//! Every operation addresses exactly one document or one collection scan;
//! there are no multi-document transactions.

use std::{fmt, future::Future};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A stored document: a JSON object with camelCase field names.
pub type Document = serde_json::Map<String, Value>;

/// Top-level document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Users,
  Courses,
  Enrollments,
  /// Server-side attributes kept by the token identity provider.
  Identities,
}

impl Collection {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Users => "users",
      Self::Courses => "courses",
      Self::Enrollments => "enrollments",
      Self::Identities => "identities",
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A document together with the id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
  pub id:   String,
  pub body: Document,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a document store backend.
///
/// Writes to a single document are atomic and last-write-wins. All methods
/// return `Send` futures so the trait can be used in multi-threaded async
/// runtimes.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch one document. Returns `None` if not found.
  fn get<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Create or fully overwrite a document.
  fn put<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
    document: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Write a document only if `id` is free. Returns `false`, leaving the
  /// stored document untouched, when one already exists.
  fn create<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
    document: Document,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Merge top-level `fields` into a document, creating it if missing.
  /// Fields not named in `fields` are left untouched.
  fn merge<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
    fields: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove a document. Removing a missing document succeeds.
  fn delete<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// All documents whose top-level `field` equals the scalar `value`.
  fn query_eq<'a>(
    &'a self,
    collection: Collection,
    field: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<Vec<StoredDocument>, Self::Error>> + Send + 'a;

  /// Every document in a collection.
  fn scan(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<Vec<StoredDocument>, Self::Error>> + Send + '_;
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Serialise a value that must encode as a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> serde_json::Result<Document> {
  match serde_json::to_value(value)? {
    Value::Object(map) => Ok(map),
    other => Err(serde::ser::Error::custom(format!(
      "expected a JSON object, got {other}"
    ))),
  }
}

pub fn from_document<T: DeserializeOwned>(
  document: Document,
) -> serde_json::Result<T> {
  serde_json::from_value(Value::Object(document))
}
