//! Integration tests for `SqliteStore` against an in-memory database.

use campus_core::store::{Collection, Document, DocumentStore};
use serde_json::{Value, json};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn doc(value: Value) -> Document {
  match value {
    Value::Object(map) => map,
    _ => panic!("test document must be an object"),
  }
}

// ─── Single documents ────────────────────────────────────────────────────────

#[tokio::test]
async fn put_and_get() {
  let s = store().await;
  s.put(Collection::Users, "u-1", doc(json!({ "email": "a@example.com" })))
    .await
    .unwrap();

  let fetched = s.get(Collection::Users, "u-1").await.unwrap().unwrap();
  assert_eq!(fetched["email"], json!("a@example.com"));
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(Collection::Users, "nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn collections_are_separate_namespaces() {
  let s = store().await;
  s.put(Collection::Users, "x", doc(json!({ "kind": "user" }))).await.unwrap();
  s.put(Collection::Courses, "x", doc(json!({ "kind": "course" }))).await.unwrap();

  let user = s.get(Collection::Users, "x").await.unwrap().unwrap();
  let course = s.get(Collection::Courses, "x").await.unwrap().unwrap();
  assert_eq!(user["kind"], json!("user"));
  assert_eq!(course["kind"], json!("course"));
}

#[tokio::test]
async fn put_overwrites_whole_document() {
  let s = store().await;
  s.put(Collection::Users, "u", doc(json!({ "a": 1, "b": 2 }))).await.unwrap();
  s.put(Collection::Users, "u", doc(json!({ "a": 3 }))).await.unwrap();

  let fetched = s.get(Collection::Users, "u").await.unwrap().unwrap();
  assert_eq!(fetched, doc(json!({ "a": 3 })));
}

#[tokio::test]
async fn create_never_overwrites() {
  let s = store().await;
  assert!(
    s.create(Collection::Enrollments, "e", doc(json!({ "status": "Pending" })))
      .await
      .unwrap()
  );
  assert!(
    !s.create(Collection::Enrollments, "e", doc(json!({ "status": "Approved" })))
      .await
      .unwrap()
  );

  let fetched = s.get(Collection::Enrollments, "e").await.unwrap().unwrap();
  assert_eq!(fetched, doc(json!({ "status": "Pending" })));

  // The same id in another collection is free.
  assert!(s.create(Collection::Courses, "e", doc(json!({}))).await.unwrap());
}

#[tokio::test]
async fn merge_keeps_untouched_fields() {
  let s = store().await;
  s.put(Collection::Users, "u", doc(json!({ "a": 1, "b": 2 }))).await.unwrap();
  s.merge(Collection::Users, "u", doc(json!({ "b": 20, "c": 30 })))
    .await
    .unwrap();

  let fetched = s.get(Collection::Users, "u").await.unwrap().unwrap();
  assert_eq!(fetched, doc(json!({ "a": 1, "b": 20, "c": 30 })));
}

#[tokio::test]
async fn merge_creates_missing_document() {
  let s = store().await;
  s.merge(Collection::Identities, "sub", doc(json!({ "role": "Student" })))
    .await
    .unwrap();

  let fetched = s.get(Collection::Identities, "sub").await.unwrap().unwrap();
  assert_eq!(fetched["role"], json!("Student"));
}

#[tokio::test]
async fn delete_is_idempotent() {
  let s = store().await;
  s.put(Collection::Courses, "c", doc(json!({}))).await.unwrap();
  s.delete(Collection::Courses, "c").await.unwrap();
  s.delete(Collection::Courses, "c").await.unwrap();
  assert!(s.get(Collection::Courses, "c").await.unwrap().is_none());
}

// ─── Queries ─────────────────────────────────────────────────────────────────

async fn seeded() -> SqliteStore {
  let s = store().await;
  for (id, course, status, active) in [
    ("e-1", "c-1", "Approved", true),
    ("e-2", "c-1", "Pending", false),
    ("e-3", "c-2", "Approved", true),
  ] {
    s.put(
      Collection::Enrollments,
      id,
      doc(json!({ "courseId": course, "status": status, "active": active, "rank": 2 })),
    )
    .await
    .unwrap();
  }
  s
}

#[tokio::test]
async fn query_eq_matches_strings() {
  let s = seeded().await;
  let hits = s
    .query_eq(Collection::Enrollments, "courseId", json!("c-1"))
    .await
    .unwrap();
  let ids: Vec<_> = hits.iter().map(|d| d.id.as_str()).collect();
  assert_eq!(ids, ["e-1", "e-2"]);
}

#[tokio::test]
async fn query_eq_matches_bools_and_numbers() {
  let s = seeded().await;
  let active = s
    .query_eq(Collection::Enrollments, "active", json!(true))
    .await
    .unwrap();
  assert_eq!(active.len(), 2);

  let ranked = s
    .query_eq(Collection::Enrollments, "rank", json!(2))
    .await
    .unwrap();
  assert_eq!(ranked.len(), 3);
}

#[tokio::test]
async fn query_eq_ignores_other_collections() {
  let s = seeded().await;
  let hits = s
    .query_eq(Collection::Users, "courseId", json!("c-1"))
    .await
    .unwrap();
  assert!(hits.is_empty());
}

#[tokio::test]
async fn query_eq_rejects_non_scalars() {
  let s = seeded().await;
  let err = s
    .query_eq(Collection::Enrollments, "courseId", json!(["c-1"]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnsupportedQueryValue(_)));

  let err = s
    .query_eq(Collection::Enrollments, "course.id", json!("c-1"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidField(_)));
}

#[tokio::test]
async fn scan_lists_in_insertion_order() {
  let s = seeded().await;
  let all = s.scan(Collection::Enrollments).await.unwrap();
  let ids: Vec<_> = all.iter().map(|d| d.id.as_str()).collect();
  assert_eq!(ids, ["e-1", "e-2", "e-3"]);
  assert!(s.scan(Collection::Courses).await.unwrap().is_empty());
}

#[tokio::test]
async fn file_backed_store_persists() {
  let dir = std::env::temp_dir().join(format!("campus-store-{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("campus.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.put(Collection::Users, "u", doc(json!({ "a": 1 }))).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get(Collection::Users, "u").await.unwrap().is_some());

  let _ = std::fs::remove_dir_all(&dir);
}
