//! Typed access to the non-polymorphic collections.
//!
//! Courses and enrollments have a single shape, so they decode strictly.

use campus_core::{
  Entity, Error, Result,
  store::{Collection, DocumentStore, from_document, to_document},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub(crate) async fn find<S, T>(store: &S, collection: Collection, id: &str) -> Result<Option<T>>
where
  S: DocumentStore,
  T: DeserializeOwned,
{
  let doc = store.get(collection, id).await.map_err(Error::store)?;
  Ok(doc.map(from_document).transpose()?)
}

pub(crate) async fn load<S, T>(
  store: &S,
  collection: Collection,
  entity: Entity,
  id: &str,
) -> Result<T>
where
  S: DocumentStore,
  T: DeserializeOwned,
{
  find(store, collection, id)
    .await?
    .ok_or_else(|| Error::not_found(entity, id))
}

pub(crate) async fn save<S, T>(store: &S, collection: Collection, id: &str, record: &T) -> Result<()>
where
  S: DocumentStore,
  T: Serialize,
{
  store
    .put(collection, id, to_document(record)?)
    .await
    .map_err(Error::store)
}

/// Store `record` under a fresh `id`. `false` means the id was taken.
pub(crate) async fn create<S, T>(
  store: &S,
  collection: Collection,
  id: &str,
  record: &T,
) -> Result<bool>
where
  S: DocumentStore,
  T: Serialize,
{
  store
    .create(collection, id, to_document(record)?)
    .await
    .map_err(Error::store)
}

pub(crate) async fn query<S, T>(
  store: &S,
  collection: Collection,
  field: &str,
  value: Value,
) -> Result<Vec<T>>
where
  S: DocumentStore,
  T: DeserializeOwned,
{
  store
    .query_eq(collection, field, value)
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|d| from_document(d.body).map_err(Error::from))
    .collect()
}
