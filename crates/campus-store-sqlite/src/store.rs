//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use campus_core::store::{Collection, Document, DocumentStore, StoredDocument};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use serde_json::Value;

use crate::{
  Error, Result,
  encode::{RawDocument, decode_body, encode_body, encode_dt, field_path, query_param},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A campus document store backed by a single SQLite file.
///
/// Clones share one underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT id, body` statement and collect the rows.
  async fn select_documents(
    &self,
    sql: &'static str,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<StoredDocument>> {
    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawDocument {
              id:   row.get(0)?,
              body: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_stored).collect()
  }
}

const UPSERT: &str = "INSERT INTO documents (collection, id, body, updated_at)
   VALUES (?1, ?2, ?3, ?4)
   ON CONFLICT (collection, id)
   DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at";

const INSERT_NEW: &str = "INSERT INTO documents (collection, id, body, updated_at)
   VALUES (?1, ?2, ?3, ?4)
   ON CONFLICT (collection, id) DO NOTHING";

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
    let id = id.to_owned();

    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection.as_str(), id],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(body.as_deref().map(decode_body).transpose()?)
  }

  async fn put(&self, collection: Collection, id: &str, document: Document) -> Result<()> {
    let id = id.to_owned();
    let body = encode_body(&document)?;
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          UPSERT,
          rusqlite::params![collection.as_str(), id, body, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn create(&self, collection: Collection, id: &str, document: Document) -> Result<bool> {
    let id = id.to_owned();
    let body = encode_body(&document)?;
    let at = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          INSERT_NEW,
          rusqlite::params![collection.as_str(), id, body, at],
        )?)
      })
      .await?;
    Ok(inserted == 1)
  }

  async fn merge(&self, collection: Collection, id: &str, fields: Document) -> Result<()> {
    let id = id.to_owned();
    let at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
          .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection.as_str(), id],
            |row| row.get(0),
          )
          .optional()?;

        let mut body = match existing {
          Some(raw) => decode_body(&raw)
            .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?,
          None => Document::new(),
        };
        body.extend(fields);
        let encoded = serde_json::to_string(&body)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

        tx.execute(
          UPSERT,
          rusqlite::params![collection.as_str(), id, encoded, at],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
    let id = id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
          rusqlite::params![collection.as_str(), id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_eq(
    &self,
    collection: Collection,
    field: &str,
    value: Value,
  ) -> Result<Vec<StoredDocument>> {
    let path = field_path(field)?;
    let param = query_param(value)?;
    tracing::trace!(%collection, field, "equality query");

    self
      .select_documents(
        "SELECT id, body FROM documents
         WHERE collection = ?1 AND json_extract(body, ?2) = ?3
         ORDER BY rowid",
        vec![collection.as_str().to_owned().into(), path.into(), param],
      )
      .await
  }

  async fn scan(&self, collection: Collection) -> Result<Vec<StoredDocument>> {
    self
      .select_documents(
        "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid",
        vec![collection.as_str().to_owned().into()],
      )
      .await
  }
}
