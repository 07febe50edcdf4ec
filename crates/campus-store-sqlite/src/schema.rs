//! SQL schema for the campus SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per document. Bodies are JSON objects with camelCase keys.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,   -- 'users' | 'courses' | 'enrollments' | 'identities'
    id          TEXT NOT NULL,
    body        TEXT NOT NULL,
    updated_at  TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents(collection);

PRAGMA user_version = 1;
";
