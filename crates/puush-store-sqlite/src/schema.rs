//! SQL schema for the puush SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Sessions are never updated once inserted.
CREATE TABLE IF NOT EXISTS sessions (
    key    TEXT PRIMARY KEY,   -- hyphenated v4 UUID
    since  TEXT NOT NULL       -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS files (
    id        TEXT PRIMARY KEY,   -- [a-zA-Z0-9]{3,}
    session   TEXT NOT NULL REFERENCES sessions(key) ON DELETE CASCADE,
    filename  TEXT NOT NULL,
    since     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS files_session_idx ON files(session);

PRAGMA user_version = 1;
";
