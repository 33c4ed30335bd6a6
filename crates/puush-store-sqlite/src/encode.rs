//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Session keys are stored as
//! hyphenated lowercase UUIDs.

use chrono::{DateTime, Utc};
use puush_core::{
  file::{FileId, FileRecord},
  session::SessionKey,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── SessionKey ───────────────────────────────────────────────────────────────

pub fn encode_key(key: SessionKey) -> String { key.to_string() }

pub fn decode_key(s: &str) -> Result<SessionKey> { Ok(Uuid::parse_str(s)?.into()) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// A `files` row exactly as read from SQLite.
pub struct RawFile {
  pub id:       String,
  pub session:  String,
  pub filename: String,
  pub since:    String,
}

impl RawFile {
  pub const COLUMNS: &'static str = "id, session, filename, since";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:       row.get(0)?,
      session:  row.get(1)?,
      filename: row.get(2)?,
      since:    row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<FileRecord> {
    Ok(FileRecord {
      id:       FileId::parse(&self.id)
        .map_err(|_| Error::Corrupt(format!("file id {:?}", self.id)))?,
      session:  decode_key(&self.session)?,
      filename: self.filename,
      since:    decode_dt(&self.since)?,
    })
  }
}
