//! [`SqliteStore`] — the SQLite implementation of [`FileRegistry`].

use std::{
  path::Path,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::Utc;
use rand::{SeedableRng as _, rngs::StdRng};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use puush_core::{
  allocator::IdAllocator,
  file::{FileId, FileRecord, Filename},
  registry::FileRegistry,
  session::{Session, SessionKey},
};

use crate::{
  encode::{RawFile, encode_dt, encode_key},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A puush file registry backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection and random source are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  rng:  Arc<Mutex<StdRng>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the id allocator's random source, e.g. with a seeded generator
  /// to make allocation reproducible.
  pub fn with_rng(self, rng: StdRng) -> Self {
    Self { rng: Arc::new(Mutex::new(rng)), ..self }
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
    })
  }

  #[cfg(test)]
  pub(crate) fn conn(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

fn session_row_exists(conn: &rusqlite::Connection, key: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM sessions WHERE key = ?1", rusqlite::params![key], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn select_files(conn: &rusqlite::Connection, key: &str) -> rusqlite::Result<Vec<RawFile>> {
  let mut stmt = conn.prepare_cached(&format!(
    "SELECT {} FROM files WHERE session = ?1 ORDER BY rowid",
    RawFile::COLUMNS
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![key], RawFile::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── FileRegistry impl ───────────────────────────────────────────────────────

impl FileRegistry for SqliteStore {
  type Error = Error;

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self) -> Result<Session> {
    let session = Session { key: SessionKey::generate(), since: Utc::now() };

    let key_str = encode_key(session.key);
    let at_str  = encode_dt(session.since);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (key, since) VALUES (?1, ?2)",
          rusqlite::params![key_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn session_exists(&self, key: SessionKey) -> Result<bool> {
    let key_str = encode_key(key);
    let exists = self
      .conn
      .call(move |conn| Ok(session_row_exists(conn, &key_str)?))
      .await?;
    Ok(exists)
  }

  async fn delete_session(&self, key: SessionKey) -> Result<Vec<FileRecord>> {
    let key_str = encode_key(key);

    let removed: Option<Vec<RawFile>> = self
      .conn
      .call(move |conn| {
        let tx    = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let files = select_files(&tx, &key_str)?;
        let gone  = tx.execute("DELETE FROM sessions WHERE key = ?1", rusqlite::params![key_str])?;
        tx.commit()?;
        Ok((gone == 1).then_some(files))
      })
      .await?;

    removed
      .ok_or(puush_core::Error::SessionNotFound(key))?
      .into_iter()
      .map(RawFile::into_record)
      .collect()
  }

  // ── Files ─────────────────────────────────────────────────────────────────

  async fn register_file(&self, session: SessionKey, filename: Filename) -> Result<FileId> {
    let key_str   = encode_key(session);
    let at_str    = encode_dt(Utc::now());
    let name: String = filename.into();
    let rng       = Arc::clone(&self.rng);

    // The session check and every claim attempt share one write transaction,
    // and each claim is a single conditional insert: a collision shows up as
    // zero affected rows instead of a constraint error.
    let claimed: Option<FileId> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !session_row_exists(&tx, &key_str)? {
          return Ok(None);
        }

        let id = {
          let mut rng    = rng.lock().unwrap_or_else(PoisonError::into_inner);
          let mut insert = tx.prepare_cached(
            "INSERT INTO files (id, session, filename, since)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO NOTHING",
          )?;
          IdAllocator::new().allocate(&mut *rng, |id| {
            let inserted =
              insert.execute(rusqlite::params![id.as_str(), key_str, name, at_str])?;
            Ok::<_, rusqlite::Error>(inserted == 1)
          })?
        };

        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    Ok(claimed.ok_or(puush_core::Error::SessionNotFound(session))?)
  }

  async fn lookup_file(&self, id: FileId, session: Option<SessionKey>) -> Result<Option<String>> {
    let key_str = session.map(encode_key);

    let filename: Option<String> = self
      .conn
      .call(move |conn| {
        let found = match key_str {
          None => conn
            .query_row(
              "SELECT filename FROM files WHERE id = ?1",
              rusqlite::params![id.as_str()],
              |row| row.get(0),
            )
            .optional()?,
          Some(k) => conn
            .query_row(
              "SELECT filename FROM files WHERE id = ?1 AND session = ?2",
              rusqlite::params![id.as_str(), k],
              |row| row.get(0),
            )
            .optional()?,
        };
        Ok(found)
      })
      .await?;

    Ok(filename)
  }

  async fn delete_file(&self, session: SessionKey, id: FileId) -> Result<String> {
    let key_str = encode_key(session);
    let id_str  = id.as_str().to_owned();

    let removed: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "DELETE FROM files WHERE id = ?1 AND session = ?2 RETURNING filename",
              rusqlite::params![id_str, key_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(removed.ok_or(puush_core::Error::FileNotFound(id))?)
  }

  async fn list_files(&self, session: SessionKey) -> Result<Vec<FileRecord>> {
    let key_str = encode_key(session);

    let raws: Vec<RawFile> = self
      .conn
      .call(move |conn| Ok(select_files(conn, &key_str)?))
      .await?;

    raws.into_iter().map(RawFile::into_record).collect()
  }
}
