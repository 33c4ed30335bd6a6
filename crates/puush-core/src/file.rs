//! File records and the validated newtypes they are built from.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, allocator::ALPHABET, session::SessionKey};

/// Widest id the `files.id` column is declared to hold.
pub const MAX_ID_LEN: usize = 32;

/// Longest display name accepted, in characters.
pub const MAX_FILENAME_LEN: usize = 128;

/// Longest display name accepted, in bytes: the blob file `{id}-{name}` must
/// fit in a 255-byte path component.
pub const MAX_FILENAME_BYTES: usize = 255 - MAX_ID_LEN - 1;

// ─── FileId ──────────────────────────────────────────────────────────────────

/// Short public identifier of an uploaded file, e.g. `a1B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
  /// Validate an id received from outside (a URL path, a query).
  pub fn parse(s: &str) -> Result<Self, Error> {
    let valid = (crate::allocator::MIN_LEN..=MAX_ID_LEN).contains(&s.len())
      && s.bytes().all(|b| ALPHABET.contains(&b));
    if valid {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::InvalidFileId(s.to_owned()))
    }
  }

  /// Wrap an id the allocator built from [`ALPHABET`].
  pub(crate) fn from_alphabet(s: String) -> Self { Self(s) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl TryFrom<String> for FileId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

impl From<FileId> for String {
  fn from(id: FileId) -> Self { id.0 }
}

impl fmt::Display for FileId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Filename ────────────────────────────────────────────────────────────────

/// Caller-supplied display name, accepted only if it is safe to embed in a
/// blob path.
///
/// The name is stored verbatim and reused by [`blob_path`](crate::blob::blob_path),
/// so anything that could escape the blob root or collide with the root
/// itself is rejected rather than rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Filename(String);

impl Filename {
  pub fn parse(s: &str) -> Result<Self, Error> {
    let reject = |reason| Err(Error::InvalidFilename { name: s.to_owned(), reason });

    if s.is_empty() {
      return reject("empty");
    }
    if s == "." || s == ".." {
      return reject("reserved name");
    }
    if s.chars().count() > MAX_FILENAME_LEN {
      return reject("longer than 128 characters");
    }
    if s.len() > MAX_FILENAME_BYTES {
      return reject("longer than 222 bytes");
    }
    if s.contains(['/', '\\', '\0']) {
      return reject("contains a path separator or NUL");
    }
    Ok(Self(s.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  /// The extension including its leading dot, or `""`.
  pub fn extension(&self) -> &str {
    match self.0.rfind('.') {
      Some(0) | None => "",
      Some(i) => &self.0[i..],
    }
  }
}

impl TryFrom<String> for Filename {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

impl From<Filename> for String {
  fn from(name: Filename) -> Self { name.0 }
}

impl fmt::Display for Filename {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── FileRecord ──────────────────────────────────────────────────────────────

/// A registry row mapping a public id to its display name and owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
  pub id:       FileId,
  pub session:  SessionKey,
  pub filename: String,
  pub since:    DateTime<Utc>,
}
