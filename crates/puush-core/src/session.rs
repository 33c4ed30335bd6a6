//! Session — the anonymous token that scopes a set of uploaded files.
//!
//! A session is created once and never mutated. Possession of the key is the
//! whole trust boundary, so keys are 128-bit random (v4) UUIDs.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Opaque session key, rendered as a hyphenated lowercase UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(Uuid);

impl SessionKey {
  /// Draw a fresh random key.
  pub fn generate() -> Self { Self(Uuid::new_v4()) }

  pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl From<Uuid> for SessionKey {
  fn from(id: Uuid) -> Self { Self(id) }
}

impl FromStr for SessionKey {
  type Err = Error;

  /// Only the 36-character hyphenated form is accepted.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || Error::InvalidSessionKey(s.to_owned());
    if s.len() != 36 {
      return Err(invalid());
    }
    Uuid::try_parse(s).map(Self).map_err(|_| invalid())
  }
}

impl fmt::Display for SessionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

/// A persisted session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub key:   SessionKey,
  pub since: DateTime<Utc>,
}
