//! Identifier allocator.
//!
//! Ids start [`MIN_LEN`] characters long and grow by one character each time
//! [`ATTEMPTS_PER_LEN`] consecutive candidates of the current length turn out
//! to be taken. Termination is probabilistic: 62^L outgrows any realistic
//! number of stored files long before the loop could spin for long.
//!
//! The allocator never checks existence on its own. Callers supply a
//! `try_claim` closure that atomically claims a candidate (for SQL stores an
//! `INSERT ... ON CONFLICT DO NOTHING`), so there is no window between
//! choosing an id and persisting it.

use rand::Rng;

use crate::file::FileId;

/// Characters an id is drawn from.
pub const ALPHABET: &[u8; 62] =
  b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of the first candidates.
pub const MIN_LEN: usize = 3;

/// Consecutive collisions tolerated before the length grows.
pub const ATTEMPTS_PER_LEN: u32 = 20;

/// Allocation state: the current candidate length and how many candidates of
/// that length have collided in a row.
#[derive(Debug, Clone)]
pub struct IdAllocator {
  len:        usize,
  collisions: u32,
}

impl Default for IdAllocator {
  fn default() -> Self { Self::new() }
}

impl IdAllocator {
  pub fn new() -> Self { Self { len: MIN_LEN, collisions: 0 } }

  /// Length of the next candidate.
  pub fn current_len(&self) -> usize { self.len }

  /// Draw a uniformly random id of the current length.
  pub fn candidate<R: Rng + ?Sized>(&self, rng: &mut R) -> FileId {
    let id = (0..self.len)
      .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
      .collect();
    FileId::from_alphabet(id)
  }

  /// Record that the last candidate was already taken.
  pub fn collided(&mut self) {
    self.collisions += 1;
    if self.collisions >= ATTEMPTS_PER_LEN {
      self.len += 1;
      self.collisions = 0;
    }
  }

  /// Run the allocation loop until `try_claim` accepts a candidate.
  ///
  /// `try_claim` returns `Ok(true)` once the id is durably claimed and
  /// `Ok(false)` on a uniqueness collision. Any error aborts allocation.
  pub fn allocate<R, E, F>(mut self, rng: &mut R, mut try_claim: F) -> Result<FileId, E>
  where
    R: Rng + ?Sized,
    F: FnMut(&FileId) -> Result<bool, E>,
  {
    loop {
      let id = self.candidate(rng);
      if try_claim(&id)? {
        return Ok(id);
      }
      self.collided();
    }
  }
}
