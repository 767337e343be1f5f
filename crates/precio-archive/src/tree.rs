//! [`Archive`] — the tree store that allocates and enumerates snapshots.

use std::{
  fs,
  path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, Offset as _, Utc};

use crate::{
  Error, Result,
  index::Index,
  metadata::Metadata,
  path::{Digits, MAX_ORDINALS},
  snapshot::Snapshot,
};

pub const INDEX_FILE: &str = "index.json";
pub const ROOT_DIR: &str = "root";

/// Format `now`, shifted by `offset`, as a `YYYYMMDDHHMMSS` label.
pub fn timestamp_label(now: DateTime<Utc>, offset: FixedOffset) -> String {
  now.with_timezone(&offset).format("%Y%m%d%H%M%S").to_string()
}

/// A sample archive rooted at one directory.
///
/// Assumes a single writer process; there is no locking.
#[derive(Debug)]
pub struct Archive {
  home:       PathBuf,
  root:       PathBuf,
  index:      Index,
  utc_offset: FixedOffset,
}

impl Archive {
  /// Open (or create) the archive at `home`.
  pub fn open(home: impl Into<PathBuf>) -> Result<Self> {
    let home = home.into();
    let root = home.join(ROOT_DIR);
    fs::create_dir_all(&root).map_err(Error::io(&root))?;

    let index = Index::open(home.join(INDEX_FILE))?;
    if index.value() > MAX_ORDINALS {
      return Err(Error::CorruptIndex {
        path:   index.resource().to_path_buf(),
        detail: format!("index {} exceeds capacity {MAX_ORDINALS}", index.value()),
      });
    }

    Ok(Self { home, root, index, utc_offset: Utc.fix() })
  }

  /// Offset applied to the wall clock when labelling new snapshots.
  pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
    self.utc_offset = offset;
    self
  }

  pub fn home(&self) -> &Path { &self.home }

  pub fn root(&self) -> &Path { &self.root }

  /// Number of snapshots, i.e. the current index value.
  pub fn len(&self) -> u32 { self.index.value() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Allocate the next snapshot, labelled with the current wall clock.
  pub fn create_snapshot(&mut self) -> Result<Snapshot> {
    let label = timestamp_label(Utc::now(), self.utc_offset);
    self.create_snapshot_at(&label)
  }

  /// Allocate the next snapshot with an explicit timestamp label.
  ///
  /// The directory and metadata are written before the index is advanced.
  /// A crash in between leaves an orphan directory past the index; the next
  /// call reuses it.
  pub fn create_snapshot_at(&mut self, timestamp: &str) -> Result<Snapshot> {
    let ordinal = self.index.value();
    let digits = Digits::encode(ordinal).ok_or(Error::OutOfRange {
      ordinal,
      count: MAX_ORDINALS,
    })?;
    let home = digits.path_under(&self.root);

    if home.exists() {
      tracing::warn!(path = ?home, ordinal, "reusing orphan snapshot directory");
    }
    fs::create_dir_all(&home).map_err(Error::io(&home))?;

    let metadata = Metadata::new(digits.key(), timestamp);
    metadata.write(&home)?;
    self.index.advance(ordinal + 1)?;

    tracing::info!(ordinal, key = %metadata.key, timestamp, "created snapshot");
    Ok(Snapshot::new(home, ordinal, metadata))
  }

  /// Clear the processed markers of every snapshot. Snapshots whose metadata
  /// cannot be rewritten are logged and skipped. Returns how many were reset.
  pub fn reset_markers(&self) -> Result<usize> {
    let mut reset = 0;
    for snapshot in self.iterate(0, None)? {
      let mut snapshot = snapshot?;
      match snapshot.clear_markers() {
        Ok(()) => reset += 1,
        Err(e) => tracing::error!(
          key = %snapshot.key(),
          timestamp = %snapshot.timestamp(),
          error = %e,
          "could not reset snapshot markers"
        ),
      }
    }
    Ok(reset)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Load snapshot `ordinal`; it must be below [`Archive::len`].
  pub fn get_snapshot(&self, ordinal: u32) -> Result<Snapshot> {
    let count = self.len();
    if ordinal >= count {
      return Err(Error::OutOfRange { ordinal, count });
    }
    self.load(ordinal)
  }

  /// Snapshots with `first <= ordinal < top`, in ordinal order. `top` of
  /// `None` means the current index value.
  pub fn iterate(&self, first: u32, top: Option<u32>) -> Result<Snapshots<'_>> {
    let count = self.len();
    let end = top.unwrap_or(count);
    if first > end || end > count {
      return Err(Error::InvalidRange { first, top, count });
    }
    Ok(Snapshots { archive: self, next: first, top: end })
  }

  fn load(&self, ordinal: u32) -> Result<Snapshot> {
    let digits = Digits::encode(ordinal).ok_or(Error::OutOfRange {
      ordinal,
      count: MAX_ORDINALS,
    })?;
    let home = digits.path_under(&self.root);
    let metadata = Metadata::read(&home, &digits.key());
    Ok(Snapshot::new(home, ordinal, metadata))
  }
}

/// Lazy, finite iterator over a range of snapshots.
///
/// Nothing is cached between calls; a new [`Archive::iterate`] restarts from
/// any ordinal.
pub struct Snapshots<'a> {
  archive: &'a Archive,
  next:    u32,
  top:     u32,
}

impl Iterator for Snapshots<'_> {
  type Item = Result<Snapshot>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.next >= self.top {
      return None;
    }
    let ordinal = self.next;
    self.next += 1;
    Some(self.archive.load(ordinal))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = self.top.saturating_sub(self.next) as usize;
    (left, Some(left))
  }
}
