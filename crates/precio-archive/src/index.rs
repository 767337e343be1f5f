//! [`Index`] — the crash-recoverable snapshot counter.
//!
//! The index is the only source of truth for how many snapshots exist. It is
//! persisted as `{"index": "<decimal>"}` and only ever moves forward.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  fsutil::{read_optional, write_json_atomic},
};

#[derive(Serialize, Deserialize)]
struct IndexRecord {
  index: IndexValue,
}

/// The persisted value is a decimal string; bare integers are accepted on
/// read.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IndexValue {
  Text(String),
  Number(u32),
}

#[derive(Debug)]
pub struct Index {
  resource: PathBuf,
  value:    u32,
}

impl Index {
  /// Load the index at `resource`, or create it with value 0.
  pub fn open(resource: impl Into<PathBuf>) -> Result<Self> {
    let resource = resource.into();

    let Some(text) = read_optional(&resource)? else {
      let index = Self { resource, value: 0 };
      index.persist()?;
      tracing::debug!(path = ?index.resource, "initialised snapshot index");
      return Ok(index);
    };

    let corrupt = |detail: String| Error::CorruptIndex {
      path: resource.clone(),
      detail,
    };
    let record: IndexRecord =
      serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
    let value = match record.index {
      IndexValue::Number(n) => n,
      IndexValue::Text(s) => s
        .trim()
        .parse()
        .map_err(|_| corrupt(format!("index value {s:?} is not a count")))?,
    };

    Ok(Self { resource, value })
  }

  pub fn value(&self) -> u32 { self.value }

  pub fn resource(&self) -> &Path { &self.resource }

  /// Move the counter to `update`, which must exceed the current value.
  /// The new value is on disk before this returns.
  pub fn advance(&mut self, update: u32) -> Result<()> {
    if update <= self.value {
      return Err(Error::NonMonotonicUpdate {
        current:   self.value,
        requested: update,
      });
    }
    let previous = self.value;
    self.value = update;
    if let Err(e) = self.persist() {
      self.value = previous;
      return Err(e);
    }
    Ok(())
  }

  fn persist(&self) -> Result<()> {
    let record = IndexRecord { index: IndexValue::Text(self.value.to_string()) };
    write_json_atomic(&self.resource, &record)
  }
}
