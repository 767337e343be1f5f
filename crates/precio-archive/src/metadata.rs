//! Snapshot metadata: `metadata.json` inside each snapshot directory.
//!
//! Besides the snapshot `key` and its `timestamp` label, the document holds
//! one boolean per database the snapshot has been loaded into.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use serde_json::{Map, Value};

use crate::{
  Result,
  fsutil::{read_optional, write_json_atomic},
};

pub const FILE_NAME: &str = "metadata.json";

/// Timestamp label used when a snapshot's metadata has none.
pub const DEFAULT_TIMESTAMP: &str = "00000000000000";

const KEY: &str = "key";
const TIMESTAMP: &str = "timestamp";
const LEGACY_TIMESTAMP: &str = "sample_key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
  pub key:       String,
  pub timestamp: String,
  /// Database identifier → whether the snapshot has been loaded into it.
  pub processed: BTreeMap<String, bool>,
}

impl Metadata {
  pub fn new(key: impl Into<String>, timestamp: impl Into<String>) -> Self {
    Self {
      key:       key.into(),
      timestamp: timestamp.into(),
      processed: BTreeMap::new(),
    }
  }

  /// Read the metadata of the snapshot in `dir`.
  ///
  /// Never fails: a missing or unreadable document, or missing fields, fall
  /// back to `default_key` and [`DEFAULT_TIMESTAMP`].
  pub fn read(dir: &Path, default_key: &str) -> Self {
    let resource = dir.join(FILE_NAME);
    let table = match read_optional(&resource) {
      Ok(Some(text)) => match serde_json::from_str::<Map<String, Value>>(&text) {
        Ok(table) => table,
        Err(e) => {
          tracing::warn!(path = ?resource, error = %e, "unparseable snapshot metadata");
          Map::new()
        }
      },
      Ok(None) => Map::new(),
      Err(e) => {
        tracing::warn!(path = ?resource, error = %e, "unreadable snapshot metadata");
        Map::new()
      }
    };
    Self::from_table(table, default_key)
  }

  fn from_table(table: Map<String, Value>, default_key: &str) -> Self {
    let text = |name: &str| table.get(name).and_then(Value::as_str).map(str::to_owned);

    let key = text(KEY).unwrap_or_else(|| default_key.to_owned());
    let timestamp = text(TIMESTAMP)
      .or_else(|| text(LEGACY_TIMESTAMP))
      .unwrap_or_else(|| DEFAULT_TIMESTAMP.to_owned());
    let processed = table
      .iter()
      .filter(|(name, _)| ![KEY, TIMESTAMP, LEGACY_TIMESTAMP].contains(&name.as_str()))
      .filter_map(|(name, value)| value.as_bool().map(|b| (name.clone(), b)))
      .collect();

    Self { key, timestamp, processed }
  }

  /// Whether the snapshot is recorded as loaded into `database`.
  pub fn is_processed(&self, database: &str) -> bool {
    self.processed.get(database).copied().unwrap_or(false)
  }

  /// Write the document into `dir`, replacing any previous version.
  pub fn write(&self, dir: &Path) -> Result<()> {
    let mut table = Map::new();
    table.insert(KEY.to_owned(), Value::String(self.key.clone()));
    table.insert(TIMESTAMP.to_owned(), Value::String(self.timestamp.clone()));
    for (database, done) in &self.processed {
      table.insert(database.clone(), Value::Bool(*done));
    }
    write_json_atomic(&Self::resource(dir), &table)
  }

  pub fn resource(dir: &Path) -> PathBuf { dir.join(FILE_NAME) }
}
