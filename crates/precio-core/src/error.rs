//! Error types for `precio-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A persisted row did not have the shape its dimension type expects.
  #[error("cannot decode row from {table}: {detail}")]
  Decode { table: &'static str, detail: String },

  /// A snapshot timestamp label is not a valid `YYYYMMDDHHMMSS` string.
  #[error("invalid timestamp label: {0:?}")]
  InvalidTimestamp(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
