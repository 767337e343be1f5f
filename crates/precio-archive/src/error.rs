//! Error type for `precio-archive`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The index record exists but does not hold `{"index": "<integer>"}`.
  #[error("corrupt index at {path:?}: {detail}")]
  CorruptIndex { path: PathBuf, detail: String },

  #[error("index update {requested} must be greater than {current}")]
  NonMonotonicUpdate { current: u32, requested: u32 },

  #[error("snapshot ordinal {ordinal} out of range (archive holds {count})")]
  OutOfRange { ordinal: u32, count: u32 },

  #[error("bad snapshot range [{first}, {top:?}) for archive holding {count}")]
  InvalidRange { first: u32, top: Option<u32>, count: u32 },

  /// A single record-set line is unusable; callers skip it.
  #[error("malformed record ({reason}): {record}")]
  MalformedRecord { record: String, reason: String },

  #[error("i/o error at {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { path, source }
  }

  pub(crate) fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::MalformedRecord { record: record.into(), reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
