//! Error type for `precio-ingest`.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("archive error: {0}")]
  Archive(#[from] precio_archive::Error),

  #[error("core error: {0}")]
  Core(#[from] precio_core::Error),

  /// A row referenced a natural key that its dependency step did not
  /// produce.
  #[error("unresolved {dimension} key {key}")]
  DimensionResolution { dimension: &'static str, key: String },

  #[error("bulk insert into {table} failed: {source}")]
  BulkInsert {
    table:  &'static str,
    #[source]
    source: BoxError,
  },

  #[error("warehouse error: {0}")]
  Store(#[source] BoxError),
}

impl Error {
  pub(crate) fn bulk<E>(table: &'static str, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::BulkInsert { table, source: Box::new(source) }
  }

  pub(crate) fn store<E>(source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(source))
  }

  pub(crate) fn unresolved(dimension: &'static str, key: impl std::fmt::Debug) -> Self {
    Self::DimensionResolution { dimension, key: format!("{key:?}") }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
