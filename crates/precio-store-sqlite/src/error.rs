//! Error type for `precio-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] precio_core::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  /// A batch was rolled back, typically on a uniqueness or foreign-key
  /// violation.
  #[error("bulk insert into {table} failed: {source}")]
  BulkInsert {
    table:  &'static str,
    #[source]
    source: rusqlite::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
