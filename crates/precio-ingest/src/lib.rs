//! Idempotent loading of archived snapshots into a price [`Warehouse`].
//!
//! [`Ingestor`] merges one [`Snapshot`] into the star schema, dimension by
//! dimension in dependency order, then appends its price facts. [`sweep`]
//! drives it over a range of the archive.
//!
//! [`Warehouse`]: precio_core::Warehouse
//! [`Snapshot`]: precio_archive::Snapshot

pub mod cache;
pub mod error;
pub mod pipeline;
pub mod sweep;

pub use cache::{DimensionCache, Lookup};
pub use error::{Error, Result};
pub use pipeline::{IngestReport, Ingestor, Outcome};
pub use sweep::{SweepReport, sweep};

#[cfg(test)]
mod tests;
