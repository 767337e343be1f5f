//! The `Warehouse` trait: the storage seam of the star schema.
//!
//! Implemented by storage backends (e.g. `precio-store-sqlite`). The ingestion
//! pipeline depends on this abstraction only. Every write is append-only;
//! nothing in the trait updates or deletes a row.

use serde::{Deserialize, Serialize};

use crate::dimension::{Dimension, Persisted, PointOfSalePlace, PriceRow};

/// Row count of every table, as reported by [`Warehouse::counts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
  pub timestamps:             u64,
  pub states:                 u64,
  pub cities:                 u64,
  pub places:                 u64,
  pub flags:                  u64,
  pub businesses:             u64,
  pub branches:               u64,
  pub points_of_sale:         u64,
  pub points_of_sale_places:  u64,
  pub article_codes:          u64,
  pub article_brands:         u64,
  pub article_descriptions:   u64,
  pub article_packages:       u64,
  pub article_cards:          u64,
  pub prices:                 u64,
}

/// Abstraction over a relational store holding the price star schema.
///
/// Each `insert_*` call is one batch and must be atomic: either every row of
/// the batch is stored or none is. Batches are not grouped into larger units.
pub trait Warehouse {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Dimensions ────────────────────────────────────────────────────────

  /// Read every persisted row of dimension `D`.
  fn load<D: Dimension>(&self) -> Result<Vec<Persisted<D>>, Self::Error>;

  /// Insert a batch of new rows of dimension `D`. A natural-key collision
  /// with an existing row fails the whole batch.
  fn insert<D: Dimension>(&mut self, rows: &[D]) -> Result<usize, Self::Error>;

  // ── Point-of-sale ⇄ place association ─────────────────────────────────

  fn load_point_of_sale_places(&self) -> Result<Vec<PointOfSalePlace>, Self::Error>;

  fn link_point_of_sale_places(
    &mut self,
    links: &[PointOfSalePlace],
  ) -> Result<usize, Self::Error>;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Append a batch of price observations. Never deduplicates.
  fn insert_prices(&mut self, rows: &[PriceRow]) -> Result<usize, Self::Error>;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn counts(&self) -> Result<TableCounts, Self::Error>;
}
