//! In-memory natural-key lookups over the persisted dimension tables.
//!
//! A [`Lookup`] is filled by one full-table read and must be reloaded after
//! every insert into its table; a dependent dimension may only be resolved
//! once the lookups it depends on have been reloaded.

use std::collections::{HashMap, HashSet};

use precio_core::{
  Warehouse,
  dimension::{
    ArticleBrandRow, ArticleCardRow, ArticleCodeRow, ArticleDescriptionRow,
    ArticlePackageRow, BranchRow, BusinessRow, CityRow, Dimension, FlagRow, PlaceRow,
    PointOfSaleRow, StateRow, TimestampRow,
  },
};

use crate::{Error, Result};

// ─── Lookup ──────────────────────────────────────────────────────────────────

/// Natural key → surrogate id for one dimension table.
#[derive(Debug)]
pub struct Lookup<D: Dimension> {
  ids: Option<HashMap<D::Key, i64>>,
}

impl<D: Dimension> Default for Lookup<D> {
  fn default() -> Self { Self { ids: None } }
}

impl<D: Dimension> Lookup<D> {
  pub fn new() -> Self { Self::default() }

  #[cfg(test)]
  fn is_loaded(&self) -> bool { self.ids.is_some() }

  /// The loaded map, reading the whole table first if needed.
  pub fn load<W: Warehouse>(&mut self, warehouse: &W) -> Result<&HashMap<D::Key, i64>> {
    if self.ids.is_none() {
      self.reload(warehouse)?;
    }
    Ok(self.ids.get_or_insert_with(HashMap::new))
  }

  /// Drop the map; the next [`Lookup::load`] re-reads the table.
  pub fn invalidate(&mut self) { self.ids = None; }

  pub fn reload<W: Warehouse>(&mut self, warehouse: &W) -> Result<()> {
    let rows = warehouse.load::<D>().map_err(Error::store)?;
    let ids: HashMap<_, _> = rows.into_iter().map(|p| (p.row.key(), p.id)).collect();
    tracing::debug!(table = D::TABLE, rows = ids.len(), "dimension cache loaded");
    self.ids = Some(ids);
    Ok(())
  }

  /// Id of `key`, if the lookup is loaded and holds it.
  pub fn get(&self, key: &D::Key) -> Option<i64> {
    self.ids.as_ref()?.get(key).copied()
  }

  /// Like [`Lookup::get`], but a missing key is a
  /// [`Error::DimensionResolution`].
  pub fn resolve(&self, key: &D::Key) -> Result<i64> {
    self.get(key).ok_or_else(|| Error::unresolved(D::TABLE, key))
  }
}

// ─── DimensionCache ──────────────────────────────────────────────────────────

/// One [`Lookup`] per dimension, plus the known places of every point of sale.
#[derive(Debug, Default)]
pub struct DimensionCache {
  pub timestamps:           Lookup<TimestampRow>,
  pub states:               Lookup<StateRow>,
  pub cities:               Lookup<CityRow>,
  pub places:               Lookup<PlaceRow>,
  pub flags:                Lookup<FlagRow>,
  pub businesses:           Lookup<BusinessRow>,
  pub branches:             Lookup<BranchRow>,
  pub points_of_sale:       Lookup<PointOfSaleRow>,
  pub article_codes:        Lookup<ArticleCodeRow>,
  pub article_brands:       Lookup<ArticleBrandRow>,
  pub article_descriptions: Lookup<ArticleDescriptionRow>,
  pub article_packages:     Lookup<ArticlePackageRow>,
  pub article_cards:        Lookup<ArticleCardRow>,
  point_of_sale_places:     Option<HashMap<i64, HashSet<i64>>>,
}

impl DimensionCache {
  pub fn new() -> Self { Self::default() }

  /// Point-of-sale id → ids of its linked places.
  pub fn point_of_sale_places<W: Warehouse>(
    &mut self,
    warehouse: &W,
  ) -> Result<&mut HashMap<i64, HashSet<i64>>> {
    if self.point_of_sale_places.is_none() {
      let links = warehouse.load_point_of_sale_places().map_err(Error::store)?;
      let mut map: HashMap<i64, HashSet<i64>> = HashMap::new();
      for link in links {
        map.entry(link.point_of_sale_id).or_default().insert(link.place_id);
      }
      tracing::debug!(points_of_sale = map.len(), "point-of-sale places loaded");
      self.point_of_sale_places = Some(map);
    }
    Ok(self.point_of_sale_places.get_or_insert_with(HashMap::new))
  }

  /// Drop every lookup.
  pub fn invalidate_all(&mut self) { *self = Self::default(); }
}

#[cfg(test)]
mod tests {
  use precio_store_sqlite::SqliteWarehouse;

  use super::*;

  #[test]
  fn lookup_sees_rows_only_after_reload() {
    let mut w = SqliteWarehouse::open_in_memory().unwrap();
    let mut flags = Lookup::<FlagRow>::new();
    assert!(!flags.is_loaded());
    assert!(flags.load(&w).unwrap().is_empty());

    w.insert(&[FlagRow::new("dia")]).unwrap();
    assert_eq!(flags.get(&"dia".to_owned()), None);

    flags.reload(&w).unwrap();
    assert!(flags.get(&"dia".to_owned()).is_some());
  }

  #[test]
  fn invalidate_forces_reread() {
    let mut w = SqliteWarehouse::open_in_memory().unwrap();
    let mut flags = Lookup::<FlagRow>::new();
    flags.load(&w).unwrap();
    w.insert(&[FlagRow::new("coto")]).unwrap();

    flags.invalidate();
    assert!(flags.get(&"coto".to_owned()).is_none());
    assert_eq!(flags.load(&w).unwrap().len(), 1);
  }

  #[test]
  fn resolve_names_dimension_and_key() {
    let w = SqliteWarehouse::open_in_memory().unwrap();
    let mut states = Lookup::<StateRow>::new();
    states.load(&w).unwrap();
    match states.resolve(&"ar-b".to_owned()) {
      Err(Error::DimensionResolution { dimension, key }) => {
        assert_eq!(dimension, "states");
        assert!(key.contains("ar-b"));
      }
      other => panic!("expected DimensionResolution, got {other:?}"),
    }
  }
}
