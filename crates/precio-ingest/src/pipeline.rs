//! [`Ingestor`] — merges one snapshot into the warehouse.
//!
//! The steps run in a fixed order and each either completes or aborts the
//! whole snapshot:
//!
//! 1. skip the snapshot if its timestamp is already stored;
//! 2. insert the timestamp;
//! 3. states, then cities, then places;
//! 4. flags, businesses and branches, then points of sale, then their place
//!    links;
//! 5. article codes, brands, descriptions and packages, then article cards;
//! 6. prices.
//!
//! Every dimension step collects candidates from the whole snapshot,
//! deduplicates them by natural key, inserts only the rows the cache lacks
//! and reloads the cache before the next step reads it.

use std::collections::HashSet;

use precio_archive::{
  Snapshot,
  records::{ArticleRecord, PointOfSaleRecord, Record},
  snapshot::Records,
};
use precio_core::{
  TableCounts, Warehouse,
  dimension::{
    ArticleBrandRow, ArticleCardRow, ArticleCodeRow, ArticleDescriptionRow,
    ArticlePackageRow, BranchRow, BusinessRow, CityRow, Dimension, FlagRow, PlaceRow,
    PointOfSalePlace, PointOfSaleRow, PriceRow, TimestampRow,
  },
  state::{is_known, state_row},
};
use serde::Serialize;

use crate::{
  Error, Result,
  cache::{DimensionCache, Lookup},
};

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Rows written by one successful ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub timestamp: String,
  /// Rows inserted per table.
  pub inserted:  TableCounts,
  /// Input rows skipped as malformed or unresolvable.
  pub skipped:   usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  /// The snapshot's timestamp was already stored; nothing was written.
  AlreadyProcessed { timestamp: String },
  Ingested(IngestReport),
}

// ─── Ingestor ────────────────────────────────────────────────────────────────

/// Loads snapshots into a warehouse, keeping its [`DimensionCache`] between
/// snapshots.
#[derive(Debug, Default)]
pub struct Ingestor {
  cache:  DimensionCache,
  marker: Option<String>,
}

impl Ingestor {
  pub fn new() -> Self { Self::default() }

  /// Record `database` in each snapshot's processed markers once it is
  /// ingested or found already ingested.
  pub fn with_marker(mut self, database: impl Into<String>) -> Self {
    self.marker = Some(database.into());
    self
  }

  pub fn cache(&self) -> &DimensionCache { &self.cache }

  /// Ingest `snapshot` into `warehouse`.
  ///
  /// On failure, batches already committed stay in the warehouse and the
  /// cache is dropped so the next snapshot starts from a fresh read.
  pub fn ingest<W: Warehouse>(
    &mut self,
    warehouse: &mut W,
    snapshot: &mut Snapshot,
  ) -> Result<Outcome> {
    let outcome = match self.run(warehouse, snapshot) {
      Ok(outcome) => outcome,
      Err(e) => {
        self.cache.invalidate_all();
        return Err(e);
      }
    };

    if let Some(database) = &self.marker {
      if let Err(e) = snapshot.mark_processed(database) {
        tracing::warn!(
          key = %snapshot.key(),
          database = %database,
          error = %e,
          "could not record processed marker"
        );
      }
    }
    Ok(outcome)
  }

  fn run<W: Warehouse>(&mut self, w: &mut W, snapshot: &Snapshot) -> Result<Outcome> {
    let cache = &mut self.cache;

    // ── 1. Idempotency ────────────────────────────────────────────────────
    let timestamp = TimestampRow::parse(snapshot.timestamp())?;
    if cache.timestamps.load(w)?.contains_key(&timestamp) {
      tracing::info!(key = %snapshot.key(), %timestamp, "snapshot already processed");
      return Ok(Outcome::AlreadyProcessed { timestamp: timestamp.to_string() });
    }

    let mut report =
      IngestReport { timestamp: timestamp.to_string(), ..Default::default() };
    let points_of_sale = read_all(snapshot.points_of_sale()?, &mut report.skipped)?;
    let articles = read_all(snapshot.articles()?, &mut report.skipped)?;
    tracing::info!(
      key = %snapshot.key(),
      %timestamp,
      points_of_sale = points_of_sale.len(),
      articles = articles.len(),
      "ingesting snapshot"
    );

    // ── 2. Timestamp ──────────────────────────────────────────────────────
    report.inserted.timestamps = merge(w, &mut cache.timestamps, [timestamp])?;
    let timestamp_id = cache.timestamps.resolve(&timestamp)?;

    // ── 3. Locations ──────────────────────────────────────────────────────
    let inserted = &mut report.inserted;
    for p in points_of_sale.iter().filter(|p| !is_known(&p.state)) {
      tracing::warn!(
        state = %p.state,
        point_of_sale = %p.point_of_sale_key,
        "unknown state code, using sentinel state"
      );
    }
    let states = points_of_sale.iter().map(|p| state_row(&p.state));
    inserted.states = merge(w, &mut cache.states, states)?;

    let cities = points_of_sale
      .iter()
      .map(|p| city_of(cache, p))
      .collect::<Result<Vec<_>>>()?;
    inserted.cities = merge(w, &mut cache.cities, cities)?;

    let places = points_of_sale
      .iter()
      .map(|p| place_of(cache, p))
      .collect::<Result<Vec<_>>>()?;
    inserted.places = merge(w, &mut cache.places, places)?;

    // ── 4. Points of sale ─────────────────────────────────────────────────
    let flags = points_of_sale.iter().map(|p| FlagRow::new(&p.flag));
    inserted.flags = merge(w, &mut cache.flags, flags)?;
    let businesses = points_of_sale.iter().map(|p| BusinessRow::new(&p.business));
    inserted.businesses = merge(w, &mut cache.businesses, businesses)?;
    let branches = points_of_sale.iter().map(|p| BranchRow::new(&p.branch));
    inserted.branches = merge(w, &mut cache.branches, branches)?;

    let rows = points_of_sale
      .iter()
      .map(|p| point_of_sale_of(cache, p))
      .collect::<Result<Vec<_>>>()?;
    inserted.points_of_sale = merge(w, &mut cache.points_of_sale, rows)?;

    inserted.points_of_sale_places = link_places(w, cache, &points_of_sale)?;

    // ── 5. Article taxonomy ───────────────────────────────────────────────
    let codes = articles.iter().map(|a| ArticleCodeRow::new(&a.article_code));
    inserted.article_codes = merge(w, &mut cache.article_codes, codes)?;
    let brands = articles.iter().map(|a| ArticleBrandRow::new(&a.brand));
    inserted.article_brands = merge(w, &mut cache.article_brands, brands)?;
    let descriptions = articles.iter().map(|a| ArticleDescriptionRow::new(&a.description));
    inserted.article_descriptions = merge(w, &mut cache.article_descriptions, descriptions)?;
    let packages = articles.iter().map(|a| ArticlePackageRow::new(&a.package));
    inserted.article_packages = merge(w, &mut cache.article_packages, packages)?;

    let cards = articles
      .iter()
      .map(|a| article_card_of(cache, a))
      .collect::<Result<Vec<_>>>()?;
    inserted.article_cards = merge(w, &mut cache.article_cards, cards)?;

    // ── 6. Prices ─────────────────────────────────────────────────────────
    let mut prices = Vec::with_capacity(articles.len());
    for article in &articles {
      match price_of(cache, article, timestamp_id) {
        Ok(price) => prices.push(price),
        Err(e) => {
          tracing::warn!(
            error = %e,
            article = %article.article_code,
            point_of_sale = %article.point_of_sale_key,
            "skipping price"
          );
          report.skipped += 1;
        }
      }
    }
    report.inserted.prices =
      count(w.insert_prices(&prices).map_err(|e| Error::bulk("prices", e))?);

    tracing::info!(
      key = %snapshot.key(),
      %timestamp,
      prices = report.inserted.prices,
      skipped = report.skipped,
      "snapshot ingested"
    );
    Ok(Outcome::Ingested(report))
  }
}

// ─── Steps ───────────────────────────────────────────────────────────────────

/// Collect a record set, logging and counting malformed lines.
fn read_all<R: Record>(mut records: Records<R>, skipped: &mut usize) -> Result<Vec<R>> {
  let mut rows = Vec::new();
  while let Some(item) = records.next() {
    match item {
      Ok(row) => rows.push(row),
      Err(e @ precio_archive::Error::MalformedRecord { .. }) => {
        tracing::warn!(
          set = R::NAME,
          line = records.line_no(),
          error = %e,
          "skipping malformed record"
        );
        *skipped += 1;
      }
      Err(e) => return Err(e.into()),
    }
  }
  Ok(rows)
}

/// Insert the candidates `lookup` does not know yet, once each, and reload
/// it. Returns the number of rows inserted.
fn merge<W, D>(
  w: &mut W,
  lookup: &mut Lookup<D>,
  candidates: impl IntoIterator<Item = D>,
) -> Result<u64>
where
  W: Warehouse,
  D: Dimension,
{
  let known = lookup.load(w)?;
  let mut seen = HashSet::new();
  let fresh: Vec<D> = candidates
    .into_iter()
    .filter(|row| {
      let key = row.key();
      !known.contains_key(&key) && seen.insert(key)
    })
    .collect();
  if fresh.is_empty() {
    return Ok(0);
  }

  let inserted = w.insert(&fresh).map_err(|e| Error::bulk(D::TABLE, e))?;
  lookup.reload(w)?;
  tracing::info!(table = D::TABLE, rows = inserted, "inserted dimension rows");
  Ok(count(inserted))
}

fn link_places<W: Warehouse>(
  w: &mut W,
  cache: &mut DimensionCache,
  points_of_sale: &[PointOfSaleRecord],
) -> Result<u64> {
  let mut fresh = Vec::new();
  {
    let mut pending = HashSet::new();
    let mut candidates = Vec::with_capacity(points_of_sale.len());
    for p in points_of_sale {
      let place = place_of(cache, p)?;
      candidates.push(PointOfSalePlace {
        point_of_sale_id: cache.points_of_sale.resolve(&p.point_of_sale_key)?,
        place_id:         cache.places.resolve(&place.key())?,
      });
    }
    let known = cache.point_of_sale_places(w)?;
    for link in candidates {
      let linked = known
        .get(&link.point_of_sale_id)
        .is_some_and(|places| places.contains(&link.place_id));
      if !linked && pending.insert(link) {
        fresh.push(link);
      }
    }
  }
  if fresh.is_empty() {
    return Ok(0);
  }

  let inserted = w
    .link_point_of_sale_places(&fresh)
    .map_err(|e| Error::bulk("points_of_sale_places", e))?;
  let known = cache.point_of_sale_places(w)?;
  for link in fresh {
    known.entry(link.point_of_sale_id).or_default().insert(link.place_id);
  }
  tracing::info!(table = "points_of_sale_places", rows = inserted, "linked places");
  Ok(count(inserted))
}

fn city_of(cache: &DimensionCache, p: &PointOfSaleRecord) -> Result<CityRow> {
  let state_id = cache.states.resolve(&state_row(&p.state).code)?;
  Ok(CityRow { name: p.city.clone(), state_id })
}

fn place_of(cache: &DimensionCache, p: &PointOfSaleRecord) -> Result<PlaceRow> {
  let city_id = cache.cities.resolve(&city_of(cache, p)?.key())?;
  Ok(PlaceRow { address: p.address.clone(), city_id })
}

fn point_of_sale_of(
  cache: &DimensionCache,
  p: &PointOfSaleRecord,
) -> Result<PointOfSaleRow> {
  Ok(PointOfSaleRow {
    code:        p.point_of_sale_key.clone(),
    flag_id:     cache.flags.resolve(&p.flag)?,
    business_id: cache.businesses.resolve(&p.business)?,
    branch_id:   cache.branches.resolve(&p.branch)?,
  })
}

fn article_card_of(cache: &DimensionCache, a: &ArticleRecord) -> Result<ArticleCardRow> {
  Ok(ArticleCardRow {
    brand_id:       cache.article_brands.resolve(&a.brand)?,
    description_id: cache.article_descriptions.resolve(&a.description)?,
    package_id:     cache.article_packages.resolve(&a.package)?,
    code_id:        cache.article_codes.resolve(&a.article_code)?,
  })
}

fn price_of(
  cache: &DimensionCache,
  a: &ArticleRecord,
  timestamp_id: i64,
) -> Result<PriceRow> {
  Ok(PriceRow {
    amount: a.price,
    timestamp_id,
    article_code_id: cache.article_codes.resolve(&a.article_code)?,
    point_of_sale_id: cache.points_of_sale.resolve(&a.point_of_sale_key)?,
  })
}

fn count(rows: usize) -> u64 { u64::try_from(rows).unwrap_or(u64::MAX) }
