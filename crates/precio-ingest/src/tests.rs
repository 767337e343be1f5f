//! Pipeline tests against an on-disk archive and an in-memory warehouse.

use std::path::Path;

use precio_archive::{
  Archive, Snapshot,
  metadata::Metadata,
  records::{ArticleRecord, PointOfSaleRecord},
};
use precio_core::{
  TableCounts, Warehouse,
  dimension::{CityRow, FlagRow, PointOfSaleRow, StateRow},
};
use precio_store_sqlite::SqliteWarehouse;
use tempfile::TempDir;

use crate::{Error, Ingestor, Outcome, sweep};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn pos(code: &str, state: &str, city: &str, address: &str, flag: &str) -> PointOfSaleRecord {
  PointOfSaleRecord {
    point_of_sale_code: Some(code.into()),
    state:              state.into(),
    city:               city.into(),
    address:            address.into(),
    flag:               flag.into(),
    business:           format!("{flag} s.a."),
    branch:             format!("{flag} {city}"),
    point_of_sale_key:  format!("({code})({flag})"),
    city_key:           None,
    place_key:          None,
  }
}

fn article(code: &str, brand: &str, price: i64, point_of_sale_key: &str) -> ArticleRecord {
  ArticleRecord {
    article_code:       code.into(),
    brand:              brand.into(),
    description:        format!("{brand} description"),
    package:            "1 un".into(),
    price,
    point_of_sale_code: None,
    point_of_sale_key:  point_of_sale_key.into(),
    article_card_key:   None,
  }
}

fn standard_points_of_sale() -> Vec<PointOfSaleRecord> {
  vec![
    pos("1", "ar-b", "la plata", "calle 7 100", "dia"),
    pos("2", "ar-c", "caba", "corrientes 1000", "coto"),
  ]
}

fn standard_articles() -> Vec<ArticleRecord> {
  vec![
    article("779", "coca-cola", 199_999, "(1)(dia)"),
    article("779", "coca-cola", 205_000, "(2)(coto)"),
    article("780", "pepsi", 150_000, "(2)(coto)"),
  ]
}

struct Fixture {
  _dir:      TempDir,
  archive:   Archive,
  warehouse: SqliteWarehouse,
}

impl Fixture {
  fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let archive = Archive::open(dir.path()).unwrap();
    let warehouse = SqliteWarehouse::open_in_memory().unwrap();
    Self { _dir: dir, archive, warehouse }
  }

  fn snapshot(
    &mut self,
    timestamp: &str,
    points_of_sale: &[PointOfSaleRecord],
    articles: &[ArticleRecord],
  ) -> Snapshot {
    let snapshot = self.archive.create_snapshot_at(timestamp).unwrap();
    snapshot.write_points_of_sale(points_of_sale).unwrap();
    snapshot.write_articles(articles).unwrap();
    snapshot
  }

  fn standard(&mut self, timestamp: &str) -> Snapshot {
    self.snapshot(timestamp, &standard_points_of_sale(), &standard_articles())
  }
}

fn ingested(outcome: Outcome) -> crate::IngestReport {
  match outcome {
    Outcome::Ingested(report) => report,
    other => panic!("expected Ingested, got {other:?}"),
  }
}

fn metadata(dir: &Path) -> Metadata { Metadata::read(dir, "") }

// ─── Full ingestion ──────────────────────────────────────────────────────────

#[test]
fn fresh_snapshot_populates_every_table() {
  let mut f = Fixture::new();
  let mut snap = f.standard("20250829191500");

  let report = ingested(Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap());
  assert_eq!(report.timestamp, "20250829191500");
  assert_eq!(report.skipped, 0);

  let counts = f.warehouse.counts().unwrap();
  assert_eq!(counts, report.inserted);
  assert_eq!(counts.timestamps, 1);
  assert_eq!(counts.states, 2);
  assert_eq!(counts.cities, 2);
  assert_eq!(counts.places, 2);
  assert_eq!(counts.flags, 2);
  assert_eq!(counts.businesses, 2);
  assert_eq!(counts.branches, 2);
  assert_eq!(counts.points_of_sale, 2);
  assert_eq!(counts.points_of_sale_places, 2);
  assert_eq!(counts.article_codes, 2);
  assert_eq!(counts.article_brands, 2);
  assert_eq!(counts.article_descriptions, 2);
  assert_eq!(counts.article_packages, 1);
  assert_eq!(counts.article_cards, 2);
  assert_eq!(counts.prices, 3);
}

#[test]
fn same_snapshot_twice_is_already_processed() {
  let mut f = Fixture::new();
  let mut snap = f.standard("20250829191500");
  let mut ingestor = Ingestor::new();

  ingested(ingestor.ingest(&mut f.warehouse, &mut snap).unwrap());
  let after_first = f.warehouse.counts().unwrap();

  let outcome = ingestor.ingest(&mut f.warehouse, &mut snap).unwrap();
  assert_eq!(
    outcome,
    Outcome::AlreadyProcessed { timestamp: "20250829191500".into() }
  );
  assert_eq!(f.warehouse.counts().unwrap(), after_first);

  // A fresh ingestor reads the timestamp back from the warehouse.
  let outcome = Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap();
  assert!(matches!(outcome, Outcome::AlreadyProcessed { .. }));
  assert_eq!(f.warehouse.counts().unwrap(), after_first);
}

#[test]
fn later_snapshot_with_same_dimensions_adds_only_timestamp_and_prices() {
  let mut f = Fixture::new();
  let mut first = f.standard("20250829191500");
  let mut second = f.standard("20250830191500");
  let mut ingestor = Ingestor::new();

  ingestor.ingest(&mut f.warehouse, &mut first).unwrap();
  let before = f.warehouse.counts().unwrap();
  let report = ingested(ingestor.ingest(&mut f.warehouse, &mut second).unwrap());

  assert_eq!(report.inserted.timestamps, 1);
  assert_eq!(report.inserted.prices, 3);
  assert_eq!(report.inserted.states, 0);
  assert_eq!(report.inserted.points_of_sale_places, 0);
  assert_eq!(report.inserted.article_cards, 0);

  let after = f.warehouse.counts().unwrap();
  assert_eq!(after.timestamps, before.timestamps + 1);
  assert_eq!(after.prices, before.prices + 3);
  assert_eq!(after.cities, before.cities);
  assert_eq!(after.points_of_sale, before.points_of_sale);
}

// ─── Dimension policy ────────────────────────────────────────────────────────

#[test]
fn unknown_state_code_maps_to_sentinel_row() {
  let mut f = Fixture::new();
  let mut snap = f.snapshot(
    "20250101000000",
    &[
      pos("1", "ar-b", "la plata", "calle 7", "dia"),
      pos("2", "ar-b", "tandil", "san martin 1", "dia"),
      pos("3", "zz-9", "nowhere", "calle 1", "dia"),
    ],
    &[],
  );
  Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap();

  let mut states: Vec<_> = f
    .warehouse
    .load::<StateRow>()
    .unwrap()
    .into_iter()
    .map(|p| (p.row.code, p.row.name))
    .collect();
  states.sort();
  assert_eq!(
    states,
    vec![
      ("ar-b".to_owned(), "Buenos Aires".to_owned()),
      ("xxxx".to_owned(), "Error".to_owned()),
    ]
  );
}

#[test]
fn n_rows_over_k_states_yield_k_state_rows() {
  let mut f = Fixture::new();
  let codes = ["ar-b", "ar-c", "ar-x"];
  let rows: Vec<_> = (0..30)
    .map(|i| {
      let state = codes[i % codes.len()];
      pos(&i.to_string(), state, "ciudad", &format!("calle {i}"), "dia")
    })
    .collect();
  let mut snap = f.snapshot("20250101000000", &rows, &[]);

  Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap();
  let counts = f.warehouse.counts().unwrap();
  assert_eq!(counts.states, 3);
  // "ciudad" exists once per state.
  assert_eq!(counts.cities, 3);
  assert_eq!(counts.points_of_sale, 30);
}

#[test]
fn state_aliases_collapse_onto_one_row() {
  let mut f = Fixture::new();
  let mut snap = f.snapshot(
    "20250101000000",
    &[
      pos("1", "ar-c", "caba", "a 1", "dia"),
      pos("2", "capital federal", "caba", "a 2", "dia"),
    ],
    &[],
  );
  Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap();
  let counts = f.warehouse.counts().unwrap();
  assert_eq!(counts.states, 1);
  assert_eq!(counts.cities, 1);
  assert_eq!(counts.places, 2);
}

#[test]
fn dependent_rows_reference_existing_parents() {
  let mut f = Fixture::new();
  let mut snap = f.standard("20250101000000");
  Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap();

  let state_ids: Vec<_> = f.warehouse.load::<StateRow>().unwrap().iter().map(|p| p.id).collect();
  for city in f.warehouse.load::<CityRow>().unwrap() {
    assert!(state_ids.contains(&city.row.state_id));
  }
  let flag_ids: Vec<_> = f.warehouse.load::<FlagRow>().unwrap().iter().map(|p| p.id).collect();
  for point in f.warehouse.load::<PointOfSaleRow>().unwrap() {
    assert!(flag_ids.contains(&point.row.flag_id));
  }
}

#[test]
fn point_of_sale_at_two_places_is_linked_once_each() {
  let mut f = Fixture::new();
  let rows = [
    pos("1", "ar-b", "la plata", "calle 7 100", "dia"),
    pos("1", "ar-b", "la plata", "calle 8 200", "dia"),
    pos("1", "ar-b", "la plata", "calle 8 200", "dia"),
  ];
  let mut first = f.snapshot("20250101000000", &rows, &[]);
  let mut second = f.snapshot("20250102000000", &rows, &[]);
  let mut ingestor = Ingestor::new();

  let report = ingested(ingestor.ingest(&mut f.warehouse, &mut first).unwrap());
  assert_eq!(report.inserted.points_of_sale, 1);
  assert_eq!(report.inserted.points_of_sale_places, 2);

  let report = ingested(ingestor.ingest(&mut f.warehouse, &mut second).unwrap());
  assert_eq!(report.inserted.points_of_sale_places, 0);
  assert_eq!(f.warehouse.counts().unwrap().points_of_sale_places, 2);
}

// ─── Prices ──────────────────────────────────────────────────────────────────

#[test]
fn price_for_unknown_point_of_sale_is_skipped() {
  let mut f = Fixture::new();
  let mut articles = standard_articles();
  articles.push(article("781", "sprite", 99_000, "(404)(nowhere)"));
  let mut snap = f.snapshot("20250101000000", &standard_points_of_sale(), &articles);

  let report = ingested(Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap());
  assert_eq!(report.skipped, 1);
  assert_eq!(report.inserted.prices, 3);
  // The article's own dimensions are still recorded.
  assert_eq!(report.inserted.article_codes, 3);
}

#[test]
fn repeated_pair_yields_two_prices() {
  let mut f = Fixture::new();
  let articles = [
    article("779", "coca-cola", 100, "(1)(dia)"),
    article("779", "coca-cola", 100, "(1)(dia)"),
  ];
  let mut snap = f.snapshot("20250101000000", &standard_points_of_sale(), &articles);

  let report = ingested(Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap());
  assert_eq!(report.inserted.prices, 2);
  assert_eq!(report.inserted.article_cards, 1);
}

// ─── Failures ────────────────────────────────────────────────────────────────

#[test]
fn malformed_lines_are_skipped() {
  let mut f = Fixture::new();
  let snap = f.standard("20250101000000");
  let path = snap.home().join("points_of_sale.jsonl");
  let mut body = std::fs::read_to_string(&path).unwrap();
  body.push_str("{\"state\":\"ar-b\"}\nnot json\n");
  std::fs::write(&path, body).unwrap();

  let mut snap = f.archive.get_snapshot(0).unwrap();
  let report = ingested(Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap());
  assert_eq!(report.skipped, 2);
  assert_eq!(report.inserted.points_of_sale, 2);
  assert_eq!(report.inserted.prices, 3);
}

#[test]
fn undecodable_line_is_skipped_without_losing_later_rows() {
  let mut f = Fixture::new();
  let snap = f.snapshot("20250101000000", &[], &standard_articles());
  let path = snap.home().join("points_of_sale.jsonl");
  let mut body = b"{\"state\":\"\xff\xfe\"}\n".to_vec();
  for row in standard_points_of_sale() {
    body.extend(serde_json::to_vec(&row).unwrap());
    body.push(b'\n');
  }
  std::fs::write(&path, body).unwrap();

  let mut snap = f.archive.get_snapshot(0).unwrap();
  let report = ingested(Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap());
  assert_eq!(report.skipped, 1);
  assert_eq!(report.inserted.points_of_sale, 2);
  assert_eq!(report.inserted.prices, 3);
}

#[test]
fn invalid_timestamp_aborts_before_any_write() {
  let mut f = Fixture::new();
  let mut snap = f.standard("00000000000000");

  let err = Ingestor::new().ingest(&mut f.warehouse, &mut snap).unwrap_err();
  assert!(matches!(err, Error::Core(precio_core::Error::InvalidTimestamp(_))));
  assert_eq!(f.warehouse.counts().unwrap(), TableCounts::default());
}

#[test]
fn stale_cache_collision_aborts_and_next_snapshot_recovers() {
  let mut f = Fixture::new();
  let mut first = f.standard("20250101000000");
  let jumbo = [pos("9", "ar-b", "la plata", "calle 9", "jumbo")];
  let mut second = f.snapshot("20250102000000", &jumbo, &[]);
  let mut third = f.snapshot("20250103000000", &jumbo, &[]);
  let mut ingestor = Ingestor::new();

  ingestor.ingest(&mut f.warehouse, &mut first).unwrap();
  // Written behind the ingestor's back, so its flag cache is stale.
  f.warehouse.insert(&[FlagRow::new("jumbo")]).unwrap();

  let err = ingestor.ingest(&mut f.warehouse, &mut second).unwrap_err();
  assert!(matches!(err, Error::BulkInsert { table: "flags", .. }));

  let report = ingested(ingestor.ingest(&mut f.warehouse, &mut third).unwrap());
  assert_eq!(report.inserted.flags, 0);
  assert_eq!(report.inserted.points_of_sale, 1);
}

// ─── Markers and sweep ───────────────────────────────────────────────────────

#[test]
fn marker_is_recorded_for_ingested_and_already_processed() {
  let mut f = Fixture::new();
  let mut snap = f.standard("20250101000000");
  let mut ingestor = Ingestor::new().with_marker("precio.db");

  ingestor.ingest(&mut f.warehouse, &mut snap).unwrap();
  assert!(metadata(snap.home()).is_processed("precio.db"));

  let mut again = f.archive.get_snapshot(0).unwrap();
  again.clear_markers().unwrap();
  ingestor.ingest(&mut f.warehouse, &mut again).unwrap();
  assert!(metadata(again.home()).is_processed("precio.db"));
}

#[test]
fn failed_ingestion_leaves_no_marker() {
  let mut f = Fixture::new();
  let mut snap = f.standard("00000000000000");
  let mut ingestor = Ingestor::new().with_marker("precio.db");

  assert!(ingestor.ingest(&mut f.warehouse, &mut snap).is_err());
  assert!(!metadata(snap.home()).is_processed("precio.db"));
}

#[test]
fn sweep_continues_past_failed_snapshots() {
  let mut f = Fixture::new();
  f.standard("20250101000000");
  f.standard("00000000000000");
  f.standard("20250103000000");
  let mut ingestor = Ingestor::new();

  let report = sweep(&f.archive, 0, None, &mut f.warehouse, &mut ingestor).unwrap();
  assert_eq!(report.ingested, vec![0, 2]);
  assert_eq!(report.failed, vec![1]);
  assert_eq!(report.prices, 6);
  assert_eq!(report.total(), 3);

  let again = sweep(&f.archive, 0, None, &mut f.warehouse, &mut ingestor).unwrap();
  assert_eq!(again.already_processed, vec![0, 2]);
  assert_eq!(again.failed, vec![1]);
  assert_eq!(f.warehouse.counts().unwrap().prices, 6);
}

#[test]
fn sweep_honours_range_and_rejects_bad_ones() {
  let mut f = Fixture::new();
  for day in 1..=4 {
    f.standard(&format!("202501{day:02}000000"));
  }
  let mut ingestor = Ingestor::new();

  let report = sweep(&f.archive, 1, Some(3), &mut f.warehouse, &mut ingestor).unwrap();
  assert_eq!(report.ingested, vec![1, 2]);

  let err = sweep(&f.archive, 2, Some(9), &mut f.warehouse, &mut ingestor).unwrap_err();
  assert!(matches!(err, Error::Archive(precio_archive::Error::InvalidRange { .. })));
}
