//! [`SqliteWarehouse`] — the SQLite implementation of [`Warehouse`].

use std::path::Path;

use precio_core::{
  TableCounts, Warehouse,
  dimension::{Dimension, Persisted, PointOfSalePlace, PriceRow},
};
use rusqlite::{Connection, params_from_iter, types::Value};

use crate::{
  Error, Result,
  encode::{RawRow, encode_cell, insert_sql, select_sql},
  schema::{SCHEMA, TABLES},
};

const LINK_SQL: &str =
  "INSERT INTO points_of_sale_places (point_of_sale_id, place_id) VALUES (?1, ?2)";
const PRICE_SQL: &str = "INSERT INTO prices (amount, timestamp_id, article_code_id, \
                         point_of_sale_id) VALUES (?1, ?2, ?3, ?4)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A price warehouse backed by a single SQLite file.
///
/// Owns one synchronous connection; not shared between threads.
pub struct SqliteWarehouse {
  conn:       Connection,
  identifier: String,
}

impl SqliteWarehouse {
  /// Open (or create) a warehouse at `path` and run schema initialisation.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = Connection::open(path)?;
    Self::init(conn, path.display().to_string())
  }

  /// Open an in-memory warehouse — useful for testing.
  pub fn open_in_memory() -> Result<Self> {
    Self::init(Connection::open_in_memory()?, ":memory:".to_owned())
  }

  fn init(conn: Connection, identifier: String) -> Result<Self> {
    conn.execute_batch(SCHEMA)?;
    tracing::debug!(database = %identifier, "warehouse schema ready");
    Ok(Self { conn, identifier })
  }

  /// The database identifier recorded in snapshot processed markers.
  pub fn identifier(&self) -> &str { &self.identifier }

  /// Run `rows` through `sql` inside one transaction. Any failure rolls the
  /// whole batch back.
  fn insert_batch<I>(&mut self, table: &'static str, sql: &str, rows: I) -> Result<usize>
  where
    I: IntoIterator<Item = Vec<Value>>,
  {
    let bulk = |source| Error::BulkInsert { table, source };

    let tx = self.conn.transaction().map_err(bulk)?;
    let mut inserted = 0;
    {
      let mut stmt = tx.prepare(sql).map_err(bulk)?;
      for values in rows {
        inserted += stmt.execute(params_from_iter(values)).map_err(bulk)?;
      }
    }
    tx.commit().map_err(bulk)?;

    tracing::debug!(table, rows = inserted, "batch committed");
    Ok(inserted)
  }

  fn count(&self, table: &str) -> Result<u64> {
    let n: i64 =
      self.conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(u64::try_from(n).unwrap_or_default())
  }
}

// ─── Warehouse impl ──────────────────────────────────────────────────────────

impl Warehouse for SqliteWarehouse {
  type Error = Error;

  fn load<D: Dimension>(&self) -> Result<Vec<Persisted<D>>> {
    let columns = D::COLUMNS.len();
    let mut stmt = self.conn.prepare(&select_sql::<D>())?;
    let raws = stmt
      .query_map([], |row| RawRow::read(row, columns))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawRow::into_persisted).collect()
  }

  fn insert<D: Dimension>(&mut self, rows: &[D]) -> Result<usize> {
    if rows.is_empty() {
      return Ok(0);
    }
    let sql = insert_sql::<D>();
    let values = rows
      .iter()
      .map(|row| row.to_cells().into_iter().map(encode_cell).collect());
    self.insert_batch(D::TABLE, &sql, values)
  }

  fn load_point_of_sale_places(&self) -> Result<Vec<PointOfSalePlace>> {
    let mut stmt = self
      .conn
      .prepare("SELECT point_of_sale_id, place_id FROM points_of_sale_places")?;
    let links = stmt
      .query_map([], |row| {
        Ok(PointOfSalePlace { point_of_sale_id: row.get(0)?, place_id: row.get(1)? })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(links)
  }

  fn link_point_of_sale_places(&mut self, links: &[PointOfSalePlace]) -> Result<usize> {
    if links.is_empty() {
      return Ok(0);
    }
    let values = links.iter().map(|l| {
      vec![Value::Integer(l.point_of_sale_id), Value::Integer(l.place_id)]
    });
    self.insert_batch("points_of_sale_places", LINK_SQL, values)
  }

  fn insert_prices(&mut self, rows: &[PriceRow]) -> Result<usize> {
    if rows.is_empty() {
      return Ok(0);
    }
    let values = rows.iter().map(|p| {
      vec![
        Value::Integer(p.amount),
        Value::Integer(p.timestamp_id),
        Value::Integer(p.article_code_id),
        Value::Integer(p.point_of_sale_id),
      ]
    });
    self.insert_batch("prices", PRICE_SQL, values)
  }

  fn counts(&self) -> Result<TableCounts> {
    let mut n = [0u64; TABLES.len()];
    for (slot, table) in n.iter_mut().zip(TABLES) {
      *slot = self.count(table)?;
    }
    let [
      timestamps,
      states,
      cities,
      places,
      flags,
      businesses,
      branches,
      points_of_sale,
      points_of_sale_places,
      article_codes,
      article_brands,
      article_descriptions,
      article_packages,
      article_cards,
      prices,
    ] = n;
    Ok(TableCounts {
      timestamps,
      states,
      cities,
      places,
      flags,
      businesses,
      branches,
      points_of_sale,
      points_of_sale_places,
      article_codes,
      article_brands,
      article_descriptions,
      article_packages,
      article_cards,
      prices,
    })
  }
}
