//! Dimension and fact row types of the price star schema.
//!
//! Every dimension row carries a natural key (the business tuple used to
//! detect "this row already exists") and is persisted with a surrogate
//! numeric id. Rows cross the storage seam as ordered [`Cell`] lists so that
//! backends need no per-table mapping code.

use std::{fmt, hash::Hash};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Cells ───────────────────────────────────────────────────────────────────

/// A single column value, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
  Int(i64),
  Text(String),
}

/// Sequential reader over the cells of one persisted row.
struct Cells {
  table:  &'static str,
  column: usize,
  iter:   std::vec::IntoIter<Cell>,
}

impl Cells {
  fn new(table: &'static str, cells: Vec<Cell>) -> Self {
    Self { table, column: 0, iter: cells.into_iter() }
  }

  fn next(&mut self) -> Result<Cell> {
    self.column += 1;
    self.iter.next().ok_or_else(|| Error::Decode {
      table:  self.table,
      detail: format!("missing column {}", self.column),
    })
  }

  fn text(&mut self) -> Result<String> {
    match self.next()? {
      Cell::Text(s) => Ok(s),
      Cell::Int(i) => Err(Error::Decode {
        table:  self.table,
        detail: format!("column {} holds integer {i}, expected text", self.column),
      }),
    }
  }

  fn int(&mut self) -> Result<i64> {
    match self.next()? {
      Cell::Int(i) => Ok(i),
      Cell::Text(s) => Err(Error::Decode {
        table:  self.table,
        detail: format!("column {} holds text {s:?}, expected integer", self.column),
      }),
    }
  }

  fn small(&mut self) -> Result<u32> {
    let value = self.int()?;
    u32::try_from(value).map_err(|_| Error::Decode {
      table:  self.table,
      detail: format!("column {} value {value} out of range", self.column),
    })
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A deduplicated reference table of the star schema.
pub trait Dimension: Clone + fmt::Debug {
  /// The natural key; unique across the table.
  type Key: Eq + Hash + Clone + fmt::Debug;

  const TABLE: &'static str;
  /// Data columns in cell order, excluding the surrogate `id`.
  const COLUMNS: &'static [&'static str];

  fn key(&self) -> Self::Key;
  fn to_cells(&self) -> Vec<Cell>;
  fn from_cells(cells: Vec<Cell>) -> Result<Self>;
}

/// A dimension row together with its surrogate id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persisted<D> {
  pub id:  i64,
  pub row: D,
}

// ─── Timestamp ───────────────────────────────────────────────────────────────

/// The moment a snapshot was taken; one row per ingested snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestampRow {
  pub year:   u32,
  pub month:  u32,
  pub day:    u32,
  pub hour:   u32,
  pub minute: u32,
  pub second: u32,
}

impl TimestampRow {
  /// Parse a 14-digit `YYYYMMDDHHMMSS` label.
  pub fn parse(label: &str) -> Result<Self> {
    let invalid = || Error::InvalidTimestamp(label.to_owned());
    if label.len() != 14 || !label.bytes().all(|b| b.is_ascii_digit()) {
      return Err(invalid());
    }
    let field = |range: std::ops::Range<usize>| -> Result<u32> {
      label[range].parse().map_err(|_| invalid())
    };
    let row = Self {
      year:   field(0..4)?,
      month:  field(4..6)?,
      day:    field(6..8)?,
      hour:   field(8..10)?,
      minute: field(10..12)?,
      second: field(12..14)?,
    };
    let valid = (1..=12).contains(&row.month)
      && (1..=31).contains(&row.day)
      && row.hour < 24
      && row.minute < 60
      && row.second < 60;
    if !valid {
      return Err(invalid());
    }
    Ok(row)
  }
}

impl fmt::Display for TimestampRow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{:04}{:02}{:02}{:02}{:02}{:02}",
      self.year, self.month, self.day, self.hour, self.minute, self.second
    )
  }
}

impl Dimension for TimestampRow {
  type Key = TimestampRow;

  const TABLE: &'static str = "timestamps";
  const COLUMNS: &'static [&'static str] =
    &["year", "month", "day", "hour", "minute", "second"];

  fn key(&self) -> Self::Key { *self }

  fn to_cells(&self) -> Vec<Cell> {
    [self.year, self.month, self.day, self.hour, self.minute, self.second]
      .into_iter()
      .map(|v| Cell::Int(i64::from(v)))
      .collect()
  }

  fn from_cells(cells: Vec<Cell>) -> Result<Self> {
    let mut c = Cells::new(Self::TABLE, cells);
    Ok(Self {
      year:   c.small()?,
      month:  c.small()?,
      day:    c.small()?,
      hour:   c.small()?,
      minute: c.small()?,
      second: c.small()?,
    })
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// A province, keyed by its ISO-like code (`"ar-b"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRow {
  pub code: String,
  pub name: String,
}

impl Dimension for StateRow {
  type Key = String;

  const TABLE: &'static str = "states";
  const COLUMNS: &'static [&'static str] = &["code", "name"];

  fn key(&self) -> Self::Key { self.code.clone() }

  fn to_cells(&self) -> Vec<Cell> {
    vec![Cell::Text(self.code.clone()), Cell::Text(self.name.clone())]
  }

  fn from_cells(cells: Vec<Cell>) -> Result<Self> {
    let mut c = Cells::new(Self::TABLE, cells);
    Ok(Self { code: c.text()?, name: c.text()? })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRow {
  pub name:     String,
  pub state_id: i64,
}

impl Dimension for CityRow {
  type Key = (String, i64);

  const TABLE: &'static str = "cities";
  const COLUMNS: &'static [&'static str] = &["name", "state_id"];

  fn key(&self) -> Self::Key { (self.name.clone(), self.state_id) }

  fn to_cells(&self) -> Vec<Cell> {
    vec![Cell::Text(self.name.clone()), Cell::Int(self.state_id)]
  }

  fn from_cells(cells: Vec<Cell>) -> Result<Self> {
    let mut c = Cells::new(Self::TABLE, cells);
    Ok(Self { name: c.text()?, state_id: c.int()? })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRow {
  pub address: String,
  pub city_id: i64,
}

impl Dimension for PlaceRow {
  type Key = (String, i64);

  const TABLE: &'static str = "places";
  const COLUMNS: &'static [&'static str] = &["address", "city_id"];

  fn key(&self) -> Self::Key { (self.address.clone(), self.city_id) }

  fn to_cells(&self) -> Vec<Cell> {
    vec![Cell::Text(self.address.clone()), Cell::Int(self.city_id)]
  }

  fn from_cells(cells: Vec<Cell>) -> Result<Self> {
    let mut c = Cells::new(Self::TABLE, cells);
    Ok(Self { address: c.text()?, city_id: c.int()? })
  }
}

// ─── Single-column dimensions ────────────────────────────────────────────────

/// Declares a dimension whose only column is also its natural key.
macro_rules! text_dimension {
  ($(#[$meta:meta])* $name:ident, $table:literal, $field:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct $name {
      pub $field: String,
    }

    impl $name {
      pub fn new(value: impl Into<String>) -> Self { Self { $field: value.into() } }
    }

    impl Dimension for $name {
      type Key = String;

      const TABLE: &'static str = $table;
      const COLUMNS: &'static [&'static str] = &[stringify!($field)];

      fn key(&self) -> Self::Key { self.$field.clone() }

      fn to_cells(&self) -> Vec<Cell> { vec![Cell::Text(self.$field.clone())] }

      fn from_cells(cells: Vec<Cell>) -> Result<Self> {
        let mut c = Cells::new(Self::TABLE, cells);
        Ok(Self { $field: c.text()? })
      }
    }
  };
}

text_dimension!(
  /// The retail banner a point of sale trades under.
  FlagRow, "flags", name
);
text_dimension!(
  /// The legal entity owning a point of sale.
  BusinessRow, "businesses", name
);
text_dimension!(BranchRow, "branches", name);
text_dimension!(ArticleCodeRow, "article_codes", code);
text_dimension!(ArticleBrandRow, "article_brands", brand);
text_dimension!(ArticleDescriptionRow, "article_descriptions", description);
text_dimension!(ArticlePackageRow, "article_packages", package);

// ─── Composite dimensions ────────────────────────────────────────────────────

/// A store, keyed by its point-of-sale key. Many-to-many with [`PlaceRow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOfSaleRow {
  pub code:        String,
  pub flag_id:     i64,
  pub business_id: i64,
  pub branch_id:   i64,
}

impl Dimension for PointOfSaleRow {
  type Key = String;

  const TABLE: &'static str = "points_of_sale";
  const COLUMNS: &'static [&'static str] =
    &["code", "flag_id", "business_id", "branch_id"];

  fn key(&self) -> Self::Key { self.code.clone() }

  fn to_cells(&self) -> Vec<Cell> {
    vec![
      Cell::Text(self.code.clone()),
      Cell::Int(self.flag_id),
      Cell::Int(self.business_id),
      Cell::Int(self.branch_id),
    ]
  }

  fn from_cells(cells: Vec<Cell>) -> Result<Self> {
    let mut c = Cells::new(Self::TABLE, cells);
    Ok(Self {
      code:        c.text()?,
      flag_id:     c.int()?,
      business_id: c.int()?,
      branch_id:   c.int()?,
    })
  }
}

/// An article as sold: the combination of its four taxonomy ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCardRow {
  pub brand_id:       i64,
  pub description_id: i64,
  pub package_id:     i64,
  pub code_id:        i64,
}

impl Dimension for ArticleCardRow {
  type Key = (i64, i64, i64, i64);

  const TABLE: &'static str = "article_cards";
  const COLUMNS: &'static [&'static str] =
    &["brand_id", "description_id", "package_id", "code_id"];

  fn key(&self) -> Self::Key {
    (self.brand_id, self.description_id, self.package_id, self.code_id)
  }

  fn to_cells(&self) -> Vec<Cell> {
    vec![
      Cell::Int(self.brand_id),
      Cell::Int(self.description_id),
      Cell::Int(self.package_id),
      Cell::Int(self.code_id),
    ]
  }

  fn from_cells(cells: Vec<Cell>) -> Result<Self> {
    let mut c = Cells::new(Self::TABLE, cells);
    Ok(Self {
      brand_id:       c.int()?,
      description_id: c.int()?,
      package_id:     c.int()?,
      code_id:        c.int()?,
    })
  }
}

// ─── Association and fact ────────────────────────────────────────────────────

/// One row of the point-of-sale ⇄ place association table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointOfSalePlace {
  pub point_of_sale_id: i64,
  pub place_id:         i64,
}

/// An observed price, in cents. Insert-only; never deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRow {
  pub amount:           i64,
  pub timestamp_id:     i64,
  pub article_code_id:  i64,
  pub point_of_sale_id: i64,
}
