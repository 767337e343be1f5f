//! Encoding and decoding between [`Cell`]s and SQLite values, plus the
//! statement text derived from a dimension's table and column names.

use precio_core::dimension::{Cell, Dimension, Persisted};
use rusqlite::types::Value;

use crate::Result;

pub fn encode_cell(cell: Cell) -> Value {
  match cell {
    Cell::Int(i) => Value::Integer(i),
    Cell::Text(s) => Value::Text(s),
  }
}

pub fn decode_cell(table: &'static str, value: Value) -> Result<Cell> {
  match value {
    Value::Integer(i) => Ok(Cell::Int(i)),
    Value::Text(s) => Ok(Cell::Text(s)),
    other => Err(
      precio_core::Error::Decode {
        table,
        detail: format!("unsupported column value {other:?}"),
      }
      .into(),
    ),
  }
}

pub fn select_sql<D: Dimension>() -> String {
  format!("SELECT id, {} FROM {} ORDER BY id", D::COLUMNS.join(", "), D::TABLE)
}

pub fn insert_sql<D: Dimension>() -> String {
  let placeholders = (1..=D::COLUMNS.len())
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  format!(
    "INSERT INTO {} ({}) VALUES ({placeholders})",
    D::TABLE,
    D::COLUMNS.join(", ")
  )
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from one dimension row.
pub struct RawRow {
  pub id:     i64,
  pub values: Vec<Value>,
}

impl RawRow {
  pub fn read(row: &rusqlite::Row<'_>, columns: usize) -> rusqlite::Result<Self> {
    let id = row.get(0)?;
    let values = (1..=columns)
      .map(|i| row.get::<_, Value>(i))
      .collect::<rusqlite::Result<_>>()?;
    Ok(Self { id, values })
  }

  pub fn into_persisted<D: Dimension>(self) -> Result<Persisted<D>> {
    let cells = self
      .values
      .into_iter()
      .map(|v| decode_cell(D::TABLE, v))
      .collect::<Result<Vec<_>>>()?;
    Ok(Persisted { id: self.id, row: D::from_cells(cells)? })
  }
}
