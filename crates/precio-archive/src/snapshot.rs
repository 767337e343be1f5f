//! [`Snapshot`] — one archived scrape run and its record sets.

use std::{
  fs::File,
  io::{self, BufRead, BufReader, BufWriter, Split, Write},
  marker::PhantomData,
  path::{Path, PathBuf},
};

use crate::{
  Error, Result,
  metadata::Metadata,
  records::{ArticleRecord, PointOfSaleRecord, Record},
};

const ROWS_SUFFIX: &str = "jsonl";

/// Handle to a snapshot directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
  home:     PathBuf,
  ordinal:  u32,
  metadata: Metadata,
}

impl Snapshot {
  pub(crate) fn new(home: PathBuf, ordinal: u32, metadata: Metadata) -> Self {
    Self { home, ordinal, metadata }
  }

  pub fn home(&self) -> &Path { &self.home }

  pub fn ordinal(&self) -> u32 { self.ordinal }

  /// The 9-digit key, e.g. `"000000042"`.
  pub fn key(&self) -> &str { &self.metadata.key }

  /// The `YYYYMMDDHHMMSS` wall-clock label of the scrape.
  pub fn timestamp(&self) -> &str { &self.metadata.timestamp }

  pub fn metadata(&self) -> &Metadata { &self.metadata }

  // ── Record sets ───────────────────────────────────────────────────────

  pub fn points_of_sale(&self) -> Result<Records<PointOfSaleRecord>> { self.read() }

  pub fn articles(&self) -> Result<Records<ArticleRecord>> { self.read() }

  /// Open record set `R`, falling back to its legacy names. A set that was
  /// never written reads as empty.
  pub fn read<R: Record>(&self) -> Result<Records<R>> {
    let names = std::iter::once(R::NAME).chain(R::LEGACY_NAMES.iter().copied());
    for name in names {
      let path = self.rows_path(name);
      match File::open(&path) {
        Ok(file) => return Ok(Records::open(path, file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
        Err(e) => return Err(Error::io(path)(e)),
      }
    }
    Ok(Records::empty())
  }

  pub fn write_points_of_sale<'a>(
    &self,
    rows: impl IntoIterator<Item = &'a PointOfSaleRecord>,
  ) -> Result<usize> {
    self.write(rows)
  }

  pub fn write_articles<'a>(
    &self,
    rows: impl IntoIterator<Item = &'a ArticleRecord>,
  ) -> Result<usize> {
    self.write(rows)
  }

  /// Write record set `R`, one JSON document per line. Returns the number
  /// of lines written.
  pub fn write<'a, R: Record + 'a>(
    &self,
    rows: impl IntoIterator<Item = &'a R>,
  ) -> Result<usize> {
    let path = self.rows_path(R::NAME);
    let file = File::create(&path).map_err(Error::io(&path))?;
    let mut out = BufWriter::new(file);
    let mut written = 0;
    for row in rows {
      serde_json::to_writer(&mut out, row)?;
      out.write_all(b"\n").map_err(Error::io(&path))?;
      written += 1;
    }
    out.flush().map_err(Error::io(&path))?;
    tracing::debug!(snapshot = %self.key(), set = R::NAME, rows = written, "wrote record set");
    Ok(written)
  }

  // ── Metadata ──────────────────────────────────────────────────────────

  /// Record that this snapshot has been loaded into `database`.
  pub fn mark_processed(&mut self, database: &str) -> Result<()> {
    self.metadata.processed.insert(database.to_owned(), true);
    self.metadata.write(&self.home)
  }

  /// Drop every processed marker, keeping key and timestamp.
  pub fn clear_markers(&mut self) -> Result<()> {
    self.metadata.processed.clear();
    self.metadata.write(&self.home)
  }

  fn rows_path(&self, name: &str) -> PathBuf {
    self.home.join(name).with_extension(ROWS_SUFFIX)
  }
}

// ─── Record iterator ─────────────────────────────────────────────────────────

/// Lazy reader over one record set, yielding one result per non-blank line.
///
/// A line that is not UTF-8 or fails validation yields
/// [`Error::MalformedRecord`] and the iterator carries on with the next line.
/// Only a failed read ends the iteration.
pub struct Records<R> {
  path:    PathBuf,
  lines:   Option<Split<BufReader<File>>>,
  line_no: usize,
  _record: PhantomData<R>,
}

impl<R> Records<R> {
  fn open(path: PathBuf, file: File) -> Self {
    Self {
      path,
      lines: Some(BufReader::new(file).split(b'\n')),
      line_no: 0,
      _record: PhantomData,
    }
  }

  fn empty() -> Self {
    Self { path: PathBuf::new(), lines: None, line_no: 0, _record: PhantomData }
  }

  /// File being read; empty when the record set does not exist.
  pub fn path(&self) -> &Path { &self.path }

  /// 1-based number of the line most recently read.
  pub fn line_no(&self) -> usize { self.line_no }
}

impl<R: Record> Iterator for Records<R> {
  type Item = Result<R>;

  fn next(&mut self) -> Option<Self::Item> {
    let lines = self.lines.as_mut()?;
    loop {
      let line = match lines.next()? {
        Ok(line) => line,
        Err(e) => {
          self.lines = None;
          return Some(Err(Error::io(&self.path)(e)));
        }
      };
      self.line_no += 1;
      let line = match String::from_utf8(line) {
        Ok(line) => line,
        Err(e) => {
          let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
          return Some(Err(Error::malformed(lossy, e.utf8_error().to_string())));
        }
      };
      let line = line.strip_suffix('\r').unwrap_or(&line);
      if line.trim().is_empty() {
        continue;
      }
      return Some(R::from_line(line));
    }
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  fn snapshot(dir: &Path) -> Snapshot {
    Snapshot::new(dir.to_path_buf(), 0, Metadata::new("000000000", "20250101000000"))
  }

  fn pos(key: &str) -> PointOfSaleRecord {
    PointOfSaleRecord {
      point_of_sale_code: None,
      state:              "ar-b".into(),
      city:               "la plata".into(),
      address:            "calle 7 100".into(),
      flag:               "dia".into(),
      business:           "dia argentina sa".into(),
      branch:             "la plata centro".into(),
      point_of_sale_key:  key.into(),
      city_key:           None,
      place_key:          None,
    }
  }

  #[test]
  fn unwritten_record_set_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot(dir.path());
    assert_eq!(snap.points_of_sale().unwrap().count(), 0);
    assert_eq!(snap.articles().unwrap().count(), 0);
  }

  #[test]
  fn written_records_read_back_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot(dir.path());
    let rows = [pos("(1)(dia)"), pos("(2)(dia)")];
    assert_eq!(snap.write_points_of_sale(&rows).unwrap(), 2);

    let back: Vec<_> = snap
      .points_of_sale()
      .unwrap()
      .collect::<Result<_>>()
      .unwrap();
    assert_eq!(back, rows);
  }

  #[test]
  fn malformed_line_does_not_stop_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot(dir.path());
    snap.write_points_of_sale(&[pos("(1)(dia)")]).unwrap();
    let path = dir.path().join("points_of_sale.jsonl");
    let mut body = fs::read_to_string(&path).unwrap();
    body.push_str("{\"state\": \"ar-b\"}\n\n");
    body.push_str(&serde_json::to_string(&pos("(3)(dia)")).unwrap());
    body.push('\n');
    fs::write(&path, body).unwrap();

    let results: Vec<_> = snap.points_of_sale().unwrap().collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::MalformedRecord { .. })));
    assert_eq!(results[2].as_ref().unwrap().point_of_sale_key, "(3)(dia)");
  }

  #[test]
  fn non_utf8_line_is_malformed_and_later_lines_still_read() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot(dir.path());
    let mut body = b"{\"state\":\"\xff\xfe\"}\r\n".to_vec();
    body.extend(serde_json::to_vec(&pos("(1)(dia)")).unwrap());
    body.extend(b"\r\n");
    fs::write(dir.path().join("points_of_sale.jsonl"), body).unwrap();

    let mut records = snap.points_of_sale().unwrap();
    let first = records.next().unwrap();
    assert!(matches!(first, Err(Error::MalformedRecord { .. })));
    assert_eq!(records.line_no(), 1);
    assert_eq!(records.next().unwrap().unwrap().point_of_sale_key, "(1)(dia)");
    assert_eq!(records.line_no(), 2);
    assert!(records.next().is_none());
  }

  #[test]
  fn legacy_articles_file_is_used_as_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot(dir.path());
    fs::write(
      dir.path().join("articles_per_point_of_sale.jsonl"),
      concat!(
        r#"{"article_code":"1","brand":"b","description":"d","package":"p","price":100,"point_of_sale_key":"(1)(dia)"}"#,
        "\n"
      ),
    )
    .unwrap();

    let articles: Vec<_> = snap.articles().unwrap().collect::<Result<_>>().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].price, 100);
  }

  #[test]
  fn markers_are_persisted_and_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let mut snap = snapshot(dir.path());
    snap.mark_processed("db-a").unwrap();
    assert!(Metadata::read(dir.path(), "").is_processed("db-a"));

    snap.clear_markers().unwrap();
    let meta = Metadata::read(dir.path(), "");
    assert!(meta.processed.is_empty());
    assert_eq!(meta.timestamp, "20250101000000");
  }
}
