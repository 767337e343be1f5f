//! Archiving raw scraper dumps as a new snapshot.

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use anyhow::Context as _;
use precio_archive::{Archive, normalize::Normalizer};
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
  pub ordinal:        u32,
  pub key:            String,
  pub timestamp:      String,
  pub points_of_sale: usize,
  pub articles:       usize,
  pub skipped:        usize,
}

/// Normalise the line-delimited dumps at `points_of_sale` and `articles`
/// and store them as the archive's next snapshot.
///
/// Rows that fail normalisation are logged and skipped. Nothing is written
/// to the archive if either dump cannot be read.
pub fn import(
  archive: &mut Archive,
  points_of_sale: &Path,
  articles: &Path,
  timestamp: Option<&str>,
) -> anyhow::Result<ImportReport> {
  let mut normalizer = Normalizer::new();
  let mut skipped = 0;

  let mut pos_rows = Vec::new();
  for_each_line(points_of_sale, |line| match normalizer.point_of_sale(line) {
    Ok(row) => pos_rows.push(row),
    Err(e) => {
      tracing::warn!(error = %e, "skipping raw point of sale");
      skipped += 1;
    }
  })?;

  let mut article_rows = Vec::new();
  for_each_line(articles, |line| match normalizer.article(line) {
    Ok(row) => article_rows.push(row),
    Err(e) => {
      tracing::warn!(error = %e, "skipping raw article");
      skipped += 1;
    }
  })?;

  let snapshot = match timestamp {
    Some(ts) => archive.create_snapshot_at(ts),
    None => archive.create_snapshot(),
  }
  .context("failed to allocate snapshot")?;
  let written_pos = snapshot
    .write_points_of_sale(&pos_rows)
    .context("failed to write points of sale")?;
  let written_articles = snapshot
    .write_articles(&article_rows)
    .context("failed to write articles")?;

  Ok(ImportReport {
    ordinal: snapshot.ordinal(),
    key: snapshot.key().to_owned(),
    timestamp: snapshot.timestamp().to_owned(),
    points_of_sale: written_pos,
    articles: written_articles,
    skipped,
  })
}

fn for_each_line(path: &Path, mut f: impl FnMut(&str)) -> anyhow::Result<()> {
  let file = File::open(path).with_context(|| format!("failed to open {path:?}"))?;
  for line in BufReader::new(file).lines() {
    let line = line.with_context(|| format!("failed to read {path:?}"))?;
    if !line.trim().is_empty() {
      f(&line);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const POS: &str = concat!(
    r#"{"id":"1","provincia":"AR-B","localidad":"La Plata","direccion":"Calle 7","banderaDescripcion":"Dia","comercioRazonSocial":"Dia SA","sucursalNombre":"Centro"}"#,
    "\n",
    r#"{"id":"2","provincia":"AR-C"}"#,
    "\n",
  );
  const ARTICLES: &str = concat!(
    r#"{"id":"779","marca":"Coca-Cola","nombre":"Gaseosa","presentacion":"2.25 lt","precio":"1999.99","point_of_sale_id":"1"}"#,
    "\n\n",
    r#"{"id":"780","marca":"Pepsi","nombre":"Gaseosa","presentacion":"2 lt","precio":"10","point_of_sale_id":"2"}"#,
    "\n",
  );

  #[test]
  fn import_writes_normalised_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let pos = dir.path().join("pos.jsonl");
    let articles = dir.path().join("articles.jsonl");
    std::fs::write(&pos, POS).unwrap();
    std::fs::write(&articles, ARTICLES).unwrap();

    let mut archive = Archive::open(dir.path().join("archive")).unwrap();
    let report = import(&mut archive, &pos, &articles, Some("20250101120000")).unwrap();
    assert_eq!(report.ordinal, 0);
    assert_eq!(report.points_of_sale, 1);
    assert_eq!(report.articles, 1);
    // One incomplete point of sale, plus the article that referenced it.
    assert_eq!(report.skipped, 2);

    let snapshot = archive.get_snapshot(0).unwrap();
    assert_eq!(snapshot.timestamp(), "20250101120000");
    let stored: Vec<_> = snapshot.articles().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(stored[0].price, 199_999);
    assert_eq!(stored[0].point_of_sale_key, "(1)(dia)");
  }

  #[test]
  fn unreadable_dump_allocates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut archive = Archive::open(dir.path()).unwrap();
    let missing = dir.path().join("missing.jsonl");
    assert!(import(&mut archive, &missing, &missing, None).is_err());
    assert!(archive.is_empty());
  }
}
