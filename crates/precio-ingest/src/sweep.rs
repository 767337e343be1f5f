//! Archive sweep: ingest a range of snapshots, one at a time.

use precio_archive::Archive;
use precio_core::Warehouse;
use serde::Serialize;

use crate::{Ingestor, Outcome, Result};

/// Ordinals of a sweep, grouped by what happened to each snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub ingested:          Vec<u32>,
  pub already_processed: Vec<u32>,
  pub failed:            Vec<u32>,
  /// Prices appended across every ingested snapshot.
  pub prices:            u64,
  pub skipped:           usize,
}

impl SweepReport {
  pub fn total(&self) -> usize {
    self.ingested.len() + self.already_processed.len() + self.failed.len()
  }
}

/// Ingest the snapshots with `first <= ordinal < top` (`top` of `None`
/// meaning the archive length), in ordinal order.
///
/// A snapshot that fails to load or ingest is logged and recorded in
/// [`SweepReport::failed`]; the sweep carries on with the next one. Only an
/// invalid range fails the sweep itself.
pub fn sweep<W: Warehouse>(
  archive: &Archive,
  first: u32,
  top: Option<u32>,
  warehouse: &mut W,
  ingestor: &mut Ingestor,
) -> Result<SweepReport> {
  let mut report = SweepReport::default();
  let mut ordinal = first;

  for snapshot in archive.iterate(first, top)? {
    let current = ordinal;
    ordinal += 1;

    let mut snapshot = match snapshot {
      Ok(snapshot) => snapshot,
      Err(e) => {
        tracing::error!(ordinal = current, error = %e, "could not load snapshot");
        report.failed.push(current);
        continue;
      }
    };

    match ingestor.ingest(warehouse, &mut snapshot) {
      Ok(Outcome::Ingested(ingest)) => {
        report.prices += ingest.inserted.prices;
        report.skipped += ingest.skipped;
        report.ingested.push(current);
      }
      Ok(Outcome::AlreadyProcessed { .. }) => report.already_processed.push(current),
      Err(e) => {
        tracing::error!(
          ordinal = current,
          key = %snapshot.key(),
          timestamp = %snapshot.timestamp(),
          error = %e,
          "snapshot ingestion aborted"
        );
        report.failed.push(current);
      }
    }
  }

  tracing::info!(
    ingested = report.ingested.len(),
    already_processed = report.already_processed.len(),
    failed = report.failed.len(),
    prices = report.prices,
    "sweep finished"
  );
  Ok(report)
}
