//! `precio` — archive price snapshots and load them into the warehouse.
//!
//! # Usage
//!
//! ```
//! precio import --points-of-sale pos.jsonl --articles articles.jsonl
//! precio ingest --first 120
//! precio status
//! precio --config ~/.config/precio/precio.toml reset-markers
//! ```

mod import;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use precio_archive::Archive;
use precio_core::{Warehouse, dimension::TimestampRow};
use precio_ingest::{Ingestor, sweep};
use precio_store_sqlite::SqliteWarehouse;
use serde::Serialize;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Price snapshot archive and warehouse loader")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "precio.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Load archived snapshots into the warehouse.
  Ingest {
    /// First ordinal to ingest.
    #[arg(long, default_value_t = 0)]
    first: u32,
    /// Stop before this ordinal (default: the archive length).
    #[arg(long)]
    top:   Option<u32>,
  },
  /// Print the archive length and the row count of every table.
  Status,
  /// Normalise raw scraper dumps and archive them as a new snapshot.
  Import {
    #[arg(long, value_name = "FILE")]
    points_of_sale: PathBuf,
    #[arg(long, value_name = "FILE")]
    articles:       PathBuf,
    /// `YYYYMMDDHHMMSS` label; defaults to the current wall clock.
    #[arg(long)]
    timestamp:      Option<String>,
  },
  /// Clear the processed markers of every snapshot.
  ResetMarkers,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Ingest { first, top } => {
      let archive = open_archive(&settings)?;
      let mut warehouse = open_warehouse(&settings)?;
      let mut ingestor = Ingestor::new().with_marker(warehouse.identifier());
      let report = sweep(&archive, first, top, &mut warehouse, &mut ingestor)
        .context("archive sweep failed")?;
      if !report.failed.is_empty() {
        tracing::warn!(failed = ?report.failed, "some snapshots were not ingested");
      }
      print_json(&report)
    }
    Command::Status => {
      let archive = open_archive(&settings)?;
      let warehouse = open_warehouse(&settings)?;
      let tables = warehouse.counts().context("failed to count rows")?;
      print_json(&serde_json::json!({
        "archive": {
          "path":      archive.home(),
          "snapshots": archive.len(),
        },
        "database": warehouse.identifier(),
        "tables":   tables,
      }))
    }
    Command::Import { points_of_sale, articles, timestamp } => {
      if let Some(ts) = &timestamp {
        TimestampRow::parse(ts).with_context(|| format!("invalid --timestamp {ts:?}"))?;
      }
      let mut archive = open_archive(&settings)?;
      let report =
        import::import(&mut archive, &points_of_sale, &articles, timestamp.as_deref())?;
      tracing::info!(ordinal = report.ordinal, key = %report.key, "snapshot archived");
      print_json(&report)
    }
    Command::ResetMarkers => {
      let archive = open_archive(&settings)?;
      let reset = archive.reset_markers().context("failed to reset markers")?;
      tracing::info!(snapshots = reset, "processed markers cleared");
      Ok(())
    }
  }
}

fn open_archive(settings: &Settings) -> anyhow::Result<Archive> {
  let archive = Archive::open(&settings.archive_path)
    .with_context(|| format!("failed to open archive at {:?}", settings.archive_path))?;
  Ok(archive.with_utc_offset(settings.utc_offset()?))
}

fn open_warehouse(settings: &Settings) -> anyhow::Result<SqliteWarehouse> {
  SqliteWarehouse::open(&settings.database_path)
    .with_context(|| format!("failed to open database at {:?}", settings.database_path))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
