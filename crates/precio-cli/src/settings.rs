//! Runtime settings, read from an optional TOML file and `PRECIO_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::FixedOffset;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Directory holding `index.json` and the snapshot tree.
  pub archive_path:     PathBuf,
  /// SQLite warehouse file.
  pub database_path:    PathBuf,
  /// Offset of the wall clock used to label new snapshots.
  pub utc_offset_hours: i32,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      archive_path:     PathBuf::from("./archive"),
      database_path:    PathBuf::from("./precio.db"),
      utc_offset_hours: -3,
    }
  }
}

impl Settings {
  /// Layer `file` (if it exists) under the environment and expand `~/` in
  /// both paths.
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("PRECIO"))
      .build()
      .context("failed to read configuration")?;

    let mut settings: Self = raw
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.archive_path = expand_tilde(&settings.archive_path);
    settings.database_path = expand_tilde(&settings.database_path);
    Ok(settings)
  }

  pub fn utc_offset(&self) -> anyhow::Result<FixedOffset> {
    self
      .utc_offset_hours
      .checked_mul(3600)
      .and_then(FixedOffset::east_opt)
      .with_context(|| format!("utc_offset_hours {} is out of range", self.utc_offset_hours))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
