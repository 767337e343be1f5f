//! Small filesystem helpers shared by the index and snapshot metadata.

use std::{
  fs::{self, File},
  io::{self, Write},
  path::Path,
};

use serde::Serialize;

use crate::{Error, Result};

/// Read a whole file, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
  match fs::read_to_string(path) {
    Ok(text) => Ok(Some(text)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(Error::io(path)(e)),
  }
}

/// Serialise `value` as pretty JSON and replace `path` with it.
///
/// The bytes are written to a sibling temporary file and fsynced before the
/// rename, so readers observe either the old or the new document in full.
pub(crate) fn write_json_atomic(path: &Path, value: &impl Serialize) -> Result<()> {
  let body = serde_json::to_vec_pretty(value)?;
  let tmp = path.with_extension("json.tmp");

  let mut file = File::create(&tmp).map_err(Error::io(&tmp))?;
  file.write_all(&body).map_err(Error::io(&tmp))?;
  file.sync_all().map_err(Error::io(&tmp))?;
  drop(file);

  fs::rename(&tmp, path).map_err(Error::io(path))?;
  Ok(())
}
