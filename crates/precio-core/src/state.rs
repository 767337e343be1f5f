//! Static lookup from raw province identifiers to state rows.
//!
//! The feed reports provinces either by code (`"ar-b"`) or, in older samples,
//! by lower-case name (`"buenos aires"`). Both resolve to the same row.
//! Unrecognised identifiers resolve to the [`UNKNOWN_STATE`] sentinel rather
//! than failing.

use crate::dimension::StateRow;

/// Sentinel `(code, name)` for identifiers missing from the table.
pub const UNKNOWN_STATE: (&str, &str) = ("xxxx", "Error");

const CODES_AND_STATES: &[(&str, &str, &str)] = &[
  ("ar-a", "ar-a", "Salta"),
  ("salta", "ar-a", "Salta"),
  ("ar-b", "ar-b", "Buenos Aires"),
  ("buenos aires", "ar-b", "Buenos Aires"),
  ("ar-c", "ar-c", "CABA"),
  ("caba", "ar-c", "CABA"),
  ("capital federal", "ar-c", "CABA"),
  ("ar-d", "ar-d", "San Luis"),
  ("san luis", "ar-d", "San Luis"),
  ("ar-e", "ar-e", "Entre Rios"),
  ("entre rios", "ar-e", "Entre Rios"),
  ("ar-f", "ar-f", "La Rioja"),
  ("la rioja", "ar-f", "La Rioja"),
  ("ar-g", "ar-g", "Santiago del Estero"),
  ("santiago del estero", "ar-g", "Santiago del Estero"),
  ("ar-h", "ar-h", "Chaco"),
  ("chaco", "ar-h", "Chaco"),
  ("ar-j", "ar-j", "San Juan"),
  ("san juan", "ar-j", "San Juan"),
  ("ar-k", "ar-k", "Catamarca"),
  ("catamarca", "ar-k", "Catamarca"),
  ("ar-l", "ar-l", "La Pampa"),
  ("la pampa", "ar-l", "La Pampa"),
  ("ar-m", "ar-m", "Mendoza"),
  ("mendoza", "ar-m", "Mendoza"),
  ("ar-n", "ar-n", "Misiones"),
  ("misiones", "ar-n", "Misiones"),
  ("ar-p", "ar-p", "Formosa"),
  ("formosa", "ar-p", "Formosa"),
  ("ar-q", "ar-q", "Neuquén"),
  ("neuquen", "ar-q", "Neuquén"),
  ("ar-r", "ar-r", "Río Negro"),
  ("rio negro", "ar-r", "Río Negro"),
  ("ar-s", "ar-s", "Santa Fe"),
  ("santa fe", "ar-s", "Santa Fe"),
  ("ar-t", "ar-t", "Tucumán"),
  ("tucuman", "ar-t", "Tucumán"),
  ("ar-u", "ar-u", "Chubut"),
  ("chubut", "ar-u", "Chubut"),
  ("ar-v", "ar-v", "Tierra del Fuego"),
  ("tierra del fuego", "ar-v", "Tierra del Fuego"),
  ("ar-w", "ar-w", "Corrientes"),
  ("corrientes", "ar-w", "Corrientes"),
  ("ar-x", "ar-x", "Córdoba"),
  ("cordoba", "ar-x", "Córdoba"),
  ("ar-y", "ar-y", "Jujuy"),
  ("jujuy", "ar-y", "Jujuy"),
  ("ar-z", "ar-z", "Santa Cruz"),
  ("santa cruz", "ar-z", "Santa Cruz"),
];

/// Resolve a raw province identifier to its `(code, name)` pair.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn lookup(raw: &str) -> (&'static str, &'static str) {
  let needle = raw.trim().to_lowercase();
  CODES_AND_STATES
    .iter()
    .find(|(alias, _, _)| *alias == needle)
    .map(|&(_, code, name)| (code, name))
    .unwrap_or(UNKNOWN_STATE)
}

/// Whether `raw` resolves to a real province rather than the sentinel.
pub fn is_known(raw: &str) -> bool { lookup(raw) != UNKNOWN_STATE }

/// Build the state row a raw identifier resolves to.
pub fn state_row(raw: &str) -> StateRow {
  let (code, name) = lookup(raw);
  StateRow { code: code.to_owned(), name: name.to_owned() }
}
