//! Ordinal ⇄ directory path codec.
//!
//! An ordinal `n < 256³` is written as three base-256 digits, most
//! significant first, each rendered as a three-character zero-padded decimal
//! (`"000"`..=`"255"`).

use std::path::{Path, PathBuf};

/// Number of addressable snapshots (`256³`).
pub const MAX_ORDINALS: u32 = 1 << 24;

/// The three base-256 digits of an ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digits(pub [u8; 3]);

impl Digits {
  /// Split `ordinal` into digits; `None` when it is not addressable.
  pub fn encode(ordinal: u32) -> Option<Self> {
    if ordinal >= MAX_ORDINALS {
      return None;
    }
    let [_, first, second, third] = ordinal.to_be_bytes();
    Some(Self([first, second, third]))
  }

  pub fn decode(self) -> u32 {
    let [first, second, third] = self.0;
    u32::from_be_bytes([0, first, second, third])
  }

  /// Zero-padded components, e.g. `["001", "002", "003"]`.
  pub fn components(self) -> [String; 3] { self.0.map(|d| format!("{d:03}")) }

  /// The 9-digit snapshot key, e.g. `"001002003"`.
  pub fn key(self) -> String { self.components().concat() }

  /// The snapshot directory below `root`.
  pub fn path_under(self, root: &Path) -> PathBuf {
    let [first, second, third] = self.components();
    root.join(first).join(second).join(third)
  }

  /// Parse a 9-digit key back into digits.
  pub fn from_key(key: &str) -> Option<Self> {
    if key.len() != 9 || !key.bytes().all(|b| b.is_ascii_digit()) {
      return None;
    }
    let digit = |i: usize| key[i * 3..i * 3 + 3].parse::<u8>().ok();
    Some(Self([digit(0)?, digit(1)?, digit(2)?]))
  }
}
