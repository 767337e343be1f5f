//! The two record shapes stored in a snapshot's line-delimited files.
//!
//! Lines are decoded leniently (every field optional) and then validated,
//! so a bad line yields a [`Error::MalformedRecord`] naming the line rather
//! than a bare serde error.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A line-delimited record set of a snapshot.
pub trait Record: Serialize + Sized {
  /// Base file name, without the `.jsonl` suffix.
  const NAME: &'static str;

  /// Alternative file names read when the primary one is absent.
  const LEGACY_NAMES: &'static [&'static str] = &[];

  fn from_line(line: &str) -> Result<Self>;
}

fn required(line: &str, field: &str, value: Option<String>) -> Result<String> {
  match value {
    Some(v) if !v.trim().is_empty() => Ok(v),
    _ => Err(Error::malformed(line, format!("missing field `{field}`"))),
  }
}

// ─── Points of sale ──────────────────────────────────────────────────────────

/// A normalised point-of-sale row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointOfSaleRecord {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub point_of_sale_code: Option<String>,
  pub state:              String,
  pub city:               String,
  pub address:            String,
  pub flag:               String,
  pub business:           String,
  pub branch:             String,
  /// Natural key of the point of sale, `"(<code>)(<flag>)"`.
  pub point_of_sale_key:  String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city_key:           Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub place_key:          Option<String>,
}

#[derive(Deserialize)]
struct LinePointOfSale {
  point_of_sale_code: Option<String>,
  state:              Option<String>,
  city:               Option<String>,
  address:            Option<String>,
  flag:               Option<String>,
  business:           Option<String>,
  branch:             Option<String>,
  point_of_sale_key:  Option<String>,
  city_key:           Option<String>,
  place_key:          Option<String>,
}

impl Record for PointOfSaleRecord {
  const NAME: &'static str = "points_of_sale";

  fn from_line(line: &str) -> Result<Self> {
    let raw: LinePointOfSale = serde_json::from_str(line)
      .map_err(|e| Error::malformed(line, e.to_string()))?;
    Ok(Self {
      point_of_sale_code: raw.point_of_sale_code,
      state:              required(line, "state", raw.state)?,
      city:               required(line, "city", raw.city)?,
      address:            required(line, "address", raw.address)?,
      flag:               required(line, "flag", raw.flag)?,
      business:           required(line, "business", raw.business)?,
      branch:             required(line, "branch", raw.branch)?,
      point_of_sale_key:  required(line, "point_of_sale_key", raw.point_of_sale_key)?,
      city_key:           raw.city_key,
      place_key:          raw.place_key,
    })
  }
}

// ─── Articles ────────────────────────────────────────────────────────────────

/// A normalised article-at-point-of-sale row; `price` is in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
  pub article_code:       String,
  pub brand:              String,
  pub description:        String,
  pub package:            String,
  pub price:              i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub point_of_sale_code: Option<String>,
  pub point_of_sale_key:  String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub article_card_key:   Option<String>,
}

#[derive(Deserialize)]
struct LineArticle {
  article_code:       Option<String>,
  brand:              Option<String>,
  description:        Option<String>,
  package:            Option<String>,
  price:              Option<serde_json::Value>,
  point_of_sale_code: Option<String>,
  point_of_sale_key:  Option<String>,
  article_card_key:   Option<String>,
}

/// Accept an integer number of cents, as a JSON integer or digit string.
fn parse_cents(line: &str, value: Option<serde_json::Value>) -> Result<i64> {
  let unparseable = |v: &serde_json::Value| {
    Error::malformed(line, format!("unparseable price {v}"))
  };
  let cents = match value {
    None | Some(serde_json::Value::Null) => {
      return Err(Error::malformed(line, "missing field `price`"));
    }
    Some(serde_json::Value::Number(n)) => {
      n.as_i64().ok_or_else(|| unparseable(&serde_json::Value::Number(n.clone())))?
    }
    Some(serde_json::Value::String(s)) => s
      .trim()
      .parse::<i64>()
      .map_err(|_| unparseable(&serde_json::Value::String(s.clone())))?,
    Some(other) => return Err(unparseable(&other)),
  };
  if cents < 0 {
    return Err(Error::malformed(line, format!("negative price {cents}")));
  }
  Ok(cents)
}

impl Record for ArticleRecord {
  const NAME: &'static str = "articles";
  const LEGACY_NAMES: &'static [&'static str] = &["articles_per_point_of_sale"];

  fn from_line(line: &str) -> Result<Self> {
    let raw: LineArticle = serde_json::from_str(line)
      .map_err(|e| Error::malformed(line, e.to_string()))?;
    Ok(Self {
      article_code:       required(line, "article_code", raw.article_code)?,
      brand:              required(line, "brand", raw.brand)?,
      description:        required(line, "description", raw.description)?,
      package:            required(line, "package", raw.package)?,
      price:              parse_cents(line, raw.price)?,
      point_of_sale_code: raw.point_of_sale_code,
      point_of_sale_key:  required(line, "point_of_sale_key", raw.point_of_sale_key)?,
      article_card_key:   raw.article_card_key,
    })
  }
}
