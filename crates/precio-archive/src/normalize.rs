//! Normalisation of raw scraper rows into snapshot records.
//!
//! The feed reports points of sale as
//! `{id, provincia, localidad, direccion, banderaDescripcion,
//! comercioRazonSocial, sucursalNombre}` and articles as
//! `{id, marca, nombre, presentacion, precio, point_of_sale_id}`. Text is
//! trimmed and lower-cased (codes keep their case), prices become integer
//! cents, and each article is tied to the point-of-sale key seen earlier in
//! the same run.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{
  Error, Result,
  records::{ArticleRecord, PointOfSaleRecord},
};

/// A JSON scalar the feed may send for a text field.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
  Text(String),
  Number(serde_json::Number),
}

impl Scalar {
  fn into_text(self) -> String {
    match self {
      Self::Text(s) => s.trim().to_owned(),
      Self::Number(n) => n.to_string(),
    }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapedPointOfSale {
  id:                    Option<Scalar>,
  provincia:             Option<Scalar>,
  localidad:             Option<Scalar>,
  direccion:             Option<Scalar>,
  bandera_descripcion:   Option<Scalar>,
  comercio_razon_social: Option<Scalar>,
  sucursal_nombre:       Option<Scalar>,
}

#[derive(Deserialize)]
struct ScrapedArticle {
  id:               Option<Scalar>,
  marca:            Option<Scalar>,
  nombre:           Option<Scalar>,
  presentacion:     Option<Scalar>,
  precio:           Option<Scalar>,
  point_of_sale_id: Option<Scalar>,
}

/// Required text field; `lower` folds case.
fn text_field(line: &str, name: &str, value: Option<Scalar>, lower: bool) -> Result<String> {
  let text = value.map(Scalar::into_text).unwrap_or_default();
  if text.is_empty() {
    return Err(Error::malformed(line, format!("missing field `{name}`")));
  }
  Ok(if lower { text.to_lowercase() } else { text })
}

// ─── Keys ────────────────────────────────────────────────────────────────────

pub fn city_key(state: &str, city: &str) -> String { format!("({state})[{city}]") }

pub fn place_key(state: &str, city: &str, address: &str) -> String {
  format!("({state})[({city})({address})]")
}

pub fn point_of_sale_key(code: &str, flag: &str) -> String { format!("({code})({flag})") }

pub fn article_card_key(code: &str, brand: &str, description: &str, package: &str) -> String {
  format!("[{code}]({brand})({description})({package})")
}

/// Convert a decimal price (`"1234.5"`) to cents, rounding to the nearest
/// cent.
pub fn price_to_cents(price: &str) -> Option<i64> {
  let value: f64 = price.trim().parse().ok()?;
  if !value.is_finite() || value < 0.0 {
    return None;
  }
  let cents = (value * 100.0).round();
  (cents <= i64::MAX as f64).then_some(cents as i64)
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// Stateful converter for one scrape run.
///
/// Points of sale must be fed before the articles that reference them.
#[derive(Debug, Default)]
pub struct Normalizer {
  point_of_sale_keys: HashMap<String, String>,
}

impl Normalizer {
  pub fn new() -> Self { Self::default() }

  #[cfg(test)]
  fn known_points_of_sale(&self) -> usize { self.point_of_sale_keys.len() }

  pub fn point_of_sale(&mut self, line: &str) -> Result<PointOfSaleRecord> {
    let raw: ScrapedPointOfSale =
      serde_json::from_str(line).map_err(|e| Error::malformed(line, e.to_string()))?;
    let field = |name, value, lower| text_field(line, name, value, lower);

    let code = field("id", raw.id, false)?;
    let state = field("provincia", raw.provincia, true)?;
    let city = field("localidad", raw.localidad, true)?;
    let address = field("direccion", raw.direccion, true)?;
    let flag = field("banderaDescripcion", raw.bandera_descripcion, true)?;
    let business = field("comercioRazonSocial", raw.comercio_razon_social, true)?;
    let branch = field("sucursalNombre", raw.sucursal_nombre, true)?;

    let key = point_of_sale_key(&code, &flag);
    self.point_of_sale_keys.insert(code.clone(), key.clone());

    Ok(PointOfSaleRecord {
      city_key: Some(city_key(&state, &city)),
      place_key: Some(place_key(&state, &city, &address)),
      point_of_sale_code: Some(code),
      point_of_sale_key: key,
      state,
      city,
      address,
      flag,
      business,
      branch,
    })
  }

  pub fn article(&self, line: &str) -> Result<ArticleRecord> {
    let raw: ScrapedArticle =
      serde_json::from_str(line).map_err(|e| Error::malformed(line, e.to_string()))?;
    let field = |name, value, lower| text_field(line, name, value, lower);

    let code = field("id", raw.id, false)?;
    let brand = field("marca", raw.marca, true)?;
    let description = field("nombre", raw.nombre, true)?;
    let package = field("presentacion", raw.presentacion, true)?;
    let precio = field("precio", raw.precio, false)?;
    let price = price_to_cents(&precio)
      .ok_or_else(|| Error::malformed(line, format!("unparseable price {precio:?}")))?;
    let pos_code = field("point_of_sale_id", raw.point_of_sale_id, false)?;
    let pos_key = self.point_of_sale_keys.get(&pos_code).cloned().ok_or_else(|| {
      Error::malformed(line, format!("unknown point of sale {pos_code:?}"))
    })?;

    Ok(ArticleRecord {
      article_card_key: Some(article_card_key(&code, &brand, &description, &package)),
      article_code: code,
      brand,
      description,
      package,
      price,
      point_of_sale_code: Some(pos_code),
      point_of_sale_key: pos_key,
    })
  }
}
