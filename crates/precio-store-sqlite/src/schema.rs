//! SQL schema for the Precio SQLite warehouse.
//!
//! Executed once at connection startup. Table and column names match the
//! `TABLE`/`COLUMNS` constants of the `precio_core::dimension` row types.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS timestamps (
    id      INTEGER PRIMARY KEY,
    year    INTEGER NOT NULL,
    month   INTEGER NOT NULL,
    day     INTEGER NOT NULL,
    hour    INTEGER NOT NULL,
    minute  INTEGER NOT NULL,
    second  INTEGER NOT NULL,
    UNIQUE (year, month, day, hour, minute, second)
);

-- Location hierarchy: state > city > place.
CREATE TABLE IF NOT EXISTS states (
    id    INTEGER PRIMARY KEY,
    code  TEXT NOT NULL UNIQUE,
    name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cities (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL,
    state_id  INTEGER NOT NULL REFERENCES states(id),
    UNIQUE (name, state_id)
);

CREATE TABLE IF NOT EXISTS places (
    id       INTEGER PRIMARY KEY,
    address  TEXT NOT NULL,
    city_id  INTEGER NOT NULL REFERENCES cities(id),
    UNIQUE (address, city_id)
);

CREATE TABLE IF NOT EXISTS flags (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS businesses (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS branches (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS points_of_sale (
    id           INTEGER PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,   -- '(<code>)(<flag>)'
    flag_id      INTEGER NOT NULL REFERENCES flags(id),
    business_id  INTEGER NOT NULL REFERENCES businesses(id),
    branch_id    INTEGER NOT NULL REFERENCES branches(id)
);

CREATE TABLE IF NOT EXISTS points_of_sale_places (
    point_of_sale_id  INTEGER NOT NULL REFERENCES points_of_sale(id),
    place_id          INTEGER NOT NULL REFERENCES places(id),
    PRIMARY KEY (point_of_sale_id, place_id)
);

-- Article taxonomy.
CREATE TABLE IF NOT EXISTS article_codes (
    id    INTEGER PRIMARY KEY,
    code  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS article_brands (
    id     INTEGER PRIMARY KEY,
    brand  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS article_descriptions (
    id           INTEGER PRIMARY KEY,
    description  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS article_packages (
    id       INTEGER PRIMARY KEY,
    package  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS article_cards (
    id              INTEGER PRIMARY KEY,
    brand_id        INTEGER NOT NULL REFERENCES article_brands(id),
    description_id  INTEGER NOT NULL REFERENCES article_descriptions(id),
    package_id      INTEGER NOT NULL REFERENCES article_packages(id),
    code_id         INTEGER NOT NULL REFERENCES article_codes(id),
    UNIQUE (brand_id, description_id, package_id, code_id)
);

-- Prices are strictly append-only observations.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS prices (
    id                INTEGER PRIMARY KEY,
    amount            INTEGER NOT NULL,   -- cents
    timestamp_id      INTEGER NOT NULL REFERENCES timestamps(id),
    article_code_id   INTEGER NOT NULL REFERENCES article_codes(id),
    point_of_sale_id  INTEGER NOT NULL REFERENCES points_of_sale(id)
);

CREATE INDEX IF NOT EXISTS timestamps_ymdh_idx     ON timestamps(year, month, day, hour);
CREATE INDEX IF NOT EXISTS states_name_idx         ON states(name);
CREATE INDEX IF NOT EXISTS cities_state_idx        ON cities(state_id);
CREATE INDEX IF NOT EXISTS places_city_idx         ON places(city_id);
CREATE INDEX IF NOT EXISTS prices_amount_idx       ON prices(amount);
CREATE INDEX IF NOT EXISTS prices_timestamp_idx    ON prices(timestamp_id);
CREATE INDEX IF NOT EXISTS prices_article_idx      ON prices(article_code_id);
CREATE INDEX IF NOT EXISTS prices_point_of_sale_idx ON prices(point_of_sale_id);

PRAGMA user_version = 1;
";

/// Every table, in the order [`TableCounts`](precio_core::TableCounts)
/// lists them.
pub const TABLES: [&str; 15] = [
  "timestamps",
  "states",
  "cities",
  "places",
  "flags",
  "businesses",
  "branches",
  "points_of_sale",
  "points_of_sale_places",
  "article_codes",
  "article_brands",
  "article_descriptions",
  "article_packages",
  "article_cards",
  "prices",
];
