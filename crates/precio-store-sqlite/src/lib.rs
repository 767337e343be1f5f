//! SQLite backend for the Precio price warehouse.
//!
//! Implements [`precio_core::Warehouse`] on a single synchronous
//! [`rusqlite::Connection`]. Each insert batch runs in its own transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteWarehouse;
