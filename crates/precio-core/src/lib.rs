//! Core types and trait definitions for the Precio price warehouse.
//!
//! This crate is deliberately free of filesystem and database dependencies.
//! It describes the star schema (dimensions, the price fact, timestamps) and
//! the [`Warehouse`] seam that storage backends implement.

pub mod dimension;
pub mod error;
pub mod state;
pub mod warehouse;

pub use error::{Error, Result};
pub use warehouse::{TableCounts, Warehouse};
