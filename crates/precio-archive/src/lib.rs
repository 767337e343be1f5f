//! Sharded, append-only archive of scrape snapshots.
//!
//! Layout on disk:
//!
//! ```text
//! <archive-root>/
//!   index.json                 {"index": "<count>"}
//!   root/<d1>/<d2>/<d3>/       one directory per snapshot
//!     metadata.json            {"key": "...", "timestamp": "...", ...}
//!     points_of_sale.jsonl
//!     articles.jsonl
//! ```
//!
//! `d1/d2/d3` are the zero-padded base-256 digits of the snapshot ordinal,
//! which keeps every directory under 257 entries.

mod fsutil;

pub mod error;
pub mod index;
pub mod metadata;
pub mod normalize;
pub mod path;
pub mod records;
pub mod snapshot;
pub mod tree;

pub use error::{Error, Result};
pub use index::Index;
pub use snapshot::Snapshot;
pub use tree::{Archive, Snapshots};
