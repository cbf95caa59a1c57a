//! File-based JSON cache with TTL expiration
//!
//! Each entry lives in its own directory under the cache root, named after its
//! `(item_type, item_id)` key, holding a `metadata.json` and a `detail.json`.
//! Nothing is kept in memory between operations, so entries survive restarts.
//! Writes are staged in a sibling directory and renamed into place, so readers
//! only ever see a complete entry.

mod cache;
mod clock;
mod error;
mod store;
mod types;

pub use cache::{TtlCache, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use store::EntryStore;
pub use types::{CacheMetadata, CacheStats, SweepReport, TypeStats};
