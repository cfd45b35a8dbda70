//! Persistent fingerprint and thumbnail cache.
//!
//! This module lets rescans of a folder skip rasterizing documents whose
//! identity has not changed since the last run.
//!
//! # Architecture
//!
//! * [`key`]: [`CacheKey`] derivation from `(path, modified, size)` and the
//!   reversible record file naming.
//! * [`record`]: [`CacheRecord`], the flat key-value document stored per key.
//! * [`store`]: [`FingerprintCache`], the directory-backed store with merge
//!   on write and LRU eviction against a byte budget.
//!
//! # Cache Invalidation
//!
//! Records are never invalidated explicitly. A changed document gets a new
//! key (its modification time or size differs), and the stale record ages
//! out through LRU eviction.

pub mod key;
pub mod record;
pub mod store;

pub use key::CacheKey;
pub use record::CacheRecord;
pub use store::{
    CacheError, CacheResult, CacheStats, EvictionReport, FingerprintCache, StoredRecord,
    CACHE_DIR_NAME, MAX_CACHE_BYTES,
};
