//! Cache Module
//!
//! Epoch-ordered read-after-write caches for a sorted key-value table.
//!
//! Writers `put` each change at the epoch the backend assigned to it; readers
//! `get` the newest cached value before falling back to the backend; the owner
//! calls `cleanup(epoch)` once the backend has durably flushed up to `epoch`.
//!
//! Two strategies share the [`TableCache`] capability:
//! - [`FullTableCache`] mirrors the whole table and never evicts.
//! - [`PartialTableCache`] keeps entries only until a flush subsumes them.

mod epoch;
mod full;
mod partial;
mod stats;
mod value;

#[cfg(test)]
mod property_tests;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::error::TableError;

// Re-export public types
pub use full::FullTableCache;
pub use partial::PartialTableCache;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use value::CacheValue;

// == Table Cache Capability ==
/// Operations shared by every cache strategy.
///
/// All operations are synchronous, never block on I/O and never fail. Each
/// implementation serializes mutations behind a single lock so the map and any
/// eviction bookkeeping change together.
///
/// Epochs passed to `put` must be the write positions assigned by the backend.
/// Epochs passed to `cleanup` must already be durably persisted by the backend;
/// the cache does not verify this.
pub trait TableCache<K, V>: Send + Sync {
    /// Records a write of `value` (or a delete, for `None`) at `epoch`.
    ///
    /// The mapping is replaced only if `epoch` is newer than the cached one.
    fn put(&self, key: K, value: Option<V>, epoch: i64);

    /// Returns the current cached value for `key`, which may be a tombstone.
    fn get(&self, key: &K) -> Option<CacheValue<V>>;

    /// Drops entries made redundant by a durable flush up to `epoch`.
    fn cleanup(&self, epoch: i64);

    /// Number of keys currently mapped.
    fn size(&self) -> usize;

    /// Outstanding eviction candidates. Always 0 for strategies that never evict.
    fn pending_epochs(&self) -> usize;

    fn cache_type(&self) -> CacheType;

    /// Returns current statistics.
    fn stats(&self) -> CacheStatsSnapshot;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // == Lookup ==
    /// Resolves `key` into what the cache can say about it.
    ///
    /// A tombstone always means the key does not exist. A missing entry means
    /// the key does not exist for a full cache, which mirrors the whole table,
    /// and may exist for a partial cache, whose caller must read the backend.
    fn lookup(&self, key: &K) -> CacheResult<V> {
        match self.get(key) {
            Some(value) if value.is_tombstone() => CacheResult::NotExist,
            Some(value) => CacheResult::Exists(value),
            None => match self.cache_type() {
                CacheType::Full => CacheResult::NotExist,
                CacheType::Partial => CacheResult::MayExist,
            },
        }
    }
}

// == Cache Type ==
/// Selects the caching strategy for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// Whole table mirrored in memory
    Full,
    /// Only unflushed writes kept in memory
    Partial,
}

impl CacheType {
    /// Creates an empty cache of this type.
    pub fn build<K, V>(self) -> Arc<dyn TableCache<K, V>>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match self {
            CacheType::Full => Arc::new(FullTableCache::new()),
            CacheType::Partial => Arc::new(PartialTableCache::new()),
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheType::Full => write!(f, "full"),
            CacheType::Partial => write!(f, "partial"),
        }
    }
}

impl FromStr for CacheType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(CacheType::Full),
            "partial" => Ok(CacheType::Partial),
            other => Err(TableError::InvalidCacheType(other.to_string())),
        }
    }
}

// == Cache Result ==
/// Outcome of [`TableCache::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult<V> {
    /// Live value cached for the key
    Exists(CacheValue<V>),
    /// The key is known not to exist
    NotExist,
    /// The cache cannot answer; read the backend
    MayExist,
}

/// Value-free view of a [`CacheResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheStatus {
    Exists,
    NotExist,
    MayExist,
}

impl<V> CacheResult<V> {
    pub fn status(&self) -> CacheStatus {
        match self {
            CacheResult::Exists(_) => CacheStatus::Exists,
            CacheResult::NotExist => CacheStatus::NotExist,
            CacheResult::MayExist => CacheStatus::MayExist,
        }
    }
}

// == Shared Map Logic ==
/// Applies the overwrite-if-newer rule. Returns true if the map changed.
pub(crate) fn put_if_newer<K, V>(
    map: &mut HashMap<K, CacheValue<V>>,
    key: K,
    value: CacheValue<V>,
) -> bool
where
    K: Hash + Eq,
{
    match map.entry(key) {
        Entry::Occupied(mut current) => {
            if value.epoch() > current.get().epoch() {
                current.insert(value);
                true
            } else {
                false
            }
        }
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
    }
}

/// Reads a key and records the hit or miss.
pub(crate) fn get_recorded<K, V>(
    map: &HashMap<K, CacheValue<V>>,
    key: &K,
    stats: &CacheStats,
) -> Option<CacheValue<V>>
where
    K: Hash + Eq,
    V: Clone,
{
    match map.get(key) {
        Some(value) => {
            stats.record_hit();
            Some(value.clone())
        }
        None => {
            stats.record_miss();
            None
        }
    }
}
