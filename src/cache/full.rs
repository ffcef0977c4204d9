//! Full Table Cache Module
//!
//! Cache that mirrors an entire table and never evicts.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;
use tracing::trace;

use crate::cache::{
    get_recorded, put_if_newer, CacheStats, CacheStatsSnapshot, CacheType, CacheValue,
    TableCache,
};

// == Full Table Cache ==
/// Keeps every key indefinitely, so it is the authoritative in-memory copy of
/// a table small enough to fit in memory.
#[derive(Debug)]
pub struct FullTableCache<K, V> {
    /// Current value per key
    entries: RwLock<HashMap<K, CacheValue<V>>>,
    stats: CacheStats,
}

impl<K, V> FullTableCache<K, V>
where
    K: Hash + Eq,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::new(),
        }
    }
}

impl<K, V> Default for FullTableCache<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TableCache<K, V> for FullTableCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn put(&self, key: K, value: Option<V>, epoch: i64) {
        let mut entries = self.entries.write();
        if put_if_newer(&mut entries, key, CacheValue::new(value, epoch)) {
            self.stats.record_insert();
        } else {
            self.stats.record_stale_put();
        }
    }

    fn get(&self, key: &K) -> Option<CacheValue<V>> {
        get_recorded(&self.entries.read(), key, &self.stats)
    }

    fn cleanup(&self, epoch: i64) {
        // Nothing to evict: every key stays mirrored.
        trace!(epoch, "full cache cleanup is a no-op");
        self.stats.record_cleanup(epoch, 0);
    }

    fn size(&self) -> usize {
        self.entries.read().len()
    }

    fn pending_epochs(&self) -> usize {
        0
    }

    fn cache_type(&self) -> CacheType {
        CacheType::Full
    }

    fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.size(), 0)
    }
}
