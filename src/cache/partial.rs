//! Partial Table Cache Module
//!
//! Cache that holds writes only until a durable flush subsumes them.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cache::epoch::EpochEntry;
use crate::cache::{
    get_recorded, put_if_newer, CacheStats, CacheStatsSnapshot, CacheType, CacheValue,
    TableCache,
};

// == Partial State ==
/// Map and eviction candidates, always mutated together under one lock.
#[derive(Debug)]
struct PartialState<K, V> {
    /// Current value per key
    entries: HashMap<K, CacheValue<V>>,
    /// One entry per `put` call, superseded or not, ordered by epoch
    candidates: BTreeSet<EpochEntry<K>>,
    /// Tie-breaker for candidates sharing an epoch
    next_seq: u64,
    /// Highest epoch cleanup has run with
    cleaned_through: Option<i64>,
}

impl<K, V> PartialState<K, V>
where
    K: Hash + Eq,
{
    fn record_candidate(&mut self, epoch: i64, key: K) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.candidates.insert(EpochEntry::new(epoch, seq, key));
    }

    /// Pops every candidate at or below `epoch` in ascending order and drops
    /// the mapping of each key whose current value is itself subsumed.
    ///
    /// A mapping whose epoch is above the boundary came from a write that no
    /// flush has confirmed yet, so it stays. Returns the number of keys evicted.
    fn evict_through(&mut self, epoch: i64) -> usize {
        let mut evicted = 0;
        while self.candidates.first().is_some_and(|c| c.epoch() <= epoch) {
            let Some(candidate) = self.candidates.pop_first() else {
                break;
            };
            let key = candidate.into_key();
            let subsumed = self
                .entries
                .get(&key)
                .is_some_and(|current| current.epoch() <= epoch);
            if subsumed {
                self.entries.remove(&key);
                evicted += 1;
            }
        }
        evicted
    }
}

// == Partial Table Cache ==
/// Keeps recent writes visible until the backend confirms them durable.
///
/// Every `put` records an eviction candidate, even one the epoch guard
/// rejects.
#[derive(Debug)]
pub struct PartialTableCache<K, V> {
    state: RwLock<PartialState<K, V>>,
    stats: CacheStats,
}

impl<K, V> PartialTableCache<K, V>
where
    K: Hash + Eq,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PartialState {
                entries: HashMap::new(),
                candidates: BTreeSet::new(),
                next_seq: 0,
                cleaned_through: None,
            }),
            stats: CacheStats::new(),
        }
    }
}

impl<K, V> Default for PartialTableCache<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TableCache<K, V> for PartialTableCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn put(&self, key: K, value: Option<V>, epoch: i64) {
        let mut state = self.state.write();
        state.record_candidate(epoch, key.clone());
        if put_if_newer(&mut state.entries, key, CacheValue::new(value, epoch)) {
            self.stats.record_insert();
        } else {
            self.stats.record_stale_put();
        }
    }

    fn get(&self, key: &K) -> Option<CacheValue<V>> {
        get_recorded(&self.state.read().entries, key, &self.stats)
    }

    fn cleanup(&self, epoch: i64) {
        let (evicted, remaining) = {
            let mut state = self.state.write();
            if let Some(previous) = state.cleaned_through {
                if epoch < previous {
                    debug!(epoch, previous, "ignoring cleanup behind previous boundary");
                    return;
                }
            }
            state.cleaned_through = Some(epoch);
            (state.evict_through(epoch), state.candidates.len())
        };

        self.stats.record_cleanup(epoch, evicted);
        if evicted > 0 {
            debug!(epoch, evicted, remaining, "partial cache cleanup");
        } else {
            trace!(epoch, remaining, "partial cache cleanup evicted nothing");
        }
    }

    fn size(&self) -> usize {
        self.state.read().entries.len()
    }

    fn pending_epochs(&self) -> usize {
        self.state.read().candidates.len()
    }

    fn cache_type(&self) -> CacheType {
        CacheType::Partial
    }

    fn stats(&self) -> CacheStatsSnapshot {
        let (entries, pending) = {
            let state = self.state.read();
            (state.entries.len(), state.candidates.len())
        };
        self.stats.snapshot(entries, pending)
    }
}
