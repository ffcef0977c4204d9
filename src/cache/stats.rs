//! Cache Statistics Module
//!
//! Tracks cache activity: lookups, inserts, guarded stale writes and cleanup
//! evictions.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Sentinel for "no cleanup has run yet".
const NO_EPOCH: i64 = i64::MIN;

// == Cache Stats ==
/// Lock-free counters shared by all readers and writers of a cache.
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    stale_puts: AtomicU64,
    evictions: AtomicU64,
    cleanups: AtomicU64,
    last_cleanup_epoch: AtomicI64,
    last_cleanup_at: Mutex<Option<DateTime<Utc>>>,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            stale_puts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            cleanups: AtomicU64::new(0),
            last_cleanup_epoch: AtomicI64::new(NO_EPOCH),
            last_cleanup_at: Mutex::new(None),
        }
    }
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Recorders ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// A `put` that lost to an equal-or-newer epoch already cached.
    pub fn record_stale_put(&self) {
        self.stale_puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed cleanup pass and how many keys it evicted.
    pub fn record_cleanup(&self, epoch: i64, evicted: usize) {
        self.cleanups.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        self.last_cleanup_epoch.fetch_max(epoch, Ordering::Relaxed);
        *self.last_cleanup_at.lock() = Some(Utc::now());
    }

    // == Snapshot ==
    /// Copies the counters into a serializable snapshot.
    pub fn snapshot(&self, entries: usize, pending_epochs: usize) -> CacheStatsSnapshot {
        let last_epoch = self.last_cleanup_epoch.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            stale_puts: self.stale_puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            cleanups: self.cleanups.load(Ordering::Relaxed),
            last_cleanup_epoch: (last_epoch != NO_EPOCH).then_some(last_epoch),
            last_cleanup_at: *self.last_cleanup_at.lock(),
            entries,
            pending_epochs,
        }
    }
}

// == Cache Stats Snapshot ==
/// Point-in-time copy of a cache's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    /// Lookups answered from the cache (live value or tombstone)
    pub hits: u64,
    /// Lookups that found no entry
    pub misses: u64,
    /// Puts that replaced or created the current mapping
    pub inserts: u64,
    /// Puts ignored because a newer epoch was already cached
    pub stale_puts: u64,
    /// Keys removed by cleanup
    pub evictions: u64,
    /// Cleanup passes run
    pub cleanups: u64,
    /// Highest epoch passed to cleanup
    pub last_cleanup_epoch: Option<i64>,
    /// Wall-clock time of the last cleanup pass
    pub last_cleanup_at: Option<DateTime<Utc>>,
    /// Current map entry count
    pub entries: usize,
    /// Outstanding eviction candidates (partial cache only)
    pub pending_epochs: usize,
}

impl CacheStatsSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
