//! Cached Table Module
//!
//! Combines an epoch-ordered cache with a durable store and a buffer of
//! writes that have not been flushed yet.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::cache::{CacheResult, CacheType, TableCache};
use crate::error::Result;
use crate::table::TableStore;
use crate::tasks::CleanupTarget;

/// Epoch given to rows loaded from the store when a full cache is warmed,
/// and the flushed watermark before any flush. Write epochs start above it.
pub const INITIAL_EPOCH: i64 = -1;

/// Buffered writes keyed by epoch. `None` values are deletes.
type PendingWrites<K, V> = BTreeMap<i64, Vec<(K, Option<V>)>>;

// == Table ==
/// A table whose reads see every write immediately, while writes reach the
/// durable store only on [`Table::flush`].
///
/// Callers assign a distinct, increasing epoch to each write. After a flush
/// the new watermark is published to [`Table::subscribe`] receivers, which
/// is what drives cache cleanup.
///
/// Lock order is `flushing`, then `pending`, then the cache's own lock.
pub struct Table<K, V, S> {
    store: S,
    cache: Arc<dyn TableCache<K, V>>,
    pending: Mutex<PendingWrites<K, V>>,
    /// Held for a whole flush, and by cleanup, so neither sees a batch that
    /// has left the buffer but not yet reached the store
    flushing: Mutex<()>,
    watermark: watch::Sender<i64>,
}

impl<K, V, S> Table<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: TableStore<K, V>,
{
    // == Constructor ==
    /// Opens a table over `store` with the given cache strategy.
    ///
    /// A full cache is warmed with every stored row, since it must answer
    /// "not present" on its own.
    pub fn open(store: S, cache_type: CacheType) -> Result<Self> {
        let cache = cache_type.build::<K, V>();
        if cache_type == CacheType::Full {
            let rows = store.entries()?;
            let count = rows.len();
            for (key, value) in rows {
                cache.put(key, Some(value), INITIAL_EPOCH);
            }
            info!(rows = count, "warmed full table cache");
        }

        let (watermark, _) = watch::channel(INITIAL_EPOCH);
        Ok(Self {
            store,
            cache,
            pending: Mutex::new(BTreeMap::new()),
            flushing: Mutex::new(()),
            watermark,
        })
    }

    // == Writes ==
    /// Writes `value` for `key` at `epoch`. Visible to readers immediately.
    pub fn put(&self, key: K, value: V, epoch: i64) {
        self.write(key, Some(value), epoch);
    }

    /// Deletes `key` at `epoch`. Readers see the key as absent immediately.
    pub fn delete(&self, key: K, epoch: i64) {
        self.write(key, None, epoch);
    }

    fn write(&self, key: K, value: Option<V>, epoch: i64) {
        let flushed = self.flushed_epoch();
        if epoch <= flushed {
            // Stays buffered until the next flush; cleanup holds off until then
            warn!(epoch, flushed, "write at an already flushed epoch");
        }
        // Cache and buffer change together so a flush never sees one without the other
        let mut pending = self.pending.lock();
        self.cache.put(key.clone(), value.clone(), epoch);
        pending.entry(epoch).or_default().push((key, value));
    }

    // == Get ==
    /// Reads `key`, preferring the cache and falling back to the store.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let result = self.cache.lookup(key);
        trace!(status = ?result.status(), "table cache lookup");
        match result {
            CacheResult::Exists(value) => Ok(value.into_value()),
            CacheResult::NotExist => Ok(None),
            CacheResult::MayExist => self.store.get(key),
        }
    }

    // == Flush ==
    /// Writes every buffered operation at or below `epoch` to the store, in
    /// epoch order, then publishes `epoch` as the flushed watermark.
    ///
    /// Flushes run one at a time, so an older batch never lands on top of a
    /// newer one. Returns the number of operations written. On a store error
    /// the batch goes back into the buffer and the watermark does not move.
    pub fn flush(&self, epoch: i64) -> Result<usize> {
        let _flushing = self.flushing.lock();
        let batch = {
            let mut pending = self.pending.lock();
            let later = match epoch.checked_add(1) {
                Some(next) => pending.split_off(&next),
                None => BTreeMap::new(),
            };
            std::mem::replace(&mut *pending, later)
        };

        if let Err(err) = self.write_batch(&batch) {
            warn!(epoch, error = %err, "flush failed, keeping writes buffered");
            let mut pending = self.pending.lock();
            for (op_epoch, mut ops) in batch {
                let slot = pending.entry(op_epoch).or_default();
                ops.append(slot);
                *slot = ops;
            }
            return Err(err);
        }

        let written: usize = batch.values().map(Vec::len).sum();
        self.watermark.send_if_modified(|flushed| {
            if epoch > *flushed {
                *flushed = epoch;
                true
            } else {
                false
            }
        });
        debug!(epoch, written, "flushed table writes");
        Ok(written)
    }

    fn write_batch(&self, batch: &PendingWrites<K, V>) -> Result<()> {
        for (key, value) in batch.values().flatten() {
            match value {
                Some(value) => self.store.put(key.clone(), value.clone())?,
                None => self.store.delete(key)?,
            }
        }
        Ok(())
    }

    // == Cleanup ==
    /// Cleans the cache up to the current flushed watermark.
    ///
    /// Returns the number of keys evicted.
    pub fn cleanup(&self) -> usize {
        self.cleanup_through(self.flushed_epoch())
    }

    /// Cleans the cache through `epoch`, capped at the flushed watermark and
    /// below the oldest write still buffered.
    ///
    /// A late write at an epoch the store already covers is only in the
    /// buffer, so its cache entry must outlive this pass.
    pub fn cleanup_through(&self, epoch: i64) -> usize {
        let _flushing = self.flushing.lock();
        let pending = self.pending.lock();

        let mut boundary = epoch.min(self.flushed_epoch());
        if let Some(&oldest) = pending.keys().next() {
            boundary = boundary.min(oldest.saturating_sub(1));
        }
        if boundary < epoch {
            debug!(epoch, boundary, "capped cleanup below buffered writes");
        }

        let before = self.cache.size();
        self.cache.cleanup(boundary);
        before.saturating_sub(self.cache.size())
    }

    // == Accessors ==
    /// Highest epoch known to be durable in the store.
    pub fn flushed_epoch(&self) -> i64 {
        *self.watermark.borrow()
    }

    /// Receives every advance of the flushed watermark.
    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.watermark.subscribe()
    }

    /// Shared handle to the cache.
    pub fn cache(&self) -> Arc<dyn TableCache<K, V>> {
        Arc::clone(&self.cache)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of buffered operations not yet flushed.
    pub fn pending_writes(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }
}

impl<K, V, S> CleanupTarget for Table<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: TableStore<K, V>,
{
    fn cleanup_through(&self, epoch: i64) -> usize {
        Table::cleanup_through(self, epoch)
    }
}
