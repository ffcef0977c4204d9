//! Cache Cleanup Task
//!
//! Background task that periodically cleans a table cache up to the latest
//! durably flushed epoch.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TableCache;
use crate::table::INITIAL_EPOCH;

// == Cleanup Target ==
/// Something the cleanup task can clean through a flushed epoch.
///
/// A [`Table`](crate::table::Table) caps the epoch below its unflushed
/// writes. A bare cache takes the epoch as given.
pub trait CleanupTarget: Send + Sync {
    /// Cleans through at most `epoch`. Returns the number of entries removed.
    fn cleanup_through(&self, epoch: i64) -> usize;
}

impl<K, V> CleanupTarget for dyn TableCache<K, V>
where
    K: 'static,
    V: 'static,
{
    fn cleanup_through(&self, epoch: i64) -> usize {
        let before = self.size();
        self.cleanup(epoch);
        before.saturating_sub(self.size())
    }
}

/// Spawns a background task that cleans `target` up to the flushed watermark.
///
/// On every tick the task reads the latest epoch published on `watermark`
/// and, if it is past the last epoch cleaned (initially [`INITIAL_EPOCH`]),
/// cleans `target` through it. Several flushes between ticks collapse into
/// one pass. The task holds only a weak reference, so it never keeps the
/// target alive.
///
/// The watermark must only carry epochs the backend has durably persisted.
///
/// # Arguments
/// * `target` - Table or cache to clean
/// * `watermark` - Receiver of the flushed epoch, e.g. from `Table::subscribe`
/// * `interval` - Time between cleanup passes
///
/// # Returns
/// A JoinHandle for the spawned task. It completes once the watermark sender
/// or the target is gone, and can be aborted for an early shutdown.
///
/// # Example
/// ```ignore
/// let table = Arc::new(Table::open(MemoryStore::new(), CacheType::Partial)?);
/// let handle = spawn_cleanup_task(Arc::downgrade(&table), table.subscribe(), Duration::from_millis(100));
/// // Dropping the table closes the watermark and ends the task
/// drop(table);
/// handle.await?;
/// ```
pub fn spawn_cleanup_task<C>(
    target: Weak<C>,
    mut watermark: watch::Receiver<i64>,
    interval: Duration,
) -> JoinHandle<()>
where
    C: CleanupTarget + ?Sized + 'static,
{
    tokio::spawn(async move {
        info!("Starting cache cleanup task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        let mut cleaned = INITIAL_EPOCH;

        loop {
            ticker.tick().await;

            // Err means the sender is gone; one last pass, then stop
            let closed = watermark.has_changed().is_err();
            let flushed = *watermark.borrow_and_update();

            if flushed > cleaned {
                let Some(target) = target.upgrade() else {
                    info!("Cleanup target dropped, stopping cache cleanup task");
                    break;
                };
                let removed = target.cleanup_through(flushed);
                cleaned = flushed;

                if removed > 0 {
                    info!("Cache cleanup through epoch {}: removed {} entries", flushed, removed);
                } else {
                    debug!("Cache cleanup through epoch {}: nothing to remove", flushed);
                }
            }

            if closed {
                info!("Watermark closed, stopping cache cleanup task");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheType;
    use std::sync::Arc;

    const TICK: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_cleanup_task_evicts_flushed_entries() {
        let cache = CacheType::Partial.build::<String, String>();
        let (tx, rx) = watch::channel(INITIAL_EPOCH);

        cache.put("flushed".to_string(), Some("value".to_string()), 1);
        cache.put("pending".to_string(), Some("value".to_string()), 5);

        let handle = spawn_cleanup_task(Arc::downgrade(&cache), rx, TICK);

        tx.send(1).unwrap();
        tokio::time::sleep(TICK * 5).await;

        assert!(cache.get(&"flushed".to_string()).is_none());
        assert!(cache.get(&"pending".to_string()).is_some());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_final_pass_on_close() {
        let cache = CacheType::Partial.build::<String, String>();
        let (tx, rx) = watch::channel(INITIAL_EPOCH);
        cache.put("a".to_string(), Some("value".to_string()), 3);

        let handle = spawn_cleanup_task(Arc::downgrade(&cache), rx, TICK);

        tx.send(3).unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("cleanup task should stop once the watermark closes")
            .unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().last_cleanup_epoch, Some(3));
    }

    #[tokio::test]
    async fn test_cleanup_task_ignores_unchanged_watermark() {
        let cache = CacheType::Partial.build::<String, String>();
        let (_tx, rx) = watch::channel(INITIAL_EPOCH);
        cache.put("a".to_string(), Some("value".to_string()), 0);

        let handle = spawn_cleanup_task(Arc::downgrade(&cache), rx, TICK);
        tokio::time::sleep(TICK * 5).await;

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats().cleanups, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_when_target_dropped() {
        let cache = CacheType::Partial.build::<String, String>();
        let (tx, rx) = watch::channel(INITIAL_EPOCH);

        let handle = spawn_cleanup_task(Arc::downgrade(&cache), rx, TICK);
        drop(cache);
        tx.send(1).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("cleanup task should stop once its target is gone")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = CacheType::Full.build::<String, String>();
        let (_tx, rx) = watch::channel(INITIAL_EPOCH);

        let handle = spawn_cleanup_task(Arc::downgrade(&cache), rx, TICK);

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
