//! Epoch Table Cache - workload driver
//!
//! Runs a writer workload against a cached in-memory table, flushing
//! periodically while a background task cleans the cache behind the flushes.

use std::sync::Arc;

use anyhow::{ensure, Context};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epoch_table_cache::table::INITIAL_EPOCH;
use epoch_table_cache::{spawn_cleanup_task, Config, MemoryStore, Table, TableCache, TableStore};

type DemoTable = Table<String, String, Arc<MemoryStore<String, String>>>;

/// Main entry point for the workload driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open a table over an in-memory store with the configured cache type
/// 4. Start the background cache cleanup task
/// 5. Run the workload until it completes or Ctrl+C arrives
/// 6. Drop the table so the cleanup task stops, then report
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epoch_table_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Epoch Table Cache driver");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_type={}, cleanup_interval={}ms, flush_every={}, keys={}, writes={}",
        config.cache_type,
        config.cleanup_interval_ms,
        config.flush_every,
        config.workload_keys,
        config.workload_writes
    );

    let store = Arc::new(MemoryStore::new());
    let table: DemoTable =
        Table::open(Arc::clone(&store), config.cache_type).context("opening table")?;
    let table = Arc::new(table);
    let cache = table.cache();

    let cleanup_handle =
        spawn_cleanup_task(Arc::downgrade(&table), table.subscribe(), config.cleanup_interval());
    info!("Background cleanup task started");

    tokio::select! {
        result = run_workload(table, &config) => {
            result?;
            info!("Workload complete");
        }
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C, stopping workload");
        }
    }

    // The table is gone, so the watermark is closed and the task winds down
    cleanup_handle.await.context("cleanup task panicked")?;

    let stats = cache.stats();
    info!(
        "Final cache stats ({} rows in store): {}",
        store.len(),
        serde_json::to_string(&stats)?
    );
    info!("Hit rate: {:.2}", stats.hit_rate());

    Ok(())
}

/// Writes `workload_writes` epochs round-robin over `workload_keys` keys,
/// deleting every seventh write, and checks each write is readable at once.
async fn run_workload(table: Arc<DemoTable>, config: &Config) -> anyhow::Result<()> {
    let keys = config.workload_keys.max(1);
    let flush_every = config.flush_every.max(1);
    let mut flushed = INITIAL_EPOCH;

    for n in 0..config.workload_writes {
        let epoch = n as i64;
        let key = format!("key-{:04}", n % keys);

        if n % 7 == 6 {
            table.delete(key.clone(), epoch);
            ensure!(table.get(&key)?.is_none(), "{} visible after delete", key);
        } else {
            let value = format!("value-{}", n);
            table.put(key.clone(), value.clone(), epoch);
            ensure!(
                table.get(&key)?.as_ref() == Some(&value),
                "{} not readable after write at epoch {}",
                key,
                epoch
            );
        }

        if (n + 1) % flush_every == 0 {
            table.flush(epoch)?;
            flushed = epoch;
            tokio::task::yield_now().await;
        }
    }

    let last = config.workload_writes as i64 - 1;
    if last > flushed {
        table.flush(last)?;
    }
    let removed = table.cleanup();
    info!(
        "Final cleanup removed {} entries; {} rows durable, {} writes buffered",
        removed,
        table.store().len(),
        table.pending_writes()
    );
    Ok(())
}
