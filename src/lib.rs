//! Epoch Table Cache - read-after-write caching for a sorted key-value table
//!
//! Recent writes stay visible in memory until the backing store confirms them
//! durable, then cleanup hands the keys back to the store.

pub mod cache;
pub mod config;
pub mod error;
pub mod table;
pub mod tasks;

pub use cache::{CacheResult, CacheType, CacheValue, TableCache};
pub use config::Config;
pub use error::{Result, TableError};
pub use table::{MemoryStore, Table, TableStore};
pub use tasks::{spawn_cleanup_task, CleanupTarget};
