//! Table Module
//!
//! A cached table: a [`TableCache`](crate::cache::TableCache) in front of a
//! durable, sorted [`TableStore`].

mod cached;
mod store;

pub use cached::{Table, INITIAL_EPOCH};
pub use store::{MemoryStore, TableStore};
