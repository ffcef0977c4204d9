//! Table Store Module
//!
//! The durable backend behind a cached table.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, TableError};

// == Table Store ==
/// Durable key-value backend. The cache treats it as opaque.
pub trait TableStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Result<Option<V>>;

    fn put(&self, key: K, value: V) -> Result<()>;

    /// Removes `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &K) -> Result<()>;

    /// Every row in key order.
    fn entries(&self) -> Result<Vec<(K, V)>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, S> TableStore<K, V> for Arc<S>
where
    S: TableStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: V) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &K) -> Result<()> {
        (**self).delete(key)
    }

    fn entries(&self) -> Result<Vec<(K, V)>> {
        (**self).entries()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

// == Memory Store ==
/// Sorted in-memory store. Stands in for a persistent engine.
#[derive(Debug)]
pub struct MemoryStore<K, V> {
    rows: RwLock<BTreeMap<K, V>>,
    /// Maximum number of rows, if bounded
    row_limit: Option<usize>,
    closed: AtomicBool,
}

impl<K: Ord, V> MemoryStore<K, V> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            row_limit: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a store that rejects new rows beyond `limit`.
    pub fn with_row_limit(limit: usize) -> Self {
        Self {
            row_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Creates a store pre-populated with `rows`.
    pub fn with_rows(rows: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            rows: RwLock::new(rows.into_iter().collect()),
            row_limit: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Rejects every later operation with [`TableError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(TableError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<K: Ord, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TableStore<K, V> for MemoryStore<K, V>
where
    K: Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        self.ensure_open()?;
        Ok(self.rows.read().get(key).cloned())
    }

    fn put(&self, key: K, value: V) -> Result<()> {
        self.ensure_open()?;
        let mut rows = self.rows.write();
        if let Some(limit) = self.row_limit {
            if rows.len() >= limit && !rows.contains_key(&key) {
                return Err(TableError::Store(format!("row limit of {} reached", limit)));
            }
        }
        rows.insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &K) -> Result<()> {
        self.ensure_open()?;
        self.rows.write().remove(key);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(K, V)>> {
        self.ensure_open()?;
        Ok(self
            .rows
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn len(&self) -> usize {
        self.rows.read().len()
    }
}
