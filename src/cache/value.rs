//! Cache Value Module
//!
//! Defines the payload stored per key: a value (or tombstone) and the epoch
//! that produced it.

// == Cache Value ==
/// A cached value tagged with the epoch of the write that produced it.
///
/// `None` marks a tombstone: the key was deleted at `epoch`. This is distinct
/// from the key having no cache entry at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<V> {
    value: Option<V>,
    epoch: i64,
}

impl<V> CacheValue<V> {
    // == Constructors ==
    /// Creates a cache value. Pass `None` to record a delete.
    pub fn new(value: Option<V>, epoch: i64) -> Self {
        Self { value, epoch }
    }

    /// Creates a tombstone recorded at `epoch`.
    pub fn tombstone(epoch: i64) -> Self {
        Self { value: None, epoch }
    }

    // == Accessors ==
    /// Returns the live value, or `None` for a tombstone.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Epoch of the write that produced this value.
    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Consumes the wrapper and returns the inner value.
    pub fn into_value(self) -> Option<V> {
        self.value
    }
}
