//! Error types for cached tables
//!
//! Cache operations themselves are total. Errors come from the durable store
//! behind a table and from configuration parsing.

use thiserror::Error;

// == Table Error Enum ==
/// Unified error type for table operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The durable store rejected an operation
    #[error("Store error: {0}")]
    Store(String),

    /// Unknown cache strategy name
    #[error("Invalid cache type: {0} (expected \"full\" or \"partial\")")]
    InvalidCacheType(String),

    /// The store has been closed
    #[error("Store is closed")]
    Closed,
}

// == Result Type Alias ==
/// Convenience Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;
