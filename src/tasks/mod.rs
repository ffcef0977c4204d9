//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cached table.
//!
//! # Tasks
//! - Cache Cleanup: evicts cache entries subsumed by the flushed watermark

mod cleanup;

pub use cleanup::{spawn_cleanup_task, CleanupTarget};
