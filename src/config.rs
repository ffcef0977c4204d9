//! Configuration Module
//!
//! Handles loading the cache strategy and driver settings from environment
//! variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheType;

/// Driver configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache strategy for the table
    pub cache_type: CacheType,
    /// Background cleanup task interval in milliseconds
    pub cleanup_interval_ms: u64,
    /// Flush the table after this many write epochs
    pub flush_every: u64,
    /// Number of distinct keys the workload writes to
    pub workload_keys: u64,
    /// Total writes issued by the workload
    pub workload_writes: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults.
    ///
    /// # Environment Variables
    /// - `CACHE_TYPE` - `full` or `partial` (default: partial)
    /// - `CLEANUP_INTERVAL_MS` - Cleanup frequency in milliseconds (default: 100)
    /// - `FLUSH_EVERY` - Epochs between flushes (default: 16)
    /// - `WORKLOAD_KEYS` - Distinct keys written (default: 64)
    /// - `WORKLOAD_WRITES` - Total writes (default: 1024)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_type: env_or("CACHE_TYPE", defaults.cache_type),
            cleanup_interval_ms: env_or("CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            flush_every: env_or("FLUSH_EVERY", defaults.flush_every),
            workload_keys: env_or("WORKLOAD_KEYS", defaults.workload_keys),
            workload_writes: env_or("WORKLOAD_WRITES", defaults.workload_writes),
        }
    }

    /// Cleanup interval as a Duration, never shorter than one millisecond.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_type: CacheType::Partial,
            cleanup_interval_ms: 100,
            flush_every: 16,
            workload_keys: 64,
            workload_writes: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_type, CacheType::Partial);
        assert_eq!(config.cleanup_interval_ms, 100);
        assert_eq!(config.flush_every, 16);
        assert_eq!(config.workload_keys, 64);
        assert_eq!(config.workload_writes, 1024);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_TYPE");
        env::remove_var("CLEANUP_INTERVAL_MS");
        env::remove_var("FLUSH_EVERY");
        env::remove_var("WORKLOAD_KEYS");
        env::remove_var("WORKLOAD_WRITES");

        let config = Config::from_env();
        assert_eq!(config.cache_type, CacheType::Partial);
        assert_eq!(config.cleanup_interval_ms, 100);
        assert_eq!(config.flush_every, 16);
    }

    #[test]
    fn test_cleanup_interval_floor() {
        let config = Config {
            cleanup_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.cleanup_interval(), Duration::from_millis(1));
    }
}
