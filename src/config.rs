//! Cache configuration.
//!
//! The host embeds [`CacheConfig`] in its own configuration file and passes
//! it to the coordinator at startup.

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

/// Cache configuration supplied by the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the cache coordinator.
    ///
    /// When disabled, `get_or_compute` runs the producer without storing
    /// anything and triggers are skipped.
    pub enabled: bool,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
        }
    }
}
