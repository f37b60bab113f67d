use std::time::Duration;

use crate::constants::{DEFAULT_CACHE_MAX_SIZE, DEFAULT_CACHE_TTL};

/// Runtime-tunable cache behaviour for the notification service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Disabling skips both the read and the write path of the cache without
    /// affecting the underlying fetch.
    pub enabled: bool,
    /// How long a cached entry stays fresh.
    pub ttl: Duration,
    /// Upper bound on cached entries; oldest-inserted is evicted first.
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_CACHE_TTL,
            max_size: DEFAULT_CACHE_MAX_SIZE,
        }
    }
}
