//! Time-bounded cache of aggregated statistics.
//!
//! Uses `moka::future::Cache` keyed by playlist id. Concurrent misses for the
//! same key share one aggregation run; failed runs are never cached.

use moka::future::Cache;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::{Result, StatsError};
use crate::stats::StatsTable;

/// One entry per playlist
const MAX_ENTRIES: u64 = 16;

pub struct StatsCache {
    cache: Cache<String, StatsTable>,
    ttl: Duration,
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ttl)
            .build();
        Self { cache, ttl }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs))
    }

    /// Return the cached table for `key`, or run `fetch` to produce it.
    ///
    /// Callers arriving while `fetch` is in flight wait for its result instead
    /// of starting their own run. On failure every waiter gets the same error,
    /// wrapped in [`StatsError::Shared`], and the next call fetches again.
    pub async fn get_or_fetch<F>(&self, key: &str, fetch: F) -> Result<StatsTable>
    where
        F: Future<Output = Result<StatsTable>>,
    {
        if let Some(table) = self.cache.get(key).await {
            debug!("Statistics cache hit for {}", key);
            return Ok(table);
        }

        debug!("Statistics cache miss for {}", key);
        self.cache
            .try_get_with(key.to_string(), fetch)
            .await
            .map_err(StatsError::Shared)
    }

    /// Drop the cached table for `key`
    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
