//! Response cache facade used by the pipeline

use super::backend::CacheBackend;
use super::memory::MemoryCacheBackend;
use super::single_flight::{Flight, SingleFlight};
use super::types::{AtomicCacheStats, CacheKey, CacheStats, CachedResponse};
use crate::config::StorageConfig;
use crate::utils::error::Result;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, warn};

/// TTL response cache with single-flight fills
///
/// Backend failures never fail a request: a failed read is a miss and a
/// failed write is skipped.
pub struct ResponseCache<T: Clone> {
    backend: Arc<dyn CacheBackend>,
    flights: Arc<SingleFlight<T>>,
    stats: AtomicCacheStats,
}

impl<T: Clone> ResponseCache<T> {
    /// Create a cache on top of a backend
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            flights: Arc::new(SingleFlight::new()),
            stats: AtomicCacheStats::default(),
        }
    }

    /// Pick the backend from configuration
    ///
    /// Redis is used when enabled and reachable; otherwise the in-memory
    /// backend is used.
    pub async fn from_config(config: &StorageConfig) -> Self {
        #[cfg(feature = "redis")]
        if config.redis.enabled {
            match crate::storage::redis::RedisPool::new(&config.redis).await {
                Ok(pool) => {
                    info!("Response cache backed by Redis");
                    return Self::new(Arc::new(super::redis::RedisCacheBackend::new(pool)));
                }
                Err(e) => {
                    warn!("Redis unavailable ({}), falling back to in-memory cache", e);
                }
            }
        }

        #[cfg(not(feature = "redis"))]
        if config.redis.enabled {
            warn!("Redis support not compiled in, using in-memory cache");
        }

        info!(
            size = config.in_memory.size,
            max_memory_mb = config.in_memory.max_memory_mb,
            "Response cache backed by memory"
        );
        Self::new(Arc::new(MemoryCacheBackend::new(
            config.in_memory.size,
            config.in_memory.max_memory_bytes(),
        )))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Look up a live entry
    pub async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        match self.backend.get(key).await {
            Ok(Some(hit)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key.fingerprint(), "Cache hit");
                Some(hit)
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.backend.name(), "Cache lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Look up a live entry without touching hit/miss counters
    ///
    /// Used for re-checks that follow a counted lookup of the same request.
    pub async fn peek(&self, key: &CacheKey) -> Option<CachedResponse> {
        match self.backend.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.backend.name(), "Cache re-check failed: {}", e);
                None
            }
        }
    }

    /// Store an entry for `ttl`
    pub async fn store(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) {
        match self.backend.put(key, value, ttl).await {
            Ok(()) => {
                self.stats.stores.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(backend = self.backend.name(), "Cache store failed: {}", e);
            }
        }
    }

    /// Drop cached entries of a route
    pub async fn invalidate(&self, route_id: &str, pattern: Option<&str>) -> Result<usize> {
        let removed = self.backend.invalidate(route_id, pattern).await?;
        info!(route = route_id, pattern, removed, "Cache invalidated");
        Ok(removed)
    }

    /// Join the single-flight group of a key
    pub fn join(&self, key: &CacheKey) -> Flight<T> {
        self.flights.join(&key.fingerprint())
    }

    /// Fills currently in flight
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}
