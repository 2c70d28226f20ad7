//! Redis backend for multi-instance deployments

use super::backend::{CacheBackend, resource_matches};
use super::types::{CacheKey, CachedResponse, route_prefix};
use crate::storage::redis::RedisPool;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Response store on a shared Redis instance
///
/// Values are JSON encoded and expire through Redis' own TTL.
#[derive(Debug, Clone)]
pub struct RedisCacheBackend {
    pool: RedisPool,
}

impl RedisCacheBackend {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn storage_key(&self, key: &CacheKey) -> String {
        self.pool.key(&key.fingerprint())
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        match self.pool.get_bytes(&self.storage_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_vec(&value)?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.pool.set_px(&self.storage_key(key), raw, ttl_ms).await
    }

    async fn invalidate(&self, route_id: &str, pattern: Option<&str>) -> Result<usize> {
        let prefix = self.pool.key(&format!("{}:", route_prefix(route_id)));
        let keys: Vec<String> = self
            .pool
            .scan_prefix(&prefix)
            .await?
            .into_iter()
            .filter(|key| {
                pattern.is_none_or(|p| {
                    // strip `{prefix}{route}:` and the `#digest` suffix
                    let rest = key.strip_prefix(prefix.as_str()).unwrap_or(key);
                    let resource = rest.rsplit_once('#').map_or(rest, |(r, _)| r);
                    resource_matches(resource, p)
                })
            })
            .collect();

        debug!(route = route_id, count = keys.len(), "Invalidating Redis cache entries");
        self.pool.delete(keys).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
