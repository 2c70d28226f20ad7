//! Storage capability shared by the cache backends

use super::types::{CacheKey, CachedResponse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A TTL-aware key/value store for cached responses
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>>;

    /// Store an entry for `ttl`
    async fn put(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> Result<()>;

    /// Drop the entries of a route, optionally restricted to a resource pattern
    ///
    /// Returns the number of entries removed.
    async fn invalidate(&self, route_id: &str, pattern: Option<&str>) -> Result<usize>;

    /// Backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Whether a key's `METHOD path?query` part matches an invalidation pattern
///
/// A trailing `*` makes the pattern a prefix; otherwise it must be equal.
pub fn resource_matches(resource: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => resource.starts_with(prefix),
        None => resource == pattern,
    }
}
