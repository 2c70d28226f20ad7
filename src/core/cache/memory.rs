//! In-memory LRU backend bounded by entry count and bytes

use super::backend::{CacheBackend, resource_matches};
use super::types::{CacheEntry, CacheKey, CachedResponse};
use crate::utils::error::Result;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

struct MemoryState {
    entries: LruCache<CacheKey, CacheEntry<CachedResponse>>,
    used_bytes: usize,
}

impl MemoryState {
    fn remove(&mut self, key: &CacheKey) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.used_bytes = self.used_bytes.saturating_sub(entry.size_bytes);
                true
            }
            None => false,
        }
    }
}

/// Least-recently-used response store
///
/// Capacity pressure evicts eagerly regardless of remaining TTL; expiry is
/// checked on read.
pub struct MemoryCacheBackend {
    max_entries: usize,
    max_bytes: usize,
    state: Mutex<MemoryState>,
}

impl MemoryCacheBackend {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_bytes,
            state: Mutex::new(MemoryState {
                entries: LruCache::unbounded(),
                used_bytes: 0,
            }),
        }
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estimated bytes held
    pub fn used_bytes(&self) -> usize {
        self.state.lock().used_bytes
    }

    pub(crate) fn get_at(&self, key: &CacheKey, now: Instant) -> Option<CachedResponse> {
        let mut state = self.state.lock();
        let expired = match state.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            state.remove(key);
        }
        None
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        Ok(self.get_at(key, Instant::now()))
    }

    async fn put(&self, key: &CacheKey, value: CachedResponse, ttl: Duration) -> Result<()> {
        let size = value.size_bytes();
        if size > self.max_bytes {
            debug!(size, max = self.max_bytes, "Response too large for memory cache");
            return Ok(());
        }

        let mut state = self.state.lock();
        state.remove(key);
        state.entries.put(key.clone(), CacheEntry::new(value, ttl, size));
        state.used_bytes += size;

        while state.entries.len() > self.max_entries || state.used_bytes > self.max_bytes {
            match state.entries.pop_lru() {
                Some((_, evicted)) => {
                    state.used_bytes = state.used_bytes.saturating_sub(evicted.size_bytes);
                }
                None => break,
            }
        }
        Ok(())
    }

    async fn invalidate(&self, route_id: &str, pattern: Option<&str>) -> Result<usize> {
        let mut state = self.state.lock();
        let doomed: Vec<CacheKey> = state
            .entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| &*key.route_id == route_id)
            .filter(|key| pattern.is_none_or(|p| resource_matches(&key.resource, p)))
            .cloned()
            .collect();

        let mut removed = 0;
        for key in &doomed {
            if state.remove(key) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
