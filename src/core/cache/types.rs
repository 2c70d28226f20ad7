//! Response cache type definitions
//!
//! Keys, cached payloads, entries and statistics shared by every backend.

use crate::core::types::GatewayResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Fingerprint of a cacheable request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Route the entry belongs to
    pub route_id: Arc<str>,
    /// `METHOD normalized-path?sorted-query`
    pub resource: String,
    /// Digest of the configured vary headers, empty when there are none
    pub vary_digest: String,
}

impl CacheKey {
    /// Build the key of a request on a route
    pub fn from_request(
        route_id: &Arc<str>,
        method: &reqwest::Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        vary_headers: &[String],
    ) -> Self {
        let mut resource = format!("{} {}", method.as_str(), normalize_path(path));
        if let Some(query) = query.map(sorted_query).filter(|q| !q.is_empty()) {
            resource.push('?');
            resource.push_str(&query);
        }

        Self {
            route_id: Arc::clone(route_id),
            resource,
            vary_digest: vary_digest(headers, vary_headers),
        }
    }

    /// Narrow the key with an extra discriminator, such as the service a
    /// request was re-targeted to
    pub fn scoped(mut self, label: &str) -> Self {
        if self.vary_digest.is_empty() {
            self.vary_digest = label.to_string();
        } else {
            self.vary_digest = format!("{}+{}", self.vary_digest, label);
        }
        self
    }

    /// Stable string form used as the storage key
    ///
    /// The route id is hex encoded so that every entry of a route shares a
    /// prefix free of separator characters.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}#{}",
            route_prefix(&self.route_id),
            self.resource,
            self.vary_digest
        )
    }
}

/// Storage-key prefix shared by all entries of a route
pub fn route_prefix(route_id: &str) -> String {
    hex::encode(route_id.as_bytes())
}

/// Collapse repeated slashes and drop a trailing slash, except for the root
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

fn sorted_query(query: &str) -> String {
    let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    pairs.sort_unstable();
    pairs.join("&")
}

fn vary_digest(headers: &HeaderMap, vary_headers: &[String]) -> String {
    if vary_headers.is_empty() {
        return String::new();
    }

    let mut names: Vec<String> = vary_headers.iter().map(|h| h.to_ascii_lowercase()).collect();
    names.sort_unstable();
    names.dedup();

    let mut hasher = Sha256::new();
    for name in &names {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        for value in headers.get_all(name.as_str()) {
            hasher.update(value.as_bytes());
            hasher.update(b",");
        }
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Backend response as stored in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(serialize_with = "body_to_base64", deserialize_with = "body_from_base64")]
    pub body: Bytes,
}

impl CachedResponse {
    /// Estimated memory footprint
    pub fn size_bytes(&self) -> usize {
        let headers: usize = self.headers.iter().map(|(k, v)| k.len() + v.len()).sum();
        std::mem::size_of::<Self>() + headers + self.body.len()
    }

    /// Capture a backend response; headers that are not valid UTF-8 are dropped
    pub fn from_response(response: &GatewayResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Self {
            status: response.status.as_u16(),
            headers,
            body: response.body.clone(),
        }
    }

    /// Rebuild a pipeline response
    pub fn to_response(&self) -> GatewayResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = GatewayResponse::new(status);
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                response.headers.append(name, value);
            }
        }
        response.body = self.body.clone();
        response
    }
}

fn body_to_base64<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(body))
}

fn body_from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded)
        .map(Bytes::from)
        .map_err(serde::de::Error::custom)
}

/// Cache entry with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When the entry was created
    pub created_at: Instant,
    /// When the entry expires
    pub expires_at: Instant,
    /// Size in bytes (estimated)
    pub size_bytes: usize,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry
    pub fn new(value: T, ttl: Duration, size_bytes: usize) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
            size_bytes,
        }
    }

    /// Check if the entry is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        Instant::now().duration_since(self.created_at)
    }
}

/// Atomic cache statistics for lock-free hot path updates
#[derive(Debug, Default)]
pub struct AtomicCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stores: AtomicU64,
    /// Backend failures that were degraded to a miss or a skipped store
    pub errors: AtomicU64,
}

/// Cache statistics snapshot (returned to callers)
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub errors: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl AtomicCacheStats {
    /// Create a snapshot of current stats
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all stats to zero
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.stores.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}
