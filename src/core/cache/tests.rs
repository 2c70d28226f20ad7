//! Tests for the response cache

use super::*;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

fn route(id: &str) -> Arc<str> {
    Arc::from(id)
}

fn key(route_id: &str, path: &str) -> CacheKey {
    CacheKey::from_request(&route(route_id), &Method::GET, path, None, &HeaderMap::new(), &[])
}

fn payload(body: &str) -> CachedResponse {
    CachedResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "text/plain".to_string())],
        body: Bytes::from(body.to_string()),
    }
}

// ==================== Fingerprint Tests ====================

#[test]
fn test_fingerprint_is_deterministic() {
    assert_eq!(key("/users", "/users/1").fingerprint(), key("/users", "/users/1").fingerprint());
    assert_ne!(key("/users", "/users/1").fingerprint(), key("/users", "/users/2").fingerprint());
    assert_ne!(key("/a", "/users/1").fingerprint(), key("/b", "/users/1").fingerprint());
}

#[test]
fn test_path_normalization() {
    assert_eq!(normalize_path("/users//1/"), "/users/1");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path(""), "/");
    assert_eq!(key("/u", "/users//1/"), key("/u", "/users/1"));
}

#[test]
fn test_query_order_does_not_matter() {
    let route = route("/search");
    let headers = HeaderMap::new();
    let a = CacheKey::from_request(&route, &Method::GET, "/search", Some("b=2&a=1"), &headers, &[]);
    let b = CacheKey::from_request(&route, &Method::GET, "/search", Some("a=1&b=2"), &headers, &[]);
    assert_eq!(a, b);
    assert_eq!(a.resource, "GET /search?a=1&b=2");
}

#[test]
fn test_method_is_part_of_key() {
    let route = route("/r");
    let headers = HeaderMap::new();
    let get = CacheKey::from_request(&route, &Method::GET, "/r", None, &headers, &[]);
    let head = CacheKey::from_request(&route, &Method::HEAD, "/r", None, &headers, &[]);
    assert_ne!(get.fingerprint(), head.fingerprint());
}

#[test]
fn test_vary_headers_change_key() {
    let route = route("/r");
    let vary = vec!["Accept-Language".to_string()];

    let mut en = HeaderMap::new();
    en.insert("accept-language", HeaderValue::from_static("en"));
    let mut de = HeaderMap::new();
    de.insert("accept-language", HeaderValue::from_static("de"));

    let key_en = CacheKey::from_request(&route, &Method::GET, "/r", None, &en, &vary);
    let key_de = CacheKey::from_request(&route, &Method::GET, "/r", None, &de, &vary);
    let key_en_again = CacheKey::from_request(&route, &Method::GET, "/r", None, &en, &vary);

    assert_ne!(key_en, key_de);
    assert_eq!(key_en, key_en_again);
    assert_eq!(key_en.vary_digest.len(), 32);

    // headers outside the vary list are ignored
    let plain = CacheKey::from_request(&route, &Method::GET, "/r", None, &en, &[]);
    assert!(plain.vary_digest.is_empty());
}

#[test]
fn test_resource_pattern_matching() {
    assert!(resource_matches("GET /users/1", "GET /users/*"));
    assert!(resource_matches("GET /users/1", "GET /users/1"));
    assert!(!resource_matches("GET /users/12", "GET /users/1"));
    assert!(resource_matches("HEAD /x", "*"));
}

// ==================== Payload Tests ====================

#[test]
fn test_cached_response_serializes_body_as_base64() {
    let value = payload("hello");
    let json = serde_json::to_value(&value).unwrap();
    assert_eq!(json["body"], "aGVsbG8=");
    let back: CachedResponse = serde_json::from_value(json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_cached_response_restores_headers() {
    let response = payload("x").to_response();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.headers.get("content-type").unwrap(), "text/plain");
    assert_eq!(response.body, Bytes::from("x"));
}

// ==================== Memory Backend Tests ====================

#[tokio::test]
async fn test_ttl_hit_then_miss() {
    let backend = MemoryCacheBackend::new(100, 1024 * 1024);
    let key = key("/r", "/r");
    backend.put(&key, payload("v"), Duration::from_millis(100)).await.unwrap();

    let now = Instant::now();
    assert!(backend.get_at(&key, now + Duration::from_millis(50)).is_some());
    assert!(backend.get_at(&key, now + Duration::from_millis(150)).is_none());
    // expired entries are dropped on read
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_ttl_expiry_in_real_time() {
    let backend = MemoryCacheBackend::new(100, 1024 * 1024);
    let key = key("/r", "/r");
    backend.put(&key, payload("v"), Duration::from_millis(100)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(backend.get(&key).await.unwrap().is_some());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(backend.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_entry_count_evicts_least_recently_used() {
    let backend = MemoryCacheBackend::new(2, 1024 * 1024);
    let ttl = Duration::from_secs(60);
    let (a, b, c) = (key("/r", "/a"), key("/r", "/b"), key("/r", "/c"));

    backend.put(&a, payload("a"), ttl).await.unwrap();
    backend.put(&b, payload("b"), ttl).await.unwrap();
    // touch `a` so `b` becomes the eviction candidate
    assert!(backend.get(&a).await.unwrap().is_some());
    backend.put(&c, payload("c"), ttl).await.unwrap();

    assert_eq!(backend.len(), 2);
    assert!(backend.get(&a).await.unwrap().is_some());
    assert!(backend.get(&b).await.unwrap().is_none());
    assert!(backend.get(&c).await.unwrap().is_some());
}

#[tokio::test]
async fn test_memory_bound_evicts_regardless_of_ttl() {
    let entry_size = payload(&"x".repeat(1000)).size_bytes();
    let backend = MemoryCacheBackend::new(100, entry_size * 2);
    let ttl = Duration::from_secs(3600);

    for i in 0..5 {
        let body = "x".repeat(1000);
        backend.put(&key("/r", &format!("/{}", i)), payload(&body), ttl).await.unwrap();
    }
    assert_eq!(backend.len(), 2);
    assert!(backend.used_bytes() <= entry_size * 2);
}

#[tokio::test]
async fn test_oversized_entry_is_not_stored() {
    let backend = MemoryCacheBackend::new(100, 64);
    backend
        .put(&key("/r", "/big"), payload(&"x".repeat(1000)), Duration::from_secs(60))
        .await
        .unwrap();
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_invalidate_route_and_pattern() {
    let backend = MemoryCacheBackend::new(100, 1024 * 1024);
    let ttl = Duration::from_secs(60);
    backend.put(&key("/users", "/users/1"), payload("1"), ttl).await.unwrap();
    backend.put(&key("/users", "/users/2"), payload("2"), ttl).await.unwrap();
    backend.put(&key("/users", "/teams/1"), payload("t"), ttl).await.unwrap();
    backend.put(&key("/orders", "/orders/1"), payload("o"), ttl).await.unwrap();

    let removed = backend.invalidate("/users", Some("GET /users/*")).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(backend.len(), 2);

    let removed = backend.invalidate("/users", None).await.unwrap();
    assert_eq!(removed, 1);
    assert!(backend.get(&key("/orders", "/orders/1")).await.unwrap().is_some());
}

// ==================== Single-Flight Tests ====================

#[tokio::test]
async fn test_single_flight_shares_leader_result() {
    let group: Arc<SingleFlight<String>> = Arc::new(SingleFlight::new());

    let leader = match group.join("k") {
        Flight::Leader(leader) => leader,
        Flight::Follower(_) => panic!("first caller must lead"),
    };
    let followers: Vec<_> = (0..5)
        .map(|_| match group.join("k") {
            Flight::Follower(follower) => tokio::spawn(follower.wait()),
            Flight::Leader(_) => panic!("later callers must follow"),
        })
        .collect();

    leader.complete("payload".to_string());
    for follower in followers {
        assert_eq!(follower.await.unwrap().as_deref(), Some("payload"));
    }
    assert_eq!(group.in_flight(), 0);
}

#[tokio::test]
async fn test_dropped_leader_releases_followers() {
    let group: Arc<SingleFlight<u32>> = Arc::new(SingleFlight::new());
    let leader = group.join("k");
    let follower = match group.join("k") {
        Flight::Follower(follower) => follower,
        Flight::Leader(_) => panic!("expected follower"),
    };

    drop(leader);
    assert_eq!(follower.wait().await, None);
    // the next caller leads a fresh flight
    assert!(matches!(group.join("k"), Flight::Leader(_)));
}

#[tokio::test]
async fn test_single_flight_one_fill_for_concurrent_callers() {
    let group: Arc<SingleFlight<u32>> = Arc::new(SingleFlight::new());
    let fills = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let group = Arc::clone(&group);
            let fills = Arc::clone(&fills);
            tokio::spawn(async move {
                match group.join("k") {
                    Flight::Leader(leader) => {
                        fills.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        leader.complete(42);
                        Some(42)
                    }
                    Flight::Follower(follower) => follower.wait().await,
                }
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), Some(42));
    }
    assert_eq!(fills.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scoped_keys_are_distinct() {
    let base = key("/r", "/r/1");
    let a = base.clone().scoped("svc-a");
    let b = base.clone().scoped("svc-b");
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), base.fingerprint());
    assert_eq!(a.resource, base.resource);
    assert!(a.fingerprint().ends_with("#svc-a"));
}

// ==================== ResponseCache Tests ====================

#[tokio::test]
async fn test_response_cache_counts_hits_and_misses() {
    let cache: ResponseCache<()> =
        ResponseCache::new(Arc::new(MemoryCacheBackend::new(10, 1024 * 1024)));
    let key = key("/r", "/r");

    assert!(cache.lookup(&key).await.is_none());
    cache.store(&key, payload("v"), Duration::from_secs(60)).await;
    assert_eq!(cache.lookup(&key).await.unwrap().body, Bytes::from("v"));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.hit_rate(), 0.5);

    cache.reset_stats();
    assert_eq!(cache.stats(), CacheStats::default());
}

#[tokio::test]
async fn test_peek_does_not_count() {
    let cache: ResponseCache<()> =
        ResponseCache::new(Arc::new(MemoryCacheBackend::new(10, 1024 * 1024)));
    let key = key("/r", "/r");

    assert!(cache.peek(&key).await.is_none());
    cache.store(&key, payload("v"), Duration::from_secs(60)).await;
    assert_eq!(cache.peek(&key).await.unwrap().body, Bytes::from("v"));

    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
}

struct FailingBackend;

#[async_trait::async_trait]
impl CacheBackend for FailingBackend {
    async fn get(&self, _key: &CacheKey) -> crate::utils::error::Result<Option<CachedResponse>> {
        Err(crate::utils::error::GatewayError::cache("backend down"))
    }

    async fn put(
        &self,
        _key: &CacheKey,
        _value: CachedResponse,
        _ttl: Duration,
    ) -> crate::utils::error::Result<()> {
        Err(crate::utils::error::GatewayError::cache("backend down"))
    }

    async fn invalidate(
        &self,
        _route_id: &str,
        _pattern: Option<&str>,
    ) -> crate::utils::error::Result<usize> {
        Err(crate::utils::error::GatewayError::cache("backend down"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn test_backend_failure_degrades_to_miss() {
    let cache: ResponseCache<()> = ResponseCache::new(Arc::new(FailingBackend));
    let key = key("/r", "/r");

    assert!(cache.lookup(&key).await.is_none());
    cache.store(&key, payload("v"), Duration::from_secs(1)).await;

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.stores, 0);
    assert!(cache.invalidate("/r", None).await.is_err());
}

#[tokio::test]
async fn test_from_config_uses_memory_when_redis_disabled() {
    let cache: ResponseCache<()> =
        ResponseCache::from_config(&crate::config::StorageConfig::default()).await;
    assert_eq!(cache.backend_name(), "memory");
}
