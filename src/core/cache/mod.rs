//! Response caching
//!
//! Responses are addressed by a fingerprint of the request and stored in one
//! of two interchangeable backends: a bounded in-memory LRU or Redis.
//! Concurrent misses for the same key are collapsed into a single fill.

mod backend;
mod manager;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod single_flight;
mod types;

#[cfg(test)]
mod tests;

pub use backend::{CacheBackend, resource_matches};
pub use manager::ResponseCache;
pub use memory::MemoryCacheBackend;
#[cfg(feature = "redis")]
pub use redis::RedisCacheBackend;
pub use single_flight::{Flight, FlightFollower, FlightLeader, SingleFlight};
pub use types::{
    AtomicCacheStats, CacheEntry, CacheKey, CacheStats, CachedResponse, normalize_path,
    route_prefix,
};
