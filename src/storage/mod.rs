//! Storage layer for the Gateway
//!
//! Connections to external stores used by the response cache.

/// Redis cache module
#[cfg(feature = "redis")]
pub mod redis;
