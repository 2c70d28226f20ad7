//! Storage configuration for the response cache

use super::*;
use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// In-memory cache bounds, used when Redis is disabled
    #[serde(default)]
    pub in_memory: InMemoryCacheConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
}

/// In-memory LRU cache bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    #[serde(default = "default_cache_size")]
    pub size: usize,
    /// Maximum memory in megabytes
    #[serde(default = "default_cache_max_memory_mb")]
    pub max_memory_mb: usize,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            size: default_cache_size(),
            max_memory_mb: default_cache_max_memory_mb(),
        }
    }
}

impl InMemoryCacheConfig {
    /// Memory bound in bytes
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_mb.saturating_mul(1024 * 1024)
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Use Redis as the shared cache backend
    #[serde(default)]
    pub enabled: bool,
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix for every key written by the gateway
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
    /// Connection timeout in milliseconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }
}
