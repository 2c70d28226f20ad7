//! Configuration data models
//!
//! This module defines all configuration structures used throughout the gateway.

#![allow(missing_docs)]

pub mod auth;
pub mod gateway;
pub mod logging;
pub mod route;
pub mod server;
pub mod service;
pub mod storage;

// Re-export all configuration types
pub use auth::*;
pub use gateway::*;
pub use logging::*;
pub use route::*;
pub use server::*;
pub use service::*;
pub use storage::*;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8080
}

/// Default backend deadline in milliseconds
pub fn default_timeout_ms() -> u64 {
    30_000
}

/// Default maximum body size in bytes
pub fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

pub fn default_health_path() -> String {
    "/health".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_cache_size() -> usize {
    10_000
}

pub fn default_cache_max_memory_mb() -> usize {
    50
}

pub fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

pub fn default_redis_key_prefix() -> String {
    "waypost".to_string()
}

pub fn default_connection_timeout_ms() -> u64 {
    2_000
}

pub fn default_api_key_header() -> String {
    "Authorization".to_string()
}

pub fn default_token_prefix() -> String {
    "Bearer ".to_string()
}

/// `-1` caches keys until an unknown key id forces a refresh
pub fn default_jwks_ttl_secs() -> i64 {
    -1
}

pub fn default_jwt_algorithms() -> Vec<jsonwebtoken::Algorithm> {
    vec![jsonwebtoken::Algorithm::RS256]
}

pub fn default_key_set() -> String {
    "default".to_string()
}

pub fn default_methods() -> Vec<String> {
    vec!["*".to_string()]
}

/// `-1` disables response caching for the route
pub fn default_route_ttl_ms() -> i64 {
    -1
}

pub fn default_idempotency_header() -> String {
    "Idempotency-Key".to_string()
}

pub fn default_idempotency_ttl_ms() -> u64 {
    5_000
}

pub fn default_idempotency_methods() -> Vec<String> {
    ["POST", "PUT", "PATCH", "DELETE"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

pub fn default_mirror_percentage() -> u8 {
    100
}

pub fn default_refresh_period_ms() -> u64 {
    1_000
}

pub fn default_permits_per_period() -> u32 {
    100
}

pub fn default_failure_rate_threshold() -> f64 {
    50.0
}

pub fn default_slow_call_rate_threshold() -> f64 {
    100.0
}

pub fn default_slow_call_duration_ms() -> u64 {
    60_000
}

pub fn default_open_state_duration_secs() -> u64 {
    60
}

pub fn default_wait_duration_in_open_ms() -> u64 {
    60_000
}

pub fn default_permitted_calls_in_half_open() -> u32 {
    10
}

pub fn default_minimum_calls() -> u32 {
    100
}

pub fn default_cors_methods() -> Vec<String> {
    vec!["*".to_string()]
}

pub fn default_cors_headers() -> Vec<String> {
    vec!["*".to_string()]
}

pub fn default_cors_max_age() -> u32 {
    3600
}
