//! Route and per-route middleware configuration

use super::*;
use serde::{Deserialize, Serialize};

/// A route binds a path pattern to a service and its policies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Path pattern; a trailing `*` makes it a raw prefix match
    pub path: String,
    /// Name of the target service
    pub service: String,
    /// Response cache TTL in milliseconds; `<= 0` disables caching
    #[serde(default = "default_route_ttl_ms")]
    pub ttl_ms: i64,
    /// Request headers that take part in the cache key
    #[serde(default)]
    pub vary_headers: Vec<String>,
    /// Ordered rules that re-target the request; the first match wins and
    /// `service` is the fallback
    #[serde(default)]
    pub matches: Vec<MatchConfig>,
    #[serde(default)]
    pub middleware: MiddlewareConfig,
}

impl RouteConfig {
    /// Create a route without any policy
    pub fn new(path: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            service: service.into(),
            ttl_ms: default_route_ttl_ms(),
            vary_headers: vec![],
            matches: vec![],
            middleware: MiddlewareConfig::default(),
        }
    }
}

/// A rule expression and the service it selects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    pub rule: String,
    pub service: String,
}

/// Per-route policy settings; an absent section means pass-through
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MiddlewareConfig {
    /// Requests not matching this rule expression are refused with 406
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub basic_auth: Option<BasicAuthConfig>,
    #[serde(default)]
    pub jwt_auth: Option<JwtAuthConfig>,
    #[serde(default)]
    pub forward_auth: Option<ForwardAuthConfig>,
    #[serde(default)]
    pub rate_limiter: Option<RateLimiterConfig>,
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    #[serde(default)]
    pub idempotency: Option<IdempotencyConfig>,
    #[serde(default)]
    pub mirroring: Option<MirroringConfig>,
    #[serde(default)]
    pub headers: HeaderRulesConfig,
}

/// HTTP basic authentication against `auth.users`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Roles admitted on the route; empty admits any known user
    #[serde(default)]
    pub roles: Vec<String>,
}

/// JWT authentication for a route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtAuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Key set under `auth.jwt.key_sets`
    #[serde(default = "default_key_set")]
    pub key_set: String,
}

/// Delegated authentication through an external service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardAuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Name of the auth service
    pub service: String,
    /// Path on the auth service
    #[serde(default)]
    pub path: String,
    /// Directives building the auth request from the inbound headers
    #[serde(default)]
    pub request_headers: String,
    /// Directives merging auth response headers into the downstream request
    #[serde(default)]
    pub response_headers: String,
}

/// Replays the stored response for a repeated idempotency key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_idempotency_header")]
    pub header_name: String,
    /// How long a stored response is replayed
    #[serde(default = "default_idempotency_ttl_ms")]
    pub ttl_ms: u64,
    /// Methods that require a key
    #[serde(default = "default_idempotency_methods")]
    pub methods: Vec<String>,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: default_idempotency_header(),
            ttl_ms: default_idempotency_ttl_ms(),
            methods: default_idempotency_methods(),
        }
    }
}

/// Copies a share of the traffic to a second service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirroringConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Name of the mirror service
    pub service: String,
    /// Share of clients mirrored, 0 to 100
    #[serde(default = "default_mirror_percentage")]
    pub percentage: u8,
}

/// Fixed-window rate limiting for a route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_period_ms")]
    pub refresh_period_ms: u64,
    #[serde(default = "default_permits_per_period")]
    pub permits_per_period: u32,
    /// Permits granted per window; defaults to `permits_per_period`
    #[serde(default)]
    pub burst_capacity: Option<u32>,
}

impl RateLimiterConfig {
    /// Effective burst capacity
    pub fn burst(&self) -> u32 {
        self.burst_capacity.unwrap_or(self.permits_per_period)
    }
}

/// Circuit breaker settings for a route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Percentage of failed calls that opens the circuit
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,
    /// Percentage of slow calls that opens the circuit
    #[serde(default = "default_slow_call_rate_threshold")]
    pub slow_call_rate_threshold: f64,
    #[serde(default = "default_slow_call_duration_ms")]
    pub slow_call_duration_ms: u64,
    /// How long an idle open circuit is reported as open
    #[serde(default = "default_open_state_duration_secs")]
    pub open_state_duration_secs: u64,
    #[serde(default = "default_wait_duration_in_open_ms")]
    pub wait_duration_in_open_ms: u64,
    #[serde(default = "default_permitted_calls_in_half_open")]
    pub permitted_calls_in_half_open: u32,
    /// Samples needed before rates are evaluated
    #[serde(default = "default_minimum_calls")]
    pub minimum_calls: u32,
    /// Window length; never smaller than `minimum_calls`
    #[serde(default)]
    pub sliding_window_size: Option<u32>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_rate_threshold: default_failure_rate_threshold(),
            slow_call_rate_threshold: default_slow_call_rate_threshold(),
            slow_call_duration_ms: default_slow_call_duration_ms(),
            open_state_duration_secs: default_open_state_duration_secs(),
            wait_duration_in_open_ms: default_wait_duration_in_open_ms(),
            permitted_calls_in_half_open: default_permitted_calls_in_half_open(),
            minimum_calls: default_minimum_calls(),
            sliding_window_size: None,
        }
    }
}

/// Header directive strings, e.g. `Remove(Authorization);Add(X-Gateway,1)`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeaderRulesConfig {
    /// Applied to the request forwarded to the backend
    #[serde(default)]
    pub request_headers: String,
    /// Applied to the response returned to the client
    #[serde(default)]
    pub response_headers: String,
}
