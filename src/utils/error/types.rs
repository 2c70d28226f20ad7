//! Error types for the Gateway

use thiserror::Error;

/// Result type alias for the Gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the Gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis errors
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Missing or wrong basic-auth credentials
    #[error("Authentication error: {0}")]
    BasicAuth(String),

    /// Forbidden errors
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded for route {route}")]
    RateLimit {
        route: String,
        limit: u32,
        retry_after_secs: u64,
    },

    /// Circuit breaker rejected the call
    #[error("Circuit breaker is open for route {route}")]
    CircuitOpen { route: String, retry_after_secs: u64 },

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// The path matched but the target service does not accept the method
    #[error("Method not allowed, expected one of: {}", allowed.join(", "))]
    MethodNotAllowed { allowed: Vec<String> },

    /// The request does not satisfy the route's rule expression
    #[error("Rule not allowed processing request on route {0}")]
    NotAcceptable(String),

    /// A request that needs an idempotency key came without one
    #[error("{0} header is missing")]
    IdempotencyKeyMissing(String),

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Backend returned something the gateway could not relay
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Network errors
    #[error("Network error: {0}")]
    Network(String),

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}
