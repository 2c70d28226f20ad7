//! Helper functions for creating specific error types

use super::types::GatewayError;

/// Helper functions for creating specific errors
impl GatewayError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    pub fn basic_auth<S: Into<String>>(message: S) -> Self {
        Self::BasicAuth(message.into())
    }

    pub fn not_acceptable<S: Into<String>>(message: S) -> Self {
        Self::NotAcceptable(message.into())
    }

    pub fn idempotency_key_missing<S: Into<String>>(header: S) -> Self {
        Self::IdempotencyKeyMissing(header.into())
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn bad_gateway<S: Into<String>>(message: S) -> Self {
        Self::BadGateway(message.into())
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache(message.into())
    }

    pub fn rate_limit<S: Into<String>>(route: S, limit: u32, retry_after_secs: u64) -> Self {
        Self::RateLimit {
            route: route.into(),
            limit,
            retry_after_secs,
        }
    }

    pub fn circuit_open<S: Into<String>>(route: S, retry_after_secs: u64) -> Self {
        Self::CircuitOpen {
            route: route.into(),
            retry_after_secs,
        }
    }

    pub fn method_not_allowed(allowed: Vec<String>) -> Self {
        Self::MethodNotAllowed { allowed }
    }

    /// Whether this error is an authentication failure (401)
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Jwt(_) | Self::BasicAuth(_))
    }
}
