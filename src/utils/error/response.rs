//! HTTP response handling for errors

use super::types::GatewayError;
use crate::core::types::{ERROR_HEADER, ERROR_TYPE_HEADER, GatewayResponse};
use actix_web::{HttpResponse, ResponseError};
use reqwest::StatusCode;
use serde::Serialize;

/// Standard error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail carried in [`ErrorResponse`]
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl GatewayError {
    /// HTTP status surfaced to the downstream client
    pub fn http_status(&self) -> StatusCode {
        match self {
            GatewayError::Auth(_) | GatewayError::Jwt(_) | GatewayError::BasicAuth(_) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            GatewayError::IdempotencyKeyMissing(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::HttpClient(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::HttpClient(_) | GatewayError::BadGateway(_) | GatewayError::Network(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "CONFIG_ERROR",
            #[cfg(feature = "redis")]
            GatewayError::Redis(_) => "CACHE_ERROR",
            GatewayError::HttpClient(_) => "UPSTREAM_ERROR",
            GatewayError::Serialization(_) | GatewayError::Yaml(_) => "SERIALIZATION_ERROR",
            GatewayError::Io(_) => "IO_ERROR",
            GatewayError::Auth(_) | GatewayError::BasicAuth(_) => "AUTH_ERROR",
            GatewayError::Jwt(_) => "INVALID_TOKEN",
            GatewayError::Forbidden(_) => "FORBIDDEN",
            GatewayError::RateLimit { .. } => "RATE_LIMIT_EXCEEDED",
            GatewayError::CircuitOpen { .. } => "CIRCUIT_BREAKER_OPEN",
            GatewayError::Timeout(_) => "UPSTREAM_TIMEOUT",
            GatewayError::NotFound(_) => "NOT_FOUND",
            GatewayError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            GatewayError::NotAcceptable(_) => "RULE_NOT_ALLOWED",
            GatewayError::IdempotencyKeyMissing(_) => "IDEMPOTENCY_KEY_MISSING",
            GatewayError::BadRequest(_) => "BAD_REQUEST",
            GatewayError::BadGateway(_) => "BAD_GATEWAY",
            GatewayError::Network(_) => "NETWORK_ERROR",
            GatewayError::Cache(_) => "CACHE_ERROR",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Policy that produced the error, reported in `x-gateway-error-type`
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::Auth(_)
            | GatewayError::Jwt(_)
            | GatewayError::BasicAuth(_)
            | GatewayError::Forbidden(_) => "auth",
            GatewayError::NotAcceptable(_) => "rule",
            GatewayError::IdempotencyKeyMissing(_) => "idempotency",
            GatewayError::RateLimit { .. } => "rate_limiter",
            GatewayError::CircuitOpen { .. } => "circuit_breaker",
            GatewayError::NotFound(_)
            | GatewayError::MethodNotAllowed { .. }
            | GatewayError::BadRequest(_) => "routing",
            GatewayError::Timeout(_)
            | GatewayError::HttpClient(_)
            | GatewayError::BadGateway(_)
            | GatewayError::Network(_) => "upstream",
            _ => "internal",
        }
    }

    /// Client-facing message; internal details are not leaked
    fn public_message(&self) -> String {
        match self {
            GatewayError::Config(_) | GatewayError::Internal(_) | GatewayError::Io(_) => {
                "Internal gateway error".to_string()
            }
            #[cfg(feature = "redis")]
            GatewayError::Redis(_) => "Cache operation failed".to_string(),
            GatewayError::Cache(_) => "Cache operation failed".to_string(),
            GatewayError::Serialization(_) | GatewayError::Yaml(_) => {
                "Failed to encode response".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Render the error as a pipeline response with a JSON body
    pub fn to_response(&self, request_id: Option<&str>) -> GatewayResponse {
        let message = self.public_message();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: message.clone(),
                timestamp: chrono::Utc::now().timestamp(),
                request_id: request_id.map(str::to_string),
            },
        };
        let value = serde_json::to_value(&body).unwrap_or_default();
        let mut response = GatewayResponse::json(self.http_status(), &value);

        response.set_header(ERROR_HEADER, &message);
        response.set_header(ERROR_TYPE_HEADER, self.error_type());

        match self {
            GatewayError::RateLimit {
                limit,
                retry_after_secs,
                ..
            } => {
                response.set_header("retry-after", &retry_after_secs.to_string());
                response.set_header("x-ratelimit-limit", &limit.to_string());
                response.set_header("x-ratelimit-remaining", "0");
            }
            GatewayError::CircuitOpen {
                retry_after_secs, ..
            } => {
                response.set_header("retry-after", &retry_after_secs.to_string());
            }
            GatewayError::MethodNotAllowed { allowed } => {
                response.set_header("allow", &allowed.join(", "));
            }
            GatewayError::Auth(_) | GatewayError::Jwt(_) => {
                response.set_header("www-authenticate", "Bearer");
            }
            GatewayError::BasicAuth(_) => {
                response.set_header("www-authenticate", "Basic realm=\"waypost\"");
            }
            _ => {}
        }

        response
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.http_status().as_u16())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        crate::server::handlers::into_http_response(self.to_response(None))
    }
}
