//! Per-route stage handlers

use crate::config::CorsConfig;
use crate::core::basic_auth::BasicAuthPolicy;
use crate::core::forward_auth::ForwardAuthTarget;
use crate::core::rate_limiter::RateLimiter;
use crate::core::rules::RuleExpr;
use crate::core::types::GatewayResponse;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::sync::Arc;

const ALL_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";

/// One policy stage of a route's chain, in execution order
#[derive(Debug, Clone)]
pub enum Stage {
    /// Answers `OPTIONS` requests without contacting the backend
    CorsPreflight(Arc<CorsPolicy>),
    BasicAuth(Arc<BasicAuthPolicy>),
    JwtAuth { key_set: String },
    ForwardAuth(Arc<ForwardAuthTarget>),
    /// Refuses requests not matching the expression with 406
    RuleGate(Arc<RuleExpr>),
    RateLimit(Arc<RateLimiter>),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::CorsPreflight(_) => "cors",
            Stage::BasicAuth(_) => "basic_auth",
            Stage::JwtAuth { .. } => "jwt_auth",
            Stage::ForwardAuth(_) => "forward_auth",
            Stage::RuleGate(_) => "rule",
            Stage::RateLimit(_) => "rate_limiter",
        }
    }
}

/// Preflight responder
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    config: CorsConfig,
}

impl CorsPolicy {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Build the preflight response for a request's headers
    pub fn preflight(&self, headers: &HeaderMap) -> GatewayResponse {
        let mut response = GatewayResponse::new(StatusCode::OK);
        let origin = headers
            .get(reqwest::header::ORIGIN)
            .and_then(|v| v.to_str().ok());

        if let Some(origin) = origin {
            if self.config.allows_all_origins() && !self.config.allow_credentials {
                response.set_header("access-control-allow-origin", "*");
            } else if self.config.allows_all_origins()
                || self.config.allowed_origins.iter().any(|o| o == origin)
            {
                response.set_header("access-control-allow-origin", origin);
                response.set_header("vary", "Origin");
            }
        }

        if self.config.allow_credentials {
            response.set_header("access-control-allow-credentials", "true");
        }

        let methods = if self.config.allowed_methods.iter().any(|m| m == "*") {
            ALL_METHODS.to_string()
        } else {
            self.config.allowed_methods.join(",")
        };
        response.set_header("access-control-allow-methods", &methods);

        let allowed_headers = if self.config.allowed_headers.iter().any(|h| h == "*") {
            "*".to_string()
        } else {
            self.config.allowed_headers.join(",")
        };
        response.set_header("access-control-allow-headers", &allowed_headers);
        response.set_header("access-control-max-age", &self.config.max_age.to_string());
        response
    }
}
