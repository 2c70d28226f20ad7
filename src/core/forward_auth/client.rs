//! Forward-auth side calls
//!
//! The auth service's status is authoritative: 2xx admits the request, any
//! other status is relayed to the client as is. An unreachable auth service
//! denies the request.

use crate::config::{ForwardAuthConfig, ServiceConfig};
use crate::core::headers::RuleSet;
use crate::core::types::{GatewayRequest, GatewayResponse, is_hop_by_hop};
use crate::utils::error::{GatewayError, Result};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

const X_FORWARDED_METHOD: &str = "x-forwarded-method";
const X_FORWARDED_URI: &str = "x-forwarded-uri";

/// Auth endpoint and header rules of one route
#[derive(Debug, Clone)]
pub struct ForwardAuthTarget {
    pub url: String,
    pub method: Method,
    /// Builds the auth request headers from the inbound request
    pub request_rules: RuleSet,
    /// Merges auth response headers into the downstream request
    pub response_rules: RuleSet,
    pub timeout: Duration,
}

impl ForwardAuthTarget {
    /// Resolve a route's forward-auth settings against its auth service
    pub fn from_config(
        config: &ForwardAuthConfig,
        service: &ServiceConfig,
        default_timeout: Duration,
    ) -> Result<Self> {
        let parse = |directives: &str| {
            RuleSet::parse(directives).map_err(|e| GatewayError::config(e.to_string()))
        };

        // the auth call uses the first method the service declares
        let method = service
            .methods
            .iter()
            .find(|m| m.as_str() != "*")
            .map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()))
            .transpose()
            .map_err(|e| GatewayError::config(format!("Invalid auth method: {}", e)))?
            .unwrap_or(Method::GET);

        Ok(Self {
            url: format!("{}{}", service.url.trim_end_matches('/'), config.path),
            method,
            request_rules: parse(&config.request_headers)?,
            response_rules: parse(&config.response_headers)?,
            timeout: service
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default_timeout),
        })
    }
}

/// Outcome of an auth side call
#[derive(Debug)]
pub enum AuthDecision {
    Allowed,
    /// The auth service's response, to be sent to the client unchanged
    Denied(GatewayResponse),
}

/// HTTP client for auth side calls
#[derive(Debug, Clone)]
pub struct ForwardAuthClient {
    client: reqwest::Client,
}

impl ForwardAuthClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Ask the auth service whether `request` may proceed
    ///
    /// On success the response rules have already been applied to the
    /// request's headers.
    pub async fn authorize(
        &self,
        target: &ForwardAuthTarget,
        request: &mut GatewayRequest,
    ) -> Result<AuthDecision> {
        let mut headers = HeaderMap::new();
        target.request_rules.apply(&*request, &request.headers, &mut headers);
        if let Ok(value) = HeaderValue::from_str(request.method.as_str()) {
            headers.insert(HeaderName::from_static(X_FORWARDED_METHOD), value);
        }
        if let Ok(value) = HeaderValue::from_str(&request.path_and_query()) {
            headers.insert(HeaderName::from_static(X_FORWARDED_URI), value);
        }

        debug!(url = %target.url, method = %target.method, "Forward-auth call");
        let response = self
            .client
            .request(target.method.clone(), &target.url)
            .headers(headers)
            .timeout(target.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %target.url, "Forward-auth service unreachable: {}", e);
                GatewayError::auth("Authentication service unavailable")
            })?;

        let status = response.status();
        let auth_headers = response.headers().clone();

        if status.is_success() {
            let inbound = request.clone();
            target
                .response_rules
                .apply(&inbound, &auth_headers, &mut request.headers);
            return Ok(AuthDecision::Allowed);
        }

        debug!(status = status.as_u16(), "Forward-auth denied request");
        let body = response.bytes().await.unwrap_or_default();
        let mut denied = GatewayResponse::new(status);
        for (name, value) in &auth_headers {
            if !is_hop_by_hop(name) && name != reqwest::header::CONTENT_LENGTH {
                denied.headers.append(name.clone(), value.clone());
            }
        }
        denied.body = body;
        Ok(AuthDecision::Denied(denied))
    }
}
