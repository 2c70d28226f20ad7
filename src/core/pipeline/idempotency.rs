//! Idempotency-key replay
//!
//! Unsafe methods on a protected route must carry a key. The first
//! successful response for a key is stored for the configured TTL and
//! replayed for repeats; concurrent repeats share the in-flight call.

use crate::config::IdempotencyConfig;
use crate::core::cache::CacheKey;
use crate::core::router::Route;
use crate::core::types::GatewayRequest;
use crate::utils::error::{GatewayError, Result};
use reqwest::Method;
use reqwest::header::HeaderName;
use sha2::{Digest, Sha256};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IdempotencyPolicy {
    header: HeaderName,
    ttl: Duration,
    methods: Vec<Method>,
}

impl IdempotencyPolicy {
    pub fn from_config(config: &IdempotencyConfig) -> Result<Self> {
        let header = HeaderName::from_bytes(config.header_name.as_bytes()).map_err(|_| {
            GatewayError::config(format!(
                "Invalid idempotency header '{}'",
                config.header_name
            ))
        })?;
        let methods = config
            .methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| GatewayError::config(format!("Invalid HTTP method '{}'", m)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            header,
            ttl: Duration::from_millis(config.ttl_ms),
            methods,
        })
    }

    pub fn applies_to(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Storage key of a request; a missing or empty key header is an error
    pub fn key(&self, route: &Route, request: &GatewayRequest) -> Result<CacheKey> {
        let value = request
            .headers
            .get(&self.header)
            .map(|v| v.as_bytes())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::idempotency_key_missing(self.header_display()))?;

        let digest = Sha256::digest(value);
        let key = CacheKey::from_request(
            &route.id,
            &request.method,
            &request.path,
            request.query.as_deref(),
            &request.headers,
            &[],
        );
        Ok(key.scoped(&format!("idem-{}", hex::encode(&digest[..16]))))
    }

    /// Header name in the conventional `Idempotency-Key` casing
    fn header_display(&self) -> String {
        self.header
            .as_str()
            .split('-')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}
