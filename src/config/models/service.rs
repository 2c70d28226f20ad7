//! Backend service configuration

use super::*;
use serde::{Deserialize, Serialize};

/// A backend service routes forward to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique service name referenced by routes
    pub name: String,
    /// Base URL; the inbound path and query are appended to it
    pub url: String,
    /// Accepted methods, `*` accepts all
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    /// Health check path on the service
    #[serde(default)]
    pub healthcheck: Option<String>,
    /// Backend deadline in milliseconds, overrides `server.timeout_ms`
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ServiceConfig {
    /// Create a service accepting every method
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            methods: default_methods(),
            healthcheck: None,
            timeout_ms: None,
        }
    }
}
