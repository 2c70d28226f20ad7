//! Runtime route and service model
//!
//! Built once from configuration and shared read-only by every request.

use crate::config::{GatewayConfig, RouteConfig, ServiceConfig};
use crate::core::headers::RuleSet;
use crate::core::rules::RuleExpr;
use crate::core::types::GatewayRequest;
use crate::utils::error::{GatewayError, Result};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

/// Methods a service accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    Any,
    Only(Vec<Method>),
}

impl MethodSet {
    pub fn from_config(methods: &[String]) -> Result<Self> {
        if methods.is_empty() || methods.iter().any(|m| m == "*") {
            return Ok(Self::Any);
        }
        methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| GatewayError::config(format!("Invalid HTTP method '{}'", m)))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::Only)
    }

    pub fn allows(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(methods) => methods.contains(method),
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Any => vec!["*".to_string()],
            Self::Only(methods) => methods.iter().map(|m| m.as_str().to_string()).collect(),
        }
    }
}

/// A backend service
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    /// Base URL without a trailing slash
    pub base_url: String,
    pub methods: MethodSet,
    pub healthcheck: Option<String>,
    /// Deadline of a backend call
    pub timeout: Duration,
}

impl Service {
    pub fn from_config(config: &ServiceConfig, default_timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
            methods: MethodSet::from_config(&config.methods)?,
            healthcheck: config.healthcheck.clone(),
            timeout: config
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default_timeout),
        })
    }

    /// Backend URL for an inbound path and query
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

/// Path pattern of a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches the path itself and everything below it
    Segment(String),
    /// Trailing `*`: matches any path starting with the literal
    Prefix(String),
}

impl PathPattern {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Segment(raw.trim_end_matches('/').to_string()),
        }
    }

    /// Length of the literal part, used to rank matches
    pub fn literal_len(&self) -> usize {
        match self {
            Self::Segment(literal) | Self::Prefix(literal) => literal.len(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            // "/" was trimmed to ""
            Self::Segment(literal) if literal.is_empty() => true,
            Self::Segment(literal) => match path.strip_prefix(literal.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// A rule that re-targets a route to another service
#[derive(Debug, Clone)]
pub struct ServiceMatch {
    pub rule: RuleExpr,
    pub service: Arc<Service>,
}

/// A configured route
#[derive(Debug, Clone)]
pub struct Route {
    /// The configured path pattern; identifies the route
    pub id: Arc<str>,
    pub pattern: PathPattern,
    /// Fallback service, also the one whose methods gate the route
    pub service: Arc<Service>,
    /// Tried in declaration order before falling back to `service`
    pub matches: Vec<ServiceMatch>,
    /// `None` when responses are not cached
    pub cache_ttl: Option<Duration>,
    pub vary_headers: Vec<String>,
    /// Applied to the request forwarded to the backend
    pub request_rules: RuleSet,
    /// Applied to the response returned to the client
    pub response_rules: RuleSet,
}

fn find_service(services: &[Arc<Service>], route: &str, name: &str) -> Result<Arc<Service>> {
    services
        .iter()
        .find(|s| s.name == name)
        .cloned()
        .ok_or_else(|| {
            GatewayError::config(format!(
                "Route '{}' references unknown service '{}'",
                route, name
            ))
        })
}

impl Route {
    pub fn from_config(config: &RouteConfig, services: &[Arc<Service>]) -> Result<Self> {
        let parse = |directives: &str| {
            RuleSet::parse(directives)
                .map_err(|e| GatewayError::config(format!("Route '{}': {}", config.path, e)))
        };
        let matches = config
            .matches
            .iter()
            .map(|m| {
                Ok(ServiceMatch {
                    rule: RuleExpr::parse(&m.rule).map_err(|e| {
                        GatewayError::config(format!("Route '{}': {}", config.path, e))
                    })?,
                    service: find_service(services, &config.path, &m.service)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: Arc::from(config.path.as_str()),
            pattern: PathPattern::parse(&config.path),
            service: find_service(services, &config.path, &config.service)?,
            matches,
            cache_ttl: u64::try_from(config.ttl_ms)
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            vary_headers: config.vary_headers.clone(),
            request_rules: parse(&config.middleware.headers.request_headers)?,
            response_rules: parse(&config.middleware.headers.response_headers)?,
        })
    }

    /// Service a request is forwarded to: the first matching rule's, else the fallback
    pub fn service_for(&self, request: &GatewayRequest) -> &Arc<Service> {
        self.matches
            .iter()
            .find(|m| m.rule.evaluate(request))
            .map(|m| &m.service)
            .unwrap_or(&self.service)
    }

    /// Cache TTL for responses to `method`; only GET and HEAD are cached
    pub fn cache_ttl_for(&self, method: &Method) -> Option<Duration> {
        if *method == Method::GET || *method == Method::HEAD {
            self.cache_ttl
        } else {
            None
        }
    }
}

/// Build the runtime services of a configuration
pub fn services_from_config(config: &GatewayConfig) -> Result<Vec<Arc<Service>>> {
    let default_timeout = Duration::from_millis(config.server.timeout_ms);
    config
        .services
        .iter()
        .map(|s| Service::from_config(s, default_timeout).map(Arc::new))
        .collect()
}
