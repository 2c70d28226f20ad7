//! Route matcher

use super::types::{Route, services_from_config};
use crate::config::GatewayConfig;
use crate::utils::error::Result;
use reqwest::Method;
use std::sync::Arc;

/// Result of resolving a request
#[derive(Debug, Clone)]
pub enum RouteMatch {
    Matched(Arc<Route>),
    /// The path matched, but no matching route's service accepts the method
    MethodNotAllowed { allowed: Vec<String> },
    NotFound,
}

/// Routes ordered for matching
///
/// Longer literal patterns come first; patterns of equal length keep their
/// declaration order.
///
/// `OPTIONS` reaches a route regardless of its service's methods only when
/// CORS preflights are answered by the gateway.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    ordered: Vec<Arc<Route>>,
    preflight: bool,
}

impl RouteTable {
    pub fn new(routes: impl IntoIterator<Item = Arc<Route>>) -> Self {
        let mut ordered: Vec<Arc<Route>> = routes.into_iter().collect();
        // stable: ties stay in declaration order
        ordered.sort_by(|a, b| b.pattern.literal_len().cmp(&a.pattern.literal_len()));
        Self {
            ordered,
            preflight: false,
        }
    }

    /// Admit `OPTIONS` on every route
    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    /// Compile the routes of a configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let services = services_from_config(config)?;
        let routes = config
            .routes
            .iter()
            .map(|route| Route::from_config(route, &services).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(routes).with_preflight(config.server.cors.enabled))
    }

    /// Resolve a request to a route
    ///
    /// The most specific route whose service accepts the method wins.
    pub fn resolve(&self, method: &Method, path: &str) -> RouteMatch {
        let mut allowed: Vec<String> = Vec::new();
        let mut path_matched = false;

        for route in self.ordered.iter().filter(|r| r.pattern.matches(path)) {
            let preflight = self.preflight && *method == Method::OPTIONS;
            if preflight || route.service.methods.allows(method) {
                return RouteMatch::Matched(Arc::clone(route));
            }
            path_matched = true;
            for name in route.service.methods.names() {
                if !allowed.contains(&name) {
                    allowed.push(name);
                }
            }
        }

        if !path_matched {
            return RouteMatch::NotFound;
        }
        if self.preflight && !allowed.iter().any(|m| m == "OPTIONS") {
            allowed.push("OPTIONS".to_string());
        }
        RouteMatch::MethodNotAllowed { allowed }
    }

    /// Look up a route by id
    pub fn get(&self, route_id: &str) -> Option<&Arc<Route>> {
        self.ordered.iter().find(|r| &*r.id == route_id)
    }

    /// Routes in matching order
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
