//! Immutable runtime state compiled from configuration
//!
//! A reload compiles a fresh snapshot and swaps it in whole; requests keep
//! the snapshot they started with. Breakers and limiters live in the
//! snapshot, so a reload resets them.

use super::idempotency::IdempotencyPolicy;
use super::mirror::MirrorPolicy;
use super::stages::{CorsPolicy, Stage};
use crate::config::GatewayConfig;
use crate::core::basic_auth::{BasicAuthPolicy, UserStore};
use crate::core::circuit_breaker::{CircuitBreaker, CircuitBreakerSpec};
use crate::core::forward_auth::ForwardAuthTarget;
use crate::core::jwt::JwtVerifier;
use crate::core::rate_limiter::{RateLimiter, RateLimiterSpec};
use crate::core::router::{Route, RouteTable};
use crate::core::rules::RuleExpr;
use crate::utils::error::{GatewayError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Policies of one route
#[derive(Debug)]
pub struct RouteChain {
    pub route: Arc<Route>,
    /// Stages run in order before the breaker check
    pub stages: Vec<Stage>,
    pub breaker: Option<Arc<CircuitBreaker>>,
    pub limiter: Option<Arc<RateLimiter>>,
    pub idempotency: Option<Arc<IdempotencyPolicy>>,
    pub mirror: Option<Arc<MirrorPolicy>>,
}

/// Everything a request needs, indexed by route id
#[derive(Debug)]
pub struct RuntimeSnapshot {
    pub routes: RouteTable,
    pub chains: HashMap<Arc<str>, Arc<RouteChain>>,
    pub jwt: Option<Arc<JwtVerifier>>,
}

impl RuntimeSnapshot {
    /// Compile a validated configuration
    pub fn compile(config: &GatewayConfig) -> Result<Self> {
        let routes = RouteTable::from_config(config)?;
        let default_timeout = Duration::from_millis(config.server.timeout_ms);

        let jwt = if config.auth.jwt.key_sets.is_empty() {
            None
        } else {
            Some(Arc::new(JwtVerifier::new(&config.auth.jwt)?))
        };

        let users = Arc::new(UserStore::from_config(&config.auth.users)?);

        let cors = config
            .server
            .cors
            .enabled
            .then(|| Arc::new(CorsPolicy::new(config.server.cors.clone())));

        let mut chains = HashMap::with_capacity(routes.len());
        for route_config in &config.routes {
            let route = routes
                .get(&route_config.path)
                .cloned()
                .ok_or_else(|| GatewayError::internal("Compiled route missing"))?;
            let middleware = &route_config.middleware;
            let mut stages = Vec::new();

            if let Some(cors) = &cors {
                stages.push(Stage::CorsPreflight(Arc::clone(cors)));
            }

            if let Some(basic_auth) = middleware.basic_auth.as_ref().filter(|b| b.enabled) {
                if users.is_empty() {
                    return Err(GatewayError::config(format!(
                        "Route '{}' uses basic auth but no users are configured",
                        route.id
                    )));
                }
                stages.push(Stage::BasicAuth(Arc::new(BasicAuthPolicy::new(
                    Arc::clone(&users),
                    basic_auth,
                ))));
            }

            if let Some(jwt_auth) = middleware.jwt_auth.as_ref().filter(|j| j.enabled) {
                if jwt.is_none() || !config.auth.jwt.key_sets.contains_key(&jwt_auth.key_set) {
                    return Err(GatewayError::config(format!(
                        "Route '{}' uses unknown key set '{}'",
                        route.id, jwt_auth.key_set
                    )));
                }
                stages.push(Stage::JwtAuth {
                    key_set: jwt_auth.key_set.clone(),
                });
            }

            if let Some(forward_auth) = middleware.forward_auth.as_ref().filter(|f| f.enabled) {
                let service = config.service(&forward_auth.service).ok_or_else(|| {
                    GatewayError::config(format!(
                        "Route '{}' uses unknown auth service '{}'",
                        route.id, forward_auth.service
                    ))
                })?;
                let target = ForwardAuthTarget::from_config(forward_auth, service, default_timeout)?;
                stages.push(Stage::ForwardAuth(Arc::new(target)));
            }

            if let Some(rule) = &middleware.rule {
                let rule = RuleExpr::parse(rule).map_err(|e| {
                    GatewayError::config(format!("Route '{}': {}", route.id, e))
                })?;
                stages.push(Stage::RuleGate(Arc::new(rule)));
            }

            let limiter = middleware
                .rate_limiter
                .as_ref()
                .filter(|r| r.enabled)
                .map(|r| Arc::new(RateLimiter::new(RateLimiterSpec::from(r))));
            if let Some(limiter) = &limiter {
                stages.push(Stage::RateLimit(Arc::clone(limiter)));
            }

            let breaker = middleware
                .circuit_breaker
                .as_ref()
                .filter(|c| c.enabled)
                .map(|c| {
                    Arc::new(CircuitBreaker::new(
                        route.id.to_string(),
                        CircuitBreakerSpec::from(c),
                    ))
                });

            let idempotency = middleware
                .idempotency
                .as_ref()
                .filter(|i| i.enabled)
                .map(|i| IdempotencyPolicy::from_config(i).map(Arc::new))
                .transpose()?;

            let mirror = middleware
                .mirroring
                .as_ref()
                .filter(|m| m.enabled)
                .map(|m| MirrorPolicy::from_config(m, config).map(Arc::new))
                .transpose()?;

            debug!(
                route = %route.id,
                stages = ?stages.iter().map(Stage::name).collect::<Vec<_>>(),
                circuit_breaker = breaker.is_some(),
                idempotency = idempotency.is_some(),
                mirror = mirror.as_ref().map(|m| m.service.name.as_str()),
                "Compiled route chain"
            );

            chains.insert(
                Arc::clone(&route.id),
                Arc::new(RouteChain {
                    route,
                    stages,
                    breaker,
                    limiter,
                    idempotency,
                    mirror,
                }),
            );
        }

        Ok(Self {
            routes,
            chains,
            jwt,
        })
    }

    pub fn chain(&self, route_id: &str) -> Option<&Arc<RouteChain>> {
        self.chains.get(route_id)
    }
}
