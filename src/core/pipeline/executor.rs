//! Middleware chain executor
//!
//! Stage order per request:
//! 1. CORS preflight, basic auth, JWT auth, forward-auth, rule gate, rate
//!    limiting
//! 2. idempotency key check, then the mirror copy for selected clients
//! 3. circuit breaker admission
//! 4. idempotent replay or cache lookup, with single-flight fill on miss
//! 5. backend dispatch to the service picked by the route's match rules,
//!    outcome recording, response rewrite, store
//!
//! A stage that rejects the request ends the chain before anything later
//! runs, so a rejected request never records a breaker outcome or fills the
//! cache.

use super::mirror::MirrorPolicy;
use super::snapshot::{RouteChain, RuntimeSnapshot};
use super::stages::Stage;
use super::upstream::{HttpUpstream, Upstream, UpstreamRequest};
use crate::config::{Config, GatewayConfig, Validate};
use crate::core::cache::{CacheKey, CacheStats, CachedResponse, Flight, ResponseCache};
use crate::core::circuit_breaker::{CallPermit, CircuitState};
use crate::core::forward_auth::{AuthDecision, ForwardAuthClient};
use crate::core::router::{Route, RouteMatch, Service};
use crate::core::types::{
    CACHE_STATUS_HEADER, GatewayRequest, GatewayResponse, IDEMPOTENCY_REPLAY_HEADER,
    REQUEST_ID_HEADER, forwardable_headers,
};
use crate::utils::error::{GatewayError, Result};
use arc_swap::ArcSwap;
use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a single-flight leader hands to its followers
pub type FillOutcome = std::result::Result<GatewayResponse, Arc<GatewayError>>;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Observability view of one route
#[derive(Debug, Clone, Serialize)]
pub struct RouteStatus {
    pub route: String,
    pub service: String,
    /// `None` when the route has no breaker
    pub circuit_breaker: Option<CircuitState>,
    /// `None` when the route is not rate limited
    pub rate_limit_remaining: Option<u32>,
    pub cache_ttl_ms: Option<u64>,
}

/// The request pipeline
pub struct Pipeline {
    snapshot: ArcSwap<RuntimeSnapshot>,
    cache: Arc<ResponseCache<FillOutcome>>,
    upstream: Arc<dyn Upstream>,
    forward_auth: ForwardAuthClient,
}

impl Pipeline {
    /// Build the pipeline, connecting the configured cache backend
    pub async fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to build HTTP client: {}", e)))?;
        let cache = ResponseCache::from_config(config.storage()).await;
        Self::with_parts(
            &config.gateway,
            cache,
            Arc::new(HttpUpstream::new(client.clone())),
            client,
        )
    }

    /// Build the pipeline from explicit collaborators
    pub fn with_parts(
        config: &GatewayConfig,
        cache: ResponseCache<FillOutcome>,
        upstream: Arc<dyn Upstream>,
        client: reqwest::Client,
    ) -> Result<Self> {
        let snapshot = RuntimeSnapshot::compile(config)?;
        info!(
            routes = snapshot.routes.len(),
            cache = cache.backend_name(),
            "Pipeline ready"
        );
        Ok(Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            cache: Arc::new(cache),
            upstream,
            forward_auth: ForwardAuthClient::new(client),
        })
    }

    /// Swap in a new configuration
    ///
    /// In-flight requests finish against the previous snapshot. An invalid
    /// configuration is rejected and the current snapshot stays in place.
    pub fn reload(&self, config: &GatewayConfig) -> Result<()> {
        Validate::validate(config).map_err(GatewayError::Config)?;
        let snapshot = RuntimeSnapshot::compile(config)?;
        info!(routes = snapshot.routes.len(), "Configuration reloaded");
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }

    /// Resolve a request to a route without running it
    pub fn resolve_route(&self, method: &Method, path: &str) -> RouteMatch {
        self.snapshot.load().routes.resolve(method, path)
    }

    /// Handle one request; failures are rendered as responses
    pub async fn handle(&self, mut request: GatewayRequest) -> GatewayResponse {
        let request_id = match request.request_id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&id) {
                    request
                        .headers
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                }
                id
            }
        };

        let snapshot = self.snapshot.load_full();
        let mut response = match self.process(&snapshot, &mut request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(
                    request_id = %request_id,
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "Request rejected"
                );
                e.to_response(Some(&request_id))
            }
        };
        response.set_header(REQUEST_ID_HEADER, &request_id);
        response
    }

    async fn process(
        &self,
        snapshot: &RuntimeSnapshot,
        request: &mut GatewayRequest,
    ) -> Result<GatewayResponse> {
        let route = match snapshot.routes.resolve(&request.method, &request.path) {
            RouteMatch::Matched(route) => route,
            RouteMatch::MethodNotAllowed { allowed } => {
                return Err(GatewayError::method_not_allowed(allowed));
            }
            RouteMatch::NotFound => {
                return Err(GatewayError::not_found(format!(
                    "No route for {}",
                    request.path
                )));
            }
        };
        let chain = snapshot
            .chain(&route.id)
            .cloned()
            .ok_or_else(|| GatewayError::internal(format!("No chain for route {}", route.id)))?;

        for stage in &chain.stages {
            match stage {
                Stage::CorsPreflight(policy) => {
                    if request.method == Method::OPTIONS {
                        return Ok(policy.preflight(&request.headers));
                    }
                }
                Stage::BasicAuth(policy) => {
                    let user = policy.authenticate(&request.headers)?;
                    debug!(route = %route.id, user = %user, "Basic auth passed");
                }
                Stage::JwtAuth { key_set } => {
                    let verifier = snapshot
                        .jwt
                        .as_ref()
                        .ok_or_else(|| GatewayError::auth("JWT verification is not configured"))?;
                    verifier.authenticate(key_set, &mut request.headers).await?;
                }
                Stage::ForwardAuth(target) => {
                    if let AuthDecision::Denied(response) =
                        self.forward_auth.authorize(target, request).await?
                    {
                        return Ok(response);
                    }
                }
                Stage::RuleGate(rule) => {
                    if !rule.evaluate(request) {
                        return Err(GatewayError::not_acceptable(route.id.as_ref()));
                    }
                }
                Stage::RateLimit(limiter) => {
                    let result = limiter.try_acquire();
                    if !result.allowed {
                        return Err(GatewayError::rate_limit(
                            route.id.as_ref(),
                            result.limit,
                            result.retry_after_secs.unwrap_or(1),
                        ));
                    }
                }
            }
        }

        let idempotent = match &chain.idempotency {
            Some(policy) if policy.applies_to(&request.method) => {
                Some((policy.key(&route, request)?, policy.ttl()))
            }
            _ => None,
        };

        if let Some(mirror) = &chain.mirror {
            if mirror.selects(request) {
                self.spawn_mirror(&route, mirror, request);
            }
        }

        let permit = match &chain.breaker {
            Some(breaker) => Some(breaker.try_acquire().map_err(|rejected| {
                GatewayError::circuit_open(route.id.as_ref(), rejected.retry_after_secs)
            })?),
            None => None,
        };

        if let Some((key, ttl)) = idempotent {
            if let Some(hit) = self.cache.lookup(&key).await {
                debug!(route = %route.id, "Replaying idempotent response");
                return Ok(Stored::Replay.hit(hit.to_response()));
            }
            return self
                .fill(chain, request, key, ttl, permit, Stored::Replay)
                .await;
        }

        let Some(ttl) = route.cache_ttl_for(&request.method) else {
            return self.spawn_dispatch(chain, request.clone(), permit).await;
        };

        let mut key = CacheKey::from_request(
            &route.id,
            &request.method,
            &request.path,
            request.query.as_deref(),
            &request.headers,
            &route.vary_headers,
        );
        if !route.matches.is_empty() {
            key = key.scoped(&format!("svc-{}", route.service_for(request).name));
        }
        if let Some(hit) = self.cache.lookup(&key).await {
            return Ok(Stored::Cache.hit(hit.to_response()));
        }

        self.fill(chain, request, key, ttl, permit, Stored::Cache).await
    }

    /// Send a copy of the request to the mirror service in the background
    fn spawn_mirror(&self, route: &Route, mirror: &MirrorPolicy, request: &GatewayRequest) {
        let upstream = Arc::clone(&self.upstream);
        let service = Arc::clone(&mirror.service);
        let mirrored = backend_request(route, &service, request);
        let route_id = Arc::clone(&route.id);
        tokio::spawn(async move {
            match tokio::time::timeout(service.timeout, upstream.send(mirrored)).await {
                Ok(Ok(response)) => debug!(
                    route = %route_id,
                    mirror = %service.name,
                    status = response.status.as_u16(),
                    "Mirror responded"
                ),
                Ok(Err(e)) => {
                    debug!(route = %route_id, mirror = %service.name, "Mirror call failed: {}", e)
                }
                Err(_) => {
                    debug!(route = %route_id, mirror = %service.name, "Mirror call timed out")
                }
            }
        });
    }

    /// Single-flight cache fill
    async fn fill(
        &self,
        chain: Arc<RouteChain>,
        request: &GatewayRequest,
        key: CacheKey,
        ttl: Duration,
        permit: Option<CallPermit>,
        stored: Stored,
    ) -> Result<GatewayResponse> {
        let leader = match self.cache.join(&key) {
            Flight::Leader(leader) => leader,
            Flight::Follower(follower) => {
                drop(permit);
                debug!(key = %key.fingerprint(), "Waiting for in-flight cache fill");
                return match follower.wait().await {
                    Some(Ok(response)) => Ok(stored.shared(response)),
                    Some(Err(e)) => Ok(e.to_response(request.request_id())),
                    None => Err(GatewayError::bad_gateway("Cache fill was abandoned")),
                };
            }
        };

        let request_id = request.request_id().map(str::to_string);
        let cache = Arc::clone(&self.cache);
        let upstream = Arc::clone(&self.upstream);
        let request = request.clone();

        // runs to completion even if the client goes away
        let task = tokio::spawn(async move {
            // a fill may have finished between the lookup and the join;
            // the lookup already counted this request
            if let Some(hit) = cache.peek(&key).await {
                drop(permit);
                let response = stored.hit(hit.to_response());
                leader.complete(Ok(response.clone()));
                return Ok(response);
            }

            let outcome: FillOutcome = dispatch(upstream.as_ref(), &chain, request, permit)
                .await
                .map_err(Arc::new);

            let outcome = match outcome {
                Ok(mut response) if response.is_success() => {
                    cache
                        .store(&key, CachedResponse::from_response(&response), ttl)
                        .await;
                    stored.fresh(&mut response);
                    Ok(response)
                }
                other => other,
            };
            leader.complete(outcome.clone());
            outcome
        });

        match task.await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Ok(e.to_response(request_id.as_deref())),
            Err(e) => Err(GatewayError::internal(format!("Cache fill task failed: {}", e))),
        }
    }

    async fn spawn_dispatch(
        &self,
        chain: Arc<RouteChain>,
        request: GatewayRequest,
        permit: Option<CallPermit>,
    ) -> Result<GatewayResponse> {
        let upstream = Arc::clone(&self.upstream);
        // runs to completion so the breaker always sees the outcome
        tokio::spawn(async move { dispatch(upstream.as_ref(), &chain, request, permit).await })
            .await
            .map_err(|e| GatewayError::internal(format!("Dispatch task failed: {}", e)))?
    }

    /// Breaker state of a route; routes without a breaker report closed
    pub fn circuit_breaker_status(&self, route_id: &str) -> Result<CircuitState> {
        let snapshot = self.snapshot.load();
        let chain = snapshot
            .chain(route_id)
            .ok_or_else(|| GatewayError::not_found(format!("Unknown route {}", route_id)))?;
        Ok(chain
            .breaker
            .as_ref()
            .map_or(CircuitState::Closed, |b| b.status()))
    }

    /// Permits left in the current window; `None` if the route is not limited
    pub fn rate_limiter_status(&self, route_id: &str) -> Result<Option<u32>> {
        let snapshot = self.snapshot.load();
        let chain = snapshot
            .chain(route_id)
            .ok_or_else(|| GatewayError::not_found(format!("Unknown route {}", route_id)))?;
        Ok(chain.limiter.as_ref().map(|l| l.remaining()))
    }

    /// Drop cached responses of a route, optionally matching a pattern
    pub async fn invalidate_cache(&self, route_id: &str, pattern: Option<&str>) -> Result<usize> {
        if self.snapshot.load().chain(route_id).is_none() {
            return Err(GatewayError::not_found(format!("Unknown route {}", route_id)));
        }
        self.cache.invalidate(route_id, pattern).await
    }

    /// Status of every route in matching order
    pub fn route_statuses(&self) -> Vec<RouteStatus> {
        let snapshot = self.snapshot.load();
        snapshot
            .routes
            .routes()
            .iter()
            .filter_map(|route| snapshot.chain(&route.id))
            .map(|chain| RouteStatus {
                route: chain.route.id.to_string(),
                service: chain.route.service.name.clone(),
                circuit_breaker: chain.breaker.as_ref().map(|b| b.status()),
                rate_limit_remaining: chain.limiter.as_ref().map(|l| l.remaining()),
                cache_ttl_ms: chain.route.cache_ttl.map(|ttl| ttl.as_millis() as u64),
            })
            .collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend_name()
    }
}

/// How a stored response is labelled
#[derive(Debug, Clone, Copy)]
enum Stored {
    Cache,
    Replay,
}

impl Stored {
    /// Served from storage
    fn hit(self, mut response: GatewayResponse) -> GatewayResponse {
        match self {
            Stored::Cache => response.set_header(CACHE_STATUS_HEADER, "HIT"),
            Stored::Replay => response.set_header(IDEMPOTENCY_REPLAY_HEADER, "true"),
        }
        response
    }

    /// Fetched from the backend by this request
    fn fresh(self, response: &mut GatewayResponse) {
        if let Stored::Cache = self {
            response.set_header(CACHE_STATUS_HEADER, "MISS");
        }
    }

    /// Handed over by another request's in-flight call
    fn shared(self, response: GatewayResponse) -> GatewayResponse {
        match self {
            Stored::Cache => response,
            Stored::Replay => self.hit(response),
        }
    }
}

/// Backend request for `service`: forwardable headers, forwarding headers,
/// then the route's request rules
fn backend_request(route: &Route, service: &Service, request: &GatewayRequest) -> UpstreamRequest {
    let mut headers = forwardable_headers(&request.headers);
    if let Some(client) = &request.client_addr {
        let forwarded_for = match request
            .headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
        {
            Some(existing) => format!("{}, {}", existing, client),
            None => client.clone(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
        }
    }
    if let Some(host) = request.headers.get(reqwest::header::HOST) {
        headers.insert(HeaderName::from_static(X_FORWARDED_HOST), host.clone());
    }
    route.request_rules.apply(request, &request.headers, &mut headers);

    UpstreamRequest {
        method: request.method.clone(),
        url: service.url_for(&request.path_and_query()),
        headers,
        body: request.body.clone(),
    }
}

/// Send a request to the route's backend and record the outcome
async fn dispatch(
    upstream: &dyn Upstream,
    chain: &RouteChain,
    request: GatewayRequest,
    permit: Option<CallPermit>,
) -> Result<GatewayResponse> {
    let route = &chain.route;
    let service = route.service_for(&request);
    let upstream_request = backend_request(route, service, &request);

    let started = Instant::now();
    let result = tokio::time::timeout(service.timeout, upstream.send(upstream_request)).await;
    let elapsed = started.elapsed();

    let record = |permit: Option<CallPermit>, success: bool| {
        if let Some(permit) = permit {
            permit.record(elapsed, success);
        }
    };

    match result {
        Err(_) => {
            record(permit, false);
            warn!(
                route = %route.id,
                service = %service.name,
                timeout_ms = service.timeout.as_millis() as u64,
                "Backend call timed out"
            );
            Err(GatewayError::timeout(format!(
                "Service '{}' did not respond in time",
                service.name
            )))
        }
        Ok(Err(e)) => {
            record(permit, false);
            warn!(route = %route.id, service = %service.name, "Backend call failed: {}", e);
            Err(e)
        }
        Ok(Ok(mut response)) => {
            record(permit, response.is_success());
            debug!(
                route = %route.id,
                status = response.status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Backend responded"
            );
            let backend_headers = response.headers.clone();
            route
                .response_rules
                .apply(&request, &backend_headers, &mut response.headers);
            Ok(response)
        }
    }
}
