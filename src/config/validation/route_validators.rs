//! Route and middleware validators

use crate::config::models::*;
use crate::core::headers::RuleSet;
use crate::core::rules::RuleExpr;
use reqwest::Method;
use reqwest::header::HeaderName;

/// Validate a route against the gateway configuration it belongs to
pub fn validate_route(route: &RouteConfig, gateway: &GatewayConfig) -> Result<(), String> {
    if !route.path.starts_with('/') {
        return Err(format!("Route path must start with '/': {}", route.path));
    }

    let pattern = route.path.strip_suffix('*').unwrap_or(&route.path);
    if pattern.contains('*') {
        return Err(format!(
            "Route path '{}' may only use '*' as its last character",
            route.path
        ));
    }

    if gateway.service(&route.service).is_none() {
        return Err(format!(
            "Route '{}' references unknown service '{}'",
            route.path, route.service
        ));
    }

    for header in &route.vary_headers {
        HeaderName::from_bytes(header.as_bytes())
            .map_err(|_| format!("Route '{}' has invalid vary header: {}", route.path, header))?;
    }

    let middleware = &route.middleware;
    let context = |what: &str| format!("Route '{}' {}", route.path, what);

    for matched in &route.matches {
        RuleExpr::parse(&matched.rule).map_err(|e| format!("{}: {}", context("match"), e))?;
        if gateway.service(&matched.service).is_none() {
            return Err(format!(
                "{} references unknown service '{}'",
                context("match"),
                matched.service
            ));
        }
    }

    if let Some(rule) = &middleware.rule {
        RuleExpr::parse(rule).map_err(|e| format!("{}: {}", context("rule"), e))?;
    }

    if let Some(basic) = middleware.basic_auth.as_ref().filter(|b| b.enabled) {
        if gateway.auth.users.is_empty() {
            return Err(format!("{} requires auth.users", context("basic_auth")));
        }
        for role in &basic.roles {
            if !gateway.auth.users.iter().any(|u| &u.role == role) {
                return Err(format!(
                    "{} role '{}' is not held by any user",
                    context("basic_auth"),
                    role
                ));
            }
        }
    }

    RuleSet::parse(&middleware.headers.request_headers)
        .map_err(|e| format!("{}: {}", context("request headers"), e))?;
    RuleSet::parse(&middleware.headers.response_headers)
        .map_err(|e| format!("{}: {}", context("response headers"), e))?;

    if let Some(jwt) = middleware.jwt_auth.as_ref().filter(|j| j.enabled) {
        if !gateway.auth.jwt.key_sets.contains_key(&jwt.key_set) {
            return Err(format!(
                "{} references unknown key set '{}'",
                context("jwt_auth"),
                jwt.key_set
            ));
        }
    }

    if let Some(forward) = middleware.forward_auth.as_ref().filter(|f| f.enabled) {
        if gateway.service(&forward.service).is_none() {
            return Err(format!(
                "{} references unknown service '{}'",
                context("forward_auth"),
                forward.service
            ));
        }
        if !forward.path.is_empty() && !forward.path.starts_with('/') {
            return Err(format!("{} path must start with '/'", context("forward_auth")));
        }
        RuleSet::parse(&forward.request_headers)
            .map_err(|e| format!("{}: {}", context("forward_auth request headers"), e))?;
        RuleSet::parse(&forward.response_headers)
            .map_err(|e| format!("{}: {}", context("forward_auth response headers"), e))?;
    }

    if let Some(idempotency) = middleware.idempotency.as_ref().filter(|i| i.enabled) {
        validate_idempotency(idempotency)
            .map_err(|e| format!("{}: {}", context("idempotency"), e))?;
    }

    if let Some(mirror) = middleware.mirroring.as_ref().filter(|m| m.enabled) {
        if gateway.service(&mirror.service).is_none() {
            return Err(format!(
                "{} references unknown service '{}'",
                context("mirroring"),
                mirror.service
            ));
        }
        if mirror.percentage > 100 {
            return Err(format!("{} percentage must be at most 100", context("mirroring")));
        }
    }

    if let Some(limiter) = middleware.rate_limiter.as_ref().filter(|r| r.enabled) {
        validate_rate_limiter(limiter).map_err(|e| format!("{}: {}", context("rate_limiter"), e))?;
    }

    if let Some(breaker) = middleware.circuit_breaker.as_ref().filter(|c| c.enabled) {
        validate_circuit_breaker(breaker)
            .map_err(|e| format!("{}: {}", context("circuit_breaker"), e))?;
    }

    Ok(())
}

fn validate_idempotency(config: &IdempotencyConfig) -> Result<(), String> {
    HeaderName::from_bytes(config.header_name.as_bytes())
        .map_err(|_| format!("invalid header name '{}'", config.header_name))?;

    if config.ttl_ms == 0 {
        return Err("ttl_ms must be greater than 0".to_string());
    }

    if config.methods.is_empty() {
        return Err("at least one method is required".to_string());
    }
    for method in &config.methods {
        Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| format!("invalid HTTP method '{}'", method))?;
    }

    Ok(())
}

fn validate_rate_limiter(config: &RateLimiterConfig) -> Result<(), String> {
    if config.refresh_period_ms == 0 {
        return Err("refresh_period_ms must be greater than 0".to_string());
    }

    if config.permits_per_period == 0 {
        return Err("permits_per_period must be at least 1".to_string());
    }

    if config.burst() < config.permits_per_period {
        return Err(format!(
            "burst_capacity ({}) must not be smaller than permits_per_period ({})",
            config.burst(),
            config.permits_per_period
        ));
    }

    Ok(())
}

fn validate_circuit_breaker(config: &CircuitBreakerConfig) -> Result<(), String> {
    let percentage = |value: f64| value > 0.0 && value <= 100.0;

    if !percentage(config.failure_rate_threshold) {
        return Err("failure_rate_threshold must be in (0, 100]".to_string());
    }

    if !percentage(config.slow_call_rate_threshold) {
        return Err("slow_call_rate_threshold must be in (0, 100]".to_string());
    }

    if config.permitted_calls_in_half_open == 0 {
        return Err("permitted_calls_in_half_open must be at least 1".to_string());
    }

    if config.minimum_calls == 0 {
        return Err("minimum_calls must be at least 1".to_string());
    }

    if config.slow_call_duration_ms == 0 {
        return Err("slow_call_duration_ms must be greater than 0".to_string());
    }

    Ok(())
}
