//! Core configuration validators
//!
//! This module provides validation implementations for the gateway, server,
//! storage, auth and service configuration structures.

use super::route_validators::validate_route;
use super::trait_def::Validate;
use crate::config::models::*;
use reqwest::Method;
use reqwest::header::HeaderName;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating gateway configuration");

        self.server.validate()?;
        self.storage.validate()?;
        self.auth.validate()?;

        let mut service_names = HashSet::new();
        for service in &self.services {
            if !service_names.insert(service.name.as_str()) {
                return Err(format!("Duplicate service name: {}", service.name));
            }
            service.validate()?;
        }

        let mut route_paths = HashSet::new();
        for route in &self.routes {
            if !route_paths.insert(route.path.as_str()) {
                return Err(format!("Duplicate route path: {}", route.path));
            }
            validate_route(route, self)?;
        }

        debug!("Gateway configuration validation completed");
        Ok(())
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating server configuration");

        if self.host.is_empty() {
            return Err("Server host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err("Worker count must be greater than 0".to_string());
            }
        }

        if self.timeout_ms == 0 {
            return Err("Server timeout must be greater than 0".to_string());
        }

        if self.max_body_size == 0 {
            return Err("Max body size must be greater than 0".to_string());
        }

        if !self.health_path.starts_with('/') {
            return Err(format!(
                "Health path must start with '/': {}",
                self.health_path
            ));
        }

        self.cors.validate()
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.in_memory.size == 0 {
            return Err("In-memory cache size must be greater than 0".to_string());
        }

        if self.in_memory.max_memory_mb == 0 {
            return Err("In-memory cache max_memory_mb must be greater than 0".to_string());
        }

        if self.redis.enabled {
            let url = Url::parse(&self.redis.url)
                .map_err(|e| format!("Redis URL is invalid: {}", e))?;
            if !matches!(url.scheme(), "redis" | "rediss") {
                return Err(format!(
                    "Redis URL must use redis:// or rediss://, got: {}",
                    url.scheme()
                ));
            }
        }

        Ok(())
    }
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<(), String> {
        self.jwt.validate()?;

        let mut usernames = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() || user.username.contains(':') {
                return Err(format!("Invalid basic auth username: '{}'", user.username));
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(format!("Duplicate basic auth user: {}", user.username));
            }
            if let Some(digest) = user.password.strip_prefix("sha256:") {
                if digest.len() != 64 || hex::decode(digest).is_err() {
                    return Err(format!(
                        "User '{}' password must be a 64 character hex sha256 digest",
                        user.username
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Validate for JwtConfig {
    fn validate(&self) -> Result<(), String> {
        HeaderName::from_bytes(self.header_name.as_bytes())
            .map_err(|_| format!("Invalid JWT header name: {}", self.header_name))?;

        for header in self.forward_claims.values() {
            HeaderName::from_bytes(header.as_bytes())
                .map_err(|_| format!("Invalid forwarded claim header: {}", header))?;
        }

        for (name, key_set) in &self.key_sets {
            validate_http_url(&key_set.jwks_uri, &format!("Key set '{}' jwks_uri", name))?;

            if key_set.jwks_ttl_secs < -1 {
                return Err(format!(
                    "Key set '{}' jwks_ttl_secs must be -1 or a non-negative number",
                    name
                ));
            }

            if key_set.algorithms.is_empty() {
                return Err(format!("Key set '{}' must allow at least one algorithm", name));
            }
        }

        Ok(())
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Service name cannot be empty".to_string());
        }

        validate_http_url(&self.url, &format!("Service '{}' url", self.name))?;

        if self.methods.is_empty() {
            return Err(format!("Service '{}' must accept at least one method", self.name));
        }

        for method in &self.methods {
            if method != "*" && Method::from_bytes(method.to_uppercase().as_bytes()).is_err() {
                return Err(format!(
                    "Service '{}' has an invalid method: {}",
                    self.name, method
                ));
            }
        }

        if let Some(path) = &self.healthcheck {
            if !path.starts_with('/') {
                return Err(format!(
                    "Service '{}' healthcheck must start with '/'",
                    self.name
                ));
            }
        }

        if self.timeout_ms == Some(0) {
            return Err(format!("Service '{}' timeout must be greater than 0", self.name));
        }

        Ok(())
    }
}

/// Check that a URL parses and uses http or https
pub(super) fn validate_http_url(value: &str, context: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{} has invalid URL format: {}", context, e))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(format!(
                "{} must use http:// or https:// scheme, got: {}",
                context, scheme
            ));
        }
    }

    if url.host_str().is_none() {
        return Err(format!("{} URL must have a valid host", context));
    }

    Ok(())
}
