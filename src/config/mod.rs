//! Configuration management for the Gateway
//!
//! This module handles loading, validation, and serialization of the gateway
//! configuration. The runtime never reads configuration directly: the
//! pipeline compiles a validated [`Config`] into an immutable snapshot.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{GatewayError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the Gateway
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Gateway configuration
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml_str(&content)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let gateway: GatewayConfig = serde_yaml::from_str(content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self { gateway };
        config.validate()?;
        Ok(config)
    }

    /// Wrap an already-built gateway configuration, validating it
    pub fn from_gateway(gateway: GatewayConfig) -> Result<Self> {
        let config = Self { gateway };
        config.validate()?;
        Ok(config)
    }

    /// Get server configuration
    pub fn server(&self) -> &ServerConfig {
        &self.gateway.server
    }

    /// Get logging configuration
    pub fn logging(&self) -> &LoggingConfig {
        &self.gateway.logging
    }

    /// Get storage configuration
    pub fn storage(&self) -> &StorageConfig {
        &self.gateway.storage
    }

    /// Get auth configuration
    pub fn auth(&self) -> &AuthConfig {
        &self.gateway.auth
    }

    /// Get configured services
    pub fn services(&self) -> &[ServiceConfig] {
        &self.gateway.services
    }

    /// Get configured routes
    pub fn routes(&self) -> &[RouteConfig] {
        &self.gateway.routes
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        Validate::validate(&self.gateway).map_err(GatewayError::Config)?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.gateway)
            .map_err(|e| GatewayError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
server:
  host: "127.0.0.1"
  port: 8080

storage:
  in_memory:
    size: 500
    max_memory_mb: 8

auth:
  jwt:
    key_sets:
      default:
        jwks_uri: "https://issuer.example/.well-known/jwks.json"
        jwks_ttl_secs: 300
        algorithms: [RS256, ES256]

services:
  - name: user-service
    url: "http://users.internal:8081"
    methods: [GET, POST]

routes:
  - path: /user
    service: user-service
    ttl_ms: 5000
    vary_headers: [Accept-Language]
    middleware:
      jwt_auth:
        key_set: default
      rate_limiter:
        refresh_period_ms: 1000
        permits_per_period: 5
        burst_capacity: 10
      circuit_breaker:
        failure_rate_threshold: 50
        minimum_calls: 4
        wait_duration_in_open_ms: 2000
      headers:
        request_headers: "Remove(Authorization);Add(X-Gateway,1)"
"#;

    #[tokio::test]
    async fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server().host, "127.0.0.1");
        assert_eq!(config.server().port, 8080);
        assert_eq!(config.storage().in_memory.size, 500);
        assert_eq!(config.services().len(), 1);
        assert_eq!(config.services()[0].methods, vec!["GET", "POST"]);

        let route = &config.routes()[0];
        assert_eq!(route.ttl_ms, 5000);
        let jwt = route.middleware.jwt_auth.as_ref().unwrap();
        assert!(jwt.enabled);
        let limiter = route.middleware.rate_limiter.as_ref().unwrap();
        assert_eq!(limiter.burst(), 10);
        let breaker = route.middleware.circuit_breaker.as_ref().unwrap();
        assert_eq!(breaker.minimum_calls, 4);
        assert_eq!(breaker.permitted_calls_in_half_open, 10);

        let key_set = &config.auth().jwt.key_sets["default"];
        assert_eq!(key_set.algorithms.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let err = Config::from_file("/definitely/not/here.yaml").await.unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_invalid_reference_rejected() {
        let yaml = SAMPLE.replace("service: user-service", "service: ghost");
        let err = Config::from_yaml_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("unknown service"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server().health_path, "/health");
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();
        let yaml = config.to_yaml().unwrap();
        let reparsed = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(reparsed.routes()[0].path, "/user");
        assert_eq!(reparsed.routes()[0].vary_headers, vec!["Accept-Language"]);
    }
}
