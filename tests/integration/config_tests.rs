//! Configuration loading and validation tests

#[cfg(test)]
mod tests {
    use std::io::Write;
    use tempfile::NamedTempFile;
    use waypost::config::{Config, GatewayConfig, Validate};
    use waypost::{GatewayError, Pipeline};

    const MINIMAL: &str = r#"
services:
  - name: backend
    url: "http://backend.internal:8080"
routes:
  - path: /api
    service: backend
"#;

    fn minimal() -> GatewayConfig {
        Config::from_yaml_str(MINIMAL).unwrap().gateway
    }

    fn rejection(yaml: &str) -> String {
        match Config::from_yaml_str(yaml) {
            Ok(_) => panic!("configuration should have been rejected"),
            Err(GatewayError::Config(message)) => message,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    // ==================== Loading ====================

    #[tokio::test]
    async fn test_shipped_config_loads_and_compiles() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/gateway.yaml");
        let config = crate::assert_ok!(Config::from_file(path).await);

        assert_eq!(config.services().len(), 4);
        assert_eq!(config.routes().len(), 4);
        assert!(config.server().cors.enabled);
        assert_eq!(config.gateway.auth.users.len(), 1);
        assert_eq!(config.routes()[1].matches.len(), 1);

        let pipeline = crate::assert_ok!(Pipeline::new(&config).await);
        assert_eq!(pipeline.route_statuses().len(), 4);
    }

    #[tokio::test]
    async fn test_config_from_temp_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).await.unwrap();
        assert_eq!(config.routes()[0].path, "/api");
        assert_eq!(config.routes()[0].ttl_ms, -1);
        assert_eq!(config.server().port, 8080);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let message = rejection("services: [");
        assert!(message.contains("parse"));
    }

    // ==================== Validation ====================

    #[test]
    fn test_minimal_config_is_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_port_zero_rejected() {
        let mut config = minimal();
        config.server.port = 0;
        assert!(config.validate().unwrap_err().contains("port"));
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let mut config = minimal();
        let duplicate = config.services[0].clone();
        config.services.push(duplicate);
        assert!(config.validate().unwrap_err().contains("Duplicate service"));
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut config = minimal();
        let duplicate = config.routes[0].clone();
        config.routes.push(duplicate);
        assert!(config.validate().unwrap_err().contains("Duplicate route"));
    }

    #[test]
    fn test_unknown_service_rejected() {
        let message = rejection(&MINIMAL.replace("service: backend", "service: ghost"));
        assert!(message.contains("unknown service"));
    }

    #[test]
    fn test_bad_header_directive_rejected() {
        let yaml = format!(
            "{}    middleware:\n      headers:\n        request_headers: \"Explode(X-A)\"\n",
            MINIMAL
        );
        let message = rejection(&yaml);
        assert!(message.contains("request headers"));
    }

    #[test]
    fn test_burst_below_permits_rejected() {
        let yaml = format!(
            "{}    middleware:\n      rate_limiter:\n        permits_per_period: 10\n        burst_capacity: 5\n",
            MINIMAL
        );
        let message = rejection(&yaml);
        assert!(message.contains("rate_limiter"));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let yaml = format!(
            "{}    middleware:\n      circuit_breaker:\n        failure_rate_threshold: 150\n",
            MINIMAL
        );
        let message = rejection(&yaml);
        assert!(message.contains("failure_rate_threshold"));
    }

    #[test]
    fn test_jwt_route_needs_known_key_set() {
        let yaml = format!(
            "{}    middleware:\n      jwt_auth:\n        key_set: missing\n",
            MINIMAL
        );
        let message = rejection(&yaml);
        assert!(message.contains("unknown key set"));
    }

    #[test]
    fn test_wildcard_only_at_end() {
        let message = rejection(&MINIMAL.replace("path: /api", "path: /a*pi"));
        assert!(message.contains("'*'"));
    }

    #[test]
    fn test_match_rule_syntax_rejected() {
        let yaml = MINIMAL.replace(
            "    service: backend\n",
            "    service: backend\n    matches:\n      - rule: \"Header('X-Tenant')\"\n        service: backend\n",
        );
        let message = rejection(&yaml);
        assert!(message.contains("match"));
        assert!(message.contains("offset"));
    }

    #[test]
    fn test_basic_auth_roles_loaded() {
        let yaml = format!(
            "{}    middleware:\n      basic_auth:\n        roles: [admin]\nauth:\n  users:\n    - username: ops\n      password: secret\n      role: admin\n",
            MINIMAL
        );
        let config = crate::assert_ok!(Config::from_yaml_str(&yaml)).gateway;
        let basic = config.routes[0].middleware.basic_auth.as_ref().unwrap();
        assert!(basic.enabled);
        assert_eq!(basic.roles, vec!["admin"]);
    }

    #[test]
    fn test_mirror_percentage_bounded() {
        let yaml = format!(
            "{}    middleware:\n      mirroring:\n        service: backend\n        percentage: 120\n",
            MINIMAL
        );
        let message = rejection(&yaml);
        assert!(message.contains("mirroring"));
    }
}
