//! Tests for error handling

#[cfg(test)]
mod tests {
    use super::super::types::GatewayError;
    use crate::core::types::{ERROR_HEADER, ERROR_TYPE_HEADER};
    use reqwest::StatusCode;

    fn body_json(error: &GatewayError, request_id: Option<&str>) -> serde_json::Value {
        let response = error.to_response(request_id);
        serde_json::from_slice(&response.body).unwrap()
    }

    // ==================== Helper Function Tests ====================

    #[test]
    fn test_auth_helper() {
        let error = GatewayError::auth("Invalid token");
        assert!(matches!(error, GatewayError::Auth(msg) if msg == "Invalid token"));
    }

    #[test]
    fn test_rate_limit_helper() {
        let error = GatewayError::rate_limit("/user", 5, 1);
        assert!(matches!(
            error,
            GatewayError::RateLimit { ref route, limit: 5, retry_after_secs: 1 } if route == "/user"
        ));
    }

    #[test]
    fn test_is_auth_failure() {
        assert!(GatewayError::auth("x").is_auth_failure());
        assert!(!GatewayError::forbidden("x").is_auth_failure());
    }

    // ==================== Status Mapping Tests ====================

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (GatewayError::auth("x"), StatusCode::UNAUTHORIZED),
            (GatewayError::forbidden("x"), StatusCode::FORBIDDEN),
            (GatewayError::not_found("x"), StatusCode::NOT_FOUND),
            (
                GatewayError::method_not_allowed(vec!["GET".into()]),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (GatewayError::rate_limit("r", 1, 1), StatusCode::TOO_MANY_REQUESTS),
            (GatewayError::circuit_open("r", 2), StatusCode::SERVICE_UNAVAILABLE),
            (GatewayError::bad_gateway("x"), StatusCode::BAD_GATEWAY),
            (GatewayError::network("x"), StatusCode::BAD_GATEWAY),
            (GatewayError::timeout("x"), StatusCode::GATEWAY_TIMEOUT),
            (GatewayError::config("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (GatewayError::basic_auth("x"), StatusCode::UNAUTHORIZED),
            (GatewayError::not_acceptable("/r"), StatusCode::NOT_ACCEPTABLE),
            (
                GatewayError::idempotency_key_missing("Idempotency-Key"),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.http_status(), expected, "unexpected status for {error}");
        }
    }

    #[test]
    fn test_error_type_labels() {
        assert_eq!(GatewayError::rate_limit("r", 1, 1).error_type(), "rate_limiter");
        assert_eq!(GatewayError::circuit_open("r", 1).error_type(), "circuit_breaker");
        assert_eq!(GatewayError::auth("x").error_type(), "auth");
        assert_eq!(GatewayError::timeout("x").error_type(), "upstream");
    }

    // ==================== Response Rendering Tests ====================

    #[test]
    fn test_response_body_shape() {
        let json = body_json(&GatewayError::auth("missing token"), Some("req-1"));
        assert_eq!(json["error"]["code"], "AUTH_ERROR");
        assert_eq!(json["error"]["request_id"], "req-1");
        assert!(json["error"]["message"].as_str().unwrap().contains("missing token"));
        assert!(json["error"]["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let json = body_json(&GatewayError::config("secret path /etc/x"), None);
        assert_eq!(json["error"]["message"], "Internal gateway error");
        assert!(json["error"].get("request_id").is_none());
    }

    #[test]
    fn test_circuit_open_sets_retry_after() {
        let response = GatewayError::circuit_open("/user", 3).to_response(None);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers.get("retry-after").unwrap(), "3");
        assert_eq!(
            response.headers.get(ERROR_TYPE_HEADER).unwrap(),
            "circuit_breaker"
        );
        assert!(response.headers.contains_key(ERROR_HEADER));
    }

    #[test]
    fn test_rate_limit_headers() {
        let response = GatewayError::rate_limit("/user", 5, 1).to_response(None);
        assert_eq!(response.headers.get("x-ratelimit-limit").unwrap(), "5");
        assert_eq!(response.headers.get("x-ratelimit-remaining").unwrap(), "0");
        assert_eq!(response.headers.get("retry-after").unwrap(), "1");
    }

    #[test]
    fn test_basic_auth_challenge() {
        let response = GatewayError::basic_auth("bad credentials").to_response(None);
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers.get("www-authenticate").unwrap(),
            "Basic realm=\"waypost\""
        );
        assert!(GatewayError::basic_auth("x").is_auth_failure());
    }

    #[test]
    fn test_rule_rejection_rendering() {
        let response = GatewayError::not_acceptable("/beta").to_response(None);
        assert_eq!(response.status, StatusCode::NOT_ACCEPTABLE);
        assert_eq!(response.headers.get(ERROR_TYPE_HEADER).unwrap(), "rule");
        assert!(
            response
                .headers
                .get(ERROR_HEADER)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("Rule not allowed processing request")
        );
    }

    #[test]
    fn test_missing_idempotency_key_message() {
        let json = body_json(&GatewayError::idempotency_key_missing("Idempotency-Key"), None);
        assert_eq!(json["error"]["code"], "IDEMPOTENCY_KEY_MISSING");
        assert_eq!(json["error"]["message"], "Idempotency-Key header is missing");
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response =
            GatewayError::method_not_allowed(vec!["GET".into(), "POST".into()]).to_response(None);
        assert_eq!(response.headers.get("allow").unwrap(), "GET, POST");
    }
}
