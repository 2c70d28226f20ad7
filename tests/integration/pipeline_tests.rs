//! End-to-end pipeline tests
//!
//! Each test builds a gateway configuration pointing at `wiremock` servers
//! and drives requests through `Pipeline::handle`.

#[cfg(test)]
mod tests {
    use crate::common::{get, header, mount_jwks, pipeline_from_yaml, token_for};
    use reqwest::StatusCode;
    use std::time::Duration;
    use waypost::GatewayRequest;
    use waypost::core::circuit_breaker::CircuitState;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    // ==================== JWT + cache ====================

    #[tokio::test]
    async fn test_user_route_requires_token_then_caches() {
        let idp = MockServer::start().await;
        mount_jwks(&idp, 1).await;

        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/42"))
            .and(header_eq("x-user-id", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":42}"#))
            .expect(1)
            .mount(&backend)
            .await;

        let yaml = format!(
            r#"
auth:
  jwt:
    forward_claims:
      sub: X-User-Id
    key_sets:
      default:
        jwks_uri: "{idp}/.well-known/jwks.json"
        algorithms: [HS256]
services:
  - name: user-service
    url: "{backend}"
routes:
  - path: /user
    service: user-service
    ttl_ms: 60000
    middleware:
      jwt_auth:
        key_set: default
"#,
            idp = idp.uri(),
            backend = backend.uri()
        );
        let pipeline = pipeline_from_yaml(&yaml).await;

        let anonymous = pipeline.handle(get("/user/42")).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

        let bearer = format!("Bearer {}", token_for("alice"));
        let first = pipeline
            .handle(get("/user/42").with_header("Authorization", &bearer))
            .await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(header(&first, "x-gateway-cache"), Some("MISS"));

        let second = pipeline
            .handle(get("/user/42").with_header("Authorization", &bearer))
            .await;
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(header(&second, "x-gateway-cache"), Some("HIT"));
        assert_eq!(&second.body[..], br#"{"id":42}"#);

        backend.verify().await;
        idp.verify().await;
    }

    // ==================== Forward auth ====================

    fn forward_auth_yaml(auth: &MockServer, backend: &MockServer) -> String {
        format!(
            r#"
services:
  - name: auth
    url: "{auth}"
  - name: orders
    url: "{backend}"
routes:
  - path: /orders
    service: orders
    middleware:
      forward_auth:
        service: auth
        path: /verify
        request_headers: "Forward(Authorization)"
        response_headers: "Forward(X-User)"
"#,
            auth = auth.uri(),
            backend = backend.uri()
        )
    }

    #[tokio::test]
    async fn test_forward_auth_denial_is_relayed() {
        let auth = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
            .expect(1)
            .mount(&auth)
            .await;
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&backend)
            .await;

        let pipeline = pipeline_from_yaml(&forward_auth_yaml(&auth, &backend)).await;
        let response = pipeline
            .handle(get("/orders").with_header("Authorization", "Bearer x"))
            .await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(&response.body[..], b"nope");
        backend.verify().await;
    }

    #[tokio::test]
    async fn test_forward_auth_headers_reach_backend() {
        let auth = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/verify"))
            .and(header_eq("authorization", "Bearer x"))
            .and(header_eq("x-forwarded-uri", "/orders/7"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-user", "alice"))
            .expect(1)
            .mount(&auth)
            .await;
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/7"))
            .and(header_eq("x-user", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_string("order"))
            .expect(1)
            .mount(&backend)
            .await;

        let pipeline = pipeline_from_yaml(&forward_auth_yaml(&auth, &backend)).await;
        let response = pipeline
            .handle(get("/orders/7").with_header("Authorization", "Bearer x"))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"order");
    }

    // ==================== Header rules ====================

    #[tokio::test]
    async fn test_request_header_rules() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_eq("x-gateway", "1"))
            .and(|req: &Request| !req.headers.contains_key("authorization"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&backend)
            .await;

        let yaml = format!(
            r#"
services:
  - name: backend
    url: "{}"
routes:
  - path: /
    service: backend
    middleware:
      headers:
        request_headers: "Remove(Authorization);Add(X-Gateway,1)"
"#,
            backend.uri()
        );
        let pipeline = pipeline_from_yaml(&yaml).await;
        let response = pipeline
            .handle(get("/anything").with_header("Authorization", "Bearer secret"))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    // ==================== Rate limiting ====================

    #[tokio::test]
    async fn test_five_per_second_then_resume() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(6)
            .mount(&backend)
            .await;

        let yaml = format!(
            r#"
services:
  - name: backend
    url: "{}"
routes:
  - path: /limited
    service: backend
    middleware:
      rate_limiter:
        refresh_period_ms: 1000
        permits_per_period: 5
        burst_capacity: 5
"#,
            backend.uri()
        );
        let pipeline = pipeline_from_yaml(&yaml).await;

        for i in 0..5 {
            let response = pipeline.handle(get("/limited")).await;
            assert_eq!(response.status, StatusCode::OK, "request {} rejected", i);
        }
        let rejected = pipeline.handle(get("/limited")).await;
        assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header(&rejected, "x-ratelimit-limit"), Some("5"));
        assert_eq!(pipeline.rate_limiter_status("/limited").unwrap(), Some(0));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(pipeline.handle(get("/limited")).await.status, StatusCode::OK);
    }

    // ==================== Circuit breaker ====================

    fn breaker_yaml(backend: &MockServer) -> String {
        format!(
            r#"
services:
  - name: backend
    url: "{}"
routes:
  - path: /flaky
    service: backend
    middleware:
      circuit_breaker:
        failure_rate_threshold: 50
        minimum_calls: 2
        wait_duration_in_open_ms: 200
        permitted_calls_in_half_open: 1
  - path: /stable
    service: backend
    middleware:
      circuit_breaker:
        minimum_calls: 2
"#,
            backend.uri()
        )
    }

    #[tokio::test]
    async fn test_breaker_cycle_closed_open_half_open_closed() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&backend)
            .await;

        let pipeline = pipeline_from_yaml(&breaker_yaml(&backend)).await;

        for _ in 0..2 {
            let response = pipeline.handle(get("/flaky")).await;
            assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(
            pipeline.circuit_breaker_status("/flaky").unwrap(),
            CircuitState::Open
        );

        let rejected = pipeline.handle(get("/flaky")).await;
        assert_eq!(rejected.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(header(&rejected, "retry-after"), Some("1"));

        tokio::time::sleep(Duration::from_millis(250)).await;
        let trial = pipeline.handle(get("/flaky")).await;
        assert_eq!(trial.status, StatusCode::OK);
        assert_eq!(
            pipeline.circuit_breaker_status("/flaky").unwrap(),
            CircuitState::Closed
        );

        backend.verify().await;
    }

    #[tokio::test]
    async fn test_open_breaker_does_not_affect_other_routes() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/stable"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&backend)
            .await;

        let pipeline = pipeline_from_yaml(&breaker_yaml(&backend)).await;
        for _ in 0..3 {
            pipeline.handle(get("/flaky")).await;
        }
        assert_eq!(
            pipeline.circuit_breaker_status("/flaky").unwrap(),
            CircuitState::Open
        );

        assert_eq!(pipeline.handle(get("/stable")).await.status, StatusCode::OK);
        assert_eq!(
            pipeline.circuit_breaker_status("/stable").unwrap(),
            CircuitState::Closed
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_502() {
        let yaml = r#"
services:
  - name: backend
    url: "http://127.0.0.1:1"
routes:
  - path: /
    service: backend
"#;
        let pipeline = pipeline_from_yaml(yaml).await;
        let response = pipeline.handle(get("/x")).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(header(&response, "x-gateway-error-type"), Some("upstream"));
    }

    // ==================== Cache ====================

    #[tokio::test]
    async fn test_single_flight_through_public_api() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("expensive")
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&backend)
            .await;

        let yaml = format!(
            r#"
services:
  - name: backend
    url: "{}"
routes:
  - path: /report
    service: backend
    ttl_ms: 60000
"#,
            backend.uri()
        );
        let pipeline = pipeline_from_yaml(&yaml).await;

        let requests = (0..8).map(|_| pipeline.handle(get("/report")));
        for response in futures::future::join_all(requests).await {
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(&response.body[..], b"expensive");
        }
        backend.verify().await;
    }

    #[tokio::test]
    async fn test_vary_headers_split_cache_entries() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&backend)
            .await;

        let yaml = format!(
            r#"
services:
  - name: backend
    url: "{}"
routes:
  - path: /docs
    service: backend
    ttl_ms: 60000
    vary_headers: [Accept-Language]
"#,
            backend.uri()
        );
        let pipeline = pipeline_from_yaml(&yaml).await;

        let english = || GatewayRequest::new(reqwest::Method::GET, "/docs").with_header("Accept-Language", "en");
        let german = || GatewayRequest::new(reqwest::Method::GET, "/docs").with_header("Accept-Language", "de");

        pipeline.handle(english()).await;
        pipeline.handle(german()).await;
        let again = pipeline.handle(english()).await;
        assert_eq!(header(&again, "x-gateway-cache"), Some("HIT"));
        backend.verify().await;
    }

    #[tokio::test]
    async fn test_redis_outage_falls_back_to_memory() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&backend)
            .await;

        let yaml = format!(
            r#"
storage:
  redis:
    enabled: true
    url: "redis://127.0.0.1:1"
    connection_timeout_ms: 200
services:
  - name: backend
    url: "{}"
routes:
  - path: /
    service: backend
    ttl_ms: 60000
"#,
            backend.uri()
        );
        let pipeline = pipeline_from_yaml(&yaml).await;
        assert_eq!(pipeline.cache_backend(), "memory");

        pipeline.handle(get("/x")).await;
        let cached = pipeline.handle(get("/x")).await;
        assert_eq!(header(&cached, "x-gateway-cache"), Some("HIT"));
    }

    // ==================== Rules + idempotency ====================

    #[tokio::test]
    async fn test_tenant_rule_and_idempotent_orders() {
        let primary = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_string("primary"))
            .expect(1)
            .mount(&primary)
            .await;
        let tenant_b = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header_eq("idempotency-key", "order-1"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&tenant_b)
            .await;

        let yaml = format!(
            r#"
services:
  - name: primary
    url: "{primary}"
  - name: tenant-b
    url: "{tenant_b}"
routes:
  - path: /orders
    service: primary
    matches:
      - rule: "Header('X-Tenant', 'b')"
        service: tenant-b
    middleware:
      idempotency:
        ttl_ms: 60000
"#,
            primary = primary.uri(),
            tenant_b = tenant_b.uri()
        );
        let pipeline = pipeline_from_yaml(&yaml).await;

        assert_eq!(pipeline.handle(get("/orders")).await.status, StatusCode::OK);

        let order = || {
            GatewayRequest::new(reqwest::Method::POST, "/orders")
                .with_header("X-Tenant", "b")
                .with_header("Idempotency-Key", "order-1")
                .with_body("{}")
        };
        let first = pipeline.handle(order()).await;
        assert_eq!(first.status, StatusCode::CREATED);
        let replay = pipeline.handle(order()).await;
        assert_eq!(replay.status, StatusCode::CREATED);
        assert_eq!(&replay.body[..], b"created");
        assert_eq!(header(&replay, "x-gateway-idempotent-replay"), Some("true"));
    }
}
