//! Tests for server module

#[cfg(test)]
mod tests {
    use crate::config::{Config, GatewayConfig, RouteConfig, ServiceConfig};
    use crate::core::pipeline::Pipeline;
    use crate::core::types::GatewayResponse;
    use crate::server::builder::ServerBuilder;
    use crate::server::handlers::into_http_response;
    use crate::server::server::HttpServer;
    use crate::utils::error::GatewayError;
    use actix_web::{ResponseError, test as actix_test, web};
    use reqwest::StatusCode;
    use reqwest::header::HeaderValue;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn state_for(backend: &str, max_body_size: usize) -> web::Data<crate::server::state::AppState> {
        let mut gateway = GatewayConfig {
            services: vec![ServiceConfig::new("backend", backend)],
            routes: vec![RouteConfig::new("/api", "backend")],
            ..GatewayConfig::default()
        };
        gateway.server.max_body_size = max_body_size;
        let config = Config::from_gateway(gateway).unwrap();
        let pipeline = Arc::new(Pipeline::new(&config).await.unwrap());
        let server = HttpServer::with_pipeline(&config, pipeline);
        web::Data::new(server.state().clone())
    }

    #[actix_web::test]
    async fn test_health_reports_routes_and_cache() {
        let app = actix_test::init_service(HttpServer::create_app(
            state_for("http://127.0.0.1:1", 1024).await,
        ))
        .await;

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.headers().get("server").unwrap(), "waypost");

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], crate::VERSION);
        assert_eq!(body["cache"]["backend"], "memory");
        assert_eq!(body["cache"]["hits"], 0);
        assert_eq!(body["routes"][0]["route"], "/api");
        assert_eq!(body["routes"][0]["service"], "backend");
    }

    #[actix_web::test]
    async fn test_proxy_relays_backend_response() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/items"))
            .and(query_param("page", "2"))
            .and(header("x-trace", "abc"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("x-backend", "yes")
                    .set_body_string("created"),
            )
            .expect(1)
            .mount(&backend)
            .await;

        let app =
            actix_test::init_service(HttpServer::create_app(state_for(&backend.uri(), 1024).await)).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/items?page=2")
            .insert_header(("x-trace", "abc"))
            .set_payload("{}")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 201);
        assert_eq!(resp.headers().get("x-backend").unwrap(), "yes");
        assert!(resp.headers().contains_key("x-request-id"));
        let body = actix_test::read_body(resp).await;
        assert_eq!(&body[..], b"created");
    }

    #[actix_web::test]
    async fn test_unknown_path_returns_json_error() {
        let app = actix_test::init_service(HttpServer::create_app(
            state_for("http://127.0.0.1:1", 1024).await,
        ))
        .await;

        let req = actix_test::TestRequest::get().uri("/nowhere").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);
        assert_eq!(resp.headers().get("x-gateway-error-type").unwrap(), "routing");

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["error"]["request_id"].is_string());
    }

    #[actix_web::test]
    async fn test_oversized_body_rejected() {
        let app = actix_test::init_service(HttpServer::create_app(
            state_for("http://127.0.0.1:1", 8).await,
        ))
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/upload")
            .set_payload(vec![b'x'; 64])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 413);
    }

    #[test]
    fn test_into_http_response_keeps_repeated_headers() {
        let mut response = GatewayResponse::new(StatusCode::ACCEPTED);
        response
            .headers
            .append("set-cookie", HeaderValue::from_static("a=1"));
        response
            .headers
            .append("set-cookie", HeaderValue::from_static("b=2"));
        response.body = bytes::Bytes::from_static(b"ok");

        let http = into_http_response(response);
        assert_eq!(http.status().as_u16(), 202);
        assert_eq!(http.headers().get_all("set-cookie").count(), 2);
    }

    #[test]
    fn test_error_renders_through_actix() {
        let err = GatewayError::circuit_open("/api", 30);
        assert_eq!(err.status_code().as_u16(), 503);
        let resp = err.error_response();
        assert_eq!(resp.headers().get("retry-after").unwrap(), "30");
        assert_eq!(
            resp.headers().get("x-gateway-error-type").unwrap(),
            "circuit_breaker"
        );
    }

    #[tokio::test]
    async fn test_builder_requires_config() {
        let result = ServerBuilder::new().build().await;
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
