//! HTTP route handlers

use crate::core::types::GatewayResponse;
use crate::server::state::AppState;
use crate::server::types::{CacheReport, HealthReport};
use crate::server::utils::{to_gateway_request, to_http_response};
use crate::utils::error::GatewayError;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::debug;

/// Render a pipeline response as an actix response
pub fn into_http_response(response: GatewayResponse) -> HttpResponse {
    to_http_response(response)
}

/// Catch-all handler: every non-health request goes through the pipeline
pub async fn proxy(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let request = to_gateway_request(&req, body)?;
    let response = state.pipeline.handle(request).await;
    Ok(into_http_response(response))
}

/// Health check endpoint handler
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    debug!("Health check requested");

    let stats = state.pipeline.cache_stats();
    let report = HealthReport {
        status: "healthy",
        version: crate::VERSION,
        timestamp: chrono::Utc::now(),
        cache: CacheReport {
            backend: state.pipeline.cache_backend(),
            hit_rate: stats.hit_rate(),
            stats,
        },
        routes: state.pipeline.route_statuses(),
    };

    HttpResponse::Ok().json(report)
}
