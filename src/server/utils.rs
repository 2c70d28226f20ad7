//! Conversions between actix-web and pipeline messages

use crate::core::types::{GatewayRequest, GatewayResponse};
use crate::server::server::HttpServer;
use crate::utils::error::{GatewayError, Result};
use actix_web::http::StatusCode as ActixStatus;
use actix_web::http::header::{HeaderName as ActixHeaderName, HeaderValue as ActixHeaderValue};
use actix_web::{HttpRequest, HttpResponse};
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// Convert an inbound actix request into a pipeline request
pub(crate) fn to_gateway_request(req: &HttpRequest, body: Bytes) -> Result<GatewayRequest> {
    let method = Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|_| GatewayError::bad_request(format!("Unsupported method {}", req.method())))?;

    let mut headers = HeaderMap::with_capacity(req.headers().len());
    for (name, value) in req.headers() {
        // actix has already validated these, so a failure means a foreign byte
        // sequence the backend could not have used anyway
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    let query = req.query_string();
    Ok(GatewayRequest {
        method,
        path: req.path().to_string(),
        query: (!query.is_empty()).then(|| query.to_string()),
        headers,
        body,
        client_addr: req.peer_addr().map(|addr| addr.ip().to_string()),
    })
}

/// Write a pipeline response back through actix
pub(crate) fn to_http_response(response: GatewayResponse) -> HttpResponse {
    let status = ActixStatus::from_u16(response.status.as_u16())
        .unwrap_or(ActixStatus::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);

    for (name, value) in &response.headers {
        match (
            ActixHeaderName::from_bytes(name.as_str().as_bytes()),
            ActixHeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                builder.append_header((name, value));
            }
            _ => warn!(header = %name, "Dropping response header that cannot be relayed"),
        }
    }

    builder.body(response.body)
}

impl HttpServer {
    /// Describe a bind failure in terms an operator can act on
    pub(crate) fn format_bind_error(error: std::io::Error, bind_addr: &str) -> GatewayError {
        if error.kind() == std::io::ErrorKind::AddrInUse {
            return GatewayError::config(format!(
                "Address {} is already in use; change server.port or stop the other process",
                bind_addr
            ));
        }
        GatewayError::internal(format!("Failed to bind {}: {}", bind_addr, error))
    }
}
