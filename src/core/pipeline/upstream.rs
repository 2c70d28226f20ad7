//! Backend dispatch

use crate::core::types::{GatewayResponse, is_hop_by_hop};
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::debug;

/// A request ready to be sent to a backend
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport to backend services
///
/// The pipeline enforces deadlines around `send`, so implementations need
/// not apply their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<GatewayResponse>;
}

/// `reqwest` based transport
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<GatewayResponse> {
        debug!(method = %request.method, url = %request.url, "Dispatching to backend");

        let response = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::timeout(format!("Backend timed out: {}", e))
                } else {
                    GatewayError::network(format!("Backend unreachable: {}", e))
                }
            })?;

        let status = response.status();
        let mut headers = HeaderMap::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            // the server recomputes the length of the relayed body
            if is_hop_by_hop(name) || name == reqwest::header::CONTENT_LENGTH {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::bad_gateway(format!("Failed to read backend body: {}", e)))?;

        Ok(GatewayResponse {
            status,
            headers,
            body,
        })
    }
}
