//! HTTP message types flowing through the request pipeline
//!
//! The pipeline is independent of the hosting web framework: the server layer
//! converts inbound requests into [`GatewayRequest`] and writes back
//! [`GatewayResponse`].

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};

/// Header stamped on responses that went through the response cache
pub const CACHE_STATUS_HEADER: &str = "x-gateway-cache";
/// Header stamped on responses replayed for a repeated idempotency key
pub const IDEMPOTENCY_REPLAY_HEADER: &str = "x-gateway-idempotent-replay";
/// Header carrying a short description of a gateway-generated error
pub const ERROR_HEADER: &str = "x-gateway-error";
/// Header naming the policy that produced a gateway-generated error
pub const ERROR_TYPE_HEADER: &str = "x-gateway-error-type";
/// Request id header, honoured when supplied by the client
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Connection-scoped headers that must not be forwarded between hops
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Inbound request as seen by the pipeline
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    /// Decoded request path, always starting with `/`
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Peer address of the client, if known
    pub client_addr: Option<String>,
}

impl GatewayRequest {
    /// Create a request with an empty body and no headers
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_addr: None,
        }
    }

    /// Builder-style header insertion; invalid names or values are ignored
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Builder-style body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Path plus query string as it appeared on the request line
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }

    /// Request id supplied by the client, if any
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

/// Response produced by the pipeline
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    /// Create an empty response with the given status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a JSON response
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status);
        response.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response.body = Bytes::from(value.to_string());
        response
    }

    /// Set a header, replacing previous values; invalid values are ignored
    pub fn set_header(&mut self, name: &'static str, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(HeaderName::from_static(name), value);
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Whether a header is connection-scoped and must not cross the proxy
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy a header map, dropping hop-by-hop headers and `Host`
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || name == reqwest::header::HOST {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let req = GatewayRequest::new(Method::GET, "/user/1?b=2&a=1");
        assert_eq!(req.path, "/user/1");
        assert_eq!(req.query.as_deref(), Some("b=2&a=1"));
        assert_eq!(req.path_and_query(), "/user/1?b=2&a=1");
    }

    #[test]
    fn test_forwardable_headers_strips_hop_by_hop() {
        let req = GatewayRequest::new(Method::GET, "/")
            .with_header("Connection", "keep-alive")
            .with_header("Host", "gateway.local")
            .with_header("Transfer-Encoding", "chunked")
            .with_header("X-Trace", "abc");
        let headers = forwardable_headers(&req.headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn test_request_id_ignores_empty() {
        let req = GatewayRequest::new(Method::GET, "/").with_header(REQUEST_ID_HEADER, "");
        assert!(req.request_id().is_none());
        let req = GatewayRequest::new(Method::GET, "/").with_header(REQUEST_ID_HEADER, "r-1");
        assert_eq!(req.request_id(), Some("r-1"));
    }
}
