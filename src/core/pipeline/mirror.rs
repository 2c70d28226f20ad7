//! Traffic mirroring
//!
//! A stable share of clients has its requests copied to a second service.
//! Mirror calls are fire-and-forget: their outcome never reaches the client
//! and never counts toward the route's circuit breaker.

use crate::config::{GatewayConfig, MirroringConfig};
use crate::core::router::Service;
use crate::core::types::GatewayRequest;
use crate::utils::error::{GatewayError, Result};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Header identifying the client for bucketing
const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct MirrorPolicy {
    pub service: Arc<Service>,
    /// 0 to 100
    percentage: u8,
}

impl MirrorPolicy {
    pub fn from_config(config: &MirroringConfig, gateway: &GatewayConfig) -> Result<Self> {
        let service = gateway.service(&config.service).ok_or_else(|| {
            GatewayError::config(format!("Unknown mirror service '{}'", config.service))
        })?;
        let default_timeout = Duration::from_millis(gateway.server.timeout_ms);
        Ok(Self {
            service: Arc::new(Service::from_config(service, default_timeout)?),
            percentage: config.percentage.min(100),
        })
    }

    /// Whether this request's client falls into the mirrored share
    ///
    /// Clients are bucketed by `X-User-ID`, else by peer address. Requests
    /// with neither are bucketed by request id.
    pub fn selects(&self, request: &GatewayRequest) -> bool {
        match self.percentage {
            0 => false,
            100 => true,
            pct => {
                let identity = request
                    .headers
                    .get(USER_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .or(request.client_addr.as_deref())
                    .or(request.request_id())
                    .unwrap_or_default();
                bucket(identity) < u64::from(pct)
            }
        }
    }
}

/// Stable bucket in `0..100`
pub fn bucket(identity: &str) -> u64 {
    let digest = Sha256::digest(identity.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head) % 100
}
