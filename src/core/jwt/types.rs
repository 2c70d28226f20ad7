//! JWT verification types

use crate::config::KeySetConfig;
use jsonwebtoken::Algorithm;
use jsonwebtoken::jwk::JwkSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Verified token claims
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Runtime settings of one named key set
#[derive(Debug, Clone)]
pub struct KeySetSettings {
    pub name: String,
    pub jwks_uri: String,
    /// `None` keeps fetched keys until an unknown key id shows up
    pub ttl: Option<Duration>,
    pub algorithms: Vec<Algorithm>,
}

impl KeySetSettings {
    pub fn from_config(name: &str, config: &KeySetConfig) -> Self {
        let ttl = u64::try_from(config.jwks_ttl_secs)
            .ok()
            .map(Duration::from_secs);
        Self {
            name: name.to_string(),
            jwks_uri: config.jwks_uri.clone(),
            ttl,
            algorithms: config.algorithms.clone(),
        }
    }
}

/// Keys fetched from a JWKS endpoint
#[derive(Debug, Clone)]
pub struct JwksEntry {
    pub keys: Arc<JwkSet>,
    pub fetched_at: Instant,
}

impl JwksEntry {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys: Arc::new(keys),
            fetched_at: Instant::now(),
        }
    }

    /// Whether the keys are still within their TTL
    pub fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.fetched_at.elapsed() < ttl,
            None => true,
        }
    }
}
