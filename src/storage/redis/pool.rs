//! Redis connection management
//!
//! One multiplexed connection is shared by every request; cloning it is cheap
//! and commands are pipelined over the same socket.

use crate::config::RedisConfig;
use crate::utils::error::{GatewayError, Result};
use redis::{Client, aio::MultiplexedConnection};
use std::time::Duration;
use tracing::{debug, info};

/// Shared Redis connection
#[derive(Clone)]
pub struct RedisPool {
    pub(crate) connection: MultiplexedConnection,
    pub(crate) key_prefix: String,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisPool {
    /// Connect, giving up after the configured connection timeout
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to Redis at {}", Self::sanitize_url(&config.url));

        let client = Client::open(config.url.as_str())?;
        let timeout = Duration::from_millis(config.connection_timeout_ms.max(1));
        let connection = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                GatewayError::cache(format!(
                    "Redis connection timed out after {}ms",
                    timeout.as_millis()
                ))
            })??;

        let pool = Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        };
        pool.health_check().await?;

        info!("Redis connection established");
        Ok(pool)
    }

    /// Prefix of every key written by this gateway
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Round-trip a PING
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis health check passed");
        Ok(())
    }

    /// Sanitize Redis URL for logging (hide password)
    pub(crate) fn sanitize_url(url: &str) -> String {
        if let Ok(parsed) = url::Url::parse(url) {
            let mut sanitized = parsed.clone();
            if sanitized.password().is_some() {
                let _ = sanitized.set_password(Some("***"));
            }
            sanitized.to_string()
        } else {
            "invalid_url".to_string()
        }
    }
}
