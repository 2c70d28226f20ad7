//! # waypost
//!
//! A configurable HTTP reverse proxy and API gateway.
//!
//! Requests are matched to routes by path. Each route forwards to one backend
//! service and may run a chain of policies in front of it:
//!
//! - **JWT authentication** against named JWKS key sets
//! - **Forward authentication** through an external auth service
//! - **Rate limiting** with fixed per-route windows
//! - **Circuit breaking** on failure and slow-call rates
//! - **Response caching** with single-flight fills, in memory or in Redis
//! - **Header rewriting** of requests and responses
//!
//! ## Gateway Mode
//!
//! ```rust,no_run
//! use waypost::{Config, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/gateway.yaml").await?;
//!     let gateway = Gateway::new(config).await?;
//!     gateway.run().await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod server;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::pipeline::{Pipeline, RouteStatus};
pub use core::types::{GatewayRequest, GatewayResponse};
pub use utils::error::{GatewayError, Result};

use std::sync::Arc;
use tracing::info;

/// A gateway instance: the pipeline hosted on an HTTP server
pub struct Gateway {
    config: Config,
    pipeline: Arc<Pipeline>,
    server: server::server::HttpServer,
}

impl Gateway {
    /// Create a new gateway instance
    pub async fn new(config: Config) -> Result<Self> {
        info!("Creating new gateway instance");

        let pipeline = Arc::new(Pipeline::new(&config).await?);
        let server = server::server::HttpServer::with_pipeline(&config, Arc::clone(&pipeline));

        Ok(Self {
            config,
            pipeline,
            server,
        })
    }

    /// Shared handle to the pipeline, e.g. to reload configuration
    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the gateway server
    pub async fn run(self) -> Result<()> {
        info!(
            routes = self.config.routes().len(),
            address = %self.config.server().address(),
            "Starting waypost gateway"
        );
        self.server.start().await
    }
}

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Gateway build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version number
    pub version: &'static str,
    /// Build time, seconds since the Unix epoch
    pub build_time: &'static str,
    /// Git commit hash
    pub git_hash: &'static str,
    /// Rust version
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: option_env!("WAYPOST_BUILD_TIME").unwrap_or("unknown"),
            git_hash: option_env!("WAYPOST_GIT_HASH").unwrap_or("unknown"),
            rust_version: option_env!("WAYPOST_RUST_VERSION").unwrap_or("unknown"),
        }
    }
}

/// Build
pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
