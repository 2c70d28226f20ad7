//! Server builder and run_server function

use crate::config::Config;
use crate::server::server::HttpServer;
use crate::utils::error::{GatewayError, Result};
use crate::utils::logging::init_logging;
use std::path::Path;
use tracing::{info, warn};

/// Server builder for easier configuration
pub struct ServerBuilder {
    config: Option<Config>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Set configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the HTTP server
    pub async fn build(self) -> Result<HttpServer> {
        let config = self
            .config
            .ok_or_else(|| GatewayError::Config("Configuration is required".to_string()))?;

        HttpServer::new(&config).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration, install logging and serve until shutdown
///
/// A missing file yields the default configuration, which serves only the
/// health endpoint. A file that exists but does not parse or validate is an
/// error.
pub async fn run_server(config_path: &Path) -> Result<()> {
    let found = tokio::fs::try_exists(config_path).await.unwrap_or(false);
    let config = if found {
        Config::from_file(config_path).await?
    } else {
        Config::default()
    };
    init_logging(config.logging())?;

    if !found {
        warn!(
            "Configuration file {} not found, starting with defaults",
            config_path.display()
        );
    }
    info!(
        version = crate::VERSION,
        config = %config_path.display(),
        services = config.services().len(),
        routes = config.routes().len(),
        "Starting waypost gateway"
    );

    let server = ServerBuilder::new().with_config(config).build().await?;
    info!(
        "Health endpoint at http://{}{}",
        server.config().address(),
        server.config().health_path
    );

    server.start().await
}
