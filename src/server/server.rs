//! HTTP server core implementation

use crate::config::{Config, ServerConfig};
use crate::core::pipeline::Pipeline;
use crate::server::handlers::{health_check, proxy};
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};
use actix_web::{
    App, HttpServer as ActixHttpServer,
    middleware::DefaultHeaders,
    web,
};
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

/// HTTP server
pub struct HttpServer {
    /// Server configuration
    config: ServerConfig,
    /// Application state
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server and its pipeline
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Creating HTTP server");
        let pipeline = Arc::new(Pipeline::new(config).await?);
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create a server around an existing pipeline
    pub fn with_pipeline(config: &Config, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config: config.gateway.server.clone(),
            state: AppState::new(config.clone(), pipeline),
        }
    }

    /// Create the Actix-web application
    pub(crate) fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let server = &state.config.gateway.server;
        let health_path = server.health_path.clone();
        let payload = web::PayloadConfig::new(server.max_body_size);

        App::new()
            .app_data(state)
            .app_data(payload)
            .wrap(DefaultHeaders::new().add(("Server", "waypost")))
            .wrap(TracingLogger::default())
            .route(&health_path, web::get().to(health_check))
            .default_service(web::to(proxy))
    }

    /// Start the HTTP server and serve until shutdown
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.address();
        info!("Starting HTTP server on {}", bind_addr);

        let state = web::Data::new(self.state);
        let mut server = ActixHttpServer::new(move || Self::create_app(state.clone()));
        if let Some(workers) = self.config.workers {
            server = server.workers(workers);
        }

        let server = server
            .bind(&bind_addr)
            .map_err(|e| Self::format_bind_error(e, &bind_addr))?
            .run();

        info!("HTTP server listening on {}", bind_addr);

        server
            .await
            .map_err(|e| GatewayError::internal(format!("Server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
