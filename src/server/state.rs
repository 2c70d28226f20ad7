//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::pipeline::Pipeline;
use std::sync::Arc;

/// HTTP server state shared across handlers
///
/// Cloned into every actix worker, so all fields are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Configuration the server was started with
    pub config: Arc<Config>,
    /// Request pipeline; reloads swap its snapshot in place
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: Config, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Get gateway configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
