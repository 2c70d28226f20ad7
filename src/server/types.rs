//! Server response types

use crate::core::cache::CacheStats;
use crate::core::pipeline::RouteStatus;
use serde::Serialize;

/// Body of the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub cache: CacheReport,
    pub routes: Vec<RouteStatus>,
}

/// Cache section of [`HealthReport`]
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub backend: &'static str,
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}
