//! Rate limiter types and data structures

use crate::config::RateLimiterConfig;
use std::time::Duration;

/// Runtime settings of a per-route limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterSpec {
    /// Window length
    pub refresh_period: Duration,
    /// Nominal permits per window
    pub permits_per_period: u32,
    /// Permits granted when a new window starts
    pub burst_capacity: u32,
}

impl RateLimiterSpec {
    pub fn new(refresh_period: Duration, permits_per_period: u32, burst_capacity: u32) -> Self {
        Self {
            refresh_period,
            permits_per_period,
            burst_capacity,
        }
    }
}

impl From<&RateLimiterConfig> for RateLimiterSpec {
    fn from(config: &RateLimiterConfig) -> Self {
        Self {
            refresh_period: Duration::from_millis(config.refresh_period_ms.max(1)),
            permits_per_period: config.permits_per_period,
            burst_capacity: config.burst(),
        }
    }
}

/// Rate limit result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Permits consumed in the current window, including this one
    pub current_count: u32,
    /// Permits granted per window
    pub limit: u32,
    /// Remaining permits in the window
    pub remaining: u32,
    /// Time until the window resets (in milliseconds)
    pub reset_after_ms: u64,
    /// Retry after (in seconds, only set when not allowed)
    pub retry_after_secs: Option<u64>,
}
