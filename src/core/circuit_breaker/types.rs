//! Circuit breaker types

use crate::config::CircuitBreakerConfig;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through and outcomes are recorded
    Closed,
    /// Calls are rejected without reaching the backend
    Open,
    /// A limited number of trial calls are let through
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(label)
    }
}

/// Runtime settings of a per-route breaker
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerSpec {
    /// Failure percentage above which the circuit opens
    pub failure_rate_threshold: f64,
    /// Slow-call percentage above which the circuit opens
    pub slow_call_rate_threshold: f64,
    /// Calls taking longer than this are slow
    pub slow_call_duration: Duration,
    /// How long an open circuit is reported as open when no call arrives
    pub open_state_duration: Duration,
    /// Time spent open before trial calls are admitted
    pub wait_duration_in_open: Duration,
    pub permitted_calls_in_half_open: u32,
    pub minimum_calls: u32,
    /// Number of outcomes kept; at least `minimum_calls`
    pub window_size: u32,
}

impl From<&CircuitBreakerConfig> for CircuitBreakerSpec {
    fn from(config: &CircuitBreakerConfig) -> Self {
        let minimum_calls = config.minimum_calls.max(1);
        Self {
            failure_rate_threshold: config.failure_rate_threshold,
            slow_call_rate_threshold: config.slow_call_rate_threshold,
            slow_call_duration: Duration::from_millis(config.slow_call_duration_ms),
            open_state_duration: Duration::from_secs(config.open_state_duration_secs),
            wait_duration_in_open: Duration::from_millis(config.wait_duration_in_open_ms),
            permitted_calls_in_half_open: config.permitted_calls_in_half_open.max(1),
            minimum_calls,
            window_size: config
                .sliding_window_size
                .unwrap_or(minimum_calls)
                .max(minimum_calls),
        }
    }
}

impl CircuitBreakerSpec {
    /// `Retry-After` seconds sent with rejections
    pub fn retry_after_secs(&self) -> u64 {
        (self.wait_duration_in_open.as_millis().div_ceil(1000) as u64).max(1)
    }
}

/// Outcome of one backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOutcome {
    pub failed: bool,
    pub slow: bool,
}

/// The breaker refused the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallNotPermitted {
    pub state: CircuitState,
    pub retry_after_secs: u64,
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub slow_calls: usize,
    pub failure_rate: f64,
    pub slow_call_rate: f64,
}
