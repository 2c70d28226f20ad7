//! Per-route circuit breaking
//!
//! Outcomes of backend calls are kept in a count-based sliding window. Once
//! enough calls are buffered and the failure or slow-call percentage exceeds
//! its threshold, the circuit opens and calls are rejected until the wait
//! duration elapses. A limited number of trial calls then decide whether the
//! circuit closes again.

mod breaker;
mod types;


pub use breaker::{CallPermit, CircuitBreaker};
pub use types::{
    CallNotPermitted, CallOutcome, CircuitBreakerMetrics, CircuitBreakerSpec, CircuitState,
};
