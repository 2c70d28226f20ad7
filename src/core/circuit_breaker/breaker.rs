//! Circuit breaker implementation for backend protection

use super::types::{
    CallNotPermitted, CallOutcome, CircuitBreakerMetrics, CircuitBreakerSpec, CircuitState,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Bumped on every transition; permits from an older generation are stale
    generation: u64,
    transitioned_at: Instant,
    window: VecDeque<CallOutcome>,
    half_open_admitted: u32,
    half_open_successes: u32,
}

impl BreakerInner {
    fn transition(&mut self, to: CircuitState, now: Instant) {
        self.state = to;
        self.generation += 1;
        self.transitioned_at = now;
        self.window.clear();
        self.half_open_admitted = 0;
        self.half_open_successes = 0;
    }

    fn rates(&self) -> (usize, usize, f64, f64) {
        let total = self.window.len();
        let failed = self.window.iter().filter(|o| o.failed).count();
        let slow = self.window.iter().filter(|o| o.slow).count();
        if total == 0 {
            return (0, 0, 0.0, 0.0);
        }
        let pct = |n: usize| n as f64 * 100.0 / total as f64;
        (failed, slow, pct(failed), pct(slow))
    }
}

/// Per-route circuit breaker
///
/// The lock is held only while admitting a call or recording its outcome,
/// never across backend I/O.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: CircuitBreakerSpec,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in the closed state
    pub fn new(name: impl Into<String>, settings: CircuitBreakerSpec) -> Self {
        let capacity = settings.window_size as usize;
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                generation: 0,
                transitioned_at: Instant::now(),
                window: VecDeque::with_capacity(capacity),
                half_open_admitted: 0,
                half_open_successes: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &CircuitBreakerSpec {
        &self.settings
    }

    /// Ask for permission to call the backend
    ///
    /// The returned permit must be used to record the outcome. A permit that
    /// is dropped without recording releases its half-open trial slot.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, CallNotPermitted> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            if now.saturating_duration_since(inner.transitioned_at)
                < self.settings.wait_duration_in_open
            {
                return Err(self.rejection(CircuitState::Open));
            }
            inner.transition(CircuitState::HalfOpen, now);
            info!(breaker = %self.name, "Circuit breaker transitioning from Open to HalfOpen");
        }

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => {
                if inner.half_open_admitted >= self.settings.permitted_calls_in_half_open {
                    return Err(self.rejection(CircuitState::HalfOpen));
                }
                inner.half_open_admitted += 1;
                true
            }
            CircuitState::Open => return Err(self.rejection(CircuitState::Open)),
        };

        Ok(CallPermit {
            breaker: Arc::clone(self),
            generation: inner.generation,
            trial,
            finished: false,
        })
    }

    fn rejection(&self, state: CircuitState) -> CallNotPermitted {
        debug!(breaker = %self.name, %state, "Circuit breaker rejected call");
        CallNotPermitted {
            state,
            retry_after_secs: self.settings.retry_after_secs(),
        }
    }

    fn on_outcome(&self, generation: u64, trial: bool, outcome: CallOutcome) {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if inner.generation != generation {
            // the circuit moved on while this call was in flight
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(outcome);
                while inner.window.len() > self.settings.window_size as usize {
                    inner.window.pop_front();
                }

                if inner.window.len() < self.settings.minimum_calls as usize {
                    return;
                }

                let (_, _, failure_rate, slow_rate) = inner.rates();
                if failure_rate > self.settings.failure_rate_threshold
                    || slow_rate > self.settings.slow_call_rate_threshold
                {
                    warn!(
                        breaker = %self.name,
                        failure_rate,
                        slow_rate,
                        "Circuit breaker opening"
                    );
                    inner.transition(CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen if trial => {
                if outcome.failed || outcome.slow {
                    warn!(breaker = %self.name, "Trial call failed, circuit breaker reopening");
                    inner.transition(CircuitState::Open, now);
                    return;
                }

                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.settings.permitted_calls_in_half_open {
                    info!(breaker = %self.name, "Circuit breaker transitioning from HalfOpen to Closed");
                    inner.transition(CircuitState::Closed, now);
                }
            }
            _ => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.half_open_admitted = inner.half_open_admitted.saturating_sub(1);
        }
    }

    /// Current state as used for admission decisions
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// State for external health reporting
    ///
    /// An open circuit that has been open longer than the configured open
    /// state duration is reported as half-open even before a call arrives.
    /// Reporting never changes the state.
    pub fn status(&self) -> CircuitState {
        let inner = self.inner.lock();
        if inner.state == CircuitState::Open
            && inner.transitioned_at.elapsed() >= self.settings.open_state_duration
        {
            return CircuitState::HalfOpen;
        }
        inner.state
    }

    /// Get current metrics
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        let (failed_calls, slow_calls, failure_rate, slow_call_rate) = inner.rates();
        CircuitBreakerMetrics {
            state: inner.state,
            buffered_calls: inner.window.len(),
            failed_calls,
            slow_calls,
            failure_rate,
            slow_call_rate,
        }
    }

    /// Reset the circuit breaker to closed with an empty window
    pub fn reset(&self) {
        self.inner.lock().transition(CircuitState::Closed, Instant::now());
        debug!(breaker = %self.name, "Circuit breaker reset");
    }
}

/// Permission to perform one backend call
#[derive(Debug)]
#[must_use = "a permit records nothing unless `record` is called"]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    trial: bool,
    finished: bool,
}

impl CallPermit {
    /// Record the call's duration and whether it succeeded
    pub fn record(mut self, elapsed: Duration, success: bool) {
        self.finished = true;
        let outcome = CallOutcome {
            failed: !success,
            slow: elapsed > self.breaker.settings.slow_call_duration,
        };
        self.breaker
            .on_outcome(self.generation, self.trial, outcome);
    }

    /// Whether this permit holds a half-open trial slot
    pub fn is_trial(&self) -> bool {
        self.trial
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.finished && self.trial {
            self.breaker.release(self.generation);
        }
    }
}
