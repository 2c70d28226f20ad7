//! Core rate limiter implementation
//!
//! Fixed windows are aligned to the limiter's creation time. The window index
//! and the permits used in it are packed into one `AtomicU64` (index in the
//! high half, count in the low half) and updated with compare-and-swap, so a
//! check never takes a lock.

use super::types::{RateLimitResult, RateLimiterSpec};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

const COUNT_MASK: u64 = 0xFFFF_FFFF;

#[inline]
fn pack(window: u64, used: u32) -> u64 {
    ((window & COUNT_MASK) << 32) | u64::from(used)
}

#[inline]
fn unpack(state: u64) -> (u64, u32) {
    (state >> 32, (state & COUNT_MASK) as u32)
}

/// Per-route fixed-window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    settings: RateLimiterSpec,
    epoch: Instant,
    state: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter; the first window starts now
    pub fn new(settings: RateLimiterSpec) -> Self {
        Self {
            settings,
            epoch: Instant::now(),
            state: AtomicU64::new(pack(0, 0)),
        }
    }

    pub fn settings(&self) -> &RateLimiterSpec {
        &self.settings
    }

    /// Index of the current window and the time left in it
    fn window_at(&self, now: Instant) -> (u64, Duration) {
        let period_ms = self.settings.refresh_period.as_millis().max(1);
        let elapsed_ms = now.saturating_duration_since(self.epoch).as_millis();
        let index = (elapsed_ms / period_ms) as u64 & COUNT_MASK;
        let left_ms = period_ms - elapsed_ms % period_ms;
        (index, Duration::from_millis(left_ms as u64))
    }

    /// Take one permit if the current window has any left
    pub fn try_acquire(&self) -> RateLimitResult {
        self.try_acquire_at(Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, now: Instant) -> RateLimitResult {
        let capacity = self.settings.burst_capacity;
        let (window, reset_after) = self.window_at(now);

        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let (stored_window, stored_used) = unpack(current);
            // a new window refills the budget to the burst capacity
            let used = if stored_window == window { stored_used } else { 0 };

            if used >= capacity {
                let retry_after_secs = reset_after.as_millis().div_ceil(1000).max(1) as u64;
                debug!(
                    used,
                    capacity,
                    retry_after_secs,
                    "Rate limit exceeded for current window"
                );
                return RateLimitResult {
                    allowed: false,
                    current_count: used,
                    limit: capacity,
                    remaining: 0,
                    reset_after_ms: reset_after.as_millis() as u64,
                    retry_after_secs: Some(retry_after_secs),
                };
            }

            let next = pack(window, used + 1);
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return RateLimitResult {
                        allowed: true,
                        current_count: used + 1,
                        limit: capacity,
                        remaining: capacity - used - 1,
                        reset_after_ms: reset_after.as_millis() as u64,
                        retry_after_secs: None,
                    };
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Permits left in the current window, without consuming one
    pub fn remaining(&self) -> u32 {
        self.remaining_at(Instant::now())
    }

    pub(crate) fn remaining_at(&self, now: Instant) -> u32 {
        let (window, _) = self.window_at(now);
        let (stored_window, used) = unpack(self.state.load(Ordering::Acquire));
        if stored_window == window {
            self.settings.burst_capacity.saturating_sub(used)
        } else {
            self.settings.burst_capacity
        }
    }

    /// Start over with a full budget in the current window
    pub fn reset(&self) {
        let (window, _) = self.window_at(Instant::now());
        self.state.store(pack(window, 0), Ordering::Release);
    }
}
