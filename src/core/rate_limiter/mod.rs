//! Per-route rate limiting
//!
//! Fixed-window counter with burst capacity. Each route owns one limiter; the
//! limiter is rebuilt (and its budget reset) when configuration is reloaded.

mod limiter;
mod types;


// Re-export public types
pub use limiter::RateLimiter;
pub use types::{RateLimitResult, RateLimiterSpec};
