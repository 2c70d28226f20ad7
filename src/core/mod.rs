//! Core functionality for the Gateway
//!
//! Policies (auth, rate limiting, circuit breaking, caching, header rewriting)
//! and the pipeline that chains them in front of backend services. Nothing in
//! here depends on the hosting web framework.

pub mod basic_auth;
pub mod cache;
pub mod circuit_breaker;
pub mod forward_auth;
pub mod headers;
pub mod jwt;
pub mod pipeline;
pub mod rate_limiter;
pub mod router;
pub mod rules;
pub mod types;
