//! Request pipeline
//!
//! Resolves each request to its route and runs the route's policy chain in
//! front of the backend call. Runtime state is compiled from configuration
//! into an immutable snapshot that can be swapped atomically.

mod executor;
mod idempotency;
mod mirror;
mod snapshot;
mod stages;
mod upstream;


pub use executor::{FillOutcome, Pipeline, RouteStatus};
pub use idempotency::IdempotencyPolicy;
pub use mirror::{MirrorPolicy, bucket};
pub use snapshot::{RouteChain, RuntimeSnapshot};
pub use stages::{CorsPolicy, Stage};
pub use upstream::{HttpUpstream, Upstream, UpstreamRequest};
#[cfg(test)]
pub use upstream::MockUpstream;
