//! Route resolution
//!
//! Maps an inbound method and path to the configured route and its backend
//! service.

mod matcher;
mod types;


pub use matcher::{RouteMatch, RouteTable};
pub use types::{MethodSet, PathPattern, Route, Service, ServiceMatch, services_from_config};
