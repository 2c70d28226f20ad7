//! Error handling for the Gateway
//!
//! This module defines the crate-wide error type, its helper constructors and
//! its mapping onto HTTP responses.

mod helpers;
mod response;
#[cfg(test)]
mod tests;
mod types;

pub use response::{ErrorDetail, ErrorResponse};
pub use types::{GatewayError, Result};
