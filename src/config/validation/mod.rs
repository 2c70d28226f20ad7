//! Configuration validation
//!
//! The validation is organized into several submodules:
//! - `trait_def`: Core Validate trait definition
//! - `config_validators`: gateway, server, storage, auth and service validators
//! - `route_validators`: route and middleware validators, which need the whole
//!   gateway configuration to resolve service and key set references
//! - `tests`: Test suite for all validators

mod config_validators;
mod route_validators;
mod trait_def;

pub use route_validators::validate_route;
pub use trait_def::Validate;
