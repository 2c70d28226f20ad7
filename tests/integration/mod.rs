//! Integration tests for waypost
//!
//! These tests drive the public pipeline API against real HTTP collaborators
//! served by `wiremock`.

pub mod config_tests;
pub mod pipeline_tests;
