//! Test suite for waypost
//!
//! ## Test Categories
//!
//! ### 1. Common Utilities (`common/`)
//! Shared helpers: JWT signing, JWKS documents, pipeline construction from
//! YAML, and assertion macros.
//!
//! ### 2. Integration Tests (`integration/`)
//! End-to-end behaviour of the pipeline against `wiremock` backends, and
//! configuration loading and validation.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run everything
//! cargo test --all-features
//!
//! # Run only unit tests
//! cargo test --lib --all-features
//!
//! # Run integration tests
//! cargo test --test lib --all-features
//! ```

pub mod common;
pub mod integration;
