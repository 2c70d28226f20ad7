//! Delegated authentication through an external HTTP service

mod client;


pub use client::{AuthDecision, ForwardAuthClient, ForwardAuthTarget};
