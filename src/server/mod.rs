//! HTTP server implementation
//!
//! Hosts the request pipeline on actix-web: a health endpoint plus a
//! catch-all handler that hands every other request to the pipeline.

pub mod builder;
pub mod handlers;
pub mod server;
pub mod state;
pub mod types;
mod utils;

#[cfg(test)]
mod tests;
