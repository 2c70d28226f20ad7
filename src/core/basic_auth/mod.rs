//! HTTP basic authentication against the configured user list

mod authenticator;


pub use authenticator::{BasicAuthPolicy, UserStore};
