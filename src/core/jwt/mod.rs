//! JWT verification against JWKS key sets

mod jwks;
mod types;
mod verifier;


pub use jwks::JwksCache;
pub use types::{Claims, JwksEntry, KeySetSettings};
pub use verifier::JwtVerifier;
