//! Authentication configuration

use super::*;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// JWT verification settings shared by all routes
    #[serde(default)]
    pub jwt: JwtConfig,
    /// Users known to basic authentication
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// A basic-auth user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    /// Plain text, or `sha256:<hex digest>`
    pub password: String,
    #[serde(default)]
    pub role: String,
}

/// JWT verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Header carrying the token
    #[serde(default = "default_api_key_header")]
    pub header_name: String,
    /// Prefix stripped from the header value
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,
    /// Clock skew tolerated for `exp`/`nbf`
    #[serde(default)]
    pub leeway_secs: u64,
    /// Required `iss` claim
    #[serde(default)]
    pub issuer: Option<String>,
    /// Accepted `aud` values; empty skips the audience check
    #[serde(default)]
    pub audience: Vec<String>,
    /// Claims that must carry exactly the given value
    #[serde(default)]
    pub required_claims: HashMap<String, serde_json::Value>,
    /// Claim name to request header forwarded to the backend
    #[serde(default)]
    pub forward_claims: HashMap<String, String>,
    /// Named JWKS key sets
    #[serde(default)]
    pub key_sets: HashMap<String, KeySetConfig>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            header_name: default_api_key_header(),
            token_prefix: default_token_prefix(),
            leeway_secs: 0,
            issuer: None,
            audience: vec![],
            required_claims: HashMap::new(),
            forward_claims: HashMap::new(),
            key_sets: HashMap::new(),
        }
    }
}

/// A JWKS endpoint and the algorithms accepted for its keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySetConfig {
    pub jwks_uri: String,
    /// Cache lifetime of fetched keys; `-1` keeps them until an unknown kid shows up
    #[serde(default = "default_jwks_ttl_secs")]
    pub jwks_ttl_secs: i64,
    #[serde(default = "default_jwt_algorithms")]
    pub algorithms: Vec<Algorithm>,
}
