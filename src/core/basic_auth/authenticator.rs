//! Credential checks
//!
//! Passwords are stored either as plain text or as `sha256:<hex digest>`.
//! Both forms are compared through their SHA-256 digests.

use crate::config::{BasicAuthConfig, UserConfig};
use crate::utils::error::{GatewayError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const SHA256_PREFIX: &str = "sha256:";

#[derive(Debug)]
struct StoredUser {
    digest: [u8; 32],
    role: String,
}

/// Known users, keyed by name
#[derive(Debug, Default)]
pub struct UserStore {
    users: HashMap<String, StoredUser>,
}

impl UserStore {
    pub fn from_config(users: &[UserConfig]) -> Result<Self> {
        let mut store = HashMap::with_capacity(users.len());
        for user in users {
            let digest = match user.password.strip_prefix(SHA256_PREFIX) {
                Some(hex_digest) => hex::decode(hex_digest)
                    .ok()
                    .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
                    .ok_or_else(|| {
                        GatewayError::config(format!(
                            "User '{}' has an invalid sha256 password digest",
                            user.username
                        ))
                    })?,
                None => sha256(&user.password),
            };
            store.insert(
                user.username.clone(),
                StoredUser {
                    digest,
                    role: user.role.clone(),
                },
            );
        }
        Ok(Self { users: store })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Role of the user if the password is right
    pub fn verify(&self, username: &str, password: &str) -> Option<&str> {
        let user = self.users.get(username)?;
        (user.digest == sha256(password)).then_some(user.role.as_str())
    }
}

fn sha256(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Basic-auth settings of one route
#[derive(Debug, Clone)]
pub struct BasicAuthPolicy {
    users: Arc<UserStore>,
    /// Empty admits any known user
    roles: Vec<String>,
}

impl BasicAuthPolicy {
    pub fn new(users: Arc<UserStore>, config: &BasicAuthConfig) -> Self {
        Self {
            users,
            roles: config.roles.clone(),
        }
    }

    /// Check the `Authorization: Basic` credentials, returning the user name
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<String> {
        let encoded = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.split_once(' ')
                    .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"))
                    .map(|(_, credentials)| credentials.trim())
            })
            .ok_or_else(|| GatewayError::basic_auth("Missing basic credentials"))?;

        let decoded = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| GatewayError::basic_auth("Malformed basic credentials"))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| GatewayError::basic_auth("Malformed basic credentials"))?;

        let role = self
            .users
            .verify(username, password)
            .ok_or_else(|| GatewayError::basic_auth("Invalid username or password"))?;

        if !self.roles.is_empty() && !self.roles.iter().any(|r| r == role) {
            debug!(user = username, role, "Basic auth role not admitted");
            return Err(GatewayError::forbidden(format!(
                "User '{}' may not access this route",
                username
            )));
        }
        Ok(username.to_string())
    }
}
