//! Bearer token verification

use super::jwks::JwksCache;
use super::types::{Claims, KeySetSettings};
use crate::config::JwtConfig;
use crate::utils::error::{GatewayError, Result};
use jsonwebtoken::jwk::KeyAlgorithm;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Validates tokens against the configured JWKS key sets
#[derive(Debug)]
pub struct JwtVerifier {
    config: JwtConfig,
    header_name: HeaderName,
    forward_claims: Vec<(String, HeaderName)>,
    jwks: JwksCache,
}

impl JwtVerifier {
    /// Create a verifier; keys are fetched lazily on first use
    pub fn new(config: &JwtConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()?;
        Self::with_client(config, client)
    }

    pub fn with_client(config: &JwtConfig, client: reqwest::Client) -> Result<Self> {
        let header_name = HeaderName::from_bytes(config.header_name.as_bytes())
            .map_err(|e| GatewayError::config(format!("Invalid JWT header name: {}", e)))?;

        let mut forward_claims = Vec::with_capacity(config.forward_claims.len());
        for (claim, header) in &config.forward_claims {
            let header = HeaderName::from_bytes(header.as_bytes()).map_err(|e| {
                GatewayError::config(format!("Invalid forward header for claim '{}': {}", claim, e))
            })?;
            forward_claims.push((claim.clone(), header));
        }

        let key_sets = config
            .key_sets
            .iter()
            .map(|(name, key_set)| KeySetSettings::from_config(name, key_set));

        Ok(Self {
            config: config.clone(),
            header_name,
            forward_claims,
            jwks: JwksCache::new(client, key_sets),
        })
    }

    pub fn jwks(&self) -> &JwksCache {
        &self.jwks
    }

    /// Pull the token out of the configured header
    pub fn extract_token<'a>(&self, headers: &'a HeaderMap) -> Result<&'a str> {
        let value = headers
            .get(&self.header_name)
            .ok_or_else(|| GatewayError::auth("Missing bearer token"))?
            .to_str()
            .map_err(|_| GatewayError::auth("Malformed authorization header"))?
            .trim();

        let prefix = self.config.token_prefix.as_str();
        let token = if prefix.is_empty() {
            value
        } else if value.len() >= prefix.len()
            && value.is_char_boundary(prefix.len())
            && value[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            value[prefix.len()..].trim_start()
        } else {
            return Err(GatewayError::auth("Unsupported authorization scheme"));
        };

        if token.is_empty() {
            return Err(GatewayError::auth("Missing bearer token"));
        }
        Ok(token)
    }

    /// Verify a token against a key set and return its claims
    pub async fn verify(&self, key_set: &str, token: &str) -> Result<Claims> {
        let header = decode_header(token)?;

        let allowed = self.jwks.algorithms(key_set)?;
        if !allowed.contains(&header.alg) {
            return Err(GatewayError::auth(format!(
                "Algorithm {:?} is not accepted",
                header.alg
            )));
        }

        let jwk = self.jwks.find_key(key_set, header.kid.as_deref()).await?;
        if let Some(key_alg) = &jwk.common.key_algorithm {
            if signing_algorithm(key_alg) != Some(header.alg) {
                return Err(GatewayError::auth("Token algorithm does not match signing key"));
            }
        }
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.config.leeway_secs;
        validation.validate_nbf = true;
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }
        if self.config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.config.audience[..]);
        }

        let claims = decode::<Claims>(token, &key, &validation)?.claims;
        self.check_required_claims(&claims)?;

        debug!(key_set, sub = ?claims.get("sub"), "Token verified");
        Ok(claims)
    }

    fn check_required_claims(&self, claims: &Claims) -> Result<()> {
        for (name, expected) in &self.config.required_claims {
            let satisfied = match claims.get(name) {
                Some(actual) if actual == expected => true,
                Some(Value::Array(values)) => values.contains(expected),
                _ => false,
            };
            if !satisfied {
                return Err(GatewayError::auth(format!("Claim '{}' is not acceptable", name)));
            }
        }
        Ok(())
    }

    /// Extract, verify and forward the configured claims as request headers
    ///
    /// Inbound headers with the same names are replaced so clients cannot
    /// spoof them.
    pub async fn authenticate(&self, key_set: &str, headers: &mut HeaderMap) -> Result<Claims> {
        let token = self.extract_token(headers)?.to_string();
        let claims = self.verify(key_set, &token).await?;

        for (claim, header) in &self.forward_claims {
            headers.remove(header);
            let value = match claims.get(claim) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => continue,
                Some(other) => other.to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(header.clone(), value);
            }
        }
        Ok(claims)
    }
}

/// Signature algorithm a JWK is pinned to; encryption algorithms have none
fn signing_algorithm(key_alg: &KeyAlgorithm) -> Option<Algorithm> {
    match key_alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        KeyAlgorithm::RSA1_5 | KeyAlgorithm::RSA_OAEP | KeyAlgorithm::RSA_OAEP_256 => None,
    }
}
