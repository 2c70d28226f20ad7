//! JWKS fetching and caching
//!
//! Each key set keeps its last fetched keys behind a read lock. Refreshes are
//! serialized by one global async mutex; a caller that waited on the mutex
//! first checks whether someone else already refreshed, so a burst of tokens
//! with an unknown key id causes a single fetch.

use super::types::{JwksEntry, KeySetSettings};
use crate::utils::error::{GatewayError, Result};
use jsonwebtoken::Algorithm;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct KeySetState {
    settings: KeySetSettings,
    entry: RwLock<Option<JwksEntry>>,
}

impl KeySetState {
    fn snapshot(&self) -> Option<JwksEntry> {
        self.entry.read().clone()
    }
}

/// Cache of the configured JWKS key sets
pub struct JwksCache {
    client: reqwest::Client,
    key_sets: HashMap<String, KeySetState>,
    refresh_lock: Mutex<()>,
    fetches: AtomicU64,
}

impl JwksCache {
    pub fn new(
        client: reqwest::Client,
        key_sets: impl IntoIterator<Item = KeySetSettings>,
    ) -> Self {
        let key_sets = key_sets
            .into_iter()
            .map(|settings| {
                (
                    settings.name.clone(),
                    KeySetState {
                        settings,
                        entry: RwLock::new(None),
                    },
                )
            })
            .collect();
        Self {
            client,
            key_sets,
            refresh_lock: Mutex::new(()),
            fetches: AtomicU64::new(0),
        }
    }

    /// Algorithms accepted for a key set
    pub fn algorithms(&self, key_set: &str) -> Result<&[Algorithm]> {
        Ok(&self.state(key_set)?.settings.algorithms)
    }

    /// Number of JWKS fetches performed so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    fn state(&self, key_set: &str) -> Result<&KeySetState> {
        self.key_sets
            .get(key_set)
            .ok_or_else(|| GatewayError::auth(format!("Unknown key set '{}'", key_set)))
    }

    /// Find the key for `kid`, refreshing the key set when needed
    pub async fn find_key(&self, key_set: &str, kid: Option<&str>) -> Result<Jwk> {
        let state = self.state(key_set)?;
        let ttl = state.settings.ttl;

        let observed = state.snapshot();
        if let Some(entry) = observed.as_ref().filter(|e| e.is_fresh(ttl)) {
            if let Some(key) = select_key(&entry.keys, kid)? {
                return Ok(key.clone());
            }
            debug!(key_set, ?kid, "Key id not in cached key set, refreshing");
        }

        let _guard = self.refresh_lock.lock().await;

        // another request may have refreshed while we waited
        let current = state.snapshot();
        let refreshed_meanwhile = match (&observed, &current) {
            (Some(before), Some(now)) => now.fetched_at != before.fetched_at,
            (None, Some(_)) => true,
            _ => false,
        };
        if refreshed_meanwhile {
            if let Some(entry) = current.as_ref().filter(|e| e.is_fresh(ttl)) {
                return select_key(&entry.keys, kid)?
                    .cloned()
                    .ok_or_else(|| unknown_kid(kid));
            }
        }

        match self.fetch(&state.settings).await {
            Ok(keys) => {
                let entry = JwksEntry::new(keys);
                let key = select_key(&entry.keys, kid)?.cloned();
                *state.entry.write() = Some(entry);
                key.ok_or_else(|| unknown_kid(kid))
            }
            Err(e) => {
                warn!(key_set, "JWKS refresh failed: {}", e);
                match current.filter(|e| e.is_fresh(ttl)) {
                    Some(entry) => select_key(&entry.keys, kid)?
                        .cloned()
                        .ok_or_else(|| unknown_kid(kid)),
                    None => Err(GatewayError::auth("No valid signing keys available")),
                }
            }
        }
    }

    async fn fetch(&self, settings: &KeySetSettings) -> Result<JwkSet> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(key_set = %settings.name, uri = %settings.jwks_uri, "Fetching JWKS");

        let keys: JwkSet = self
            .client
            .get(&settings.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(key_set = %settings.name, keys = keys.keys.len(), "JWKS refreshed");
        Ok(keys)
    }

    /// Drop every cached key
    pub fn clear(&self) {
        for state in self.key_sets.values() {
            *state.entry.write() = None;
        }
    }
}

/// Pick the key a token refers to
///
/// Without a key id the set must contain exactly one key.
fn select_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Result<Option<&'a Jwk>> {
    match kid {
        Some(kid) => Ok(keys.find(kid)),
        None if keys.keys.len() == 1 => Ok(keys.keys.first()),
        None => Err(GatewayError::auth(
            "Token has no key id and the key set holds several keys",
        )),
    }
}

fn unknown_kid(kid: Option<&str>) -> GatewayError {
    GatewayError::auth(format!("Unknown signing key '{}'", kid.unwrap_or_default()))
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("key_sets", &self.key_sets.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
