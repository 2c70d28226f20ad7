//! Key/value operations used by the response cache

use super::pool::RedisPool;
use crate::utils::error::Result;
use redis::AsyncCommands;

const SCAN_BATCH: usize = 200;

impl RedisPool {
    /// Namespaced key
    pub fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.key_prefix, suffix)
    }

    /// Get a raw value
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    /// Set a value expiring after `ttl_ms` milliseconds
    pub async fn set_px(&self, key: &str, value: Vec<u8>, ttl_ms: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.pset_ex(key, value, ttl_ms.max(1)).await?;
        Ok(())
    }

    /// Delete keys, returning how many existed
    pub async fn delete(&self, keys: Vec<String>) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let removed: usize = conn.del(keys).await?;
        Ok(removed)
    }

    /// Collect every key starting with `prefix` using incremental SCAN
    pub async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

/// Escape Redis glob metacharacters so a literal prefix can be matched
pub(crate) fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
