//! In-memory TTL cache.
//!
//! Single-process stand-in for an external key-value cache. Expiry is lazy:
//! stale entries are dropped when read, and `delete_by_pattern` sweeps
//! whatever it touches.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use wizard_core::repository::{CacheStore, RepoResult};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory implementation of `CacheStore`.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Entry exists but is stale - drop it.
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> RepoResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> RepoResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> RepoResult<()> {
        let mut entries = self.entries.write().await;
        match pattern.strip_suffix('*') {
            Some(prefix) => entries.retain(|key, _| !key.starts_with(prefix)),
            None => {
                entries.remove(pattern);
            }
        }
        Ok(())
    }
}
