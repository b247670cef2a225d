//! Mock repository implementations for testing
//!
//! In-memory implementations of the data-access traits for fast, isolated
//! tests, plus deliberately broken variants for failure-path coverage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use wizard_core::domain::CatalogEntry;
use wizard_core::repository::{CacheStore, CatalogQuery, CatalogRepository, RepoResult};

// ============================================================================
// MockCatalogRepository
// ============================================================================

/// In-memory catalog store that records upsert traffic and can be switched
/// into a failing mode to exercise persistence-tolerance paths.
#[derive(Default)]
pub struct MockCatalogRepository {
    entries: RwLock<HashMap<String, CatalogEntry>>,
    fail_upserts: AtomicBool,
    upsert_count: AtomicUsize,
}

impl MockCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upsert fail.
    pub fn fail_upserts(&self) {
        self.fail_upserts.store(true, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upsert_count.load(Ordering::SeqCst)
    }

    pub fn stored_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl CatalogRepository for MockCatalogRepository {
    async fn upsert(&self, entry: &CatalogEntry) -> RepoResult<()> {
        self.upsert_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            anyhow::bail!("database unavailable");
        }
        self.entries
            .write()
            .unwrap()
            .insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<CatalogEntry>> {
        Ok(self.entries.read().unwrap().get(id).cloned())
    }

    async fn list(&self, query: &CatalogQuery) -> RepoResult<Vec<CatalogEntry>> {
        let mut entries: Vec<CatalogEntry> = self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|e| query.source.map_or(true, |s| e.source == s))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.popularity.cmp(&a.popularity));
        Ok(entries)
    }

    async fn count(&self, query: &CatalogQuery) -> RepoResult<u64> {
        Ok(self.list(query).await?.len() as u64)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.entries.write().unwrap().remove(id);
        Ok(())
    }
}

// ============================================================================
// FailingCache
// ============================================================================

/// Cache whose every operation fails, standing in for an unreachable cache
/// service. `discover()` treats a failing initial read as a top-level setup
/// error.
pub struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> RepoResult<Option<String>> {
        anyhow::bail!("cache connection refused")
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> RepoResult<()> {
        anyhow::bail!("cache connection refused")
    }

    async fn delete(&self, _key: &str) -> RepoResult<()> {
        anyhow::bail!("cache connection refused")
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> RepoResult<()> {
        anyhow::bail!("cache connection refused")
    }
}
