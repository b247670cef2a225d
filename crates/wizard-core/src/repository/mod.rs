//! Repository traits for data access
//!
//! These traits define the interface for external collaborators (SQLite,
//! cache, OS keychain) without specifying the implementation, so the core
//! stays testable against in-memory fakes.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::{CatalogEntry, CatalogSource, ConfigVersion, UserConfig};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Filter and pagination for catalog listings.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Restrict to one source kind
    pub source: Option<CatalogSource>,
    /// Case-insensitive substring match against name/description/tags
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Catalog entry repository trait
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert or update by identity key. On update the entry's content
    /// fields are overwritten but `created_at` and `verified` are owned by
    /// the store and preserved.
    async fn upsert(&self, entry: &CatalogEntry) -> RepoResult<()>;

    /// Get an entry by identity key
    async fn get(&self, id: &str) -> RepoResult<Option<CatalogEntry>>;

    /// List entries ordered by popularity descending
    async fn list(&self, query: &CatalogQuery) -> RepoResult<Vec<CatalogEntry>>;

    /// Count entries matching a filter
    async fn count(&self, query: &CatalogQuery) -> RepoResult<u64>;

    /// Delete an entry by identity key
    async fn delete(&self, id: &str) -> RepoResult<()>;
}

/// UserConfig repository trait
#[async_trait]
pub trait UserConfigRepository: Send + Sync {
    async fn create(&self, config: &UserConfig) -> RepoResult<()>;

    async fn update(&self, config: &UserConfig) -> RepoResult<()>;

    async fn get(&self, id: &Uuid) -> RepoResult<Option<UserConfig>>;

    /// List configurations owned by a user
    async fn list_for_owner(&self, owner_id: &str) -> RepoResult<Vec<UserConfig>>;

    async fn delete(&self, id: &Uuid) -> RepoResult<()>;
}

/// ConfigVersion repository trait (append-only snapshots)
#[async_trait]
pub trait ConfigVersionRepository: Send + Sync {
    /// Append a snapshot; `version` must already be assigned
    async fn append(&self, version: &ConfigVersion) -> RepoResult<()>;

    /// All snapshots for a configuration, newest first
    async fn list_for_config(&self, config_id: &Uuid) -> RepoResult<Vec<ConfigVersion>>;

    /// One specific snapshot
    async fn get(&self, config_id: &Uuid, version: u32) -> RepoResult<Option<ConfigVersion>>;

    /// Highest assigned version number, 0 if none
    async fn latest_version(&self, config_id: &Uuid) -> RepoResult<u32>;
}

/// Key-value cache with per-entry TTL.
///
/// Values are JSON strings; callers own (de)serialization. Operations are
/// fallible so an unavailable cache surfaces to the caller rather than
/// silently behaving as a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> RepoResult<()>;

    async fn delete(&self, key: &str) -> RepoResult<()>;

    /// Delete every key matching a `prefix*` pattern
    async fn delete_by_pattern(&self, pattern: &str) -> RepoResult<()>;
}

/// Secret storage keyed by (owner, scope, key).
///
/// `store` returns an opaque reference suitable for embedding in a
/// `UserConfig` in place of the plaintext.
#[async_trait]
pub trait SecretVault: Send + Sync {
    async fn store(
        &self,
        owner_id: &str,
        scope_id: &str,
        key: &str,
        plaintext: &str,
        label: &str,
    ) -> RepoResult<String>;

    /// Plaintext is returned zeroizing so callers do not leave copies behind
    async fn retrieve(
        &self,
        owner_id: &str,
        scope_id: &str,
        key: &str,
    ) -> RepoResult<Option<Zeroizing<String>>>;

    /// Returns true if a secret existed and was removed
    async fn delete(&self, owner_id: &str, scope_id: &str, key: &str) -> RepoResult<bool>;
}
