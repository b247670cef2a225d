//! Version snapshots and rollback for saved configurations.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{ConfigVersion, UserConfig};
use crate::repository::{ConfigVersionRepository, RepoResult, UserConfigRepository};

/// Snapshot/rollback operations over the version repository.
pub struct VersioningService {
    configs: Arc<dyn UserConfigRepository>,
    versions: Arc<dyn ConfigVersionRepository>,
}

impl VersioningService {
    pub fn new(
        configs: Arc<dyn UserConfigRepository>,
        versions: Arc<dyn ConfigVersionRepository>,
    ) -> Self {
        Self { configs, versions }
    }

    /// Snapshot a configuration's current values as the next version.
    /// Returns `None` when the configuration does not exist.
    pub async fn snapshot(
        &self,
        config_id: &Uuid,
        note: Option<String>,
    ) -> RepoResult<Option<ConfigVersion>> {
        let Some(config) = self.configs.get(config_id).await? else {
            return Ok(None);
        };

        let next = self.versions.latest_version(config_id).await? + 1;
        let version = ConfigVersion {
            id: Uuid::new_v4(),
            config_id: *config_id,
            version: next,
            values: config.values.clone(),
            secret_refs: config.secret_refs.clone(),
            note,
            created_at: chrono::Utc::now(),
        };
        self.versions.append(&version).await?;

        info!("Snapshot v{} of configuration {}", next, config_id);
        Ok(Some(version))
    }

    /// Restore a configuration to a previous snapshot. The pre-rollback
    /// state is snapshotted first so a rollback is itself reversible.
    /// Returns `None` when the configuration or snapshot does not exist.
    pub async fn rollback(
        &self,
        config_id: &Uuid,
        version: u32,
    ) -> RepoResult<Option<UserConfig>> {
        let Some(snapshot) = self.versions.get(config_id, version).await? else {
            return Ok(None);
        };
        let Some(mut config) = self.configs.get(config_id).await? else {
            return Ok(None);
        };

        self.snapshot(config_id, Some(format!("Before rollback to v{}", version)))
            .await?;

        config.values = snapshot.values.clone();
        config.secret_refs = snapshot.secret_refs.clone();
        config.updated_at = chrono::Utc::now();
        self.configs.update(&config).await?;

        info!("Rolled back configuration {} to v{}", config_id, version);
        Ok(Some(config))
    }

    /// All snapshots for a configuration, newest first.
    pub async fn history(&self, config_id: &Uuid) -> RepoResult<Vec<ConfigVersion>> {
        self.versions.list_for_config(config_id).await
    }
}
