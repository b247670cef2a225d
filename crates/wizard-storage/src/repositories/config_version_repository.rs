//! SQLite implementation of ConfigVersionRepository.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use wizard_core::domain::ConfigVersion;
use wizard_core::repository::{ConfigVersionRepository, RepoResult};

use crate::Database;

/// SQLite-backed implementation of ConfigVersionRepository.
pub struct SqliteConfigVersionRepository {
    db: Arc<Mutex<Database>>,
}

impl SqliteConfigVersionRepository {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_json_map(s: Option<String>) -> HashMap<String, String> {
        s.and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    const SELECT_COLUMNS: &'static str =
        "id, config_id, version, config_values, secret_refs, note, created_at";

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ConfigVersion> {
        let id: String = row.get(0)?;
        let config_id: String = row.get(1)?;
        let version: i64 = row.get(2)?;
        let values: Option<String> = row.get(3)?;
        let secret_refs: Option<String> = row.get(4)?;
        let note: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;

        Ok(ConfigVersion {
            id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
            config_id: Uuid::parse_str(&config_id).unwrap_or_else(|_| Uuid::new_v4()),
            version: version.max(0) as u32,
            values: Self::parse_json_map(values),
            secret_refs: Self::parse_json_map(secret_refs),
            note,
            created_at: Self::parse_datetime(&created_at),
        })
    }
}

#[async_trait]
impl ConfigVersionRepository for SqliteConfigVersionRepository {
    async fn append(&self, version: &ConfigVersion) -> RepoResult<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute(
            "INSERT INTO config_versions
                (id, config_id, version, config_values, secret_refs, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                version.id.to_string(),
                version.config_id.to_string(),
                version.version,
                serde_json::to_string(&version.values).unwrap_or_else(|_| "{}".to_string()),
                serde_json::to_string(&version.secret_refs).unwrap_or_else(|_| "{}".to_string()),
                version.note,
                version.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn list_for_config(&self, config_id: &Uuid) -> RepoResult<Vec<ConfigVersion>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM config_versions WHERE config_id = ?1 ORDER BY version DESC",
            Self::SELECT_COLUMNS
        ))?;

        let versions = stmt
            .query_map([config_id.to_string()], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(versions)
    }

    async fn get(&self, config_id: &Uuid, version: u32) -> RepoResult<Option<ConfigVersion>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let snapshot = conn
            .query_row(
                &format!(
                    "SELECT {} FROM config_versions WHERE config_id = ?1 AND version = ?2",
                    Self::SELECT_COLUMNS
                ),
                params![config_id.to_string(), version],
                Self::map_row,
            )
            .optional()?;

        Ok(snapshot)
    }

    async fn latest_version(&self, config_id: &Uuid) -> RepoResult<u32> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let latest: i64 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM config_versions WHERE config_id = ?1",
            [config_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(latest.max(0) as u32)
    }
}
