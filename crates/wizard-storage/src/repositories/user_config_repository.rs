//! SQLite implementation of UserConfigRepository.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use wizard_core::domain::UserConfig;
use wizard_core::repository::{RepoResult, UserConfigRepository};

use crate::Database;

/// SQLite-backed implementation of UserConfigRepository.
pub struct SqliteUserConfigRepository {
    db: Arc<Mutex<Database>>,
}

impl SqliteUserConfigRepository {
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

    fn serialize_json_map(map: &HashMap<String, String>) -> String {
        serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
    }

    const SELECT_COLUMNS: &'static str =
        "id, owner_id, entry_id, name, config_values, secret_refs, created_at, updated_at";

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<UserConfig> {
        let id: String = row.get(0)?;
        let owner_id: String = row.get(1)?;
        let entry_id: String = row.get(2)?;
        let name: String = row.get(3)?;
        let values: Option<String> = row.get(4)?;
        let secret_refs: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        Ok(UserConfig {
            id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
            owner_id,
            entry_id,
            name,
            values: Self::parse_json_map(values),
            secret_refs: Self::parse_json_map(secret_refs),
            created_at: Self::parse_datetime(&created_at),
            updated_at: Self::parse_datetime(&updated_at),
        })
    }
}

#[async_trait]
impl UserConfigRepository for SqliteUserConfigRepository {
    async fn create(&self, config: &UserConfig) -> RepoResult<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute(
            "INSERT INTO user_configs
                (id, owner_id, entry_id, name, config_values, secret_refs, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                config.id.to_string(),
                config.owner_id,
                config.entry_id,
                config.name,
                Self::serialize_json_map(&config.values),
                Self::serialize_json_map(&config.secret_refs),
                config.created_at.to_rfc3339(),
                config.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn update(&self, config: &UserConfig) -> RepoResult<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute(
            "UPDATE user_configs SET
                name = ?2, config_values = ?3, secret_refs = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                config.id.to_string(),
                config.name,
                Self::serialize_json_map(&config.values),
                Self::serialize_json_map(&config.secret_refs),
                config.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn get(&self, id: &Uuid) -> RepoResult<Option<UserConfig>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let config = conn
            .query_row(
                &format!(
                    "SELECT {} FROM user_configs WHERE id = ?1",
                    Self::SELECT_COLUMNS
                ),
                [id.to_string()],
                Self::map_row,
            )
            .optional()?;

        Ok(config)
    }

    async fn list_for_owner(&self, owner_id: &str) -> RepoResult<Vec<UserConfig>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM user_configs WHERE owner_id = ?1 ORDER BY created_at DESC",
            Self::SELECT_COLUMNS
        ))?;

        let configs = stmt
            .query_map([owner_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(configs)
    }

    async fn delete(&self, id: &Uuid) -> RepoResult<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        conn.execute(
            "DELETE FROM user_configs WHERE id = ?1",
            [id.to_string()],
        )?;
        Ok(())
    }
}
