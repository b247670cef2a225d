//! SQLite implementation of CatalogRepository.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;

use wizard_core::domain::{CatalogEntry, CatalogSource, LaunchTemplate};
use wizard_core::repository::{CatalogQuery, CatalogRepository, RepoResult};

use crate::Database;

/// SQLite-backed implementation of CatalogRepository.
pub struct SqliteCatalogRepository {
    db: Arc<Mutex<Database>>,
}

impl SqliteCatalogRepository {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Parse a datetime string to DateTime<Utc>.
    fn parse_datetime(s: &str) -> DateTime<Utc> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return dt.with_timezone(&Utc);
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return dt.and_utc();
        }
        Utc::now()
    }

    fn parse_json<T: serde::de::DeserializeOwned + Default>(s: Option<String>) -> T {
        s.and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    fn to_json<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    }

    fn parse_source(s: &str) -> CatalogSource {
        match s {
            "repository" => CatalogSource::Repository,
            "registry" => CatalogSource::Registry,
            _ => CatalogSource::Manual,
        }
    }

    /// Standard column list for SELECT queries
    const SELECT_COLUMNS: &'static str =
        "id, name, description, version, author, license, tags, readme, tools, resources,
         prompts, launch, required_params, optional_params, source, source_url, package_name,
         popularity, verified, created_at, updated_at, last_researched_at";

    /// Map a row to CatalogEntry
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<CatalogEntry> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let description: String = row.get(2)?;
        let version: String = row.get(3)?;
        let author: String = row.get(4)?;
        let license: String = row.get(5)?;
        let tags: Option<String> = row.get(6)?;
        let readme: String = row.get(7)?;
        let tools: Option<String> = row.get(8)?;
        let resources: Option<String> = row.get(9)?;
        let prompts: Option<String> = row.get(10)?;
        let launch: Option<String> = row.get(11)?;
        let required_params: Option<String> = row.get(12)?;
        let optional_params: Option<String> = row.get(13)?;
        let source: String = row.get(14)?;
        let source_url: String = row.get(15)?;
        let package_name: Option<String> = row.get(16)?;
        let popularity: i64 = row.get(17)?;
        let verified: bool = row.get(18)?;
        let created_at: String = row.get(19)?;
        let updated_at: String = row.get(20)?;
        let last_researched_at: String = row.get(21)?;

        Ok(CatalogEntry {
            id,
            name,
            description,
            version,
            author,
            license,
            tags: Self::parse_json(tags),
            readme,
            tools: Self::parse_json(tools),
            resources: Self::parse_json(resources),
            prompts: Self::parse_json(prompts),
            launch: Self::parse_json::<Option<LaunchTemplate>>(launch).unwrap_or_default(),
            required_params: Self::parse_json(required_params),
            optional_params: Self::parse_json(optional_params),
            source: Self::parse_source(&source),
            source_url,
            package_name,
            popularity: popularity.max(0) as u64,
            verified,
            created_at: Self::parse_datetime(&created_at),
            updated_at: Self::parse_datetime(&updated_at),
            last_researched_at: Self::parse_datetime(&last_researched_at),
        })
    }

    /// Build the WHERE clause and parameter list for a filter.
    fn filter_sql(query: &CatalogQuery) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(source) = query.source {
            clauses.push("source = ?".to_string());
            params.push(source.as_str().to_string());
        }
        if let Some(ref search) = query.search {
            clauses.push("(name LIKE ? OR description LIKE ? OR tags LIKE ?)".to_string());
            let pattern = format!("%{}%", search);
            params.push(pattern.clone());
            params.push(pattern.clone());
            params.push(pattern);
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        (sql, params)
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn upsert(&self, entry: &CatalogEntry) -> RepoResult<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        // Later entries with the same identity overwrite content fields;
        // created_at and verified are owned by the store.
        conn.execute(
            "INSERT INTO catalog_entries (
                id, name, description, version, author, license, tags, readme,
                tools, resources, prompts, launch, required_params, optional_params,
                source, source_url, package_name, popularity, verified,
                created_at, updated_at, last_researched_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                version = excluded.version,
                author = excluded.author,
                license = excluded.license,
                tags = excluded.tags,
                readme = excluded.readme,
                tools = excluded.tools,
                resources = excluded.resources,
                prompts = excluded.prompts,
                launch = excluded.launch,
                required_params = excluded.required_params,
                optional_params = excluded.optional_params,
                source = excluded.source,
                source_url = excluded.source_url,
                package_name = excluded.package_name,
                popularity = excluded.popularity,
                updated_at = excluded.updated_at,
                last_researched_at = excluded.last_researched_at",
            params![
                entry.id,
                entry.name,
                entry.description,
                entry.version,
                entry.author,
                entry.license,
                Self::to_json(&entry.tags),
                entry.readme,
                Self::to_json(&entry.tools),
                Self::to_json(&entry.resources),
                Self::to_json(&entry.prompts),
                Self::to_json(&entry.launch),
                Self::to_json(&entry.required_params),
                Self::to_json(&entry.optional_params),
                entry.source.as_str(),
                entry.source_url,
                entry.package_name,
                entry.popularity as i64,
                entry.verified,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
                entry.last_researched_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<CatalogEntry>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let entry = conn
            .query_row(
                &format!(
                    "SELECT {} FROM catalog_entries WHERE id = ?1",
                    Self::SELECT_COLUMNS
                ),
                [id],
                Self::map_row,
            )
            .optional()?;

        Ok(entry)
    }

    async fn list(&self, query: &CatalogQuery) -> RepoResult<Vec<CatalogEntry>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let (filter, params) = Self::filter_sql(query);
        let mut sql = format!(
            "SELECT {} FROM catalog_entries{} ORDER BY popularity DESC",
            Self::SELECT_COLUMNS,
            filter
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = query.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(rusqlite::params_from_iter(params), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    async fn count(&self, query: &CatalogQuery) -> RepoResult<u64> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let (filter, params) = Self::filter_sql(query);
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM catalog_entries{}", filter),
            rusqlite::params_from_iter(params),
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        conn.execute("DELETE FROM catalog_entries WHERE id = ?1", [id])?;
        Ok(())
    }
}
