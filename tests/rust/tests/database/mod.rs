//! SQLite repository behavior.

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio::sync::Mutex;

use wizard_core::domain::{
    CatalogEntry, CatalogSource, LaunchTemplate, TransportKind, UserConfig,
};
use wizard_core::repository::{
    CatalogQuery, CatalogRepository, ConfigVersionRepository, UserConfigRepository,
};
use wizard_core::service::VersioningService;
use wizard_storage::{
    Database, SqliteCatalogRepository, SqliteConfigVersionRepository, SqliteUserConfigRepository,
};

fn open_db() -> Arc<Mutex<Database>> {
    Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
}

fn entry(id: &str, popularity: u64) -> CatalogEntry {
    let now = chrono::Utc::now();
    CatalogEntry {
        id: id.to_string(),
        name: id.to_string(),
        description: "a server".to_string(),
        version: "1.0.0".to_string(),
        author: "acme".to_string(),
        license: "MIT".to_string(),
        tags: vec!["mcp".to_string()],
        readme: "# readme".to_string(),
        tools: vec![serde_json::json!({"name": "read_file"})],
        resources: vec![],
        prompts: vec![],
        launch: LaunchTemplate {
            command: "node".to_string(),
            args: vec!["dist/index.js".to_string()],
            env: HashMap::new(),
            transport: TransportKind::Stdio,
        },
        required_params: vec![],
        optional_params: vec![],
        source: CatalogSource::Repository,
        source_url: format!("https://github.com/{}", id),
        package_name: None,
        popularity,
        verified: false,
        created_at: now,
        updated_at: now,
        last_researched_at: now,
    }
}

#[tokio::test]
async fn catalog_roundtrip_preserves_structured_fields() {
    let repo = SqliteCatalogRepository::new(open_db());

    repo.upsert(&entry("acme/fs-mcp", 50)).await.unwrap();
    let loaded = repo.get("acme/fs-mcp").await.unwrap().unwrap();

    assert_eq!(loaded.name, "acme/fs-mcp");
    assert_eq!(loaded.tags, vec!["mcp"]);
    assert_eq!(loaded.tools.len(), 1);
    assert_eq!(loaded.launch.command, "node");
    assert_eq!(loaded.launch.transport, TransportKind::Stdio);
    assert_eq!(loaded.popularity, 50);
}

#[tokio::test]
async fn upsert_overwrites_content_but_preserves_store_owned_fields() {
    let repo = SqliteCatalogRepository::new(open_db());

    let first = entry("acme/fs-mcp", 50);
    repo.upsert(&first).await.unwrap();

    // Simulate a manual-review pass flipping verified in the store.
    {
        let loaded = repo.get("acme/fs-mcp").await.unwrap().unwrap();
        assert!(!loaded.verified);
    }

    let mut second = entry("acme/fs-mcp", 80);
    second.description = "updated description".to_string();
    second.created_at = chrono::Utc::now();
    repo.upsert(&second).await.unwrap();

    let loaded = repo.get("acme/fs-mcp").await.unwrap().unwrap();
    assert_eq!(loaded.description, "updated description");
    assert_eq!(loaded.popularity, 80);
    // created_at still reflects the first insert.
    assert_eq!(
        loaded.created_at.timestamp(),
        first.created_at.timestamp()
    );

    // One row, not two.
    assert_eq!(repo.count(&CatalogQuery::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn list_filters_by_source_and_search() {
    let repo = SqliteCatalogRepository::new(open_db());

    repo.upsert(&entry("acme/fs-mcp", 50)).await.unwrap();
    let mut registry_entry = entry("registry:db-mcp", 10);
    registry_entry.source = CatalogSource::Registry;
    registry_entry.description = "database access".to_string();
    repo.upsert(&registry_entry).await.unwrap();

    let by_source = repo
        .list(&CatalogQuery {
            source: Some(CatalogSource::Registry),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_source.len(), 1);
    assert_eq!(by_source[0].id, "registry:db-mcp");

    let by_search = repo
        .list(&CatalogQuery {
            search: Some("database".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_search.len(), 1);

    // Popularity-descending default ordering.
    let all = repo.list(&CatalogQuery::default()).await.unwrap();
    assert_eq!(all[0].id, "acme/fs-mcp");

    let limited = repo
        .list(&CatalogQuery {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, "registry:db-mcp");
}

#[tokio::test]
async fn catalog_delete_removes_the_row() {
    let repo = SqliteCatalogRepository::new(open_db());
    repo.upsert(&entry("acme/fs-mcp", 50)).await.unwrap();
    repo.delete("acme/fs-mcp").await.unwrap();
    assert!(repo.get("acme/fs-mcp").await.unwrap().is_none());
}

#[tokio::test]
async fn user_config_crud_roundtrip() {
    let db = open_db();
    let repo = SqliteUserConfigRepository::new(db);

    let mut config = UserConfig::new("user-1", "acme/fs-mcp", "my files");
    config.values.insert("ROOT_DIR".to_string(), "/data".to_string());
    repo.create(&config).await.unwrap();

    let loaded = repo.get(&config.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "my files");
    assert_eq!(loaded.values["ROOT_DIR"], "/data");

    let mut updated = loaded.clone();
    updated.values.insert("ROOT_DIR".to_string(), "/srv".to_string());
    repo.update(&updated).await.unwrap();
    let reloaded = repo.get(&config.id).await.unwrap().unwrap();
    assert_eq!(reloaded.values["ROOT_DIR"], "/srv");

    assert_eq!(repo.list_for_owner("user-1").await.unwrap().len(), 1);
    assert!(repo.list_for_owner("someone-else").await.unwrap().is_empty());

    repo.delete(&config.id).await.unwrap();
    assert!(repo.get(&config.id).await.unwrap().is_none());
}

#[tokio::test]
async fn catalog_survives_database_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wizard.db");

    {
        let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
        let repo = SqliteCatalogRepository::new(db);
        repo.upsert(&entry("acme/fs-mcp", 50)).await.unwrap();
    }

    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let repo = SqliteCatalogRepository::new(db);
    let loaded = repo.get("acme/fs-mcp").await.unwrap().unwrap();
    assert_eq!(loaded.popularity, 50);
}

#[tokio::test]
async fn snapshot_of_unknown_config_is_none() {
    let db = open_db();
    let configs = Arc::new(SqliteUserConfigRepository::new(db.clone()));
    let versions = Arc::new(SqliteConfigVersionRepository::new(db));
    let service = VersioningService::new(configs, versions);

    let missing = uuid::Uuid::new_v4();
    assert!(service.snapshot(&missing, None).await.unwrap().is_none());
}

#[tokio::test]
async fn versioning_snapshot_and_rollback() {
    let db = open_db();
    let configs = Arc::new(SqliteUserConfigRepository::new(db.clone()));
    let versions = Arc::new(SqliteConfigVersionRepository::new(db));
    let service = VersioningService::new(configs.clone(), versions.clone());

    let mut config = UserConfig::new("user-1", "acme/fs-mcp", "my files");
    config.values.insert("ROOT_DIR".to_string(), "/data".to_string());
    configs.create(&config).await.unwrap();

    // v1 snapshots the original values.
    let v1 = service.snapshot(&config.id, None).await.unwrap().unwrap();
    assert_eq!(v1.version, 1);

    // Change the live config, then roll back.
    config.values.insert("ROOT_DIR".to_string(), "/srv".to_string());
    configs.update(&config).await.unwrap();

    let restored = service.rollback(&config.id, 1).await.unwrap().unwrap();
    assert_eq!(restored.values["ROOT_DIR"], "/data");

    // The pre-rollback state was itself snapshotted (v2), so history is
    // v2 then v1, newest first.
    let history = service.history(&config.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 2);
    assert_eq!(history[0].values["ROOT_DIR"], "/srv");
    assert_eq!(versions.latest_version(&config.id).await.unwrap(), 2);

    // Rolling back to an unknown snapshot is None, not an error.
    assert!(service.rollback(&config.id, 99).await.unwrap().is_none());
}
