//! MCP Wizard API server binary.
//!
//! Wires the SQLite catalog, in-memory cache, job registry, and provider
//! clients into an `AggregationService` and serves the HTTP API.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wizard_core::service::{
    AggregationService, GithubClient, InMemoryJobRegistry, NpmRegistryClient,
};
use wizard_gateway::{ApiConfig, ApiServer, AppState};
use wizard_storage::{Database, MemoryCache, SqliteCatalogRepository};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = match std::env::var("WIZARD_DATABASE_PATH") {
        Ok(path) => path.into(),
        Err(_) => wizard_storage::default_database_path()
            .context("No data directory available for the database")?,
    };
    info!("Using database at {:?}", db_path);
    let db = Arc::new(Mutex::new(Database::open(&db_path)?));

    let catalog = Arc::new(SqliteCatalogRepository::new(db));
    let cache = Arc::new(MemoryCache::new());
    let jobs = Arc::new(InMemoryJobRegistry::new());

    let token = std::env::var("GITHUB_TOKEN").ok();
    if token.is_none() {
        info!("No GITHUB_TOKEN set; using unauthenticated rate limits");
    }
    let github = Arc::new(GithubClient::new(token));
    let npm = Arc::new(NpmRegistryClient::new());

    let aggregation = Arc::new(AggregationService::new(
        github,
        npm,
        catalog.clone(),
        cache,
        jobs,
    ));

    let config = ApiConfig::from_env();
    let server = ApiServer::new(config, AppState::new(aggregation, catalog));
    server.run().await
}
