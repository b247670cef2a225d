//! API Server
//!
//! HTTP server exposing the discovery pipeline and catalog reads.

mod handlers;
pub mod rate_limit;
mod state;

pub use state::AppState;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use rate_limit::{default_discovery_rate_limiter, rate_limit_middleware};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS for browser access
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: wizard_core::branding::DEFAULT_API_PORT,
            enable_cors: true,
        }
    }
}

impl ApiConfig {
    /// Read host/port overrides from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("WIZARD_API_HOST") {
            config.host = host;
        }
        if let Some(port) = std::env::var("WIZARD_API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            config.port = port;
        }
        config
    }

    /// Get the socket address
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))
    }
}

/// Build the API router with all routes and layers.
pub fn router(state: AppState, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/discovery/jobs", post(handlers::submit_discovery))
        .route("/api/discovery/jobs/{job_id}", get(handlers::job_status))
        .route("/api/discovery/analyze", post(handlers::analyze_url))
        .route("/api/discovery/status", get(handlers::provider_status))
        .route("/api/catalog", get(handlers::list_catalog))
        .route("/api/catalog/{*entry_id}", get(handlers::get_catalog_entry))
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(default_discovery_rate_limiter()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// MCP Wizard API server.
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.addr()?;
        let app = router(self.state, self.config.enable_cors);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", addr);
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Serve on a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
