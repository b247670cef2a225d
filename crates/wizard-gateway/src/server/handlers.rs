//! HTTP handlers for the API server.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use wizard_core::domain::CatalogSource;
use wizard_core::repository::CatalogQuery;
use wizard_core::service::DiscoverOptions;
use wizard_core::DiscoveryError;

use super::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    debug!("[Api] Health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Discovery submission body
#[derive(Debug, Deserialize)]
pub struct DiscoveryRequest {
    pub query: Option<String>,
    pub max_results: Option<usize>,
    pub min_popularity: Option<u64>,
    pub include_forks: Option<bool>,
}

impl DiscoveryRequest {
    fn into_options(self) -> DiscoverOptions {
        let defaults = DiscoverOptions::default();
        DiscoverOptions {
            query: self.query,
            max_results: self.max_results.unwrap_or(defaults.max_results),
            min_popularity: self.min_popularity.unwrap_or(defaults.min_popularity),
            include_forks: self.include_forks.unwrap_or(defaults.include_forks),
        }
    }
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Submit an asynchronous discovery job. Returns 202 with the job id;
/// callers poll the job endpoint until a terminal state.
pub async fn submit_discovery(
    State(state): State<AppState>,
    Json(request): Json<DiscoveryRequest>,
) -> impl IntoResponse {
    let job_id = state.aggregation.submit_job(request.into_options()).await;
    (StatusCode::ACCEPTED, Json(SubmitResponse { job_id }))
}

/// Poll a discovery job. 404 once unknown or evicted.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    match state.aggregation.get_job_status(&job_id).await {
        Some(job) => Json(job).into_response(),
        None => not_found("job not found"),
    }
}

/// Single-URL analysis body
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
}

/// Analyze one repository URL synchronously.
pub async fn analyze_url(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    match state.aggregation.analyze_single(&request.url).await {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => not_found("no server detected at this repository"),
        Err(e) => error_response(e),
    }
}

/// Provider availability and rate-limit status.
pub async fn provider_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.aggregation.provider_status().await)
}

/// Catalog listing query string
#[derive(Debug, Deserialize)]
pub struct CatalogListParams {
    pub source: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct CatalogListResponse {
    pub entries: Vec<wizard_core::domain::CatalogEntry>,
    pub total: u64,
}

/// List catalog entries, popularity descending.
pub async fn list_catalog(
    State(state): State<AppState>,
    Query(params): Query<CatalogListParams>,
) -> Response {
    let source = match params.source.as_deref() {
        Some("repository") => Some(CatalogSource::Repository),
        Some("registry") => Some(CatalogSource::Registry),
        Some("manual") => Some(CatalogSource::Manual),
        Some(other) => {
            return bad_request(&format!("unknown source filter: {}", other));
        }
        None => None,
    };

    let query = CatalogQuery {
        source,
        search: params.search,
        limit: params.limit,
        offset: params.offset,
    };

    let total = match state.catalog.count(&query).await {
        Ok(total) => total,
        Err(e) => return internal_error(e),
    };
    match state.catalog.list(&query).await {
        Ok(entries) => Json(CatalogListResponse { entries, total }).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Fetch one catalog entry by identity key. Identity keys contain slashes
/// ("owner/repo"), hence the wildcard path segment.
pub async fn get_catalog_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Response {
    match state.catalog.get(&entry_id).await {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => not_found("catalog entry not found"),
        Err(e) => internal_error(e),
    }
}

/// Map the discovery error taxonomy to HTTP status codes.
fn error_response(error: DiscoveryError) -> Response {
    let status = match &error {
        DiscoveryError::Validation(_) => StatusCode::BAD_REQUEST,
        DiscoveryError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        DiscoveryError::Fetch { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn internal_error(error: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": error.to_string() })),
    )
        .into_response()
}
