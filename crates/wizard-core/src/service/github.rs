//! HTTP client for the GitHub search and contents APIs.
//!
//! Stateless per call except for rate-limit bookkeeping: every response
//! updates the tracked remaining/reset values from the `x-ratelimit-*`
//! headers so callers can back off before the provider starts rejecting.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::branding;
use crate::error::DiscoveryError;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Documented unauthenticated+authenticated ceiling; used before any call
/// has been made so `is_exhausted` starts false.
const DEFAULT_RATE_LIMIT: i64 = 5000;

/// Per-call timeout for all provider requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Owner of a repository.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoOwner {
    pub login: String,
}

/// Repository metadata as returned by the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub owner: RepoOwner,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    pub default_branch: Option<String>,
    pub license: Option<RepoLicense>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoLicense {
    pub spdx_id: Option<String>,
    pub name: Option<String>,
}

/// One page of repository search results.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSearchPage {
    pub total_count: u64,
    pub items: Vec<Repo>,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}

/// Options for repository search.
#[derive(Debug, Clone, Default)]
pub struct RepoSearchOptions {
    /// e.g. "stars"
    pub sort: Option<String>,
    /// "asc" or "desc"
    pub order: Option<String>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

/// Snapshot of the client-side rate-limit view.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub remaining: i64,
    pub reset_at: Option<DateTime<Utc>>,
    pub is_exhausted: bool,
}

#[derive(Debug)]
struct RateLimitState {
    remaining: i64,
    reset_at: Option<DateTime<Utc>>,
}

/// Client for the repository-search provider.
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    raw_base: String,
    token: Option<String>,
    rate: RwLock<RateLimitState>,
}

impl GithubClient {
    /// Create a client against the real provider endpoints.
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_urls(DEFAULT_API_BASE, DEFAULT_RAW_BASE, token)
    }

    /// Create with custom API and raw-content hosts (used by tests).
    pub fn with_base_urls(api_base: &str, raw_base: &str, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(branding::USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
            token,
            rate: RwLock::new(RateLimitState {
                remaining: DEFAULT_RATE_LIMIT,
                reset_at: None,
            }),
        }
    }

    /// Search repositories. The caller-supplied term is augmented with the
    /// protocol keyword terms before being sent, so callers only supply the
    /// user-facing part of the query.
    pub async fn search_repositories(
        &self,
        query: &str,
        options: &RepoSearchOptions,
    ) -> Result<RepoSearchPage, DiscoveryError> {
        let augmented = augment_query(query);
        let mut url = format!(
            "{}/search/repositories?q={}",
            self.api_base,
            urlencoding::encode(&augmented)
        );
        if let Some(ref sort) = options.sort {
            url.push_str(&format!("&sort={}", sort));
        }
        if let Some(ref order) = options.order {
            url.push_str(&format!("&order={}", order));
        }
        if let Some(per_page) = options.per_page {
            url.push_str(&format!("&per_page={}", per_page));
        }
        if let Some(page) = options.page {
            url.push_str(&format!("&page={}", page));
        }

        debug!("Searching repositories: {}", augmented);
        let response = self.send(&url, &format!("search '{}'", query)).await?;
        parse_json(response, &format!("search '{}'", query)).await
    }

    /// Fetch a single repository's metadata.
    pub async fn get_repository(&self, owner: &str, name: &str) -> Result<Repo, DiscoveryError> {
        let context = format!("{}/{}", owner, name);
        let url = format!("{}/repos/{}/{}", self.api_base, owner, name);
        let response = self.send(&url, &context).await?;
        parse_json(response, &context).await
    }

    /// List files and directories at a path within a repository.
    pub async fn get_directory_listing(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Vec<DirEntry>, DiscoveryError> {
        let context = format!("{}/{} contents/{}", owner, name, path);
        let url = format!("{}/repos/{}/{}/contents/{}", self.api_base, owner, name, path);
        let response = self.send(&url, &context).await?;
        parse_json(response, &context).await
    }

    /// Download a file's raw text content. Tries the primary default branch
    /// name first and falls back once to the conventional secondary name -
    /// exactly two attempts, nothing more.
    pub async fn download_raw_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<String, DiscoveryError> {
        let context = format!("{}/{}:{}", owner, name, path);
        for branch in ["main", "master"] {
            let url = format!("{}/{}/{}/{}/{}", self.raw_base, owner, name, branch, path);
            match self.send(&url, &context).await {
                Ok(response) => {
                    return response
                        .text()
                        .await
                        .map_err(|e| DiscoveryError::fetch(context.as_str(), e));
                }
                Err(e) if e.is_rate_limit() => return Err(e),
                Err(e) => debug!("Raw download via {} failed: {}", branch, e),
            }
        }
        Err(DiscoveryError::fetch(
            context,
            "file not found on main or master branch",
        ))
    }

    /// Current client-side view of the provider rate limit.
    pub async fn rate_limit_status(&self) -> RateLimitStatus {
        let rate = self.rate.read().await;
        RateLimitStatus {
            remaining: rate.remaining,
            reset_at: rate.reset_at,
            is_exhausted: rate.remaining <= 0,
        }
    }

    /// True if the tracked quota still allows a request.
    pub async fn can_make_request(&self) -> bool {
        self.rate.read().await.remaining > 0
    }

    /// Send a GET request, update rate-limit bookkeeping, and map
    /// non-success statuses to the error taxonomy.
    async fn send(&self, url: &str, context: &str) -> Result<reqwest::Response, DiscoveryError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DiscoveryError::fetch(context, e))?;

        let remaining = self.track_rate_limit(&response).await;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN && remaining == Some(0) {
            let reset_at = self.rate.read().await.reset_at.unwrap_or_else(Utc::now);
            return Err(DiscoveryError::RateLimit {
                provider: "github".to_string(),
                reset_at,
            });
        }
        if !status.is_success() {
            return Err(DiscoveryError::fetch(context, format!("HTTP {}", status)));
        }

        Ok(response)
    }

    /// Pull `x-ratelimit-remaining` / `x-ratelimit-reset` out of a response.
    /// Returns the parsed remaining count if the header was present.
    async fn track_rate_limit(&self, response: &reqwest::Response) -> Option<i64> {
        let headers = response.headers();
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());
        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        if remaining.is_some() || reset_at.is_some() {
            let mut rate = self.rate.write().await;
            if let Some(r) = remaining {
                rate.remaining = r;
            }
            if reset_at.is_some() {
                rate.reset_at = reset_at;
            }
        }
        remaining
    }
}

/// Augment a user-facing term with the fixed protocol keyword terms.
fn augment_query(query: &str) -> String {
    let term = query.trim();
    if term.is_empty() {
        format!(
            "{} OR \"{}\"",
            branding::PROTOCOL_ABBREV,
            branding::PROTOCOL_NAME
        )
    } else {
        format!(
            "{} {} OR \"{}\"",
            term,
            branding::PROTOCOL_ABBREV,
            branding::PROTOCOL_NAME
        )
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, DiscoveryError> {
    response
        .json()
        .await
        .map_err(|e| DiscoveryError::fetch(context, format!("malformed response: {}", e)))
}
