//! Multi-source discovery orchestration and job ownership.
//!
//! Both provider branches run concurrently and settle independently: a
//! failed branch degrades to an empty list, a failed item degrades to a
//! skipped item, and a failed persistence write never fails the discovery
//! that produced it.

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{dedup_tags, CatalogEntry, DiscoveryJob};
use crate::error::DiscoveryError;
use crate::repository::{CacheStore, CatalogRepository};
use crate::service::github::{GithubClient, RateLimitStatus, Repo, RepoSearchOptions};
use crate::service::job_registry::JobRegistry;
use crate::service::npm::{NpmRegistryClient, PackageSearchOptions};
use crate::service::package_analyzer::PackageAnalyzer;
use crate::service::repo_analyzer::RepositoryAnalyzer;

/// Discovery results are memoized for one hour.
const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Single-URL analyses are memoized for six hours.
const ANALYSIS_CACHE_TTL: Duration = Duration::from_secs(6 * 3600);

/// Terminal jobs stay pollable for one hour before eviction.
const JOB_RETENTION: Duration = Duration::from_secs(3600);

/// Provider-side maximum page size for repository search.
const SEARCH_PAGE_CAP: usize = 100;

/// Options for one discovery request.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub query: Option<String>,
    pub max_results: usize,
    pub min_popularity: u64,
    pub include_forks: bool,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            query: None,
            max_results: 50,
            min_popularity: 10,
            include_forks: false,
        }
    }
}

/// Health view over both providers.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub repository_provider: RepositoryProviderStatus,
    pub registry_provider: RegistryProviderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryProviderStatus {
    pub available: bool,
    pub rate_limit: RateLimitStatus,
}

/// The registry provider has no comparable client-visible rate limit.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryProviderStatus {
    pub available: bool,
    pub rate_limit: Option<RateLimitStatus>,
}

/// Orchestrates multi-source discovery and owns the job registry.
#[derive(Clone)]
pub struct AggregationService {
    github: Arc<GithubClient>,
    npm: Arc<NpmRegistryClient>,
    repo_analyzer: Arc<RepositoryAnalyzer>,
    package_analyzer: Arc<PackageAnalyzer>,
    catalog: Arc<dyn CatalogRepository>,
    cache: Arc<dyn CacheStore>,
    jobs: Arc<dyn JobRegistry>,
}

impl AggregationService {
    pub fn new(
        github: Arc<GithubClient>,
        npm: Arc<NpmRegistryClient>,
        catalog: Arc<dyn CatalogRepository>,
        cache: Arc<dyn CacheStore>,
        jobs: Arc<dyn JobRegistry>,
    ) -> Self {
        Self {
            repo_analyzer: Arc::new(RepositoryAnalyzer::new(github.clone())),
            package_analyzer: Arc::new(PackageAnalyzer::new(npm.clone())),
            github,
            npm,
            catalog,
            cache,
            jobs,
        }
    }

    /// Run one aggregated discovery. Partial failures degrade; only
    /// top-level setup (an unavailable cache) propagates as an error.
    pub async fn discover(&self, options: &DiscoverOptions) -> Result<Vec<CatalogEntry>> {
        let cache_key = discovery_cache_key(options);
        if let Some(cached) = self
            .cache
            .get(&cache_key)
            .await
            .context("discovery cache unavailable")?
        {
            match serde_json::from_str::<Vec<CatalogEntry>>(&cached) {
                Ok(entries) => {
                    debug!("Discovery cache hit for {}", cache_key);
                    return Ok(entries);
                }
                Err(e) => warn!("Discarding unreadable cached discovery: {}", e),
            }
        }

        let query = options.query.clone().unwrap_or_default();

        // Both branches always run to completion; a thrown branch becomes
        // an empty list instead of aborting the other.
        let (repo_branch, registry_branch) = tokio::join!(
            self.discover_repositories(&query, options),
            self.discover_packages(&query, options),
        );
        let repo_entries = repo_branch.unwrap_or_else(|e| {
            warn!("Repository branch failed: {}", e);
            Vec::new()
        });
        let registry_entries = registry_branch.unwrap_or_else(|e| {
            warn!("Registry branch failed: {}", e);
            Vec::new()
        });

        info!(
            "Discovery '{}': {} repository entries, {} registry entries",
            query,
            repo_entries.len(),
            registry_entries.len()
        );

        let mut merged = merge_entries(repo_entries, registry_entries);
        rank_entries(&mut merged);
        merged.truncate(options.max_results);

        // Discovery succeeding is independent of persistence succeeding.
        for entry in &merged {
            if let Err(e) = self.catalog.upsert(entry).await {
                warn!("Failed to persist catalog entry {}: {}", entry.id, e);
            }
        }

        match serde_json::to_string(&merged) {
            Ok(json) => {
                if let Err(e) = self.cache.set(&cache_key, json, DISCOVERY_CACHE_TTL).await {
                    warn!("Failed to cache discovery results: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize discovery results: {}", e),
        }

        Ok(merged)
    }

    async fn discover_repositories(
        &self,
        query: &str,
        options: &DiscoverOptions,
    ) -> Result<Vec<CatalogEntry>, DiscoveryError> {
        let per_page = (options.max_results * 2).min(SEARCH_PAGE_CAP) as u32;
        let page = self
            .github
            .search_repositories(
                query,
                &RepoSearchOptions {
                    sort: Some("stars".to_string()),
                    order: Some("desc".to_string()),
                    per_page: Some(per_page),
                    page: None,
                },
            )
            .await?;

        let candidates: Vec<&Repo> = page
            .items
            .iter()
            .filter(|r| r.stargazers_count >= options.min_popularity)
            .filter(|r| options.include_forks || !is_fork_heavy(r))
            .take(options.max_results)
            .collect();

        debug!(
            "Repository branch: {} of {} search hits pass filters",
            candidates.len(),
            page.items.len()
        );

        // Analyzer failures are logged per item and yield None.
        let analyses = join_all(
            candidates
                .iter()
                .map(|r| self.repo_analyzer.analyze(&r.owner.login, &r.name)),
        )
        .await;

        Ok(analyses.into_iter().flatten().collect())
    }

    async fn discover_packages(
        &self,
        query: &str,
        options: &DiscoverOptions,
    ) -> Result<Vec<CatalogEntry>, DiscoveryError> {
        let page = self
            .npm
            .search_packages(
                query,
                &PackageSearchOptions {
                    size: Some((options.max_results * 2) as u32),
                    ..Default::default()
                },
            )
            .await?;

        let analyses = join_all(
            page.objects
                .iter()
                .map(|o| self.package_analyzer.analyze(&o.package.name)),
        )
        .await;

        Ok(analyses
            .into_iter()
            .flatten()
            .filter(|a| a.is_mcp)
            .map(|a| PackageAnalyzer::to_catalog_entry(&a))
            .collect())
    }

    /// Analyze one repository URL, with a per-URL cache in front.
    pub async fn analyze_single(
        &self,
        url: &str,
    ) -> Result<Option<CatalogEntry>, DiscoveryError> {
        let (owner, name) = parse_repository_url(url)?;

        let cache_key = format!("analysis:{}", url);
        match self.cache.get(&cache_key).await {
            Ok(Some(cached)) => {
                if let Ok(entry) = serde_json::from_str::<CatalogEntry>(&cached) {
                    debug!("Analysis cache hit for {}", url);
                    return Ok(Some(entry));
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Analysis cache unavailable: {}", e),
        }

        let entry = self.repo_analyzer.analyze(&owner, &name).await;

        if let Some(ref entry) = entry {
            if let Err(e) = self.catalog.upsert(entry).await {
                warn!("Failed to persist catalog entry {}: {}", entry.id, e);
            }
            if let Ok(json) = serde_json::to_string(entry) {
                if let Err(e) = self.cache.set(&cache_key, json, ANALYSIS_CACHE_TTL).await {
                    warn!("Failed to cache analysis: {}", e);
                }
            }
        }

        Ok(entry)
    }

    /// Create a job and start its background run. Returns the job id
    /// without awaiting completion.
    pub async fn submit_job(&self, options: DiscoverOptions) -> String {
        let job = DiscoveryJob::new(options.query.clone().unwrap_or_default());
        let job_id = job.id.clone();
        self.jobs.put(job).await;

        let service = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            service.jobs.mark_running(&id).await;
            match service.discover(&options).await {
                Ok(results) => {
                    info!("Job {} completed with {} results", id, results.len());
                    service.jobs.complete(&id, results).await;
                }
                Err(e) => {
                    warn!("Job {} failed: {}", id, e);
                    service.jobs.fail(&id, e.to_string()).await;
                }
            }
            service.jobs.schedule_eviction(&id, JOB_RETENTION);
        });

        job_id
    }

    /// Look up a job; `None` once unknown or evicted.
    pub async fn get_job_status(&self, job_id: &str) -> Option<DiscoveryJob> {
        self.jobs.get(job_id).await
    }

    /// Availability and rate-limit view over both providers.
    pub async fn provider_status(&self) -> ProviderStatus {
        ProviderStatus {
            repository_provider: RepositoryProviderStatus {
                available: self.github.can_make_request().await,
                rate_limit: self.github.rate_limit_status().await,
            },
            registry_provider: RegistryProviderStatus {
                available: true,
                rate_limit: None,
            },
        }
    }
}

/// Fork-heavy repositories (forks more than twice the stars) are noise
/// unless the caller opted in.
fn is_fork_heavy(repo: &Repo) -> bool {
    repo.forks_count > repo.stargazers_count.saturating_mul(2)
}

fn discovery_cache_key(options: &DiscoverOptions) -> String {
    format!(
        "discovery:{}:{}:{}",
        options.query.as_deref().unwrap_or(""),
        options.max_results,
        options.min_popularity
    )
}

/// Parse a repository URL into (owner, name). Validation happens before any
/// I/O is attempted.
fn parse_repository_url(raw: &str) -> Result<(String, String), DiscoveryError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| DiscoveryError::Validation(format!("not a valid URL: {}", e)))?;

    let host = parsed.host_str().unwrap_or_default();
    if host != "github.com" && host != "www.github.com" {
        return Err(DiscoveryError::Validation(format!(
            "unsupported repository host: {}",
            host
        )));
    }

    let mut segments = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()))
        .ok_or_else(|| DiscoveryError::Validation("missing repository path".to_string()))?;
    let owner = segments
        .next()
        .ok_or_else(|| DiscoveryError::Validation("missing repository owner".to_string()))?;
    let name = segments
        .next()
        .ok_or_else(|| DiscoveryError::Validation("missing repository name".to_string()))?;

    Ok((owner.to_string(), name.trim_end_matches(".git").to_string()))
}

/// Merge registry-branch entries into repository-branch entries by
/// identity. Repository source takes priority on a collision, except:
/// popularity is first-truthy, tags are unioned, and the longer README
/// wins.
fn merge_entries(
    repo_entries: Vec<CatalogEntry>,
    registry_entries: Vec<CatalogEntry>,
) -> Vec<CatalogEntry> {
    let mut order: Vec<String> = Vec::with_capacity(repo_entries.len());
    let mut by_id: HashMap<String, CatalogEntry> = HashMap::new();

    for entry in repo_entries {
        order.push(entry.id.clone());
        by_id.insert(entry.id.clone(), entry);
    }

    for entry in registry_entries {
        match by_id.get_mut(&entry.id) {
            Some(existing) => {
                if existing.popularity == 0 {
                    existing.popularity = entry.popularity;
                }
                existing.tags.extend(entry.tags);
                dedup_tags(&mut existing.tags);
                if entry.readme.len() > existing.readme.len() {
                    existing.readme = entry.readme;
                }
            }
            None => {
                order.push(entry.id.clone());
                by_id.insert(entry.id.clone(), entry);
            }
        }
    }

    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

/// Stable sort by popularity descending; ties keep discovery order.
fn rank_entries(entries: &mut [CatalogEntry]) {
    entries.sort_by(|a, b| b.popularity.cmp(&a.popularity));
}
