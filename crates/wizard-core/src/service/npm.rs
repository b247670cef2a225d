//! HTTP client for the npm registry and its downloads API.
//!
//! Download counts are best-effort enrichment, not a functional dependency:
//! a failed stats call degrades to a zeroed object instead of propagating.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::branding;
use crate::error::DiscoveryError;

const DEFAULT_REGISTRY_BASE: &str = "https://registry.npmjs.org";
const DEFAULT_DOWNLOADS_BASE: &str = "https://api.npmjs.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Six months, the staleness horizon for `is_recently_maintained`.
const MAINTENANCE_WINDOW_DAYS: i64 = 183;

/// Options for package search.
#[derive(Debug, Clone, Default)]
pub struct PackageSearchOptions {
    pub size: Option<u32>,
    pub from: Option<u32>,
    pub quality_weight: Option<f64>,
    pub popularity_weight: Option<f64>,
    pub maintenance_weight: Option<f64>,
}

/// One page of package search results.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageSearchPage {
    pub total: u64,
    pub objects: Vec<PackageSearchObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageSearchObject {
    pub package: PackageSummary,
    pub score: PackageScore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageSummary {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Provider-assigned quality/popularity/maintenance sub-scores.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageScore {
    #[serde(rename = "final")]
    pub final_score: f64,
    pub detail: PackageScoreDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageScoreDetail {
    pub quality: f64,
    pub popularity: f64,
    pub maintenance: f64,
}

/// A person field, which the registry serves either as a plain string or an
/// object with a `name`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PersonField {
    Name(String),
    Info { name: Option<String> },
}

impl PersonField {
    pub fn display(&self) -> String {
        match self {
            Self::Name(s) => s.clone(),
            Self::Info { name } => name.clone().unwrap_or_default(),
        }
    }
}

/// The `repository` field, string form or object form.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RepositoryField {
    Url(String),
    Info { url: Option<String> },
}

/// Full package metadata from the registry document.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    #[serde(default)]
    pub versions: HashMap<String, VersionManifest>,
    /// Publish timestamps per version, plus `created`/`modified`
    #[serde(default)]
    pub time: HashMap<String, String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub author: Option<PersonField>,
    pub license: Option<serde_json::Value>,
    pub repository: Option<RepositoryField>,
    pub homepage: Option<String>,
}

impl PackageInfo {
    /// Manifest of the `latest` dist-tag, if the document carries it.
    pub fn latest_version(&self) -> Option<&VersionManifest> {
        self.dist_tags
            .get("latest")
            .and_then(|v| self.versions.get(v))
    }

    /// License as display text, whichever shape the registry served.
    pub fn license_text(&self) -> String {
        match &self.license {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Object(o)) => o
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }
}

/// One version's manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub main: Option<String>,
    /// String or map form
    pub bin: Option<serde_json::Value>,
    #[serde(default)]
    pub scripts: HashMap<String, String>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: HashMap<String, String>,
    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: HashMap<String, String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Download statistics for one period.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadStats {
    pub downloads: u64,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl DownloadStats {
    fn zeroed() -> Self {
        Self {
            downloads: 0,
            start: String::new(),
            end: String::new(),
        }
    }
}

/// Client for the package-registry provider.
pub struct NpmRegistryClient {
    client: reqwest::Client,
    registry_base: String,
    downloads_base: String,
}

impl NpmRegistryClient {
    pub fn new() -> Self {
        Self::with_base_urls(DEFAULT_REGISTRY_BASE, DEFAULT_DOWNLOADS_BASE)
    }

    /// Create with custom registry and downloads hosts (used by tests).
    pub fn with_base_urls(registry_base: &str, downloads_base: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(branding::USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            registry_base: registry_base.trim_end_matches('/').to_string(),
            downloads_base: downloads_base.trim_end_matches('/').to_string(),
        }
    }

    /// Full-text package search.
    pub async fn search_packages(
        &self,
        query: &str,
        options: &PackageSearchOptions,
    ) -> Result<PackageSearchPage, DiscoveryError> {
        let mut url = format!(
            "{}/-/v1/search?text={}",
            self.registry_base,
            urlencoding::encode(query)
        );
        if let Some(size) = options.size {
            url.push_str(&format!("&size={}", size));
        }
        if let Some(from) = options.from {
            url.push_str(&format!("&from={}", from));
        }
        if let Some(w) = options.quality_weight {
            url.push_str(&format!("&quality={}", w));
        }
        if let Some(w) = options.popularity_weight {
            url.push_str(&format!("&popularity={}", w));
        }
        if let Some(w) = options.maintenance_weight {
            url.push_str(&format!("&maintenance={}", w));
        }

        debug!("Searching packages: {}", query);
        self.get_json(&url, &format!("search '{}'", query)).await
    }

    /// Full registry document for a package.
    pub async fn get_package_info(&self, name: &str) -> Result<PackageInfo, DiscoveryError> {
        let url = format!("{}/{}", self.registry_base, urlencoding::encode(name));
        self.get_json(&url, name).await
    }

    /// One specific version's manifest.
    pub async fn get_package_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<VersionManifest, DiscoveryError> {
        let url = format!(
            "{}/{}/{}",
            self.registry_base,
            urlencoding::encode(name),
            version
        );
        self.get_json(&url, &format!("{}@{}", name, version)).await
    }

    /// Download counts for a period (e.g. "last-month"). Never fails:
    /// provider errors degrade to a zeroed stats object.
    pub async fn get_download_stats(&self, name: &str, period: &str) -> DownloadStats {
        let url = format!(
            "{}/downloads/point/{}/{}",
            self.downloads_base,
            period,
            urlencoding::encode(name)
        );
        match self.get_json::<DownloadStats>(&url, name).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Download stats unavailable for {}: {}", name, e);
                DownloadStats::zeroed()
            }
        }
    }

    /// Best-effort parse of a package's declared repository field into a
    /// normalized https URL.
    pub fn extract_repository_url(info: &PackageInfo) -> Option<String> {
        let raw = match info.repository.as_ref()? {
            RepositoryField::Url(s) => s.clone(),
            RepositoryField::Info { url } => url.clone()?,
        };
        normalize_repository_url(&raw)
    }

    /// True iff the package's last-modified timestamp is within six months.
    pub fn is_recently_maintained(info: &PackageInfo) -> bool {
        let Some(modified) = info.time.get("modified") else {
            return false;
        };
        match chrono::DateTime::parse_from_rfc3339(modified) {
            Ok(ts) => {
                let age = chrono::Utc::now().signed_duration_since(ts.with_timezone(&chrono::Utc));
                age.num_days() <= MAINTENANCE_WINDOW_DAYS
            }
            Err(_) => false,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<T, DiscoveryError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DiscoveryError::fetch(context, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::fetch(context, format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| DiscoveryError::fetch(context, format!("malformed response: {}", e)))
    }
}

impl Default for NpmRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize the zoo of repository URL spellings npm packages carry.
/// Returns None when no recognizable pattern is found.
fn normalize_repository_url(raw: &str) -> Option<String> {
    let mut url = raw.trim().to_string();
    if url.is_empty() {
        return None;
    }

    // Shorthand forms: "github:owner/repo" or bare "owner/repo"
    if let Some(rest) = url.strip_prefix("github:") {
        return Some(format!("https://github.com/{}", rest.trim_end_matches(".git")));
    }

    if let Some(rest) = url.strip_prefix("git+") {
        url = rest.to_string();
    }
    if let Some(rest) = url.strip_prefix("git://") {
        url = format!("https://{}", rest);
    }
    if let Some(rest) = url.strip_prefix("ssh://git@") {
        url = format!("https://{}", rest);
    }

    if url.starts_with("https://") || url.starts_with("http://") {
        return Some(url.trim_end_matches('/').trim_end_matches(".git").to_string());
    }

    // Bare "owner/repo" with exactly one separator
    if url.split('/').count() == 2 && !url.contains(' ') && !url.contains(':') {
        return Some(format!("https://github.com/{}", url));
    }

    None
}
