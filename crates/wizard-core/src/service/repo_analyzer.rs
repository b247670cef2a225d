//! Turns one repository identifier into zero-or-one catalog entry.
//!
//! Three independent detectors (manifest, README, schema files) are OR-ed;
//! a repository below the star floor is never analyzed at all. Failures are
//! logged and yield `None` so one bad repository never aborts a batch.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::branding;
use crate::domain::{
    dedup_tags, CatalogEntry, CatalogSource, LaunchTemplate, ParameterKind, ParameterSpec,
    TransportKind,
};
use crate::error::DiscoveryError;
use crate::service::github::GithubClient;
use crate::service::schema_scan::{is_schema_candidate, parse_schema_document, SchemaScan};

/// Repositories below this star count are low-signal and skipped outright.
const MIN_STARS: u64 = 5;

/// Conventional README filename casings, tried in order.
const README_CANDIDATES: &[&str] = &["README.md", "readme.md", "Readme.md", "README"];

/// How many schema candidate files to download and parse at most.
const MAX_SCHEMA_FILES: usize = 5;

lazy_static! {
    static ref PROTOCOL_RE: Regex =
        Regex::new(r"(?i)model[\s_-]?context[\s_-]?protocol|\bmcp\b").expect("protocol regex");
    static ref CODE_BLOCK_RE: Regex =
        Regex::new(r"(?s)```[a-zA-Z]*\s*(\{.*?\})\s*```").expect("code block regex");
    static ref SSE_RE: Regex =
        Regex::new(r"(?i)\bsse\b|server-sent events").expect("sse regex");
    static ref STDIO_RE: Regex = Regex::new(r"(?i)\bstdio\b").expect("stdio regex");
}

/// Manifest (`package.json`) fields the detectors care about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub main: Option<String>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: HashMap<String, String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Launch hints extracted from a README's `mcpServers` code block.
#[derive(Debug, Clone, Default)]
struct DetectedLaunch {
    command: Option<String>,
    args: Option<Vec<String>>,
    env: Option<HashMap<String, String>>,
    transport: Option<TransportKind>,
}

/// Analyzes repositories for protocol-server signal.
pub struct RepositoryAnalyzer {
    github: Arc<GithubClient>,
}

impl RepositoryAnalyzer {
    pub fn new(github: Arc<GithubClient>) -> Self {
        Self { github }
    }

    /// Analyze one repository. Returns `None` when the repository is
    /// low-signal, shows no protocol evidence, or cannot be fetched -
    /// callers running batches treat all three the same way.
    pub async fn analyze(&self, owner: &str, name: &str) -> Option<CatalogEntry> {
        match self.try_analyze(owner, name).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Analysis failed for {}/{}: {}", owner, name, e);
                None
            }
        }
    }

    async fn try_analyze(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<CatalogEntry>, DiscoveryError> {
        let repo = self.github.get_repository(owner, name).await?;

        // Low-signal repositories are not analyzed further, regardless of
        // content. This check precedes every other fetch.
        if repo.stargazers_count < MIN_STARS {
            debug!(
                "Skipping {}/{}: {} stars below floor",
                owner, name, repo.stargazers_count
            );
            return Ok(None);
        }

        let manifest = self.fetch_manifest(owner, name).await;
        let readme = self.fetch_readme(owner, name).await;

        let manifest_hit = manifest.as_ref().is_some_and(manifest_mentions_protocol);
        let readme_hit = PROTOCOL_RE.is_match(&readme);
        let scan = self.scan_schema_files(owner, name).await;

        if !manifest_hit && !readme_hit && !scan.matched {
            debug!("No protocol signal in {}/{}", owner, name);
            return Ok(None);
        }

        let detected = if readme_hit {
            detect_launch(&readme)
        } else {
            DetectedLaunch::default()
        };

        let launch = build_launch_template(&detected, manifest.as_ref());
        let (required_params, optional_params) = derive_parameters(&launch.env);

        let mut tags: Vec<String> = repo.topics.clone();
        if let Some(ref m) = manifest {
            tags.extend(m.keywords.iter().cloned());
        }
        tags.push(branding::PROTOCOL_ABBREV.to_string());
        tags.push("model-context-protocol".to_string());
        dedup_tags(&mut tags);

        let now = chrono::Utc::now();
        Ok(Some(CatalogEntry {
            id: CatalogEntry::repo_id(owner, name),
            name: repo.name.clone(),
            description: repo
                .description
                .clone()
                .or_else(|| manifest.as_ref().and_then(|m| m.description.clone()))
                .unwrap_or_default(),
            version: manifest
                .as_ref()
                .and_then(|m| m.version.clone())
                .unwrap_or_else(|| "0.0.0".to_string()),
            author: repo.owner.login.clone(),
            license: repo
                .license
                .as_ref()
                .and_then(|l| l.spdx_id.clone().or_else(|| l.name.clone()))
                .unwrap_or_default(),
            tags,
            readme,
            tools: scan.tools,
            resources: scan.resources,
            prompts: scan.prompts,
            launch,
            required_params,
            optional_params,
            source: CatalogSource::Repository,
            source_url: repo.html_url.clone(),
            package_name: manifest.as_ref().and_then(|m| m.name.clone()),
            popularity: repo.stargazers_count,
            verified: false,
            created_at: now,
            updated_at: now,
            last_researched_at: now,
        }))
    }

    /// Best-effort manifest fetch; absence is just "no manifest".
    async fn fetch_manifest(&self, owner: &str, name: &str) -> Option<PackageManifest> {
        match self.github.download_raw_file(owner, name, "package.json").await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    debug!("Unparseable manifest in {}/{}: {}", owner, name, e);
                    None
                }
            },
            Err(_) => None,
        }
    }

    /// Best-effort README fetch, first matching casing wins.
    async fn fetch_readme(&self, owner: &str, name: &str) -> String {
        for candidate in README_CANDIDATES {
            if let Ok(text) = self.github.download_raw_file(owner, name, candidate).await {
                return text;
            }
        }
        String::new()
    }

    /// Probe root directory files for capability schemas, accumulating from
    /// every parseable match rather than stopping at the first hit.
    async fn scan_schema_files(&self, owner: &str, name: &str) -> SchemaScan {
        let mut scan = SchemaScan::default();

        let entries = match self.github.get_directory_listing(owner, name, "").await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No directory listing for {}/{}: {}", owner, name, e);
                return scan;
            }
        };

        let candidates = entries
            .iter()
            .filter(|e| e.entry_type == "file" && is_schema_candidate(&e.name))
            .take(MAX_SCHEMA_FILES);

        for entry in candidates {
            let Ok(text) = self.github.download_raw_file(owner, name, &entry.path).await else {
                continue;
            };
            if let Some(doc) = parse_schema_document(&text) {
                scan.absorb(&doc);
            }
        }

        scan
    }
}

/// Detector a: dependency names, keywords, or the description mention the
/// protocol (case-insensitive substring).
fn manifest_mentions_protocol(manifest: &PackageManifest) -> bool {
    let mentions = |s: &str| {
        let lower = s.to_lowercase();
        lower.contains(branding::PROTOCOL_ABBREV) || lower.contains(branding::PROTOCOL_NAME)
    };

    manifest
        .dependencies
        .keys()
        .chain(manifest.dev_dependencies.keys())
        .any(|dep| mentions(dep))
        || manifest.keywords.iter().any(|k| mentions(k))
        || manifest.description.as_deref().is_some_and(mentions)
}

/// Extract launch hints from a README: a fenced code block shaped like an
/// `mcpServers` configuration, plus transport keywords anywhere in the text.
fn detect_launch(readme: &str) -> DetectedLaunch {
    let mut detected = DetectedLaunch::default();

    for capture in CODE_BLOCK_RE.captures_iter(readme) {
        let block = &capture[1];
        if !block.contains("mcpServers") {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(block) else {
            continue;
        };
        let Some(servers) = value.get("mcpServers").and_then(|v| v.as_object()) else {
            continue;
        };
        if let Some((_, server)) = servers.iter().next() {
            detected.command = server
                .get("command")
                .and_then(|v| v.as_str())
                .map(String::from);
            detected.args = server.get("args").and_then(|v| v.as_array()).map(|args| {
                args.iter()
                    .filter_map(|a| a.as_str())
                    .map(String::from)
                    .collect()
            });
            detected.env = server.get("env").and_then(|v| v.as_object()).map(|env| {
                env.iter()
                    .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                    .collect()
            });
            break;
        }
    }

    if STDIO_RE.is_match(readme) {
        detected.transport = Some(TransportKind::Stdio);
    } else if SSE_RE.is_match(readme) {
        detected.transport = Some(TransportKind::Sse);
    }

    detected
}

/// Launch template defaults: detected command, else the manifest's declared
/// package name, else `node`; detected args, else `[main]`, else empty.
fn build_launch_template(
    detected: &DetectedLaunch,
    manifest: Option<&PackageManifest>,
) -> LaunchTemplate {
    let command = detected
        .command
        .clone()
        .or_else(|| manifest.and_then(|m| m.name.clone()))
        .unwrap_or_else(|| "node".to_string());

    let args = detected
        .args
        .clone()
        .or_else(|| manifest.and_then(|m| m.main.clone()).map(|main| vec![main]))
        .unwrap_or_default();

    LaunchTemplate {
        command,
        args,
        env: detected.env.clone().unwrap_or_default(),
        transport: detected.transport.unwrap_or_default(),
    }
}

/// Derive required/optional parameter lists from a launch template's env
/// map. An entry is required iff its value is empty; otherwise the value
/// becomes the default.
fn derive_parameters(env: &HashMap<String, String>) -> (Vec<ParameterSpec>, Vec<ParameterSpec>) {
    let mut required = Vec::new();
    let mut optional = Vec::new();

    let mut keys: Vec<&String> = env.keys().collect();
    keys.sort();

    for key in keys {
        let value = &env[key];
        let spec = ParameterSpec {
            key: key.clone(),
            kind: infer_parameter_kind(key, value),
            description: format!("Environment variable {}", key),
            default: if value.is_empty() {
                None
            } else {
                Some(value.clone())
            },
        };
        if value.is_empty() {
            required.push(spec);
        } else {
            optional.push(spec);
        }
    }

    (required, optional)
}

/// Infer a parameter's type. Secret markers are checked against both name
/// and value, since required secrets arrive with empty values; the
/// remaining checks look at the value only.
fn infer_parameter_kind(key: &str, value: &str) -> ParameterKind {
    let key_lower = key.to_lowercase();
    let value_lower = value.to_lowercase();
    if ["key", "token", "secret"]
        .iter()
        .any(|m| key_lower.contains(m) || value_lower.contains(m))
    {
        return ParameterKind::Secret;
    }

    if value.contains('/') || value.contains('\\') || value.contains('.') {
        return ParameterKind::Path;
    }
    if !value.is_empty() && value.parse::<f64>().is_ok() {
        return ParameterKind::Number;
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return ParameterKind::Boolean;
    }
    ParameterKind::String
}
