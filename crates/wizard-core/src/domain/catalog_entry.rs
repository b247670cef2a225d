//! The canonical representation for every discovered server, regardless of
//! which provider it came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Transport used to talk to a launched server process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Local process via stdio
    #[default]
    Stdio,
    /// Remote server via Server-Sent Events
    Sse,
}

/// Where a catalog entry was discovered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Found through repository search (GitHub)
    Repository,
    /// Found through package registry search (npm)
    Registry,
    /// Entered by hand through the UI
    Manual,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::Registry => "registry",
            Self::Manual => "manual",
        }
    }
}

/// Command/args/env/transport tuple needed to start a discovered server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LaunchTemplate {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub transport: TransportKind,
}

/// Inferred type of a configuration parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Path,
    Secret,
}

/// One configuration parameter derived from a launch template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Environment variable or setting name
    pub key: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub description: String,
    /// Present iff the parameter is optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A normalized, source-agnostic description of a discovered server.
///
/// `id` is derived deterministically from the source: `"owner/repo"` for
/// repository-sourced entries, `"registry:<package>"` for registry-sourced
/// ones. Repeated discovery of the same underlying item therefore acts as an
/// upsert, never a duplicate insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub license: String,
    /// Unordered, deduplicated
    #[serde(default)]
    pub tags: Vec<String>,
    /// Full README or synthesized long-form text
    #[serde(default)]
    pub readme: String,

    // Capability descriptors are opaque schema blobs passed through
    // unmodified; callers inspect them structurally.
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
    #[serde(default)]
    pub resources: Vec<serde_json::Value>,
    #[serde(default)]
    pub prompts: Vec<serde_json::Value>,

    pub launch: LaunchTemplate,
    #[serde(default)]
    pub required_params: Vec<ParameterSpec>,
    #[serde(default)]
    pub optional_params: Vec<ParameterSpec>,

    pub source: CatalogSource,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Star count or download count depending on source
    pub popularity: u64,
    /// Always false on creation; set only by manual review
    #[serde(default)]
    pub verified: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_researched_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Identity key for a repository-sourced entry.
    pub fn repo_id(owner: &str, name: &str) -> String {
        format!("{}/{}", owner, name)
    }

    /// Identity key for a registry-sourced entry.
    pub fn registry_id(package: &str) -> String {
        format!("registry:{}", package)
    }
}

/// Deduplicate tags in place, case-sensitively, preserving first-seen order.
pub fn dedup_tags(tags: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    tags.retain(|t| seen.insert(t.clone()));
}
