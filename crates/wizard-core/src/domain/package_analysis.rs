//! Intermediate scoring result for one registry package.
//!
//! Never persisted; used only to decide whether and how to materialize a
//! `CatalogEntry` from a registry hit.

use serde::{Deserialize, Serialize};

/// Metadata bag carried alongside a package verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub description: String,
    pub version: String,
    pub author: String,
    pub license: String,
    pub keywords: Vec<String>,
    pub homepage: Option<String>,
    pub downloads: u64,
    pub recently_maintained: bool,
}

/// Result of scoring one registry package for protocol-server likelihood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageAnalysis {
    pub package_name: String,
    /// `confidence >= 0.3`
    pub is_mcp: bool,
    /// Heuristic estimate in [0, 1]
    pub confidence: f64,
    /// Human-readable explanations of the score
    pub indicators: Vec<String>,
    /// Best-effort repository URL derived from package metadata
    pub repository_url: Option<String>,
    pub metadata: PackageMetadata,
}
