//! Scores registry packages for protocol-server likelihood and converts
//! qualifying ones into catalog entries.
//!
//! The point system sums to 100; confidence is `min(score, 100) / 100` and
//! the pass verdict is inclusive at 0.3.

use std::sync::Arc;
use tracing::warn;

use crate::branding;
use crate::domain::{
    dedup_tags, CatalogEntry, CatalogSource, LaunchTemplate, PackageAnalysis, PackageMetadata,
    TransportKind,
};
use crate::error::DiscoveryError;
use crate::service::npm::{NpmRegistryClient, PackageInfo};

/// Inclusive pass boundary for the protocol-server verdict.
pub const CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Download period consulted for the popularity bonus.
const DOWNLOADS_PERIOD: &str = "last-month";

/// Scope marker that identifies protocol SDK dependencies.
const PROTOCOL_SCOPE: &str = "@modelcontextprotocol";

/// Analyzes registry packages.
pub struct PackageAnalyzer {
    npm: Arc<NpmRegistryClient>,
}

impl PackageAnalyzer {
    pub fn new(npm: Arc<NpmRegistryClient>) -> Self {
        Self { npm }
    }

    /// Analyze one package. Fetch failures are logged and yield `None` so a
    /// bad package never aborts a batch.
    pub async fn analyze(&self, package_name: &str) -> Option<PackageAnalysis> {
        match self.try_analyze(package_name).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!("Analysis failed for package {}: {}", package_name, e);
                None
            }
        }
    }

    async fn try_analyze(&self, package_name: &str) -> Result<PackageAnalysis, DiscoveryError> {
        let info = self.npm.get_package_info(package_name).await?;
        // Best-effort: a failed stats call is a zeroed object, and the
        // download bonus simply does not fire.
        let stats = self.npm.get_download_stats(package_name, DOWNLOADS_PERIOD).await;
        Ok(score_package(&info, stats.downloads))
    }

    /// Convert a passing analysis into a catalog entry. Callers must only
    /// invoke this for a true verdict.
    pub fn to_catalog_entry(analysis: &PackageAnalysis) -> CatalogEntry {
        let name = &analysis.package_name;

        let mut tags = vec![
            "registry".to_string(),
            branding::PROTOCOL_ABBREV.to_string(),
            "model-context-protocol".to_string(),
        ];
        tags.extend(analysis.metadata.keywords.iter().cloned());
        dedup_tags(&mut tags);

        let now = chrono::Utc::now();
        CatalogEntry {
            id: CatalogEntry::registry_id(name),
            name: name.clone(),
            description: analysis.metadata.description.clone(),
            version: analysis.metadata.version.clone(),
            author: analysis.metadata.author.clone(),
            license: analysis.metadata.license.clone(),
            tags,
            readme: synthesize_readme(analysis),
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
            launch: LaunchTemplate {
                command: "node".to_string(),
                args: vec![format!("node_modules/.bin/{}", name)],
                env: Default::default(),
                transport: TransportKind::Stdio,
            },
            // Registry-sourced entries get no parameter inference.
            required_params: Vec::new(),
            optional_params: Vec::new(),
            source: CatalogSource::Registry,
            source_url: analysis
                .repository_url
                .clone()
                .unwrap_or_else(|| format!("https://www.npmjs.com/package/{}", name)),
            package_name: Some(name.clone()),
            popularity: analysis.metadata.downloads,
            verified: false,
            created_at: now,
            updated_at: now,
            last_researched_at: now,
        }
    }
}

/// Apply the weighted point system to one package document.
pub fn score_package(info: &PackageInfo, downloads: u64) -> PackageAnalysis {
    let mut score = 0.0_f64;
    let mut indicators = Vec::new();

    let name_lower = info.name.to_lowercase();
    if name_lower.contains(branding::PROTOCOL_ABBREV) {
        score += 25.0;
        indicators.push("Package name contains \"mcp\"".to_string());
    }
    if name_lower.contains("model") && name_lower.contains("context") {
        score += 15.0;
        indicators.push("Package name contains \"model\" and \"context\"".to_string());
    }

    let matched_keywords: Vec<&String> = info
        .keywords
        .iter()
        .filter(|k| {
            let lower = k.to_lowercase();
            lower.contains(branding::PROTOCOL_ABBREV) || lower.contains(branding::PROTOCOL_NAME)
        })
        .collect();
    if !matched_keywords.is_empty() {
        score += (matched_keywords.len() as f64 * 10.0).min(25.0);
        indicators.push(format!(
            "Keywords match: {}",
            matched_keywords
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let description = info.description.clone().unwrap_or_default();
    let desc_lower = description.to_lowercase();
    if desc_lower.contains(branding::PROTOCOL_ABBREV) || desc_lower.contains(branding::PROTOCOL_NAME)
    {
        score += 20.0;
        indicators.push("Description mentions the protocol".to_string());
    } else if desc_lower.contains("model context") {
        score += 10.0;
        indicators.push("Description mentions \"model context\"".to_string());
    }

    let latest = info.latest_version();
    let matched_deps: Vec<&String> = latest
        .map(|v| {
            v.dependencies
                .keys()
                .chain(v.dev_dependencies.keys())
                .chain(v.peer_dependencies.keys())
                .filter(|dep| {
                    let lower = dep.to_lowercase();
                    lower.contains(PROTOCOL_SCOPE) || lower.contains(branding::PROTOCOL_ABBREV)
                })
                .collect()
        })
        .unwrap_or_default();
    if !matched_deps.is_empty() {
        score += (matched_deps.len() as f64 * 8.0).min(15.0);
        indicators.push(format!(
            "Protocol dependencies: {}",
            matched_deps
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let repository_url = NpmRegistryClient::extract_repository_url(info);
    if repository_url.is_some() {
        score += 5.0;
        indicators.push("Repository URL present".to_string());
    }

    let recently_maintained = NpmRegistryClient::is_recently_maintained(info);
    if !recently_maintained {
        // Staleness penalty applies to the additive terms above, before the
        // download bonus.
        score *= 0.7;
        indicators.push("Not recently maintained (score reduced)".to_string());
    }

    if downloads > 1000 {
        score += 5.0;
        indicators.push(format!("{} downloads last month", downloads));
    } else if downloads > 100 {
        score += 2.0;
        indicators.push(format!("{} downloads last month", downloads));
    }

    let confidence = score.min(100.0) / 100.0;

    PackageAnalysis {
        package_name: info.name.clone(),
        is_mcp: confidence >= CONFIDENCE_THRESHOLD,
        confidence,
        indicators,
        repository_url,
        metadata: PackageMetadata {
            description,
            version: info
                .dist_tags
                .get("latest")
                .cloned()
                .unwrap_or_else(|| "0.0.0".to_string()),
            author: info.author.as_ref().map(|a| a.display()).unwrap_or_default(),
            license: info.license_text(),
            keywords: info.keywords.clone(),
            homepage: info.homepage.clone(),
            downloads,
            recently_maintained,
        },
    }
}

/// Registry entries have no README to fetch; generate a short document from
/// the package's own metadata instead.
fn synthesize_readme(analysis: &PackageAnalysis) -> String {
    let mut readme = format!("# {}\n", analysis.package_name);

    if !analysis.metadata.description.is_empty() {
        readme.push_str(&format!("\n{}\n", analysis.metadata.description));
    }

    readme.push_str(&format!(
        "\n## Installation\n\n```bash\nnpm install -g {}\n```\n",
        analysis.package_name
    ));

    if let Some(ref url) = analysis.repository_url {
        readme.push_str(&format!("\n## Repository\n\n{}\n", url));
    }
    if let Some(ref homepage) = analysis.metadata.homepage {
        readme.push_str(&format!("\n## Homepage\n\n{}\n", homepage));
    }

    readme.push_str(&format!(
        "\n## Detection\n\nIdentified as a Model Context Protocol server with {:.0}% confidence.\n",
        analysis.confidence * 100.0
    ));
    for indicator in &analysis.indicators {
        readme.push_str(&format!("- {}\n", indicator));
    }

    readme
}
