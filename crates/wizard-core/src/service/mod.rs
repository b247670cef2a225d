//! Domain services
//!
//! Provider clients, analyzers, and the aggregation orchestration.

mod aggregation;
mod github;
mod job_registry;
mod npm;
mod package_analyzer;
mod repo_analyzer;
pub mod schema_scan;
mod versioning;

pub use aggregation::{
    AggregationService, DiscoverOptions, ProviderStatus, RegistryProviderStatus,
    RepositoryProviderStatus,
};
pub use github::{
    DirEntry, GithubClient, RateLimitStatus, Repo, RepoLicense, RepoOwner, RepoSearchOptions,
    RepoSearchPage,
};
pub use job_registry::{InMemoryJobRegistry, JobRegistry};
pub use npm::{
    DownloadStats, NpmRegistryClient, PackageInfo, PackageSearchOptions, PackageSearchPage,
    PackageSummary, PersonField, RepositoryField, VersionManifest,
};
pub use package_analyzer::{score_package, PackageAnalyzer, CONFIDENCE_THRESHOLD};
pub use repo_analyzer::{PackageManifest, RepositoryAnalyzer};
pub use versioning::VersioningService;
