//! Aggregated discovery: merging, ranking, caching, and failure isolation.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use tests::fixtures::{
    npm_package_doc, npm_search_object, npm_search_page, repo_json, repo_search_page, Harness,
};
use wizard_core::domain::CatalogSource;
use wizard_core::service::DiscoverOptions;
use wizard_core::DiscoveryError;

fn options(query: &str) -> DiscoverOptions {
    DiscoverOptions {
        query: Some(query.to_string()),
        ..Default::default()
    }
}

/// Mount the fixtures for the canonical "file system" scenario: one
/// qualifying repository and one registry package whose description-only
/// match stays below the confidence threshold.
async fn mount_file_system_scenario(harness: &Harness) {
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_search_page(&[repo_json(
            "acme", "fs-mcp", 50, 2,
        )])))
        .mount(&harness.providers.github_api)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/fs-mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("acme", "fs-mcp", 50, 2)))
        .mount(&harness.providers.github_api)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/fs-mcp/main/package.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "fs-mcp",
            "version": "1.0.0",
            "keywords": ["mcp"]
        })))
        .mount(&harness.providers.github_raw)
        .await;
    // No README in this repository; empty root listing.
    Mock::given(method("GET"))
        .and(path("/repos/acme/fs-mcp/contents/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&harness.providers.github_api)
        .await;

    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(npm_search_page(&[npm_search_object("fs-server")])),
        )
        .mount(&harness.providers.npm)
        .await;
    // Description-only protocol match: +20 -> confidence 0.20, below 0.3.
    Mock::given(method("GET"))
        .and(path("/fs-server"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(npm_package_doc("fs-server", "An MCP server for file access")),
        )
        .mount(&harness.providers.npm)
        .await;
    // Downloads endpoint is left unmounted: stats degrade to zero.
}

#[tokio::test]
async fn end_to_end_file_system_scenario() {
    let harness = Harness::start().await;
    mount_file_system_scenario(&harness).await;

    let results = harness.service.discover(&options("file system")).await.unwrap();

    // The registry package scores 0.20 and is excluded; only the
    // repository entry survives.
    assert_eq!(results.len(), 1);
    let entry = &results[0];
    assert_eq!(entry.id, "acme/fs-mcp");
    assert_eq!(entry.source, CatalogSource::Repository);
    assert_eq!(entry.popularity, 50);
    assert!(entry.tags.contains(&"mcp".to_string()));

    // Survivors were persisted.
    assert_eq!(harness.catalog.stored_ids(), vec!["acme/fs-mcp"]);
}

#[tokio::test]
async fn repeat_discovery_is_served_from_cache() {
    let harness = Harness::start().await;
    mount_file_system_scenario(&harness).await;

    let first = harness.service.discover(&options("file system")).await.unwrap();
    let searches_after_first = harness
        .providers
        .github_api
        .received_requests()
        .await
        .unwrap()
        .len();

    let second = harness.service.discover(&options("file system")).await.unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].id, second[0].id);

    // No further provider traffic on the cache hit.
    let searches_after_second = harness
        .providers
        .github_api
        .received_requests()
        .await
        .unwrap()
        .len();
    assert_eq!(searches_after_first, searches_after_second);
}

#[tokio::test]
async fn repository_branch_failure_degrades_to_registry_results() {
    let harness = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.providers.github_api)
        .await;

    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(npm_search_page(&[npm_search_object("mcp-files")])),
        )
        .mount(&harness.providers.npm)
        .await;
    let mut doc = npm_package_doc("mcp-files", "An MCP server for file access");
    doc["keywords"] = json!(["mcp"]);
    Mock::given(method("GET"))
        .and(path("/mcp-files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc))
        .mount(&harness.providers.npm)
        .await;

    let results = harness.service.discover(&options("files")).await.unwrap();

    // name 25 + keyword 10 + description 20 = 55 -> well past the gate.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "registry:mcp-files");
    assert_eq!(results[0].source, CatalogSource::Registry);
}

#[tokio::test]
async fn low_popularity_and_fork_heavy_repositories_are_filtered() {
    let harness = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_search_page(&[
            repo_json("acme", "starless", 3, 0),
            repo_json("acme", "forky", 40, 100),
        ])))
        .mount(&harness.providers.github_api)
        .await;
    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(npm_search_page(&[])))
        .mount(&harness.providers.npm)
        .await;

    let results = harness.service.discover(&options("anything")).await.unwrap();
    assert!(results.is_empty());

    // Neither filtered repository was ever analyzed.
    let api_requests = harness
        .providers
        .github_api
        .received_requests()
        .await
        .unwrap();
    assert!(api_requests
        .iter()
        .all(|r| !r.url.path().starts_with("/repos/")));
}

#[tokio::test]
async fn persistence_failures_do_not_fail_discovery() {
    let harness = Harness::start().await;
    mount_file_system_scenario(&harness).await;
    harness.catalog.fail_upserts();

    let results = harness.service.discover(&options("file system")).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(harness.catalog.upsert_count() > 0);
    assert!(harness.catalog.stored_ids().is_empty());
}

#[tokio::test]
async fn analyze_single_is_identity_stable_and_upserts() {
    let harness = Harness::start().await;
    mount_file_system_scenario(&harness).await;

    let url = "https://github.com/acme/fs-mcp";
    let first = harness.service.analyze_single(url).await.unwrap().unwrap();
    let second = harness.service.analyze_single(url).await.unwrap().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.id, "acme/fs-mcp");
    // Repeated analysis acts as an upsert, never a duplicate insert.
    assert_eq!(harness.catalog.stored_ids(), vec!["acme/fs-mcp"]);
}

#[tokio::test]
async fn analyze_single_rejects_foreign_hosts_before_io() {
    let harness = Harness::start().await;

    let err = harness
        .service
        .analyze_single("https://gitlab.com/acme/fs-mcp")
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Validation(_)));

    // Validation precedes any provider call.
    let api_requests = harness
        .providers
        .github_api
        .received_requests()
        .await
        .unwrap();
    assert!(api_requests.is_empty());
}

#[tokio::test]
async fn merged_results_are_ranked_by_popularity() {
    let harness = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_search_page(&[
            repo_json("acme", "small-mcp", 12, 1),
            repo_json("acme", "big-mcp", 900, 10),
        ])))
        .mount(&harness.providers.github_api)
        .await;
    for (name, stars) in [("small-mcp", 12), ("big-mcp", 900)] {
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/{}", name)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(repo_json("acme", name, stars, 1)),
            )
            .mount(&harness.providers.github_api)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/acme/{}/main/package.json", name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": name,
                "version": "1.0.0",
                "keywords": ["mcp"]
            })))
            .mount(&harness.providers.github_raw)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/{}/contents/", name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&harness.providers.github_api)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(npm_search_page(&[])))
        .mount(&harness.providers.npm)
        .await;

    let results = harness.service.discover(&options("anything")).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["acme/big-mcp", "acme/small-mcp"]);
}

#[tokio::test]
async fn provider_status_reports_both_providers() {
    let harness = Harness::start().await;

    let status = harness.service.provider_status().await;
    assert!(status.repository_provider.available);
    assert_eq!(status.repository_provider.rate_limit.remaining, 5000);
    assert!(status.registry_provider.available);
    assert!(status.registry_provider.rate_limit.is_none());
}
