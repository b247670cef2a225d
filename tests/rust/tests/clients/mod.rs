//! Provider client behavior against mocked HTTP endpoints.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tests::fixtures::{npm_package_doc, repo_json, repo_search_page, Providers};
use wizard_core::service::{NpmRegistryClient, PackageSearchOptions, RepoSearchOptions};
use wizard_core::DiscoveryError;

#[tokio::test]
async fn search_query_is_augmented_with_protocol_terms() {
    let providers = Providers::start().await;

    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("q", "files mcp OR \"model context protocol\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_search_page(&[])))
        .expect(1)
        .mount(&providers.github_api)
        .await;

    let client = providers.github_client();
    let page = client
        .search_repositories("files", &RepoSearchOptions::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
async fn get_repository_error_names_the_repository() {
    let providers = Providers::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&providers.github_api)
        .await;

    let client = providers.github_client();
    let err = client.get_repository("acme", "missing").await.unwrap_err();
    assert!(err.to_string().contains("acme/missing"));
    assert!(!err.is_rate_limit());
}

#[tokio::test]
async fn rate_limit_headers_update_client_state() {
    let providers = Providers::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/fs-mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(repo_json("acme", "fs-mcp", 50, 1))
                .insert_header("x-ratelimit-remaining", "42")
                .insert_header("x-ratelimit-reset", "1900000000"),
        )
        .mount(&providers.github_api)
        .await;

    let client = providers.github_client();
    // Before any call: documented ceiling, not exhausted.
    assert_eq!(client.rate_limit_status().await.remaining, 5000);

    client.get_repository("acme", "fs-mcp").await.unwrap();

    let status = client.rate_limit_status().await;
    assert_eq!(status.remaining, 42);
    assert!(status.reset_at.is_some());
    assert!(!status.is_exhausted);
    assert!(client.can_make_request().await);
}

#[tokio::test]
async fn exhaustion_is_a_distinct_rate_limit_error() {
    let providers = Providers::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/fs-mcp"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1900000000"),
        )
        .mount(&providers.github_api)
        .await;

    let client = providers.github_client();
    let err = client.get_repository("acme", "fs-mcp").await.unwrap_err();
    assert!(err.is_rate_limit());

    let status = client.rate_limit_status().await;
    assert!(status.is_exhausted);
    assert!(!client.can_make_request().await);
}

#[tokio::test]
async fn plain_403_is_a_fetch_error_not_rate_limit() {
    let providers = Providers::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/private"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "100"))
        .mount(&providers.github_api)
        .await;

    let client = providers.github_client();
    let err = client.get_repository("acme", "private").await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Fetch { .. }));
}

#[tokio::test]
async fn raw_download_falls_back_to_master_once() {
    let providers = Providers::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/fs-mcp/main/README.md"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&providers.github_raw)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/fs-mcp/master/README.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# legacy branch"))
        .expect(1)
        .mount(&providers.github_raw)
        .await;

    let client = providers.github_client();
    let text = client
        .download_raw_file("acme", "fs-mcp", "README.md")
        .await
        .unwrap();
    assert_eq!(text, "# legacy branch");
}

#[tokio::test]
async fn raw_download_gives_up_after_two_attempts() {
    let providers = Providers::start().await;
    // No mounts: both branch attempts 404.

    let client = providers.github_client();
    let err = client
        .download_raw_file("acme", "fs-mcp", "README.md")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("acme/fs-mcp:README.md"));

    let requests = providers.github_raw.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn npm_search_forwards_weights() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .and(query_param("text", "files"))
        .and(query_param("size", "10"))
        .and(query_param("popularity", "0.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total": 0,
            "objects": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NpmRegistryClient::with_base_urls(&server.uri(), &server.uri());
    let page = client
        .search_packages(
            "files",
            &PackageSearchOptions {
                size: Some(10),
                popularity_weight: Some(0.9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn npm_package_info_parses_registry_document() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fs-mcp-server"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(npm_package_doc("fs-mcp-server", "An MCP server")),
        )
        .mount(&server)
        .await;

    let client = NpmRegistryClient::with_base_urls(&server.uri(), &server.uri());
    let info = client.get_package_info("fs-mcp-server").await.unwrap();
    assert_eq!(info.name, "fs-mcp-server");
    assert!(info.latest_version().is_some());
    assert!(NpmRegistryClient::is_recently_maintained(&info));
}

#[tokio::test]
async fn npm_specific_version_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fs-mcp-server/0.9.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "fs-mcp-server",
            "version": "0.9.1",
            "main": "dist/index.js",
            "dependencies": {"@modelcontextprotocol/sdk": "^1.0.0"}
        })))
        .mount(&server)
        .await;

    let client = NpmRegistryClient::with_base_urls(&server.uri(), &server.uri());
    let manifest = client
        .get_package_version("fs-mcp-server", "0.9.1")
        .await
        .unwrap();
    assert_eq!(manifest.version, "0.9.1");
    assert_eq!(manifest.main.as_deref(), Some("dist/index.js"));
    assert!(manifest.dependencies.contains_key("@modelcontextprotocol/sdk"));
}

#[tokio::test]
async fn download_stats_degrade_to_zero_on_provider_error() {
    let server = MockServer::start().await;
    // Downloads endpoint serves nothing: every request 404s.

    let client = NpmRegistryClient::with_base_urls(&server.uri(), &server.uri());
    let stats = client.get_download_stats("fs-mcp-server", "last-month").await;
    assert_eq!(stats.downloads, 0);
    assert_eq!(stats.start, "");
}

#[tokio::test]
async fn download_stats_parse_when_available() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/point/last-month/fs-mcp-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "downloads": 4321,
            "start": "2026-07-01",
            "end": "2026-07-31",
            "package": "fs-mcp-server"
        })))
        .mount(&server)
        .await;

    let client = NpmRegistryClient::with_base_urls(&server.uri(), &server.uri());
    let stats = client.get_download_stats("fs-mcp-server", "last-month").await;
    assert_eq!(stats.downloads, 4321);
    assert_eq!(stats.start, "2026-07-01");
}
