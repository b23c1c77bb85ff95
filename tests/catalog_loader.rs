//! Tests for the catalog loader: shape normalization, cache semantics,
//! and failure handling — all against a local wiremock server.

use geoscout::catalog::{CatalogService, SearchOutcome};
use geoscout::config::CatalogConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> CatalogService {
    CatalogService::new(&CatalogConfig {
        url: format!("{}/catalog.json", server.uri()),
        fetch_timeout_secs: 5,
    })
}

fn sample_entries() -> serde_json::Value {
    serde_json::json!([
        {
            "id": "modis-ndvi",
            "title": "MODIS NDVI Composites",
            "description": "16-day vegetation index composites",
            "sample_code_url": "https://example.com/modis-ndvi"
        },
        {
            "id": "srtm-dem",
            "title": "SRTM Digital Elevation Model",
            "description": "30m global elevation data",
            "sample_code_url": "https://example.com/srtm"
        }
    ])
}

async fn mount_catalog(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/catalog.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Shape normalization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn loads_top_level_array() {
    let server = MockServer::start().await;
    mount_catalog(&server, sample_entries()).await;

    let svc = service_for(&server);
    let records = svc.load().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id.as_deref(), Some("modis-ndvi"));
    assert_eq!(records[1].title.as_deref(), Some("SRTM Digital Elevation Model"));
}

#[tokio::test]
async fn loads_object_with_datasets_array() {
    let server = MockServer::start().await;
    mount_catalog(&server, serde_json::json!({ "datasets": sample_entries() })).await;

    let svc = service_for(&server);
    let records = svc.load().await;
    assert_eq!(records.len(), 2);
    assert!(svc.is_loaded().await);
}

#[tokio::test]
async fn non_string_fields_are_treated_as_absent() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        serde_json::json!([
            { "id": 42, "title": "Numeric Id", "sample_code_url": "https://example.com/x" }
        ]),
    )
    .await;

    let svc = service_for(&server);
    let records = svc.load().await;
    assert_eq!(records.len(), 1);
    assert!(records[0].id.is_none());
    assert_eq!(records[0].title.as_deref(), Some("Numeric Id"));
}

#[tokio::test]
async fn object_without_datasets_is_a_format_failure() {
    let server = MockServer::start().await;
    mount_catalog(&server, serde_json::json!({ "items": [] })).await;

    let svc = service_for(&server);
    assert!(svc.load().await.is_empty());
    assert!(!svc.is_loaded().await);
    assert!(svc.get_keywords().await.is_none());
}

#[tokio::test]
async fn malformed_json_yields_empty_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json {"))
        .mount(&server)
        .await;

    let svc = service_for(&server);
    assert!(svc.load().await.is_empty());
    assert!(!svc.is_loaded().await);
}

// ---------------------------------------------------------------------------
// Cache semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_load_is_memoized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&sample_entries()))
        .expect(1)
        .mount(&server)
        .await;

    let svc = service_for(&server);
    assert_eq!(svc.load().await.len(), 2);
    // Second call must not hit the network (expect(1) verifies on drop).
    assert_eq!(svc.load().await.len(), 2);
    assert!(svc.get_keywords().await.is_some());
}

#[tokio::test]
async fn failed_fetch_does_not_poison_the_cache() {
    let server = MockServer::start().await;

    // First request fails with a 500…
    Mock::given(method("GET"))
        .and(path("/catalog.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // …subsequent requests succeed.
    mount_catalog(&server, sample_entries()).await;

    let svc = service_for(&server);
    assert!(svc.load().await.is_empty());
    assert!(!svc.is_loaded().await);

    // Retry on next call succeeds and caches.
    let records = svc.load().await;
    assert_eq!(records.len(), 2);
    assert!(svc.is_loaded().await);
}

#[tokio::test]
async fn invalidate_forces_a_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&sample_entries()))
        .expect(2)
        .mount(&server)
        .await;

    let svc = service_for(&server);
    assert_eq!(svc.load().await.len(), 2);
    svc.invalidate().await;
    assert!(!svc.is_loaded().await);
    assert_eq!(svc.load().await.len(), 2);
}

// ---------------------------------------------------------------------------
// Search through the service
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_against_unavailable_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let svc = service_for(&server);
    let outcome = svc.search(&["flood".into()]).await;
    assert_eq!(outcome, SearchOutcome::CatalogUnavailable);

    // Keyword validation still wins over catalog state.
    let outcome = svc.search(&[]).await;
    assert_eq!(outcome, SearchOutcome::NoValidKeywords);
}

#[tokio::test]
async fn search_against_loaded_catalog() {
    let server = MockServer::start().await;
    mount_catalog(&server, sample_entries()).await;

    let svc = service_for(&server);
    let outcome = svc.search(&["elevation".into()]).await;
    let SearchOutcome::Matches(matches) = outcome else {
        panic!("expected matches, got {outcome:?}");
    };
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "srtm-dem");
}

#[tokio::test]
async fn keywords_derived_from_loaded_catalog() {
    let server = MockServer::start().await;
    mount_catalog(&server, sample_entries()).await;

    let svc = service_for(&server);
    let vocab = svc.get_keywords().await.expect("vocabulary");
    assert!(vocab.contains(&"vegetation".to_string()));
    assert!(vocab.contains(&"elevation".to_string()));
    let mut sorted = vocab.clone();
    sorted.sort();
    assert_eq!(vocab, sorted);
}
