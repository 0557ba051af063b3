//! Lookups backed by web service maps.

use crate::common::{event, MapServer, STATUS_CSV, STATUS_JSON, STATUS_YAML};
use axum::http::{Method, StatusCode};
use fm_error::{classify_error, ErrorCategory, FetchError, FmError, LoadPhase};
use fm_lookup::{LookupFilter, ManualClock};
use fm_source::{build_source, cache_key};
use fm_traits::{EventFilter, MapSource};
use fm_types::{HttpMethod, LookupConfig, SourceConfig, WebSourceConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn web_config(web: WebSourceConfig) -> LookupConfig {
    LookupConfig::new(vec!["status".into()], SourceConfig::Webservice(web))
}

#[tokio::test]
async fn test_status_lookup_in_every_format() {
    let server = MapServer::start().await;
    server.set_body("/maps/status.yml", STATUS_YAML);
    server.set_body("/maps/status.json", STATUS_JSON);
    server.set_body("/maps/status.csv", STATUS_CSV);

    for path in ["/maps/status.yml", "/maps/status.json", "/maps/status.csv"] {
        let config = web_config(WebSourceConfig::new(server.url(path)));
        let filter = LookupFilter::register(config).await.unwrap();

        let mut event = event(json!({"status": "200"}));
        assert!(filter.filter(&mut event).await.is_matched(), "map {path}");
        assert_eq!(
            event.get("[lookup_result][status]"),
            Some(&json!("OK")),
            "map {path}"
        );
    }
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_format_inferred_from_url_path_only() {
    let server = MapServer::start().await;
    server.set_body("/maps/status.json", STATUS_JSON);

    let url = format!("{}?version=2#latest", server.url("/maps/status.json"));
    let filter = LookupFilter::register(web_config(WebSourceConfig::new(url)))
        .await
        .unwrap();

    assert_eq!(filter.store().len(), 4);
    let request = server.last_request().unwrap();
    assert_eq!(request.query.as_deref(), Some("version=2"));
}

#[tokio::test]
async fn test_get_sends_headers_and_query_params() {
    let server = MapServer::start().await;
    server.set_body("/maps/status", STATUS_YAML);

    let web = WebSourceConfig::new(server.url("/maps/status"))
        .with_header("x-api-key", "secret")
        .with_param("table", "http_status");
    LookupFilter::register(web_config(web)).await.unwrap();

    let request = server.last_request().unwrap();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.query.as_deref(), Some("table=http_status"));
    assert_eq!(request.headers.get("x-api-key").unwrap(), "secret");
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_post_sends_form_params() {
    let server = MapServer::start().await;
    server.set_body("/maps/status.csv", STATUS_CSV);

    let web = WebSourceConfig::new(server.url("/maps/status.csv"))
        .with_method(HttpMethod::Post)
        .with_param("table", "http_status")
        .with_param("region", "eu west");
    let filter = LookupFilter::register(web_config(web)).await.unwrap();
    assert_eq!(filter.store().len(), 4);

    let request = server.last_request().unwrap();
    assert_eq!(request.method, Method::POST);
    assert!(request.query.is_none());
    assert_eq!(request.body, "region=eu+west&table=http_status");
    assert_eq!(
        request.headers.get("content-type").unwrap(),
        "application/x-www-form-urlencoded"
    );
}

#[tokio::test]
async fn test_error_status_fails_registration() {
    let server = MapServer::start().await;
    server.set_response("/maps/status.yml", StatusCode::INTERNAL_SERVER_ERROR, "boom");

    let config = web_config(WebSourceConfig::new(server.url("/maps/status.yml")));
    let err = LookupFilter::register(config).await.unwrap_err();

    assert!(matches!(err, FmError::Fetch(FetchError::Network(_))));
    assert_eq!(classify_error(&err, LoadPhase::Initial), ErrorCategory::Fatal);
}

#[tokio::test]
async fn test_cache_keeps_last_good_download() {
    let server = MapServer::start().await;
    server.set_body("/maps/status.json", STATUS_JSON);
    let cache_dir = tempfile::tempdir().unwrap();

    let url = server.url("/maps/status.json");
    let config = web_config(
        WebSourceConfig::new(url.clone()).with_cache_dir(cache_dir.path().to_path_buf()),
    )
    .with_refresh_interval(30);
    let source = build_source(&config.source, config.map_format()).unwrap();
    assert_eq!(source.name(), "cached");

    let clock = Arc::new(ManualClock::new());
    let filter = LookupFilter::with_source(config, source, clock.clone())
        .await
        .unwrap();

    let cached = cache_dir.path().join(format!("{}.json", cache_key(&url)));
    let temp = cache_dir.path().join(format!("{}_temp.json", cache_key(&url)));
    assert_eq!(std::fs::read_to_string(&cached).unwrap(), STATUS_JSON);
    assert!(!temp.exists());

    // A corrupt download is discarded and the cached copy survives.
    server.set_body("/maps/status.json", r#"{"200": "OK", "#);
    clock.advance(Duration::from_secs(30));

    let mut event = event(json!({"status": "400"}));
    assert!(filter.filter(&mut event).await.is_matched());
    assert_eq!(filter.stats().refreshes_failed, 1);
    assert_eq!(std::fs::read_to_string(&cached).unwrap(), STATUS_JSON);
    assert!(!temp.exists());

    // A good download replaces it.
    server.set_body("/maps/status.json", r#"{"418": "Teapot"}"#);
    clock.advance(Duration::from_secs(30));

    let mut event = crate::common::event(json!({"status": "418"}));
    assert!(filter.filter(&mut event).await.is_matched());
    assert_eq!(
        std::fs::read_to_string(&cached).unwrap(),
        r#"{"418": "Teapot"}"#
    );
    assert_eq!(server.hits(), 3);
}
