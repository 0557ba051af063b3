//! Scheduled refresh behaviour against a live web service.

use crate::common::{event, MapServer};
use axum::http::StatusCode;
use fm_lookup::{LookupFilter, ManualClock, RefreshOutcome};
use fm_traits::EventFilter;
use fm_types::{LookupConfig, RefreshMode, SourceConfig, WebSourceConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(300);

async fn filter_for(
    server: &MapServer,
    mode: RefreshMode,
) -> (Arc<LookupFilter>, Arc<ManualClock>) {
    let config = LookupConfig::new(
        vec!["status".into()],
        SourceConfig::Webservice(WebSourceConfig::new(server.url("/status.yml"))),
    )
    .with_refresh_mode(mode);

    let source = fm_source::build_source(&config.source, config.map_format()).unwrap();
    let clock = Arc::new(ManualClock::new());
    let filter = LookupFilter::with_source(config, source, clock.clone())
        .await
        .unwrap();
    (Arc::new(filter), clock)
}

async fn lookup(filter: &LookupFilter, status: &str) -> Option<serde_json::Value> {
    let mut event = event(json!({"status": status}));
    filter.filter(&mut event).await;
    event.get("[lookup_result][status]").cloned()
}

#[tokio::test]
async fn test_merge_keeps_keys_dropped_by_later_cycle() {
    let server = MapServer::start().await;
    server.set_body("/status.yml", "'200': OK\n'300': Redirect\n");
    let (filter, clock) = filter_for(&server, RefreshMode::Merge).await;

    server.set_body("/status.yml", "'200': Success\n'404': Not Found\n");

    // Not due yet: the old mapping is served and nothing is fetched.
    assert_eq!(lookup(&filter, "200").await, Some(json!("OK")));
    assert_eq!(server.hits(), 1);

    clock.advance(INTERVAL);
    assert_eq!(lookup(&filter, "200").await, Some(json!("Success")));
    assert_eq!(lookup(&filter, "300").await, Some(json!("Redirect")));
    assert_eq!(lookup(&filter, "404").await, Some(json!("Not Found")));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_replace_evicts_keys_dropped_by_later_cycle() {
    let server = MapServer::start().await;
    server.set_body("/status.yml", "'200': OK\n'300': Redirect\n");
    let (filter, clock) = filter_for(&server, RefreshMode::Replace).await;

    server.set_body("/status.yml", "'200': Success\n");
    clock.advance(INTERVAL);

    assert_eq!(lookup(&filter, "200").await, Some(json!("Success")));
    assert_eq!(lookup(&filter, "300").await, None);
    assert_eq!(filter.store().len(), 1);
}

#[tokio::test]
async fn test_outage_keeps_table_and_retries_next_interval() {
    let server = MapServer::start().await;
    server.set_body("/status.yml", "'200': OK\n");
    let (filter, clock) = filter_for(&server, RefreshMode::Merge).await;

    server.set_response("/status.yml", StatusCode::SERVICE_UNAVAILABLE, "down");
    clock.advance(INTERVAL);
    assert_eq!(lookup(&filter, "200").await, Some(json!("OK")));
    assert_eq!(server.hits(), 2);

    // The failed attempt still pushed the deadline out.
    assert_eq!(lookup(&filter, "200").await, Some(json!("OK")));
    assert_eq!(server.hits(), 2);

    server.set_body("/status.yml", "'200': Success\n");
    clock.advance(INTERVAL);
    assert_eq!(lookup(&filter, "200").await, Some(json!("Success")));

    let stats = filter.stats();
    assert_eq!(stats.refreshes_failed, 1);
    assert_eq!(stats.refreshes_succeeded, 1);
    assert!(stats.last_load_at.is_some());
}

#[tokio::test]
async fn test_scheduler_reports_outcomes() {
    let server = MapServer::start().await;
    server.set_body("/status.yml", "'200': OK\n");
    let (filter, clock) = filter_for(&server, RefreshMode::Merge).await;

    assert_eq!(
        filter.scheduler().maybe_refresh().await,
        RefreshOutcome::NotDue
    );

    clock.advance(INTERVAL);
    assert_eq!(
        filter.scheduler().maybe_refresh().await,
        RefreshOutcome::Refreshed { entries: 1 }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workers_refresh_once() {
    let server = MapServer::start().await;
    server.set_body("/status.yml", "'200': OK\n");
    let (filter, clock) = filter_for(&server, RefreshMode::Merge).await;

    server.set_body("/status.yml", "'200': Success\n");
    clock.advance(INTERVAL);

    let workers: Vec<_> = (0..16)
        .map(|_| {
            let filter = Arc::clone(&filter);
            tokio::spawn(async move {
                let value = lookup(&filter, "200").await;
                assert!(
                    value == Some(json!("OK")) || value == Some(json!("Success")),
                    "unexpected value {value:?}"
                );
            })
        })
        .collect();

    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(server.hits(), 2);
    assert_eq!(lookup(&filter, "200").await, Some(json!("Success")));
    assert_eq!(filter.stats().events_processed, 17);
}
