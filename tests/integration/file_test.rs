//! Lookups backed by local map files.

use crate::common::{event, map_file, STATUS_CSV, STATUS_JSON, STATUS_YAML};
use fm_error::{classify_error, ErrorCategory, FmError, LoadPhase};
use fm_lookup::LookupFilter;
use fm_traits::{EventFilter, FilterChain};
use fm_types::{LookupConfig, MapFormat, Placement, SourceConfig};
use serde_json::json;
use std::sync::Arc;

fn file_config(fields: &[&str], path: &std::path::Path) -> LookupConfig {
    LookupConfig::new(
        fields.iter().map(|f| f.to_string()).collect(),
        SourceConfig::file(path.to_str().unwrap()),
    )
}

#[tokio::test]
async fn test_status_lookup_in_every_format() {
    for (suffix, content) in [(".yml", STATUS_YAML), (".json", STATUS_JSON), (".csv", STATUS_CSV)] {
        let file = map_file(suffix, content);
        let filter = LookupFilter::register(file_config(&["status"], file.path()))
            .await
            .unwrap();
        assert_eq!(filter.store().len(), 4, "format {suffix}");

        let mut event = event(json!({"status": "200"}));
        assert!(filter.filter(&mut event).await.is_matched(), "format {suffix}");
        assert_eq!(
            event.get("[lookup_result][status]"),
            Some(&json!("OK")),
            "format {suffix}"
        );
    }
}

#[tokio::test]
async fn test_explicit_format_beats_suffix() {
    let file = map_file(".txt", STATUS_CSV);
    let config = file_config(&["status"], file.path()).with_format(MapFormat::Csv);
    let filter = LookupFilter::register(config).await.unwrap();

    let mut event = event(json!({"status": "500"}));
    assert!(filter.filter(&mut event).await.is_matched());
    assert_eq!(
        event.get("[lookup_result][status]"),
        Some(&json!("Server Error"))
    );
}

#[tokio::test]
async fn test_default_value_interpolates_event_field() {
    let file = map_file(".yml", STATUS_YAML);
    let config =
        file_config(&["status"], file.path()).with_default_value("status", "%{missing_mapping}");
    let filter = LookupFilter::register(config).await.unwrap();

    let mut event = event(json!({"status": "250", "missing_mapping": "missing no match"}));
    assert!(!filter.filter(&mut event).await.is_matched());
    assert_eq!(
        event.get("[lookup_result][status]"),
        Some(&json!("missing no match"))
    );
}

#[tokio::test]
async fn test_malformed_map_fails_registration() {
    let cases = [
        (".yml", "'200': OK\n'300': Redirect\n'400', Client Error\n'500': Server Error"),
        (".json", r#"{"200": "OK", "300": "Redirect", "400", "Client Error"}"#),
        (".csv", "200OK\n300,Redirect\n400,Client Error\n500:Server Error\n"),
    ];

    for (suffix, content) in cases {
        let file = map_file(suffix, content);
        let err = LookupFilter::register(file_config(&["status"], file.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, FmError::Decode(_)), "format {suffix}: {err}");
        assert_eq!(classify_error(&err, LoadPhase::Initial), ErrorCategory::Fatal);
    }
}

#[tokio::test]
async fn test_single_field_with_fallback() {
    let file = map_file(".csv", STATUS_CSV);
    let config = LookupConfig::single(
        "[http][status]",
        "[http][reason]",
        SourceConfig::file(file.path().to_str().unwrap()),
    )
    .with_fallback("no match for %{[http][status]}")
    .with_add_tag("status_mapped");
    let filter = LookupFilter::register(config).await.unwrap();

    let mut hit = event(json!({"http": {"status": "400"}}));
    assert!(filter.filter(&mut hit).await.is_matched());
    assert_eq!(hit.get("[http][reason]"), Some(&json!("Client Error")));
    assert_eq!(hit.tags(), vec!["status_mapped"]);

    let mut miss = event(json!({"http": {"status": 418}}));
    assert!(filter.filter(&mut miss).await.is_matched());
    assert_eq!(miss.get("[http][reason]"), Some(&json!("no match for 418")));
}

#[tokio::test]
async fn test_chained_lookups() {
    let status_file = map_file(".yml", STATUS_YAML);
    let methods_file = map_file(".json", r#"{"GET": "read", "POST": "write"}"#);

    let status = LookupFilter::register(
        file_config(&["status"], status_file.path()).with_placement(Placement::OverwriteSource),
    )
    .await
    .unwrap();
    let methods = LookupFilter::register(LookupConfig::single(
        "method",
        "access",
        SourceConfig::file(methods_file.path().to_str().unwrap()),
    ))
    .await
    .unwrap();

    let status = Arc::new(status);
    let chain = FilterChain::new()
        .push(Box::new(Arc::clone(&status)))
        .push(Box::new(methods));

    let mut event = event(json!({"status": "300", "method": "POST"}));
    assert!(chain.filter(&mut event).await.is_matched());
    assert_eq!(
        event.into_value(),
        json!({"status": "Redirect", "method": "POST", "access": "write"})
    );
    assert_eq!(status.stats().events_matched, 1);
}
