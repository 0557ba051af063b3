//! Common utilities for integration tests.
//!
//! This module provides an in-process map server and helpers for writing
//! map files and building events.

pub mod map_server;

pub use map_server::{MapServer, RecordedRequest};

use fm_types::Event;
use std::io::Write;
use tempfile::NamedTempFile;

/// The status map used across tests, in each supported format.
pub const STATUS_YAML: &str = "'200': OK\n'300': Redirect\n'400': Client Error\n'500': Server Error\n";
pub const STATUS_JSON: &str =
    r#"{"200": "OK", "300": "Redirect", "400": "Client Error", "500": "Server Error"}"#;
pub const STATUS_CSV: &str = "200,OK\n300,Redirect\n400,Client Error\n500,Server Error\n";

/// Writes `content` to a temp file ending in `suffix`.
pub fn map_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("fieldmap-")
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Builds an event from a JSON object literal.
pub fn event(value: serde_json::Value) -> Event {
    Event::from_value(value).expect("event must be a JSON object")
}
