//! Integration tests for fieldmap.
//!
//! Web service tests run against an in-process HTTP server bound to a random
//! local port, so no external services are needed.
//!
//! ## Running Integration Tests
//!
//! ```bash
//! cargo test -p integration-tests
//! ```

mod common;
mod file_test;
mod refresh_test;
mod web_test;
