//! Shared utilities for fieldmap CLI binaries.
//!
//! Logging setup, the `--log-level` argument and summary formatting used by
//! `fm-lookup`.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_number, format_percent};
pub use logging::init_logging;
