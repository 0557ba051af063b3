//! Core types for fieldmap.
//!
//! This crate provides the foundational types used throughout the system:
//! - [`Event`] - A pipeline event backed by a JSON object
//! - [`LookupConfig`] - Per-instance configuration of a lookup filter
//! - [`SourceConfig`] - Where map data is fetched from
//! - [`MapFormat`] - Encoding of map data (YAML, JSON, CSV)

pub mod config;
pub mod event;

pub use config::*;
pub use event::*;
