//! Core traits for fieldmap.
//!
//! This crate defines the main abstractions for the lookup stage:
//! - [`MapSource`] - Trait for map data sources (file, web service)
//! - [`EventFilter`] - Trait for per-event filters, and [`FilterChain`]

pub mod filter;
pub mod source;

pub use filter::*;
pub use source::*;
