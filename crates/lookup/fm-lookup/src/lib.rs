//! Lookup map lifecycle and field substitution for fieldmap.
//!
//! This crate provides the pieces of a lookup filter:
//! - [`MapTable`] - Exact-match table from string keys to JSON values
//! - [`decode`] - YAML, JSON and CSV decoders producing a [`MapTable`]
//! - [`MapStore`] - The live table, read lock-free and updated atomically
//! - [`MapLoader`] - Fetch, decode and commit in one step
//! - [`RefreshScheduler`] - Interval-driven reloads checked on the event path
//! - [`LookupEngine`] - Per-event matching, fallbacks and result placement
//! - [`LookupFilter`] - All of the above behind the [`EventFilter`] trait
//!
//! # Example
//!
//! ```rust,ignore
//! use fm_lookup::LookupFilter;
//! use fm_types::{Event, LookupConfig, SourceConfig};
//! use fm_traits::EventFilter;
//!
//! let config = LookupConfig::new(vec!["status".into()], SourceConfig::file("status.yml"));
//! let filter = LookupFilter::register(config).await?;
//!
//! let mut event = Event::from_value(serde_json::json!({"status": "200"})).unwrap();
//! let status = filter.filter(&mut event).await;
//! ```
//!
//! [`EventFilter`]: fm_traits::EventFilter

mod decoder;
mod engine;
mod filter;
mod loader;
mod scheduler;
mod stats;
mod store;
mod table;

pub use decoder::decode;
pub use engine::{FieldOutcome, FieldResult, LookupEngine, LookupResult};
pub use filter::LookupFilter;
pub use loader::MapLoader;
pub use scheduler::{Clock, DueChecker, ManualClock, RefreshOutcome, RefreshScheduler, SystemClock};
pub use stats::{LookupStats, StatsSnapshot};
pub use store::MapStore;
pub use table::MapTable;
