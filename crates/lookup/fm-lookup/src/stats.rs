//! Statistics for a lookup filter.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected by one lookup filter.
///
/// All counters are updated with relaxed atomics from any worker; the
/// snapshot is therefore only approximately consistent across fields.
#[derive(Debug, Default)]
pub struct LookupStats {
    /// Events the filter was applied to
    events_processed: AtomicU64,

    /// Events reported as matched
    events_matched: AtomicU64,

    /// Source fields whose value was found in the map
    fields_matched: AtomicU64,

    /// Source fields present in the event but absent from the map
    fields_missed: AtomicU64,

    /// Fallback values written on a miss
    fallbacks_applied: AtomicU64,

    /// Events left unmodified because of a lookup error
    lookup_errors: AtomicU64,

    refreshes_succeeded: AtomicU64,
    refreshes_failed: AtomicU64,

    /// Entries in the live table after the last successful load
    map_entries: AtomicU64,

    /// When the live table was last (re)loaded
    last_load_at: Mutex<Option<DateTime<Utc>>>,
}

impl LookupStats {
    /// Create an empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed event and its per-field results.
    pub fn record_event(&self, matched: bool, hits: u64, misses: u64, fallbacks: u64) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.events_matched.fetch_add(1, Ordering::Relaxed);
        }
        self.fields_matched.fetch_add(hits, Ordering::Relaxed);
        self.fields_missed.fetch_add(misses, Ordering::Relaxed);
        self.fallbacks_applied
            .fetch_add(fallbacks, Ordering::Relaxed);
    }

    /// Record an event that could not be processed.
    pub fn record_lookup_error(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        self.lookup_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful load; `entries` is the live table size afterwards.
    pub fn record_load(&self, entries: usize) {
        self.map_entries.store(entries as u64, Ordering::Relaxed);
        *self.last_load_at.lock() = Some(Utc::now());
    }

    /// Record a successful scheduled refresh.
    pub fn record_refresh_success(&self, entries: usize) {
        self.refreshes_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_load(entries);
    }

    /// Record a failed scheduled refresh.
    pub fn record_refresh_failure(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn events_matched(&self) -> u64 {
        self.events_matched.load(Ordering::Relaxed)
    }

    pub fn fields_matched(&self) -> u64 {
        self.fields_matched.load(Ordering::Relaxed)
    }

    pub fn fields_missed(&self) -> u64 {
        self.fields_missed.load(Ordering::Relaxed)
    }

    pub fn fallbacks_applied(&self) -> u64 {
        self.fallbacks_applied.load(Ordering::Relaxed)
    }

    pub fn lookup_errors(&self) -> u64 {
        self.lookup_errors.load(Ordering::Relaxed)
    }

    pub fn refreshes_succeeded(&self) -> u64 {
        self.refreshes_succeeded.load(Ordering::Relaxed)
    }

    pub fn refreshes_failed(&self) -> u64 {
        self.refreshes_failed.load(Ordering::Relaxed)
    }

    pub fn map_entries(&self) -> u64 {
        self.map_entries.load(Ordering::Relaxed)
    }

    pub fn last_load_at(&self) -> Option<DateTime<Utc>> {
        *self.last_load_at.lock()
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_processed: self.events_processed(),
            events_matched: self.events_matched(),
            fields_matched: self.fields_matched(),
            fields_missed: self.fields_missed(),
            fallbacks_applied: self.fallbacks_applied(),
            lookup_errors: self.lookup_errors(),
            refreshes_succeeded: self.refreshes_succeeded(),
            refreshes_failed: self.refreshes_failed(),
            map_entries: self.map_entries(),
            last_load_at: self.last_load_at(),
        }
    }
}

/// A serializable snapshot of lookup statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub events_processed: u64,
    pub events_matched: u64,
    pub fields_matched: u64,
    pub fields_missed: u64,
    pub fallbacks_applied: u64,
    pub lookup_errors: u64,
    pub refreshes_succeeded: u64,
    pub refreshes_failed: u64,
    pub map_entries: u64,
    pub last_load_at: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    /// Fraction of processed events that matched, if any were processed.
    pub fn match_rate(&self) -> Option<f64> {
        if self.events_processed == 0 {
            None
        } else {
            Some(self.events_matched as f64 / self.events_processed as f64)
        }
    }

    /// Adds another filter's counters into this one.
    ///
    /// `map_entries` is summed and `last_load_at` keeps the most recent load.
    pub fn accumulate(&mut self, other: &StatsSnapshot) {
        self.events_processed += other.events_processed;
        self.events_matched += other.events_matched;
        self.fields_matched += other.fields_matched;
        self.fields_missed += other.fields_missed;
        self.fallbacks_applied += other.fallbacks_applied;
        self.lookup_errors += other.lookup_errors;
        self.refreshes_succeeded += other.refreshes_succeeded;
        self.refreshes_failed += other.refreshes_failed;
        self.map_entries += other.map_entries;
        self.last_load_at = self.last_load_at.max(other.last_load_at);
    }
}
