//! Interval-driven map refresh.
//!
//! There is no background task. Workers call
//! [`RefreshScheduler::maybe_refresh`] before each lookup; when the interval
//! has elapsed exactly one of them reloads the map while the others keep
//! reading the current table.

use crate::{LookupStats, MapLoader, MapStore, MapTable};
use fm_error::{classify_error, LoadPhase, Result};
use fm_types::RefreshMode;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock()
    }
}

/// Tracks when the next refresh is due.
///
/// A deadline past the range of [`Instant`] is never reached.
pub struct DueChecker {
    clock: Arc<dyn Clock>,
    interval: Duration,
    next_due: Mutex<Option<Instant>>,
}

impl DueChecker {
    /// Creates a checker whose first deadline is one interval from now.
    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let next_due = clock.now().checked_add(interval);
        Self {
            clock,
            interval,
            next_due: Mutex::new(next_due),
        }
    }

    /// Returns true once the deadline has been reached.
    pub fn is_due(&self) -> bool {
        match *self.next_due.lock() {
            Some(deadline) => self.clock.now() >= deadline,
            None => false,
        }
    }

    /// Sets the next deadline to one interval from now.
    pub fn reschedule(&self) {
        *self.next_due.lock() = self.clock.now().checked_add(self.interval);
    }

    /// Returns the next deadline, or `None` if it is out of range.
    pub fn next_due(&self) -> Option<Instant> {
        *self.next_due.lock()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for DueChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DueChecker")
            .field("interval", &self.interval)
            .field("next_due", &self.next_due())
            .finish_non_exhaustive()
    }
}

/// What a call to [`RefreshScheduler::maybe_refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The interval has not elapsed.
    NotDue,
    /// Another caller is already refreshing.
    InProgress,
    /// The map was reloaded; `entries` is the live table size afterwards.
    Refreshed { entries: usize },
    /// The reload failed and the previous table was kept.
    Failed,
}

/// Owns the map lifecycle: the initial load and periodic refreshes.
pub struct RefreshScheduler {
    loader: MapLoader,
    store: Arc<MapStore>,
    due: DueChecker,
    mode: RefreshMode,
    lock: tokio::sync::Mutex<()>,
    stats: Arc<LookupStats>,
}

impl RefreshScheduler {
    pub fn new(
        loader: MapLoader,
        store: Arc<MapStore>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        mode: RefreshMode,
        stats: Arc<LookupStats>,
    ) -> Self {
        Self {
            loader,
            store,
            due: DueChecker::new(clock, interval),
            mode,
            lock: tokio::sync::Mutex::new(()),
            stats,
        }
    }

    /// Loads the map for the first time.
    ///
    /// Any error is fatal: the caller must not start serving lookups.
    pub async fn initial_load(&self) -> Result<usize> {
        let table = match self.loader.load().await {
            Ok(table) => table,
            Err(e) => {
                let category = classify_error(&e, LoadPhase::Initial);
                error!(
                    source = %self.loader.source().location(),
                    phase = %LoadPhase::Initial,
                    category = ?category,
                    error = %e,
                    "Failed to load lookup map"
                );
                return Err(e);
            }
        };

        let entries = self.apply(table);
        self.stats.record_load(entries);
        self.due.reschedule();
        Ok(entries)
    }

    /// Refreshes the map if the interval has elapsed.
    ///
    /// Never blocks: if another caller holds the refresh, this returns
    /// [`RefreshOutcome::InProgress`] straight away.
    pub async fn maybe_refresh(&self) -> RefreshOutcome {
        if !self.due.is_due() {
            return RefreshOutcome::NotDue;
        }

        let Ok(_guard) = self.lock.try_lock() else {
            return RefreshOutcome::InProgress;
        };

        // Someone else may have refreshed between the check and the lock.
        if !self.due.is_due() {
            return RefreshOutcome::NotDue;
        }

        let outcome = self.refresh().await;
        self.due.reschedule();
        outcome
    }

    async fn refresh(&self) -> RefreshOutcome {
        debug!(source = %self.loader.source().location(), "Refreshing lookup map");

        match self.loader.load().await {
            Ok(table) => {
                let loaded = table.len();
                let entries = self.apply(table);
                self.stats.record_refresh_success(entries);
                info!(
                    source = %self.loader.source().location(),
                    mode = ?self.mode,
                    loaded = loaded,
                    entries = entries,
                    "Refreshed lookup map"
                );
                RefreshOutcome::Refreshed { entries }
            }
            Err(e) => {
                let category = classify_error(&e, LoadPhase::Refresh);
                self.stats.record_refresh_failure();
                warn!(
                    source = %self.loader.source().location(),
                    phase = %LoadPhase::Refresh,
                    category = ?category,
                    error = %e,
                    entries = self.store.len(),
                    "Failed to refresh lookup map, keeping previous table"
                );
                RefreshOutcome::Failed
            }
        }
    }

    fn apply(&self, table: MapTable) -> usize {
        match self.mode {
            RefreshMode::Merge => self.store.merge(&table),
            RefreshMode::Replace => self.store.replace(table),
        }
        self.store.len()
    }

    pub fn store(&self) -> &Arc<MapStore> {
        &self.store
    }

    pub fn due(&self) -> &DueChecker {
        &self.due
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("loader", &self.loader)
            .field("due", &self.due)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
