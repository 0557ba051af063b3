//! Event filter trait for per-event processing.

use async_trait::async_trait;
use fm_types::Event;
use std::sync::Arc;

/// Result of running a filter over one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    /// The filter applied successfully; the host may treat the event as enriched.
    Matched,

    /// The filter did not apply. The event may still have been modified
    /// (for example with a fallback value).
    Unmatched,
}

impl FilterStatus {
    /// Returns true for [`FilterStatus::Matched`].
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl From<bool> for FilterStatus {
    fn from(matched: bool) -> Self {
        if matched {
            Self::Matched
        } else {
            Self::Unmatched
        }
    }
}

/// Trait for event filters.
///
/// Filters mutate the event in place. Errors never cross this boundary: a
/// filter absorbs and logs its own failures and reports
/// [`FilterStatus::Unmatched`].
///
/// # Thread Safety
///
/// Filters must be `Send + Sync` as one instance is shared across workers.
#[async_trait]
pub trait EventFilter: Send + Sync {
    /// Applies the filter to an event.
    async fn filter(&self, event: &mut Event) -> FilterStatus;

    /// Returns the name of this filter for logging.
    fn name(&self) -> &str {
        "filter"
    }
}

#[async_trait]
impl<T: EventFilter + ?Sized> EventFilter for Arc<T> {
    async fn filter(&self, event: &mut Event) -> FilterStatus {
        (**self).filter(event).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A chain of filters applied in sequence.
///
/// The chain reports [`FilterStatus::Matched`] if any filter matched.
pub struct FilterChain {
    filters: Vec<Box<dyn EventFilter>>,
    name: String,
}

impl FilterChain {
    /// Creates a new empty filter chain.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            name: "chain".to_string(),
        }
    }

    /// Adds a filter to the chain.
    pub fn push(mut self, filter: Box<dyn EventFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the name of this chain.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns true if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns the number of filters in the chain.
    pub fn len(&self) -> usize {
        self.filters.len()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventFilter for FilterChain {
    async fn filter(&self, event: &mut Event) -> FilterStatus {
        let mut matched = false;
        for filter in &self.filters {
            matched |= filter.filter(event).await.is_matched();
        }
        matched.into()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
