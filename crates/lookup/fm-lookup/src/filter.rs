//! LookupFilter - the lookup stage as an [`EventFilter`].

use crate::{
    Clock, LookupEngine, LookupStats, MapLoader, MapStore, RefreshScheduler, StatsSnapshot,
    SystemClock,
};
use async_trait::async_trait;
use fm_error::{FmError, Result};
use fm_traits::{EventFilter, FilterStatus, MapSource};
use fm_types::{Event, LookupConfig};
use std::sync::Arc;
use tracing::{error, info};

/// A registered lookup stage.
///
/// Registration loads the map synchronously; a filter only exists once its
/// table is populated. Each call to [`filter`](EventFilter::filter) first
/// gives the scheduler a chance to refresh, then applies the lookup.
#[derive(Debug)]
pub struct LookupFilter {
    name: String,
    config: LookupConfig,
    engine: LookupEngine,
    scheduler: RefreshScheduler,
    stats: Arc<LookupStats>,
}

impl LookupFilter {
    /// Validates `config`, builds its source and performs the initial load.
    pub async fn register(config: LookupConfig) -> Result<Self> {
        config.validate().map_err(FmError::Config)?;
        let source = fm_source::build_source(&config.source, config.map_format())?;
        Self::with_source(config, source, Arc::new(SystemClock)).await
    }

    /// Like [`register`](Self::register) but with an explicit source and clock.
    pub async fn with_source(
        config: LookupConfig,
        source: Arc<dyn MapSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate().map_err(FmError::Config)?;

        let format = config.map_format();
        let name = format!("lookup[{}]", config.fields.join(","));
        let store = Arc::new(MapStore::new());
        let stats = Arc::new(LookupStats::new());

        let scheduler = RefreshScheduler::new(
            MapLoader::new(source, format),
            Arc::clone(&store),
            clock,
            config.refresh_interval(),
            config.refresh_mode,
            Arc::clone(&stats),
        );
        let entries = scheduler.initial_load().await?;

        info!(
            filter = %name,
            format = %format,
            entries = entries,
            refresh_interval_secs = config.refresh_interval_secs,
            "Registered lookup filter"
        );

        Ok(Self {
            name,
            engine: LookupEngine::new(&config, store),
            config,
            scheduler,
            stats,
        })
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Returns the live map.
    pub fn store(&self) -> &Arc<MapStore> {
        self.scheduler.store()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[async_trait]
impl EventFilter for LookupFilter {
    async fn filter(&self, event: &mut Event) -> FilterStatus {
        self.scheduler.maybe_refresh().await;

        let result = match self.engine.apply(event) {
            Ok(result) => result,
            Err(e) => {
                error!(
                    filter = %self.name,
                    fields = ?self.config.fields,
                    error = %e,
                    event = %serde_json::Value::Object(event.as_map().clone()),
                    "Failed to apply lookup, event left unmodified"
                );
                self.stats.record_lookup_error();
                return FilterStatus::Unmatched;
            }
        };

        self.stats.record_event(
            result.matched,
            result.hits() as u64,
            result.misses() as u64,
            result.fallbacks() as u64,
        );

        if result.matched {
            for tag in &self.config.add_tag {
                event.add_tag(tag);
            }
        }

        result.matched.into()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
