//! Map loading: fetch, decode, commit.

use crate::{decode, MapTable};
use fm_error::Result;
use fm_traits::MapSource;
use fm_types::MapFormat;
use std::sync::Arc;
use tracing::{info, warn};

/// Loads a complete [`MapTable`] from a source.
///
/// A load either yields the whole decoded table or an error. Cached
/// downloads are only committed once decoding succeeded.
#[derive(Clone)]
pub struct MapLoader {
    source: Arc<dyn MapSource>,
    format: MapFormat,
}

impl MapLoader {
    /// Creates a loader decoding `source` as `format`.
    pub fn new(source: Arc<dyn MapSource>, format: MapFormat) -> Self {
        Self { source, format }
    }

    /// Returns the underlying source.
    pub fn source(&self) -> &Arc<dyn MapSource> {
        &self.source
    }

    /// Returns the decode format.
    pub fn format(&self) -> MapFormat {
        self.format
    }

    /// Fetches and decodes the map.
    pub async fn load(&self) -> Result<MapTable> {
        let fetched = self.source.fetch().await?;
        let table = decode(self.format, fetched.bytes())?;

        if let Err(e) = fetched.commit() {
            warn!(
                source = %self.source.location(),
                error = %e,
                "Failed to update cached map copy"
            );
        }

        info!(
            source = %self.source.location(),
            kind = %self.source.name(),
            format = %self.format,
            entries = table.len(),
            "Loaded lookup map"
        );

        Ok(table)
    }
}

impl std::fmt::Debug for MapLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapLoader")
            .field("source", &self.source.location())
            .field("format", &self.format)
            .finish()
    }
}
