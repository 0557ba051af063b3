//! On-disk cache of downloaded maps.
//!
//! Each download is written to `<digest>_temp.<ext>` next to the stable copy
//! `<digest>.<ext>`, where `<digest>` is the SHA-256 hex digest of the source
//! URL. The temporary file is only renamed over the stable copy once the
//! caller has decoded the content and commits the payload, so a corrupt
//! download never replaces the last good copy.

use async_trait::async_trait;
use fm_error::FetchError;
use fm_traits::{FetchedMap, MapSource, StagedFile};
use fm_types::MapFormat;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::debug;

/// Returns the cache file stem for a source location.
pub fn cache_key(location: &str) -> String {
    hex::encode(Sha256::digest(location.as_bytes()))
}

/// Wraps a source and stages every download in a cache directory.
pub struct CachedSource {
    inner: Box<dyn MapSource>,
    dir: PathBuf,
    key: String,
    extension: &'static str,
}

impl CachedSource {
    /// Wraps `inner`, caching into `dir` with the extension of `format`.
    pub fn new(inner: Box<dyn MapSource>, dir: impl Into<PathBuf>, format: MapFormat) -> Self {
        let key = cache_key(inner.location());
        Self {
            inner,
            dir: dir.into(),
            key,
            extension: format.extension(),
        }
    }

    /// Path of the last successfully decoded download.
    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.key, self.extension))
    }

    /// Path of the in-flight download.
    pub fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}_temp.{}", self.key, self.extension))
    }
}

impl std::fmt::Debug for CachedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSource")
            .field("location", &self.inner.location())
            .field("dir", &self.dir)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MapSource for CachedSource {
    async fn fetch(&self) -> Result<FetchedMap, FetchError> {
        let bytes = self.inner.fetch().await?.into_bytes();

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            FetchError::Io(format!(
                "Failed to create cache dir {}: {e}",
                self.dir.display()
            ))
        })?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            FetchError::Io(format!("Failed to write {}: {e}", temp_path.display()))
        })?;

        debug!(
            location = %self.inner.location(),
            path = %temp_path.display(),
            bytes = bytes.len(),
            "Staged map download"
        );

        let staged = StagedFile::new(temp_path, self.cache_path());
        Ok(FetchedMap::with_staged(bytes, staged))
    }

    fn location(&self) -> &str {
        self.inner.location()
    }

    fn name(&self) -> &str {
        "cached"
    }
}
