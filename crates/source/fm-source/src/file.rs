//! Local file map source.

use async_trait::async_trait;
use fm_error::FetchError;
use fm_traits::{FetchedMap, MapSource};
use std::path::Path;
use tracing::debug;

/// Reads the whole map file on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: String,
}

impl FileSource {
    /// Creates a source for the file at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MapSource for FileSource {
    async fn fetch(&self) -> Result<FetchedMap, FetchError> {
        let path = Path::new(&self.path);
        if !path.exists() {
            return Err(FetchError::NotFound(path.display().to_string()));
        }

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| FetchError::Io(format!("Failed to read {}: {e}", path.display())))?;

        debug!(path = %path.display(), bytes = content.len(), "Read map file");
        Ok(FetchedMap::new(content))
    }

    fn location(&self) -> &str {
        &self.path
    }

    fn name(&self) -> &str {
        "file"
    }
}
