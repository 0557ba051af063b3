//! Map source trait for fetching raw map data.

use async_trait::async_trait;
use bytes::Bytes;
use fm_error::FetchError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Trait for sources of raw map data.
///
/// A source only retrieves bytes; decoding and merging happen in the caller.
/// No retries happen at this layer, failures are returned as-is so the caller
/// can decide whether they are fatal.
///
/// # Thread Safety
///
/// Sources must be `Send + Sync` as a filter shared across workers may
/// trigger a refresh from any of them.
#[async_trait]
pub trait MapSource: Send + Sync {
    /// Fetches the complete raw content of the map.
    async fn fetch(&self) -> Result<FetchedMap, FetchError>;

    /// Returns the path or URL this source reads from, for logging.
    fn location(&self) -> &str;

    /// Returns the kind of this source for logging.
    fn name(&self) -> &str {
        "source"
    }
}

/// Raw map bytes returned by a [`MapSource`].
///
/// Sources that persist downloads attach a [`StagedFile`]; the caller commits
/// it after the content decoded successfully. Dropping an uncommitted payload
/// discards the staged file.
#[derive(Debug)]
pub struct FetchedMap {
    bytes: Bytes,
    staged: Option<StagedFile>,
}

impl FetchedMap {
    /// Creates a payload with no staged file.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            staged: None,
        }
    }

    /// Creates a payload backed by a staged file.
    pub fn with_staged(bytes: impl Into<Bytes>, staged: StagedFile) -> Self {
        Self {
            bytes: bytes.into(),
            staged: Some(staged),
        }
    }

    /// Returns the raw content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the content length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the staged file, if any.
    pub fn staged(&self) -> Option<&StagedFile> {
        self.staged.as_ref()
    }

    /// Consumes the payload and returns the raw content, discarding any staged file.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Marks the content as good, promoting any staged file.
    pub fn commit(self) -> Result<(), FetchError> {
        if let Some(staged) = self.staged {
            staged.promote()?;
        }
        Ok(())
    }
}

/// A downloaded file waiting to replace a stable copy.
///
/// [`promote`](Self::promote) renames the temporary file over the final path.
/// If the value is dropped without promotion the temporary file is removed,
/// leaving any previous final file untouched.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    final_path: PathBuf,
    promoted: bool,
}

impl StagedFile {
    /// Creates a staged file. The temporary file must already be written.
    pub fn new(temp_path: impl Into<PathBuf>, final_path: impl Into<PathBuf>) -> Self {
        Self {
            temp_path: temp_path.into(),
            final_path: final_path.into(),
            promoted: false,
        }
    }

    /// Returns the temporary path.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Returns the path the file is promoted to.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Atomically renames the temporary file to the final path.
    pub fn promote(mut self) -> Result<PathBuf, FetchError> {
        std::fs::rename(&self.temp_path, &self.final_path).map_err(|e| {
            FetchError::Io(format!(
                "Failed to promote {} to {}: {e}",
                self.temp_path.display(),
                self.final_path.display()
            ))
        })?;
        self.promoted = true;

        debug!(path = %self.final_path.display(), "Promoted staged map file");
        Ok(self.final_path.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.promoted {
            return;
        }
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => debug!(path = %self.temp_path.display(), "Discarded staged map file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.temp_path.display(),
                error = %e,
                "Failed to remove staged map file"
            ),
        }
    }
}
