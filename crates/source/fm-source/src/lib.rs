//! Map sources for fieldmap.
//!
//! This crate provides [`MapSource`](fm_traits::MapSource) implementations:
//! - [`FileSource`] - Reads a local map file
//! - [`WebSource`] - Issues a GET or POST against a web service
//! - [`CachedSource`] - Persists downloads to disk, promoting them only once
//!   they decoded successfully
//!
//! [`build_source`] picks the right one from a [`SourceConfig`].

mod cache;
mod file;
mod web;

pub use cache::{cache_key, CachedSource};
pub use file::FileSource;
pub use web::WebSource;

use fm_error::Result;
use fm_traits::MapSource;
use fm_types::{MapFormat, SourceConfig};
use std::sync::Arc;

/// Builds the source described by `config`.
///
/// Web sources with a `cache_dir` are wrapped in a [`CachedSource`] whose
/// file extension follows `format`.
pub fn build_source(config: &SourceConfig, format: MapFormat) -> Result<Arc<dyn MapSource>> {
    match config {
        SourceConfig::File(file) => Ok(Arc::new(FileSource::new(&file.path))),
        SourceConfig::Webservice(web) => {
            let source = WebSource::new(web.clone())?;
            match &web.cache_dir {
                Some(dir) => Ok(Arc::new(CachedSource::new(
                    Box::new(source),
                    dir.clone(),
                    format,
                ))),
                None => Ok(Arc::new(source)),
            }
        }
    }
}
