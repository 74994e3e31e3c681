use crate::domain::model::EntityDescriptor;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub trait ConfigProvider: Send + Sync {
    fn index_url(&self) -> &str;
    fn index_cache(&self) -> &Path;
    fn corpus_root(&self) -> &Path;
    fn workers(&self) -> usize;
    fn max_line_bytes(&self) -> usize;
    fn text_extensions(&self) -> &[String];
    fn fetch_timeout(&self) -> Option<Duration>;
}

/// Downloads one entity's archive to a temporary file.
///
/// On success the caller owns the returned path and must remove it. On error
/// no temporary file is left behind.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, entity: &EntityDescriptor) -> Result<PathBuf>;
}

/// Consolidates the text members of an archive into `dest_dir`.
///
/// Runs on the blocking pool. Returns the path of the consolidated file.
pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<PathBuf>;
}
