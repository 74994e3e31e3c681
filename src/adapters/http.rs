use crate::domain::model::EntityDescriptor;
use crate::domain::ports::ArchiveFetcher;
use crate::utils::error::{ChaosError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("chaos-etl/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Streams archives over HTTP into `chaos-*.zip` temp files.
///
/// No timeout unless one is configured: a stalled server holds its worker
/// for as long as the connection stays open.
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    client: Client,
    temp_dir: Option<PathBuf>,
}

impl HttpArchiveFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            temp_dir: None,
        })
    }

    /// Create temp archives under `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn create_temp(&self) -> Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("chaos-").suffix(".zip");
        let temp = match &self.temp_dir {
            Some(dir) => builder
                .tempfile_in(dir)
                .map_err(|e| ChaosError::filesystem(dir, e))?,
            None => builder.tempfile()?,
        };
        Ok(temp)
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch(&self, entity: &EntityDescriptor) -> Result<PathBuf> {
        tracing::debug!("GET {}", entity.source_url);
        let mut response = self.client.get(&entity.source_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChaosError::HttpStatus {
                url: entity.source_url.clone(),
                status: status.as_u16(),
            });
        }

        // TempPath 在 drop 時刪除檔案，任何 `?` 提前返回都不會留下殘檔
        let (file, temp_path) = self.create_temp()?.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| ChaosError::filesystem(&temp_path, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ChaosError::filesystem(&temp_path, e))?;
        drop(file);

        let path = temp_path.keep().map_err(|e| ChaosError::Io(e.error))?;
        tracing::debug!("{}: {} bytes -> {}", entity.name, written, path.display());
        Ok(path)
    }
}
