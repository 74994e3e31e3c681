use crate::adapters::http::build_client;
use crate::domain::model::EntityDescriptor;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ChaosError, Result};
use reqwest::Client;
use std::path::PathBuf;

/// Fetches the dataset index and keeps a copy on disk.
pub struct IndexClient {
    client: Client,
    url: String,
    cache_path: PathBuf,
}

impl IndexClient {
    pub fn new(url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            client: build_client(None)?,
            url: url.into(),
            cache_path: cache_path.into(),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(config.index_url(), config.index_cache())
    }

    pub fn has_cache(&self) -> bool {
        self.cache_path.is_file()
    }

    /// 下載 index.json 並覆寫快取
    pub async fn refresh(&self) -> Result<()> {
        tracing::info!("[*] Fetching index from {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChaosError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        // 先確認內容可解析，避免把錯誤頁面寫進快取
        decode_index(&body)?;

        if let Some(parent) = self.cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ChaosError::filesystem(parent, e))?;
        }
        tokio::fs::write(&self.cache_path, &body)
            .await
            .map_err(|e| ChaosError::filesystem(&self.cache_path, e))?;

        tracing::info!("[+] Index cached at {}", self.cache_path.display());
        Ok(())
    }

    pub async fn load(&self) -> Result<Vec<EntityDescriptor>> {
        let data = tokio::fs::read(&self.cache_path)
            .await
            .map_err(|e| ChaosError::filesystem(&self.cache_path, e))?;
        decode_index(&data)
    }

    pub async fn load_or_refresh(&self, force_refresh: bool) -> Result<Vec<EntityDescriptor>> {
        if force_refresh || !self.has_cache() {
            self.refresh().await?;
        }
        self.load().await
    }
}

pub fn decode_index(data: &[u8]) -> Result<Vec<EntityDescriptor>> {
    Ok(serde_json::from_slice(data)?)
}
