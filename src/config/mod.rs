#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{Action, CliConfig};
pub use toml_config::TomlConfig;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ChaosError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INDEX_URL: &str = "https://chaos-data.projectdiscovery.io/index.json";
pub const DEFAULT_INDEX_CACHE: &str = "index.json";
pub const DEFAULT_CORPUS_ROOT: &str = "chaos";
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;
pub const MAX_WORKERS: usize = 4096;

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

/// Fully resolved settings: defaults, then the config file, then CLI flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub index_url: String,
    pub index_cache: PathBuf,
    pub corpus_root: PathBuf,
    pub workers: usize,
    pub max_line_bytes: usize,
    pub text_extensions: Vec<String>,
    pub fetch_timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            index_cache: PathBuf::from(DEFAULT_INDEX_CACHE),
            corpus_root: PathBuf::from(DEFAULT_CORPUS_ROOT),
            workers: default_workers(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            text_extensions: vec!["txt".to_string()],
            fetch_timeout: None,
            log_format: LogFormat::Compact,
        }
    }
}

impl Settings {
    pub fn merge_toml(mut self, file: &TomlConfig) -> Result<Self> {
        file.validate()?;

        if let Some(url) = &file.index.url {
            self.index_url = url.clone();
        }
        if let Some(cache) = &file.index.cache_file {
            self.index_cache = PathBuf::from(cache);
        }
        if let Some(root) = &file.corpus.root {
            self.corpus_root = PathBuf::from(root);
        }
        if let Some(extensions) = &file.corpus.text_extensions {
            self.text_extensions = extensions.clone();
        }
        if let Some(workers) = file.pipeline.workers {
            self.workers = workers;
        }
        if let Some(secs) = file.pipeline.fetch_timeout_seconds {
            self.fetch_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(limit) = file.search.max_line_bytes {
            self.max_line_bytes = limit;
        }
        if let Some(format) = &file.logging.format {
            self.log_format = format.parse::<LogFormat>().map_err(ChaosError::config)?;
        }
        Ok(self)
    }

    #[cfg(feature = "cli")]
    pub fn merge_cli(mut self, cli: &CliConfig) -> Self {
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(root) = &cli.root {
            self.corpus_root = PathBuf::from(root);
        }
        if let Some(cache) = &cli.index_cache {
            self.index_cache = PathBuf::from(cache);
        }
        if let Some(secs) = cli.timeout {
            self.fetch_timeout = Some(Duration::from_secs(secs));
        }
        if cli.log_json {
            self.log_format = LogFormat::Json;
        }
        self
    }

    #[cfg(feature = "cli")]
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let settings = match &cli.config {
            Some(path) => Self::default().merge_toml(&TomlConfig::from_file(path)?)?,
            None => Self::default(),
        };
        Ok(settings.merge_cli(cli))
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("index.url", &self.index_url)?;
        validation::validate_path("index.cache_file", &self.index_cache.to_string_lossy())?;
        validation::validate_path("corpus.root", &self.corpus_root.to_string_lossy())?;
        validation::validate_range("workers", self.workers, 1, MAX_WORKERS)?;
        validation::validate_positive_number("search.max_line_bytes", self.max_line_bytes, 1)?;
        validation::validate_extensions("corpus.text_extensions", &self.text_extensions)?;
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn index_url(&self) -> &str {
        &self.index_url
    }

    fn index_cache(&self) -> &Path {
        &self.index_cache
    }

    fn corpus_root(&self) -> &Path {
        &self.corpus_root
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    fn text_extensions(&self) -> &[String] {
        &self.text_extensions
    }

    fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }
}
