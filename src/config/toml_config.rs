use crate::utils::error::{ChaosError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 設定檔內容，所有欄位皆為選填，未填者沿用預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub index: IndexConfig,
    pub corpus: CorpusConfig,
    pub pipeline: PipelineConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub url: Option<String>,
    pub cache_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub root: Option<String>,
    pub text_extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: Option<usize>,
    pub fetch_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_line_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ChaosError::filesystem(path.as_ref(), e))?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| ChaosError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${CHAOS_ROOT})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ChaosError::config(format!("env pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.index.url {
            validation::validate_url("index.url", url)?;
        }
        if let Some(cache) = &self.index.cache_file {
            validation::validate_path("index.cache_file", cache)?;
        }
        if let Some(root) = &self.corpus.root {
            validation::validate_path("corpus.root", root)?;
        }
        if let Some(extensions) = &self.corpus.text_extensions {
            validation::validate_extensions("corpus.text_extensions", extensions)?;
        }
        if let Some(workers) = self.pipeline.workers {
            validation::validate_positive_number("pipeline.workers", workers, 1)?;
        }
        if let Some(limit) = self.search.max_line_bytes {
            validation::validate_positive_number("search.max_line_bytes", limit, 1)?;
        }
        if let Some(format) = &self.logging.format {
            format
                .parse::<crate::utils::logger::LogFormat>()
                .map_err(|reason| ChaosError::InvalidConfigValue {
                    field: "logging.format".to_string(),
                    value: format.clone(),
                    reason,
                })?;
        }
        Ok(())
    }
}
