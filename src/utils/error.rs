use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChaosError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Archive operation failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line} of {} exceeds the {limit} byte scan buffer", path.display())]
    ScanOverflow {
        path: PathBuf,
        line: usize,
        limit: usize,
    },

    #[error("Index decode error: {0}")]
    IndexDecode(#[from] serde_json::Error),

    #[error("Program '{name}' not found in index")]
    EntityNotFound { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Archive,
    Filesystem,
    Scan,
    Index,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ChaosError {
    /// 以路徑包裝 IO 錯誤
    pub fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) | Self::HttpStatus { .. } => ErrorCategory::Network,
            Self::Archive(_) => ErrorCategory::Archive,
            Self::Filesystem { .. } | Self::Io(_) => ErrorCategory::Filesystem,
            Self::ScanOverflow { .. } => ErrorCategory::Scan,
            Self::IndexDecode(_) | Self::EntityNotFound { .. } => ErrorCategory::Index,
            Self::Config { .. } | Self::InvalidConfigValue { .. } => ErrorCategory::Configuration,
            Self::Worker(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ScanOverflow { .. } => ErrorSeverity::Low,
            Self::Network(_) | Self::HttpStatus { .. } => ErrorSeverity::Medium,
            Self::Archive(_)
            | Self::IndexDecode(_)
            | Self::EntityNotFound { .. }
            | Self::Config { .. }
            | Self::InvalidConfigValue { .. } => ErrorSeverity::High,
            Self::Filesystem { .. } | Self::Io(_) | Self::Worker(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and retry; use --refresh if the index is stale",
            ErrorCategory::Archive => "The archive may be corrupt upstream; retry the download later",
            ErrorCategory::Filesystem => "Check disk space and permissions on the corpus root",
            ErrorCategory::Scan => "Raise search.max_line_bytes in the config file",
            ErrorCategory::Index => "Run with --list to see valid names, or --refresh to update the index",
            ErrorCategory::Configuration => "Fix the flag or config value named in the message",
            ErrorCategory::Internal => "Re-run with --verbose and report the log",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Network(_) | Self::HttpStatus { .. } => format!("Download failed: {}", self),
            Self::EntityNotFound { name } => format!("Program '{}' not found", name),
            Self::InvalidConfigValue { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChaosError>;
