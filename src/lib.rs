pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Action, CliConfig};
pub use config::{Settings, TomlConfig};

pub use adapters::{HttpArchiveFetcher, IndexClient, ZipExtractor};
pub use self::core::{
    corpus::Corpus, download::DownloadPipeline, orchestrator::Orchestrator, search::SearchPipeline,
};
pub use domain::model::{DownloadReport, EntityDescriptor, SearchHit, Target};
pub use utils::error::{ChaosError, Result};
