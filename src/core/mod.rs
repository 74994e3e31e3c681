pub mod corpus;
pub mod download;
pub mod orchestrator;
pub mod queue;
pub mod search;

pub use crate::domain::model::{DownloadReport, EntityDescriptor, SearchHit, Target};
pub use crate::domain::ports::{ArchiveExtractor, ArchiveFetcher, ConfigProvider};
pub use crate::utils::error::Result;
