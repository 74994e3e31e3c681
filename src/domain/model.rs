use crate::utils::error::ChaosError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One program listed in the dataset index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    #[serde(rename = "URL", default)]
    pub source_url: String,
    #[serde(rename = "count", default)]
    pub item_count: i64,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>, item_count: i64) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            item_count,
        }
    }

    /// Entities without a URL or with no items have nothing to download.
    pub fn is_fetchable(&self) -> bool {
        !self.source_url.is_empty() && self.item_count > 0
    }
}

/// Result of one fetch attempt, handed from stage A to the driver.
#[derive(Debug)]
pub struct FetchOutcome {
    pub descriptor: EntityDescriptor,
    pub result: Result<PathBuf, ChaosError>,
}

#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub descriptor: EntityDescriptor,
    pub archive_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: PathBuf,
    pub match_count: usize,
}

impl SearchHit {
    pub fn beats(&self, other: &SearchHit) -> bool {
        self.match_count > other.match_count
    }
}

/// Folds one more hit into the running best. Strictly greater wins, so on a
/// tie the hit reduced first is kept.
pub fn fold_best(best: Option<SearchHit>, hit: SearchHit) -> Option<SearchHit> {
    match best {
        Some(current) if !hit.beats(&current) => Some(current),
        _ => Some(hit),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    Named(String),
}

impl Target {
    pub fn from_arg(arg: &str) -> Self {
        if arg == "all" {
            Self::All
        } else {
            Self::Named(arg.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Extract,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub entity: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// Tally of one download run.
///
/// `succeeded` and `failed` count fetch outcomes only. An entity that was
/// fetched but failed to extract still counts as succeeded and shows up in
/// `failures` with [`FailureStage::Extract`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<EntityFailure>,
}

impl DownloadReport {
    pub fn extraction_failures(&self) -> impl Iterator<Item = &EntityFailure> {
        self.failures
            .iter()
            .filter(|f| f.stage == FailureStage::Extract)
    }
}
