use crate::adapters::{HttpArchiveFetcher, ZipExtractor};
use crate::core::corpus::Corpus;
use crate::core::download::DownloadPipeline;
use crate::core::search::SearchPipeline;
use crate::domain::model::{DownloadReport, EntityDescriptor, SearchHit, Target};
use crate::domain::ports::{ArchiveExtractor, ArchiveFetcher, ConfigProvider};
use crate::utils::error::{ChaosError, Result};
use crate::utils::monitor::SystemMonitor;
use tokio::io::AsyncWrite;

pub struct Orchestrator<F, X> {
    download: DownloadPipeline<F, X>,
    search: SearchPipeline,
    monitor: SystemMonitor,
}

impl Orchestrator<HttpArchiveFetcher, ZipExtractor> {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let fetcher = HttpArchiveFetcher::new(config.fetch_timeout())?;
        let extractor = ZipExtractor::new(config.text_extensions().to_vec());
        Ok(Self::new(
            fetcher,
            extractor,
            Corpus::new(config.corpus_root()),
            config.workers(),
            config.max_line_bytes(),
        ))
    }
}

impl<F, X> Orchestrator<F, X>
where
    F: ArchiveFetcher + 'static,
    X: ArchiveExtractor + 'static,
{
    pub fn new(
        fetcher: F,
        extractor: X,
        corpus: Corpus,
        workers: usize,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            download: DownloadPipeline::new(fetcher, extractor, corpus, workers),
            search: SearchPipeline::new(workers, max_line_bytes),
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub fn corpus(&self) -> &Corpus {
        self.download.corpus()
    }

    pub async fn run_download(
        &self,
        index: &[EntityDescriptor],
        target: &Target,
    ) -> Result<DownloadReport> {
        let entities = resolve_targets(index, target)?;

        let root = self.corpus().root();
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| ChaosError::filesystem(root, e))?;

        tracing::info!(
            "[*] Downloading {} programs with {} workers...",
            entities.len(),
            self.download.workers()
        );
        let report = self.download.run(&entities).await?;
        tracing::info!(
            "[*] Complete: {} success, {} failed",
            report.succeeded,
            report.failed
        );

        if self.monitor.is_enabled() {
            self.monitor.log_stats("Download");
        }
        Ok(report)
    }

    /// Streams the best-matching consolidated file into `out`.
    pub async fn run_query<W>(&self, term: &str, out: &mut W) -> Result<Option<SearchHit>>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let best = self.search.stream_best(self.corpus(), term, out).await?;

        if self.monitor.is_enabled() {
            self.monitor.log_stats("Query");
        }
        Ok(best)
    }
}

/// `All` selects the whole index; a name selects the first case-insensitive
/// match.
pub fn resolve_targets(
    index: &[EntityDescriptor],
    target: &Target,
) -> Result<Vec<EntityDescriptor>> {
    match target {
        Target::All => Ok(index.to_vec()),
        Target::Named(name) => {
            let wanted = name.to_lowercase();
            index
                .iter()
                .find(|e| e.name.to_lowercase() == wanted)
                .map(|e| vec![e.clone()])
                .ok_or_else(|| ChaosError::EntityNotFound { name: name.clone() })
        }
    }
}
