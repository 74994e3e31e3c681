//! Two-stage download → extract pipeline.
//!
//! ```text
//! jobs ─▶ W fetchers ─▶ results (2W) ─▶ driver ─▶ extract jobs (2W) ─▶ W extractors
//!              └─ supervisor drops the last results sender once all fetchers exit
//! ```
//!
//! The driver is the only reader of the results channel and owns the tally.

use crate::core::corpus::Corpus;
use crate::core::queue::{self, WorkQueue};
use crate::domain::model::{
    DownloadReport, EntityDescriptor, EntityFailure, ExtractionJob, FailureStage, FetchOutcome,
};
use crate::domain::ports::{ArchiveExtractor, ArchiveFetcher};
use crate::utils::error::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

pub struct DownloadPipeline<F, X> {
    fetcher: Arc<F>,
    extractor: Arc<X>,
    corpus: Corpus,
    workers: usize,
}

impl<F, X> DownloadPipeline<F, X>
where
    F: ArchiveFetcher + 'static,
    X: ArchiveExtractor + 'static,
{
    pub fn new(fetcher: F, extractor: X, corpus: Corpus, workers: usize) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            corpus,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub async fn run(&self, entities: &[EntityDescriptor]) -> Result<DownloadReport> {
        let jobs: Vec<EntityDescriptor> = entities
            .iter()
            .filter(|e| e.is_fetchable())
            .cloned()
            .collect();
        let skipped = entities.len() - jobs.len();
        if skipped > 0 {
            tracing::debug!("Skipping {} programs without a URL or subdomains", skipped);
        }

        let capacity = self.workers * 2;
        let job_queue = queue::preloaded(jobs).await;

        // Stage A: fetch
        let (result_tx, mut result_rx) = mpsc::channel::<FetchOutcome>(capacity);
        let mut fetchers = JoinSet::new();
        for worker in 0..self.workers {
            fetchers.spawn(fetch_worker(
                worker,
                job_queue.clone(),
                Arc::clone(&self.fetcher),
                result_tx.clone(),
            ));
        }
        let supervisor = tokio::spawn(async move {
            while let Some(joined) = fetchers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Fetch worker terminated abnormally: {}", e);
                }
            }
            // 所有 fetch worker 結束後才關閉結果通道
            drop(result_tx);
        });

        // Stage B: extract
        let (extract_tx, extract_rx) = mpsc::channel::<ExtractionJob>(capacity);
        let extract_queue = WorkQueue::new(extract_rx);
        let mut extractors = JoinSet::new();
        for worker in 0..self.workers {
            extractors.spawn(extract_worker(
                worker,
                extract_queue.clone(),
                Arc::clone(&self.extractor),
                self.corpus.clone(),
            ));
        }
        drop(extract_queue);

        let mut report = DownloadReport::default();
        while let Some(outcome) = result_rx.recv().await {
            let FetchOutcome { descriptor, result } = outcome;
            match result {
                Ok(archive_path) => {
                    report.succeeded += 1;
                    let job = ExtractionJob {
                        descriptor,
                        archive_path,
                    };
                    if let Err(mpsc::error::SendError(job)) = extract_tx.send(job).await {
                        tracing::error!(
                            "Extraction pool is gone; dropping {}",
                            job.descriptor.name
                        );
                        remove_archive(&job.archive_path).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("[-] Download {}: {}", descriptor.name, e);
                    report.failed += 1;
                    report.failures.push(EntityFailure {
                        entity: descriptor.name,
                        stage: FailureStage::Fetch,
                        reason: e.to_string(),
                    });
                }
            }
        }
        drop(extract_tx);

        while let Some(joined) = extractors.join_next().await {
            match joined {
                Ok(failures) => report.failures.extend(failures),
                Err(e) => tracing::error!("Extract worker terminated abnormally: {}", e),
            }
        }
        supervisor.await?;

        Ok(report)
    }
}

async fn fetch_worker<F: ArchiveFetcher>(
    worker: usize,
    jobs: WorkQueue<EntityDescriptor>,
    fetcher: Arc<F>,
    results: mpsc::Sender<FetchOutcome>,
) {
    while let Some(descriptor) = jobs.next().await {
        tracing::debug!(worker, program = %descriptor.name, "fetching");
        let result = fetcher.fetch(&descriptor).await;
        let outcome = FetchOutcome { descriptor, result };
        if let Err(mpsc::error::SendError(outcome)) = results.send(outcome).await {
            if let Ok(path) = outcome.result {
                remove_archive(&path).await;
            }
            break;
        }
    }
}

/// Returns the extraction failures this worker saw.
async fn extract_worker<X: ArchiveExtractor + 'static>(
    worker: usize,
    jobs: WorkQueue<ExtractionJob>,
    extractor: Arc<X>,
    corpus: Corpus,
) -> Vec<EntityFailure> {
    let mut failures = Vec::new();

    while let Some(job) = jobs.next().await {
        let name = job.descriptor.name.clone();
        let dest_dir = corpus.entity_dir(&name);
        tracing::debug!(worker, program = %name, "extracting");

        let extractor = Arc::clone(&extractor);
        let archive = job.archive_path.clone();
        let extracted =
            tokio::task::spawn_blocking(move || extractor.extract(&archive, &dest_dir)).await;

        // 不論成功與否都刪除暫存壓縮檔
        remove_archive(&job.archive_path).await;

        let reason = match extracted {
            Ok(Ok(_)) => {
                tracing::info!("[+] {}", name);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("extraction task failed: {}", e),
        };
        tracing::warn!("[-] Unzip {}: {}", name, reason);
        failures.push(EntityFailure {
            entity: name,
            stage: FailureStage::Extract,
            reason,
        });
    }

    failures
}

async fn remove_archive(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove temp archive {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::zip::ZipExtractor;
    use crate::core::corpus::CONSOLIDATED_FILE;
    use crate::utils::error::ChaosError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    /// Serves canned archive bytes per program and writes them to temp files
    /// the same way the HTTP fetcher does.
    struct CannedFetcher {
        archives: HashMap<String, Vec<u8>>,
        temp_dir: PathBuf,
        calls: AtomicUsize,
    }

    impl CannedFetcher {
        fn new(temp_dir: &Path) -> Self {
            Self {
                archives: HashMap::new(),
                temp_dir: temp_dir.to_path_buf(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_archive(mut self, name: &str, bytes: Vec<u8>) -> Self {
            self.archives.insert(name.to_string(), bytes);
            self
        }
    }

    #[async_trait]
    impl ArchiveFetcher for CannedFetcher {
        async fn fetch(&self, entity: &EntityDescriptor) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bytes = self.archives.get(&entity.name).ok_or_else(|| ChaosError::HttpStatus {
                url: entity.source_url.clone(),
                status: 404,
            })?;
            let temp = tempfile::Builder::new()
                .prefix("chaos-")
                .suffix(".zip")
                .tempfile_in(&self.temp_dir)?;
            std::fs::write(temp.path(), bytes)?;
            let path = temp.into_temp_path().keep().map_err(|e| ChaosError::Io(e.error))?;
            Ok(path)
        }
    }

    fn entity(name: &str) -> EntityDescriptor {
        EntityDescriptor::new(name, format!("http://x/{}.zip", name), 10)
    }

    fn pipeline(
        fetcher: CannedFetcher,
        corpus_dir: &TempDir,
        workers: usize,
    ) -> DownloadPipeline<CannedFetcher, ZipExtractor> {
        DownloadPipeline::new(
            fetcher,
            ZipExtractor::default(),
            Corpus::new(corpus_dir.path()),
            workers,
        )
    }

    fn temp_archives(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_non_fetchable_entities_are_never_fetched() {
        let tmp = TempDir::new().unwrap();
        let corpus_dir = TempDir::new().unwrap();
        let fetcher = CannedFetcher::new(tmp.path())
            .with_archive("acme", build_zip(&[("a.txt", "sub.acme.com\n")]));
        let pipeline = pipeline(fetcher, &corpus_dir, 4);

        let entities = vec![
            entity("acme"),
            EntityDescriptor::new("no-url", "", 10),
            EntityDescriptor::new("no-items", "http://x/no-items.zip", 0),
            EntityDescriptor::new("negative", "http://x/negative.zip", -1),
        ];
        let report = pipeline.run(&entities).await.unwrap();

        assert_eq!(pipeline.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert!(!pipeline.corpus().entity_dir("no-url").exists());
    }

    #[tokio::test]
    async fn test_mixed_outcomes_tally_and_no_temp_leaks() {
        let tmp = TempDir::new().unwrap();
        let corpus_dir = TempDir::new().unwrap();
        let fetcher = CannedFetcher::new(tmp.path())
            .with_archive(
                "acme",
                build_zip(&[("a.txt", "sub1.acme.com\n"), ("b.txt", "sub2.acme.com\n")]),
            )
            .with_archive("broken", b"not a zip".to_vec());
        let pipeline = pipeline(fetcher, &corpus_dir, 3);

        let report = pipeline
            .run(&[entity("acme"), entity("broken"), entity("missing")])
            .await
            .unwrap();

        // 解壓失敗不影響下載計數
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 2);
        let extract_failures: Vec<_> = report
            .extraction_failures()
            .map(|f| f.entity.as_str())
            .collect();
        assert_eq!(extract_failures, vec!["broken"]);
        assert!(report
            .failures
            .iter()
            .any(|f| f.entity == "missing" && f.stage == FailureStage::Fetch));

        assert_eq!(
            std::fs::read_to_string(corpus_dir.path().join("acme").join(CONSOLIDATED_FILE))
                .unwrap(),
            "sub1.acme.com\nsub2.acme.com\n"
        );
        assert_eq!(temp_archives(&tmp), 0);
    }

    #[tokio::test]
    async fn test_empty_entity_list() {
        let tmp = TempDir::new().unwrap();
        let corpus_dir = TempDir::new().unwrap();
        let pipeline = DownloadPipeline::new(
            CannedFetcher::new(tmp.path()),
            ZipExtractor::default(),
            Corpus::new(corpus_dir.path()),
            2,
        );

        let report = pipeline.run(&[]).await.unwrap();
        assert_eq!(report, DownloadReport::default());
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_results() {
        let names: Vec<String> = (0..40).map(|i| format!("prog{:02}", i)).collect();
        let mut entities: Vec<EntityDescriptor> = names.iter().map(|n| entity(n)).collect();
        entities.push(entity("unlisted"));

        let mut snapshots = Vec::new();
        for workers in [1, 32] {
            let tmp = TempDir::new().unwrap();
            let corpus_dir = TempDir::new().unwrap();
            let mut fetcher = CannedFetcher::new(tmp.path());
            for (i, name) in names.iter().enumerate() {
                let a = format!("a{}.{}.com\n", i, name);
                let b = format!("b{}.{}.com\n", i, name);
                let archive = build_zip(&[("a.txt", a.as_str()), ("b.txt", b.as_str())]);
                fetcher = fetcher.with_archive(name, archive);
            }
            let pipeline = pipeline(fetcher, &corpus_dir, workers);

            let report = pipeline.run(&entities).await.unwrap();
            let contents: Vec<String> = names
                .iter()
                .map(|n| std::fs::read_to_string(pipeline.corpus().consolidated_path(n)).unwrap())
                .collect();

            assert_eq!(temp_archives(&tmp), 0);
            snapshots.push((report.succeeded, report.failed, contents));
        }

        assert_eq!(snapshots[0], snapshots[1]);
        assert_eq!(snapshots[0].0, 40);
        assert_eq!(snapshots[0].1, 1);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_consolidated_file() {
        let corpus_dir = TempDir::new().unwrap();
        let corpus = Corpus::new(corpus_dir.path());

        let tmp = TempDir::new().unwrap();
        let first = CannedFetcher::new(tmp.path()).with_archive(
            "acme",
            build_zip(&[("a.txt", "one.acme.com\ntwo.acme.com\nthree.acme.com\n")]),
        );
        DownloadPipeline::new(first, ZipExtractor::default(), corpus.clone(), 2)
            .run(&[entity("acme")])
            .await
            .unwrap();

        let second = CannedFetcher::new(tmp.path())
            .with_archive("acme", build_zip(&[("a.txt", "only.acme.com\n")]));
        DownloadPipeline::new(second, ZipExtractor::default(), corpus.clone(), 2)
            .run(&[entity("acme")])
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(corpus.consolidated_path("acme")).unwrap(),
            "only.acme.com\n"
        );
        assert_eq!(temp_archives(&tmp), 0);
    }
}
