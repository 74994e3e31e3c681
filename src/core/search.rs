use crate::core::corpus::Corpus;
use crate::core::queue::{self, WorkQueue};
use crate::domain::model::{fold_best, SearchHit};
use crate::utils::error::{ChaosError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const INITIAL_SCAN_BUFFER: usize = 64 * 1024;

pub struct SearchPipeline {
    workers: usize,
    max_line_bytes: usize,
}

impl SearchPipeline {
    pub fn new(workers: usize, max_line_bytes: usize) -> Self {
        Self {
            workers: workers.max(1),
            max_line_bytes: max_line_bytes.max(1),
        }
    }

    /// Returns the file with the most matching lines.
    ///
    /// Ties go to whichever hit the reducer sees first, which depends on
    /// worker scheduling.
    pub async fn search(&self, corpus: &Corpus, term: &str) -> Result<Option<SearchHit>> {
        let walker = corpus.clone();
        let files: Vec<PathBuf> =
            tokio::task::spawn_blocking(move || walker.discover().collect()).await?;
        if files.is_empty() {
            tracing::debug!("No consolidated files under {}", corpus.root().display());
            return Ok(None);
        }
        tracing::debug!("Scanning {} files with {} workers", files.len(), self.workers);

        let needle: Arc<str> = Arc::from(term.to_lowercase());
        let file_queue = queue::preloaded(files).await;
        let (hit_tx, mut hit_rx) = mpsc::channel::<SearchHit>(self.workers);

        let mut scanners = JoinSet::new();
        for _ in 0..self.workers {
            scanners.spawn(scan_worker(
                file_queue.clone(),
                Arc::clone(&needle),
                self.max_line_bytes,
                hit_tx.clone(),
            ));
        }
        drop(hit_tx);

        let mut best = None;
        while let Some(hit) = hit_rx.recv().await {
            best = fold_best(best, hit);
        }

        while let Some(joined) = scanners.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Search worker terminated abnormally: {}", e);
            }
        }

        Ok(best)
    }

    /// Runs [`search`](Self::search) and copies the winning file verbatim
    /// into `out`. Nothing is written when no file matches.
    pub async fn stream_best<W>(
        &self,
        corpus: &Corpus,
        term: &str,
        out: &mut W,
    ) -> Result<Option<SearchHit>>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let Some(best) = self.search(corpus, term).await? else {
            return Ok(None);
        };
        tracing::debug!("Best match: {} ({} lines)", best.path.display(), best.match_count);

        let mut file = tokio::fs::File::open(&best.path)
            .await
            .map_err(|e| ChaosError::filesystem(&best.path, e))?;
        tokio::io::copy(&mut file, out).await?;
        out.flush().await?;

        Ok(Some(best))
    }
}

async fn scan_worker(
    files: WorkQueue<PathBuf>,
    needle: Arc<str>,
    max_line_bytes: usize,
    hits: mpsc::Sender<SearchHit>,
) {
    while let Some(path) = files.next().await {
        let needle = Arc::clone(&needle);
        let scanned = tokio::task::spawn_blocking(move || {
            let count = count_matches(&path, &needle, max_line_bytes);
            (path, count)
        })
        .await;

        let (path, match_count) = match scanned {
            Ok((path, Ok(count))) => (path, count),
            Ok((path, Err(e))) => {
                // 單一檔案失敗只影響該檔案
                tracing::debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                tracing::warn!("Scan task failed: {}", e);
                continue;
            }
        };

        if match_count > 0 && hits.send(SearchHit { path, match_count }).await.is_err() {
            break;
        }
    }
}

/// Counts lines of `path` containing `needle`, ignoring case.
///
/// `needle` must already be lower-cased. A line longer than
/// `max_line_bytes` (not counting the trailing `\n`) fails the whole file
/// with [`ChaosError::ScanOverflow`].
pub fn count_matches(path: &Path, needle: &str, max_line_bytes: usize) -> Result<usize> {
    let file = File::open(path).map_err(|e| ChaosError::filesystem(path, e))?;
    let mut reader = BufReader::with_capacity(INITIAL_SCAN_BUFFER.min(max_line_bytes.max(1)), file);
    let mut line = Vec::with_capacity(INITIAL_SCAN_BUFFER.min(max_line_bytes));

    let mut count = 0;
    let mut line_no = 0;
    loop {
        line.clear();
        // 讀取上限為 max + 1，剛好容納最長合法行加上換行符號
        let read = reader
            .by_ref()
            .take(max_line_bytes as u64 + 1)
            .read_until(b'\n', &mut line)
            .map_err(|e| ChaosError::filesystem(path, e))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let body = line.strip_suffix(b"\n").unwrap_or(&line);
        if body.len() > max_line_bytes {
            return Err(ChaosError::ScanOverflow {
                path: path.to_path_buf(),
                line: line_no,
                limit: max_line_bytes,
            });
        }

        let content = body.strip_suffix(b"\r").unwrap_or(body);
        if String::from_utf8_lossy(content).to_lowercase().contains(needle) {
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_entity(corpus: &Corpus, name: &str, content: &str) -> PathBuf {
        let path = corpus.consolidated_path(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn lines(prefix: &str, domain: &str, n: usize) -> String {
        (0..n).map(|i| format!("{}{}.{}\n", prefix, i, domain)).collect()
    }

    #[test]
    fn test_count_matches_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "API.Acme.COM\nwww.acme.com\r\nother.org\nacme.com").unwrap();

        assert_eq!(count_matches(&path, "acme.com", 1024).unwrap(), 3);
        assert_eq!(count_matches(&path, "nothing", 1024).unwrap(), 0);
    }

    #[test]
    fn test_count_matches_line_at_limit_is_fine() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, format!("{}\nacme\n", "a".repeat(16))).unwrap();

        assert_eq!(count_matches(&path, "acme", 16).unwrap(), 1);
    }

    #[test]
    fn test_count_matches_overflow() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, format!("acme.com\n{}acme.com\n", "x".repeat(64))).unwrap();

        let err = count_matches(&path, "acme.com", 32).unwrap_err();
        match err {
            ChaosError::ScanOverflow { line, limit, .. } => {
                assert_eq!(line, 2);
                assert_eq!(limit, 32);
            }
            other => panic!("expected ScanOverflow, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_best_match_wins_and_is_streamed() {
        let dir = TempDir::new().unwrap();
        let corpus = Corpus::new(dir.path());
        let low = write_entity(&corpus, "low", &lines("a", "acme.com", 2));
        let high_a = write_entity(&corpus, "high-a", &(lines("b", "acme.com", 5) + "noise.org\n"));
        let high_b = write_entity(&corpus, "high-b", &lines("c", "ACME.COM", 5));

        let mut out = Vec::new();
        let best = SearchPipeline::new(4, 1024)
            .stream_best(&corpus, "acme.com", &mut out)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(best.match_count, 5);
        assert_ne!(best.path, low);
        assert!(best.path == high_a || best.path == high_b);
        assert_eq!(out, fs::read(&best.path).unwrap());
    }

    #[tokio::test]
    async fn test_empty_corpus_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let corpus = Corpus::new(dir.path().join("missing"));

        let mut out = Vec::new();
        let best = SearchPipeline::new(2, 1024)
            .stream_best(&corpus, "acme.com", &mut out)
            .await
            .unwrap();

        assert!(best.is_none());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_no_matches_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let corpus = Corpus::new(dir.path());
        write_entity(&corpus, "globex", "www.globex.com\n");

        let mut out = Vec::new();
        let best = SearchPipeline::new(2, 1024)
            .stream_best(&corpus, "acme.com", &mut out)
            .await
            .unwrap();

        assert!(best.is_none());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_file_does_not_abort_query() {
        let dir = TempDir::new().unwrap();
        let corpus = Corpus::new(dir.path());
        // 這個檔案匹配更多，但有一行超過上限
        write_entity(
            &corpus,
            "huge",
            &(lines("a", "acme.com", 10) + &"z".repeat(256) + "\n"),
        );
        let small = write_entity(&corpus, "small", &lines("b", "acme.com", 1));

        let best = SearchPipeline::new(2, 128)
            .search(&corpus, "acme.com")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(best.path, small);
        assert_eq!(best.match_count, 1);
    }
}
