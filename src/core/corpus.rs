use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CONSOLIDATED_FILE: &str = "consolidated.txt";

/// On-disk layout `<root>/<program>/consolidated.txt`.
#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
}

impl Corpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one program. Path separators and parent references in
    /// the name are neutralised so an index entry cannot escape the root.
    pub fn entity_dir(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        let safe = match safe.as_str() {
            "" | "." | ".." => format!("_{}", safe),
            _ => safe,
        };
        self.root.join(safe)
    }

    pub fn consolidated_path(&self, name: &str) -> PathBuf {
        self.entity_dir(name).join(CONSOLIDATED_FILE)
    }

    /// Lazily yields every consolidated file under the root.
    ///
    /// Entries that fail to read are skipped, so a broken subtree only hides
    /// its own files. A missing root yields nothing.
    pub fn discover(&self) -> impl Iterator<Item = PathBuf> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable corpus entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && entry.file_name() == CONSOLIDATED_FILE)
            .map(|entry| entry.into_path())
    }
}
