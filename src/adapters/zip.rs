use crate::core::corpus::CONSOLIDATED_FILE;
use crate::domain::ports::ArchiveExtractor;
use crate::utils::error::{ChaosError, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Concatenates every text member of a zip archive into one file.
#[derive(Debug, Clone)]
pub struct ZipExtractor {
    text_extensions: Vec<String>,
}

impl Default for ZipExtractor {
    fn default() -> Self {
        Self::new(vec!["txt".to_string()])
    }
}

impl ZipExtractor {
    pub fn new(text_extensions: Vec<String>) -> Self {
        Self { text_extensions }
    }

    fn is_text_member(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.text_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn copy_members<W: Write>(
        &self,
        archive: &mut ZipArchive<BufReader<File>>,
        writer: &mut W,
    ) -> Result<u64> {
        let mut copied = 0;
        for index in 0..archive.len() {
            // 只看名稱篩選，非文字成員（例如加密的 README）不會被解壓
            let wanted = archive
                .name_for_index(index)
                .is_some_and(|name| !name.ends_with('/') && self.is_text_member(name));
            if !wanted {
                continue;
            }
            let mut member = archive.by_index(index)?;
            if !member.is_file() {
                continue;
            }
            copied += io::copy(&mut member, writer)?;
        }
        Ok(copied)
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        // 壓縮檔打不開時視為壓縮檔錯誤，不動既有輸出
        let file = File::open(archive_path).map_err(|e| ChaosError::Archive(e.into()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        fs::create_dir_all(dest_dir).map_err(|e| ChaosError::filesystem(dest_dir, e))?;
        let output = dest_dir.join(CONSOLIDATED_FILE);

        // 先寫到同目錄的暫存檔，完成後再 rename，讀者看不到寫一半的檔案
        let staging = tempfile::Builder::new()
            .prefix(".consolidated-")
            .tempfile_in(dest_dir)
            .map_err(|e| ChaosError::filesystem(dest_dir, e))?;

        let copied = {
            let mut writer = BufWriter::new(staging.as_file());
            let copied = self.copy_members(&mut archive, &mut writer);
            copied.and_then(|n| writer.flush().map(|_| n).map_err(ChaosError::from))
        };

        match copied {
            Ok(bytes) => {
                staging
                    .persist(&output)
                    .map_err(|e| ChaosError::filesystem(&output, e.error))?;
                tracing::debug!("{} bytes -> {}", bytes, output.display());
                Ok(output)
            }
            Err(e) => {
                // 寫入中途失敗：丟棄暫存檔並移除舊輸出
                drop(staging);
                if let Err(remove_err) = fs::remove_file(&output) {
                    if remove_err.kind() != io::ErrorKind::NotFound {
                        tracing::warn!(
                            "Could not remove stale {}: {}",
                            output.display(),
                            remove_err
                        );
                    }
                }
                Err(e)
            }
        }
    }
}
