//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{has_extension, FileMetadata, FileSystemAccess},
};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

/// Tokio-based file system implementation
///
/// Lists directory trees and reports modification times in epoch
/// milliseconds. Symlinks are followed through `tokio::fs::metadata`.
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError, keeping the offending path
    fn map_io_error(path: &Path, e: std::io::Error) -> BridgeError {
        BridgeError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    }

    fn to_millis(time: std::io::Result<SystemTime>) -> Option<i64> {
        time.ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: Self::to_millis(metadata.modified()),
            is_directory: metadata.is_dir(),
        })
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Self::map_io_error(path, e))?
        {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    /// Recursive listing that tolerates unreadable subdirectories
    ///
    /// Only a failure to read `root` itself is reported as an error. Entries
    /// below it that cannot be listed or stat'ed are logged and skipped.
    async fn list_files(&self, root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = self.list_directory(root).await?;

        while let Some(entry) = pending.pop() {
            let metadata = match self.metadata(&entry).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = ?entry, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if metadata.is_directory {
                match self.list_directory(&entry).await {
                    Ok(children) => pending.extend(children),
                    Err(e) => warn!(path = ?entry, error = %e, "Skipping unreadable directory"),
                }
            } else if has_extension(&entry, extension) {
                files.push(entry);
            }
        }

        files.sort();
        debug!(root = ?root, count = files.len(), "Listed tracked files");
        Ok(files)
    }
}
