//! File System Abstractions
//!
//! Provides the platform-agnostic trait the core uses to enumerate source trees
//! and to observe file modification times.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    /// Last modification time in Unix epoch milliseconds
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// The synchronization core only ever needs three things from the filesystem:
/// a recursive listing of audio files under a root, a file's modification
/// time, and an existence check for maintenance operations.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn count_tracks(fs: &dyn FileSystemAccess, root: &Path) -> Result<usize> {
///     Ok(fs.list_files(root, "mp3").await?.len())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// List all entries in a directory (non-recursive)
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Get the last modification time of a file in epoch milliseconds
    ///
    /// Returns `Ok(None)` when the platform cannot report a modification time.
    async fn modified_at(&self, path: &Path) -> Result<Option<i64>> {
        Ok(self.metadata(path).await?.modified_at)
    }

    /// Recursively list every file under `root` whose extension matches
    /// `extension` (case-insensitive, without the leading dot).
    ///
    /// The result is sorted so repeated scans visit files in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` itself cannot be listed.
    async fn list_files(&self, root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in self.list_directory(&dir).await? {
                let metadata = self.metadata(&entry).await?;
                if metadata.is_directory {
                    pending.push(entry);
                } else if has_extension(&entry, extension) {
                    files.push(entry);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Case-insensitive extension check shared by filesystem implementations
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Directory tree held in memory: directory path -> children
    struct MemoryTree {
        dirs: HashMap<PathBuf, Vec<PathBuf>>,
    }

    #[async_trait]
    impl FileSystemAccess for MemoryTree {
        async fn exists(&self, path: &Path) -> Result<bool> {
            Ok(self.dirs.contains_key(path)
                || self.dirs.values().any(|children| children.iter().any(|c| c == path)))
        }

        async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
            Ok(FileMetadata {
                size: 0,
                modified_at: Some(1),
                is_directory: self.dirs.contains_key(path),
            })
        }

        async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
            self.dirs.get(path).cloned().ok_or_else(|| {
                crate::BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    path.display().to_string(),
                ))
            })
        }
    }

    fn tree() -> MemoryTree {
        let mut dirs = HashMap::new();
        dirs.insert(
            PathBuf::from("/a"),
            vec![
                PathBuf::from("/a/02.MP3"),
                PathBuf::from("/a/sub"),
                PathBuf::from("/a/cover.jpg"),
            ],
        );
        dirs.insert(PathBuf::from("/a/sub"), vec![PathBuf::from("/a/sub/01.mp3")]);
        MemoryTree { dirs }
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("/x/song.mp3"), "mp3"));
        assert!(has_extension(Path::new("/x/song.MP3"), ".mp3"));
        assert!(!has_extension(Path::new("/x/song.flac"), "mp3"));
        assert!(!has_extension(Path::new("/x/mp3"), "mp3"));
    }

    #[tokio::test]
    async fn test_list_files_recurses_and_filters() {
        let files = tree().list_files(Path::new("/a"), "mp3").await.unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("/a/02.MP3"), PathBuf::from("/a/sub/01.mp3")]
        );
    }

    #[tokio::test]
    async fn test_list_files_missing_root_fails() {
        let result = tree().list_files(Path::new("/missing"), "mp3").await;
        assert!(result.is_err());
    }
}
