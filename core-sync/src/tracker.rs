//! # File State Tracker
//!
//! Keeps a cached modification time and library membership flag for every
//! Source-A file.
//!
//! ## Overview
//!
//! A scan enumerates the Source-A tree and compares each file's modification
//! time with the cached row. Only new or modified files have their membership
//! tag read again, so repeated scans of an unchanged tree do not touch any
//! tags.
//!
//! A file is a library member when the membership tag is present, non-empty
//! and not equal (ignoring case) to the excluded value.
//!
//! Rows for files that disappeared are kept until [`FileStateTracker::prune_missing`]
//! is called explicitly.

use crate::error::{Result, SyncError};
use crate::types::{LibraryMember, ScanSummary};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::tags::{get_ignore_case, TagCodec};
use bridge_traits::time::Clock;
use core_library::models::SourceFileState;
use core_library::repositories::{SourceFileStateRepository, SqliteSourceFileStateRepository};
use core_runtime::config::AppConfig;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub struct FileStateTracker {
    source_a_root: Option<PathBuf>,
    extension: String,
    membership_tag: String,
    excluded_value: String,
    file_system: Arc<dyn FileSystemAccess>,
    codec: Arc<dyn TagCodec>,
    clock: Arc<dyn Clock>,
    states: Arc<dyn SourceFileStateRepository>,
}

impl FileStateTracker {
    pub fn new(
        config: &AppConfig,
        pool: SqlitePool,
        file_system: Arc<dyn FileSystemAccess>,
        codec: Arc<dyn TagCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_repository(
            config,
            Arc::new(SqliteSourceFileStateRepository::new(pool)),
            file_system,
            codec,
            clock,
        )
    }

    pub fn with_repository(
        config: &AppConfig,
        states: Arc<dyn SourceFileStateRepository>,
        file_system: Arc<dyn FileSystemAccess>,
        codec: Arc<dyn TagCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source_a_root: config.source_a_path.clone(),
            extension: config.tracked_extension.clone(),
            membership_tag: config.membership_tag.clone(),
            excluded_value: config.membership_excluded_value.clone(),
            file_system,
            codec,
            clock,
            states,
        }
    }

    /// Scan the Source-A tree and refresh changed rows
    pub async fn scan_and_update(&self) -> Result<ScanSummary> {
        self.scan_and_update_with_cancel(&CancellationToken::new())
            .await
    }

    /// Scan like [`scan_and_update`](Self::scan_and_update), stopping between
    /// files once `token` is cancelled
    ///
    /// # Errors
    ///
    /// Returns `Precondition` when the Source-A root is not configured or
    /// cannot be listed. Per-file failures are logged and skipped.
    #[instrument(skip(self, token))]
    pub async fn scan_and_update_with_cancel(
        &self,
        token: &CancellationToken,
    ) -> Result<ScanSummary> {
        let root = self.require_root().await?;

        let files = self
            .file_system
            .list_files(&root, &self.extension)
            .await
            .map_err(|e| {
                SyncError::Precondition(format!(
                    "Cannot list Source A root {}: {}",
                    root.display(),
                    e
                ))
            })?;

        let mut summary = ScanSummary {
            total: files.len(),
            ..Default::default()
        };

        for path in &files {
            if token.is_cancelled() {
                info!(
                    processed = summary.updated,
                    total = summary.total,
                    "Library scan cancelled"
                );
                summary.cancelled = true;
                return Ok(summary);
            }

            if self.refresh_file(path).await? {
                summary.updated += 1;
            }
        }

        info!(
            total = summary.total,
            updated = summary.updated,
            "Library scan finished"
        );
        Ok(summary)
    }

    /// Re-derive one file's row if its modification time changed
    ///
    /// Returns whether the row was written. Store errors propagate.
    async fn refresh_file(&self, path: &Path) -> Result<bool> {
        let mtime = match self.file_system.modified_at(path).await {
            Ok(Some(mtime)) => mtime,
            Ok(None) => {
                warn!(path = %path.display(), "No modification time, skipping");
                return Ok(false);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot stat file, skipping");
                return Ok(false);
            }
        };

        let key = path.to_string_lossy();
        let cached = self.states.find_by_path(&key).await?;
        if cached.is_some_and(|state| state.last_modified_at == Some(mtime)) {
            return Ok(false);
        }

        let in_library = match self.read_membership(path).await {
            Ok(member) => member,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read membership tag, skipping");
                return Ok(false);
            }
        };

        let state = SourceFileState::new(key.into_owned(), Some(mtime), in_library)
            .with_last_checked(self.clock.unix_timestamp_millis());
        self.states.upsert(&state).await?;

        debug!(path = %path.display(), in_library, "Refreshed file state");
        Ok(true)
    }

    async fn read_membership(&self, path: &Path) -> bridge_traits::error::Result<bool> {
        let fields = [self.membership_tag.clone()];
        let tags = self.codec.read_fields(path, &fields).await?;

        Ok(get_ignore_case(&tags, &self.membership_tag)
            .map(|value| value.as_text())
            .is_some_and(|value| is_member(&value, &self.excluded_value)))
    }

    /// Files currently flagged as library members
    pub async fn list_in_library(&self) -> Result<Vec<LibraryMember>> {
        let members = self.states.list_in_library().await?;
        Ok(members.into_iter().map(LibraryMember::from).collect())
    }

    /// Delete rows of files that no longer exist
    ///
    /// Files whose existence cannot be determined are kept.
    #[instrument(skip(self))]
    pub async fn prune_missing(&self) -> Result<usize> {
        let mut removed = 0;

        for state in self.states.list_all().await? {
            match self.file_system.exists(Path::new(&state.path)).await {
                Ok(true) => {}
                Ok(false) => {
                    if self.states.delete(&state.path).await? {
                        debug!(path = %state.path, "Pruned missing file");
                        removed += 1;
                    }
                }
                Err(e) => {
                    warn!(path = %state.path, error = %e, "Cannot check file, keeping row");
                }
            }
        }

        info!(removed, "Pruned file states");
        Ok(removed)
    }

    async fn require_root(&self) -> Result<PathBuf> {
        let root = self
            .source_a_root
            .clone()
            .ok_or_else(|| SyncError::Precondition("Source A path is not configured".into()))?;

        if !self.file_system.exists(&root).await.unwrap_or(false) {
            return Err(SyncError::Precondition(format!(
                "Source A root does not exist: {}",
                root.display()
            )));
        }

        Ok(root)
    }
}

/// Membership rule for a present tag value
pub fn is_member(value: &str, excluded_value: &str) -> bool {
    !value.is_empty() && !value.eq_ignore_ascii_case(excluded_value)
}
