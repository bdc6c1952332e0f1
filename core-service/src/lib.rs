//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (filesystem, tag
//! codec, clock) and the SQLite state store into the sync components, and
//! exposes every user-triggered operation through [`TagSyncService`].
//! Desktop hosts enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) to get [`CoreDependencies::desktop`] and the `tagsync`
//! binary.
//!
//! ## Concurrency
//!
//! Operations that mutate files or the store (scan, prune, saving or
//! removing pairings, run and reconcile) are serialised: while one is
//! running, another is rejected with [`SyncError::SyncInProgress`] rather
//! than queued. A pairing therefore cannot change under a running sync.
//!
//! ## Configuration
//!
//! A service built with [`TagSyncService::from_config_file`] re-reads the
//! configuration file at the start of every operation, so edits take effect
//! without restarting the host.

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::storage::FileSystemAccess;
use bridge_traits::tags::TagCodec;
use bridge_traits::time::Clock;
use core_library::db::{create_pool, DatabaseConfig};
use core_runtime::config::AppConfig;
use core_sync::{
    FileStateTracker, LibraryMember, MappingEntry, PairingRegistry, PairingSuggestion,
    PreviewEntry, ReconcileReport, RunReport, ScanSummary, SyncEngine, SyncError,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Aggregated handle to all bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub file_system: Arc<dyn FileSystemAccess>,
    pub codec: Arc<dyn TagCodec>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        file_system: Arc<dyn FileSystemAccess>,
        codec: Arc<dyn TagCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            file_system,
            codec,
            clock,
        }
    }

    /// Tokio filesystem, ID3v2 codec and system clock.
    #[cfg(feature = "desktop-shims")]
    pub fn desktop() -> Self {
        Self::new(
            Arc::new(bridge_desktop::TokioFileSystem::new()),
            Arc::new(core_metadata::Id3TagCodec::new()),
            Arc::new(bridge_traits::time::SystemClock),
        )
    }
}

/// Result of saving pairings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub count: usize,
}

enum ConfigSource {
    Snapshot(AppConfig),
    File(PathBuf),
}

/// Primary façade exposed to host applications.
pub struct TagSyncService {
    deps: CoreDependencies,
    pool: SqlitePool,
    config: ConfigSource,
    operation_lock: Mutex<()>,
    shutdown: CancellationToken,
}

impl TagSyncService {
    /// Create a service around a fixed configuration and an open pool.
    pub fn new(config: AppConfig, pool: SqlitePool, deps: CoreDependencies) -> Self {
        Self::with_source(ConfigSource::Snapshot(config), pool, deps)
    }

    fn with_source(config: ConfigSource, pool: SqlitePool, deps: CoreDependencies) -> Self {
        Self {
            deps,
            pool,
            config,
            operation_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Open the database named by `config` and create a service around it.
    pub async fn open(config: AppConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;
        let pool = open_pool(&config.resolved_database_path()).await?;
        Ok(Self::new(config, pool, deps))
    }

    /// Load (or initialise) the configuration file and open its database.
    ///
    /// The file is read again at the start of every operation.
    pub async fn from_config_file(path: impl Into<PathBuf>, deps: CoreDependencies) -> Result<Self> {
        let path = path.into();
        let config = AppConfig::load_or_init(&path)?;
        config.validate()?;

        let pool = open_pool(&config.resolved_database_path()).await?;
        info!(config = %path.display(), "Tag sync service ready");
        Ok(Self::with_source(ConfigSource::File(path), pool, deps))
    }

    /// Token that interrupts a running scan between files once cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Configuration in effect for the next operation.
    pub fn config(&self) -> Result<AppConfig> {
        match &self.config {
            ConfigSource::Snapshot(config) => Ok(config.clone()),
            ConfigSource::File(path) => {
                let config = AppConfig::load(path)?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn begin(&self) -> Result<MutexGuard<'_, ()>> {
        self.operation_lock
            .try_lock()
            .map_err(|_| CoreError::Sync(SyncError::SyncInProgress))
    }

    fn tracker(&self, config: &AppConfig) -> FileStateTracker {
        FileStateTracker::new(
            config,
            self.pool.clone(),
            self.deps.file_system.clone(),
            self.deps.codec.clone(),
            self.deps.clock.clone(),
        )
    }

    fn engine(&self, config: &AppConfig) -> SyncEngine {
        SyncEngine::new(
            config,
            self.pool.clone(),
            self.deps.codec.clone(),
            self.deps.file_system.clone(),
            self.deps.clock.clone(),
        )
    }

    fn registry(&self) -> PairingRegistry {
        PairingRegistry::new(self.pool.clone())
    }

    // =========================================================================
    // Library
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn scan_library(&self) -> Result<ScanSummary> {
        let _guard = self.begin()?;
        let config = self.config()?;
        let token = self.shutdown.child_token();
        Ok(self
            .tracker(&config)
            .scan_and_update_with_cancel(&token)
            .await?)
    }

    pub async fn list_library_members(&self) -> Result<Vec<LibraryMember>> {
        let config = self.config()?;
        Ok(self.tracker(&config).list_in_library().await?)
    }

    /// Forget files that no longer exist in Source A.
    #[instrument(skip(self))]
    pub async fn prune_library(&self) -> Result<usize> {
        let _guard = self.begin()?;
        let config = self.config()?;
        Ok(self.tracker(&config).prune_missing().await?)
    }

    // =========================================================================
    // Pairings
    // =========================================================================

    pub async fn save_pairings(&self, entries: &[MappingEntry]) -> Result<SaveResult> {
        let _guard = self.begin()?;
        let count = self.registry().upsert_mappings(entries).await?;
        Ok(SaveResult { count })
    }

    pub async fn get_pairings(&self) -> Result<Vec<MappingEntry>> {
        Ok(self.registry().get_mappings().await?)
    }

    pub async fn remove_pairing(&self, source_a_path: &str) -> Result<bool> {
        let _guard = self.begin()?;
        Ok(self.registry().remove_mapping(source_a_path).await?)
    }

    /// Suggest counterparts by listing both trees.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when either root is not configured.
    #[instrument(skip(self))]
    pub async fn suggest_pairings(&self) -> Result<Vec<PairingSuggestion>> {
        let config = self.config()?;
        let root_a = require_root(config.source_a_path.as_deref(), "Source A")?;
        let root_b = require_root(config.source_b_path.as_deref(), "Source B")?;

        let fs = &self.deps.file_system;
        let a_files = fs
            .list_files(root_a, &config.tracked_extension)
            .await
            .map_err(SyncError::from)?;
        let b_files = fs
            .list_files(root_b, &config.tracked_extension)
            .await
            .map_err(SyncError::from)?;

        let suggestions = core_sync::suggest_pairings(&a_files, &b_files);
        info!(
            total = suggestions.len(),
            matched = suggestions.iter().filter(|s| s.source_b_path.is_some()).count(),
            "Suggested pairings"
        );
        Ok(suggestions)
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    pub async fn preview_sync(&self) -> Result<Vec<PreviewEntry>> {
        let config = self.config()?;
        Ok(self.engine(&config).preview_sync().await?)
    }

    pub async fn run_sync(&self) -> Result<RunReport> {
        let _guard = self.begin()?;
        let config = self.config()?;
        Ok(self.engine(&config).run_sync().await?)
    }

    pub async fn reconcile_bidirectional(&self, source_a_path: &str) -> Result<ReconcileReport> {
        let _guard = self.begin()?;
        let config = self.config()?;
        Ok(self
            .engine(&config)
            .reconcile_bidirectional(source_a_path)
            .await?)
    }
}

fn require_root<'a>(root: Option<&'a Path>, name: &str) -> Result<&'a Path> {
    root.ok_or_else(|| {
        CoreError::Sync(SyncError::Precondition(format!(
            "{name} path is not configured"
        )))
    })
}

async fn open_pool(database_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::InitializationFailed(format!(
                    "Cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(create_pool(DatabaseConfig::new(database_path)).await?)
}
