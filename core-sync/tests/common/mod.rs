//! Shared fixtures for core-sync integration tests
//!
//! `MemoryLibrary` stands in for both the filesystem and the tag codec: each
//! file is a modification time plus a tag map, all held in memory.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::storage::{has_extension, FileMetadata, FileSystemAccess};
use bridge_traits::tags::{get_ignore_case, TagCodec, TagMap, TagValue};
use bridge_traits::time::ManualClock;
use core_library::db::create_test_pool;
use core_library::models::SourceFileState;
use core_library::repositories::{SourceFileStateRepository, SqliteSourceFileStateRepository};
use core_runtime::config::{AppConfig, ChangeDetection, TagSelection};
use core_sync::{FileStateTracker, MappingEntry, PairingRegistry, SyncEngine};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type WriteHook = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Clone)]
struct MemoryFile {
    mtime: i64,
    tags: TagMap,
}

/// In-memory directory tree with tags
#[derive(Default)]
pub struct MemoryLibrary {
    files: Mutex<BTreeMap<PathBuf, MemoryFile>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    read_only: Mutex<HashSet<PathBuf>>,
    writes: Mutex<Vec<(PathBuf, TagMap)>>,
    reads: AtomicUsize,
    /// Modification time given to files on write
    write_time: AtomicI64,
    /// Awaited at the start of the next write
    write_hook: Mutex<Option<WriteHook>>,
}

impl MemoryLibrary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, path: &str, mtime: i64, tags: &[(&str, &str)]) {
        let tags = tags
            .iter()
            .map(|(k, v)| (k.to_string(), TagValue::text(*v)))
            .collect();
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), MemoryFile { mtime, tags });
    }

    /// Change a tag as an external editor would, bumping the modification time
    pub fn edit(&self, path: &str, mtime: i64, tag: &str, value: &str) {
        let mut files = self.files.lock().unwrap();
        let file = files.get_mut(Path::new(path)).expect("file exists");
        file.tags.insert(tag.to_string(), TagValue::text(value));
        file.mtime = mtime;
    }

    pub fn touch(&self, path: &str, mtime: i64) {
        let mut files = self.files.lock().unwrap();
        if let Some(file) = files.get_mut(Path::new(path)) {
            file.mtime = mtime;
        }
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(Path::new(path));
    }

    pub fn tag(&self, path: &str, tag: &str) -> Option<String> {
        let files = self.files.lock().unwrap();
        files
            .get(Path::new(path))
            .and_then(|f| get_ignore_case(&f.tags, tag).map(TagValue::as_text))
    }

    pub fn set_unreadable(&self, path: &str) {
        self.unreadable.lock().unwrap().insert(PathBuf::from(path));
    }

    pub fn set_read_only(&self, path: &str) {
        self.read_only.lock().unwrap().insert(PathBuf::from(path));
    }

    pub fn set_write_time(&self, mtime: i64) {
        self.write_time.store(mtime, Ordering::SeqCst);
    }

    /// Run `hook` while the next write is in flight
    pub fn on_next_write(&self, hook: impl Future<Output = ()> + Send + 'static) {
        *self.write_hook.lock().unwrap() = Some(Box::pin(hook));
    }

    pub fn writes(&self) -> Vec<(PathBuf, TagMap)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn not_found(path: &Path) -> BridgeError {
        BridgeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            path.display().to_string(),
        ))
    }
}

#[async_trait]
impl FileSystemAccess for MemoryLibrary {
    async fn exists(&self, path: &Path) -> Result<bool> {
        let files = self.files.lock().unwrap();
        Ok(files.contains_key(path) || files.keys().any(|p| p.starts_with(path)))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(file) => Ok(FileMetadata {
                size: 0,
                modified_at: Some(file.mtime),
                is_directory: false,
            }),
            None if files.keys().any(|p| p.starts_with(path)) => Ok(FileMetadata {
                size: 0,
                modified_at: None,
                is_directory: true,
            }),
            None => Err(Self::not_found(path)),
        }
    }

    async fn list_directory(&self, _path: &Path) -> Result<Vec<PathBuf>> {
        Err(BridgeError::NotAvailable("list_directory".into()))
    }

    async fn list_files(&self, root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        Ok(files
            .keys()
            .filter(|p| p.starts_with(root) && has_extension(p, extension))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TagCodec for MemoryLibrary {
    async fn read_fields(&self, path: &Path, fields: &[String]) -> Result<TagMap> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unreadable.lock().unwrap().contains(path) {
            return Err(BridgeError::OperationFailed("unreadable".into()));
        }

        let files = self.files.lock().unwrap();
        let file = files.get(path).ok_or_else(|| Self::not_found(path))?;
        Ok(fields
            .iter()
            .filter_map(|field| {
                get_ignore_case(&file.tags, field).map(|value| (field.clone(), value.clone()))
            })
            .collect())
    }

    async fn write_fields(&self, path: &Path, values: &TagMap) -> Result<()> {
        let hook = self.write_hook.lock().unwrap().take();
        if let Some(hook) = hook {
            hook.await;
        }

        if self.read_only.lock().unwrap().contains(path) {
            return Err(BridgeError::OperationFailed("read-only".into()));
        }

        let mut files = self.files.lock().unwrap();
        let file = files.get_mut(path).ok_or_else(|| Self::not_found(path))?;
        for (field, value) in values {
            file.tags.retain(|k, _| !k.eq_ignore_ascii_case(field));
            file.tags.insert(field.clone(), value.clone());
        }
        file.mtime = self.write_time.load(Ordering::SeqCst);

        self.writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), values.clone()));
        Ok(())
    }
}

/// Configuration with a small one-way selection
pub fn test_config(detection: ChangeDetection) -> AppConfig {
    AppConfig::default()
        .with_source_a("/a")
        .with_source_b("/b")
        .with_tags_to_sync(TagSelection::List(vec!["TIT2".into(), "TPE1".into()]))
        .with_change_detection(detection)
}

pub struct Harness {
    pub pool: SqlitePool,
    pub library: Arc<MemoryLibrary>,
    pub clock: Arc<ManualClock>,
    pub engine: SyncEngine,
    pub registry: PairingRegistry,
    pub tracker: FileStateTracker,
}

impl Harness {
    pub async fn new(detection: ChangeDetection) -> Self {
        Self::with_config(test_config(detection)).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let pool = create_test_pool().await.unwrap();
        let library = MemoryLibrary::new();
        let clock = Arc::new(ManualClock::new(1_000));

        let engine = SyncEngine::new(
            &config,
            pool.clone(),
            library.clone(),
            library.clone(),
            clock.clone(),
        );
        let registry = PairingRegistry::new(pool.clone());
        let tracker = FileStateTracker::new(
            &config,
            pool.clone(),
            library.clone(),
            library.clone(),
            clock.clone(),
        );

        Self {
            pool,
            library,
            clock,
            engine,
            registry,
            tracker,
        }
    }

    /// Register a pair as library member and mapping
    pub async fn pair(&self, a: &str, b: &str) {
        SqliteSourceFileStateRepository::new(self.pool.clone())
            .upsert(&SourceFileState::new(a, Some(1), true))
            .await
            .unwrap();
        self.registry
            .upsert_mappings(&[MappingEntry::new(a, b)])
            .await
            .unwrap();
    }

    pub async fn last_sync(&self, a: &str) -> Option<i64> {
        self.registry
            .get_mappings()
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.source_a_path == a)
            .and_then(|m| m.last_sync_timestamp)
    }
}
