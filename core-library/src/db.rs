//! # State Store Pool
//!
//! Opens the SQLite database that holds file states, pairings and the
//! ledger, and applies the embedded migrations.
//!
//! File databases run in WAL mode with foreign keys enforced, so deleting a
//! mapping cascades to its ledger rows. An in-memory database lives and dies
//! with its connection, so [`DatabaseConfig::InMemory`] pins the pool to one
//! connection that is never recycled.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("/data/tagsync/sync_data.db")).await?;
//! let mappings = SqliteFileMappingRepository::new(pool.clone());
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connections kept for a file database
const FILE_POOL_SIZE: u32 = 4;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Location of the state store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// SQLite file, created when missing
    File(PathBuf),
    /// Private in-memory database
    InMemory,
}

impl DatabaseConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        DatabaseConfig::File(database_path.into())
    }

    pub fn in_memory() -> Self {
        DatabaseConfig::InMemory
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match self {
            DatabaseConfig::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            DatabaseConfig::InMemory => SqliteConnectOptions::new().in_memory(true),
        };

        options.foreign_keys(true).busy_timeout(BUSY_TIMEOUT)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        match self {
            DatabaseConfig::File(_) => SqlitePoolOptions::new().max_connections(FILE_POOL_SIZE),
            DatabaseConfig::InMemory => SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .max_lifetime(None)
                .idle_timeout(None),
        }
    }
}

/// Open the store and bring its schema up to date
///
/// # Errors
///
/// Returns `Database` when the file cannot be opened and `Migration` when
/// the schema cannot be applied.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(database = ?config, "Opening state store");

    let pool = config
        .pool_options()
        .connect_with(config.connect_options())
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to open state store");
            LibraryError::Database(e)
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            LibraryError::Migration(e.to_string())
        })?;

    debug!(connections = pool.size(), "State store ready");
    Ok(pool)
}

/// In-memory store with the schema applied
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}
