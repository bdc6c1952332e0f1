//! # Repository Pattern Implementation
//!
//! This module provides repository traits and implementations for data access.
//! Each table has a corresponding repository.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `SourceFileStateRepository` - Cached mtime and membership per Source-A file
//! - `FileMappingRepository` - Source-A to Source-B pairings and last sync times
//! - `SyncStateTagRepository` - Per-tag ledger of last observed values

pub mod file_mapping;
pub mod source_file_state;
pub mod sync_state_tag;

pub use file_mapping::{FileMappingRepository, SqliteFileMappingRepository};
pub use source_file_state::{SourceFileStateRepository, SqliteSourceFileStateRepository};
pub use sync_state_tag::{SqliteSyncStateTagRepository, SyncStateTagRepository};
