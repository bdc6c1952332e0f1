//! # Sync State Store
//!
//! Owns the SQLite database that persists synchronization state and provides
//! repository patterns for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pooling, schema and embedded migrations
//! - `source_file_states`: cached modification time and membership per Source-A file
//! - `file_mappings`: the 1:1 pairing of Source-A and Source-B files
//! - `sync_state_tags`: the per-pair, per-tag ledger of last observed values
//!
//! Every row mutation is a single `INSERT ... ON CONFLICT DO UPDATE` statement,
//! so concurrent writers never lose updates to the same row.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{FileMapping, SourceFileState, SyncStateTag};
