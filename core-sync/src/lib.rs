//! # Tag Sync Module
//!
//! Keeps tags of paired audio files in two directory trees consistent.
//!
//! ## Overview
//!
//! A configured set of bidirectional tags may change on either side and
//! propagates in whichever direction changed; every other tag flows one way,
//! from Source A to Source B. Simultaneous edits of a bidirectional tag are
//! reported as conflicts instead of being overwritten.
//!
//! ## Components
//!
//! - **File State Tracker** (`tracker`): Caches modification times and library
//!   membership of Source-A files, re-reading tags only for changed files
//! - **Pairing Registry** (`pairing`): Source-A → Source-B mappings and
//!   name-based pairing suggestions
//! - **Change Detection** (`detection`): Ledger and modification-time
//!   strategies deciding which side of a pair changed
//! - **Sync Engine** (`engine`): Preview, run and single-pair reconciliation

pub mod detection;
pub mod engine;
pub mod error;
pub mod pairing;
pub mod tracker;
pub mod types;

pub use detection::{ChangeDetector, Changes, LedgerDetector, ModificationTimeDetector};
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use pairing::{suggest_pairings, PairingRegistry};
pub use tracker::FileStateTracker;
pub use types::{
    ConflictReport, LibraryMember, MappingEntry, PairingSuggestion, PendingUpdate, PreviewEntry,
    ReconcileReport, RunReport, ScanSummary, SyncDirection, TagConflict,
};
