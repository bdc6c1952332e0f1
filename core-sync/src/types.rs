//! Result and request types exchanged with the host
//!
//! Everything here serializes to camelCase JSON so a host can forward the
//! values unchanged.

use bridge_traits::tags::TagValue;
use core_library::models::{FileMapping, SourceFileState};
use serde::{Deserialize, Serialize};

// =============================================================================
// Library scan
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    /// Files enumerated under the Source-A root
    pub total: usize,
    /// Rows whose membership flag was re-derived
    pub updated: usize,
    /// The scan stopped early on request
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryMember {
    pub path: String,
    pub last_modified_at: Option<i64>,
}

impl From<SourceFileState> for LibraryMember {
    fn from(state: SourceFileState) -> Self {
        Self {
            path: state.path,
            last_modified_at: state.last_modified_at,
        }
    }
}

// =============================================================================
// Pairing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub source_a_path: String,
    pub source_b_path: String,
    /// Ignored on input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<i64>,
}

impl MappingEntry {
    pub fn new(source_a_path: impl Into<String>, source_b_path: impl Into<String>) -> Self {
        Self {
            source_a_path: source_a_path.into(),
            source_b_path: source_b_path.into(),
            last_sync_timestamp: None,
        }
    }
}

impl From<FileMapping> for MappingEntry {
    fn from(mapping: FileMapping) -> Self {
        Self {
            source_a_path: mapping.source_a_path,
            source_b_path: mapping.source_b_path,
            last_sync_timestamp: mapping.last_sync_timestamp,
        }
    }
}

/// Proposed counterpart for a Source-A file, `None` when nothing matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingSuggestion {
    pub source_a_path: String,
    pub source_b_path: Option<String>,
}

// =============================================================================
// Preview and run
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    #[serde(rename = "aToB")]
    AToB,
    #[serde(rename = "bToA")]
    BToA,
}

/// A single tag write the executor will perform
///
/// For `AToB`, `from` is the Source-B value being replaced and `to` the
/// transformed Source-A value. For `BToA` the roles are swapped: `from` is
/// the Source-A value and `to` the Source-B value pushed back onto A.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    pub tag: String,
    pub from: Option<TagValue>,
    pub to: Option<TagValue>,
    pub direction: SyncDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagConflict {
    pub tag: String,
    pub a: Option<TagValue>,
    pub b: Option<TagValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub source_path: String,
    pub dest_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending_updates: Vec<PendingUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<TagConflict>,
}

impl PreviewEntry {
    pub fn new(source_path: impl Into<String>, dest_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            dest_path: dest_path.into(),
            pending_updates: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending_updates.is_empty() && self.conflicts.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub source: String,
    pub tag: String,
    pub a: Option<TagValue>,
    pub b: Option<TagValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Pairs whose pending updates were all written
    pub applied: usize,
    pub conflicts: Vec<ConflictReport>,
    /// Pairs skipped because a write failed
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    #[serde(rename = "updatedAtoB")]
    pub updated_a_to_b: Vec<String>,
    #[serde(rename = "updatedBtoA")]
    pub updated_b_to_a: Vec<String>,
    pub conflicts: Vec<TagConflict>,
}
