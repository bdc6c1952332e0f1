//! Domain models for the synchronization state store
//!
//! This module contains the persisted entities with validation and database
//! mapping. Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// =============================================================================
// Source File State
// =============================================================================

/// Cached state of one Source-A file
///
/// `in_library` is derived from the membership tag and is only recomputed when
/// `last_modified_at` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileState {
    pub path: String,
    pub last_modified_at: Option<i64>,
    pub in_library: bool,
    pub last_checked: Option<i64>,
}

impl SourceFileState {
    pub fn new(path: impl Into<String>, last_modified_at: Option<i64>, in_library: bool) -> Self {
        Self {
            path: path.into(),
            last_modified_at,
            in_library,
            last_checked: None,
        }
    }

    pub fn with_last_checked(mut self, checked_at: i64) -> Self {
        self.last_checked = Some(checked_at);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("Source file path cannot be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// File Mapping
// =============================================================================

/// Declared pairing of a Source-A file with its Source-B counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileMapping {
    pub id: i64,
    pub source_a_path: String,
    pub source_b_path: String,
    /// `None` until the pair has been synchronized once
    pub last_sync_timestamp: Option<i64>,
}

impl FileMapping {
    pub fn is_first_sync(&self) -> bool {
        self.last_sync_timestamp.is_none()
    }
}

/// Validate the two sides of a pairing before persisting it
pub fn validate_mapping_paths(source_a_path: &str, source_b_path: &str) -> Result<(), String> {
    if source_a_path.trim().is_empty() {
        return Err("Source A path cannot be empty".to_string());
    }
    if source_b_path.trim().is_empty() {
        return Err("Source B path cannot be empty".to_string());
    }
    if source_a_path == source_b_path {
        return Err(format!(
            "A file cannot be paired with itself: {}",
            source_a_path
        ));
    }
    Ok(())
}

// =============================================================================
// Sync State Tag (ledger)
// =============================================================================

/// Last observed value of one bidirectional tag on both sides of a pair
///
/// `None` means the tag was absent on that side when it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateTag {
    pub file_mapping_id: i64,
    pub tag_name: String,
    pub source_a_value: Option<String>,
    pub source_b_value: Option<String>,
    pub updated_at: i64,
}

impl SyncStateTag {
    pub fn new(
        file_mapping_id: i64,
        tag_name: impl Into<String>,
        source_a_value: Option<String>,
        source_b_value: Option<String>,
        updated_at: i64,
    ) -> Self {
        Self {
            file_mapping_id,
            tag_name: tag_name.into(),
            source_a_value,
            source_b_value,
            updated_at,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tag_name.trim().is_empty() {
            return Err("Tag name cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_state_validation() {
        let state = SourceFileState::new("/a/song.mp3", Some(1), true).with_last_checked(2);
        assert!(state.validate().is_ok());
        assert_eq!(state.last_checked, Some(2));

        let state = SourceFileState::new("  ", None, false);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_mapping_path_validation() {
        assert!(validate_mapping_paths("/a/x.mp3", "/b/x.mp3").is_ok());
        assert!(validate_mapping_paths("", "/b/x.mp3").is_err());
        assert!(validate_mapping_paths("/a/x.mp3", " ").is_err());
        assert!(validate_mapping_paths("/a/x.mp3", "/a/x.mp3").is_err());
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let mapping = FileMapping {
            id: 1,
            source_a_path: "/a/x.mp3".into(),
            source_b_path: "/b/x.mp3".into(),
            last_sync_timestamp: None,
        };
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["sourceAPath"], "/a/x.mp3");
        assert!(json["lastSyncTimestamp"].is_null());
        assert!(mapping.is_first_sync());
    }
}
