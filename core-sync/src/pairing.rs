//! Pairing Registry
//!
//! Owns the Source-A → Source-B mapping table. Repointing a mapping to a
//! different Source-B file discards its ledger rows and last sync time, since
//! that baseline described another file.

use crate::error::{Result, SyncError};
use crate::types::{MappingEntry, PairingSuggestion};
use core_library::models::validate_mapping_paths;
use core_library::repositories::{
    FileMappingRepository, SqliteFileMappingRepository, SqliteSyncStateTagRepository,
    SyncStateTagRepository,
};
use regex::Regex;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument};

/// `<track>_<artist>_<title>.<ext>` as used for Source-A file names
static SOURCE_A_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)_([^_]+)_(.+)\.([^.]+)$").expect("source name regex")
});

pub struct PairingRegistry {
    mappings: Arc<dyn FileMappingRepository>,
    ledger: Arc<dyn SyncStateTagRepository>,
}

impl PairingRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_repositories(
            Arc::new(SqliteFileMappingRepository::new(pool.clone())),
            Arc::new(SqliteSyncStateTagRepository::new(pool)),
        )
    }

    pub fn with_repositories(
        mappings: Arc<dyn FileMappingRepository>,
        ledger: Arc<dyn SyncStateTagRepository>,
    ) -> Self {
        Self { mappings, ledger }
    }

    /// Create or repoint every entry, returning how many were processed
    ///
    /// All entries are validated before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `Precondition` if any entry has an empty path or pairs a file
    /// with itself.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn upsert_mappings(&self, entries: &[MappingEntry]) -> Result<usize> {
        for entry in entries {
            validate_mapping_paths(&entry.source_a_path, &entry.source_b_path)
                .map_err(SyncError::Precondition)?;
        }

        for entry in entries {
            let previous = self.mappings.find_by_source_a(&entry.source_a_path).await?;
            let mapping = self
                .mappings
                .upsert(&entry.source_a_path, &entry.source_b_path)
                .await?;

            if previous.is_some_and(|p| p.source_b_path != entry.source_b_path) {
                let cleared = self.ledger.delete_for_mapping(mapping.id).await?;
                debug!(
                    source_a = %entry.source_a_path,
                    source_b = %entry.source_b_path,
                    cleared,
                    "Repointed mapping"
                );
            }
        }

        info!(count = entries.len(), "Saved pairings");
        Ok(entries.len())
    }

    pub async fn get_mappings(&self) -> Result<Vec<MappingEntry>> {
        let mappings = self.mappings.list_all().await?;
        Ok(mappings.into_iter().map(MappingEntry::from).collect())
    }

    /// Remove a mapping and its ledger rows
    pub async fn remove_mapping(&self, source_a_path: &str) -> Result<bool> {
        let removed = self.mappings.delete_by_source_a(source_a_path).await?;
        if removed {
            info!(source_a = %source_a_path, "Removed pairing");
        }
        Ok(removed)
    }
}

/// Suggest Source-B counterparts by file name
///
/// A Source-A file named `<track>_<artist>_<title>.<ext>` matches the
/// Source-B file named `<artist>_<track>_<title>.<ext>`, compared without
/// regard to case. Every Source-A file appears once in the result, in input
/// order; files without a match carry `None`.
pub fn suggest_pairings(a_files: &[PathBuf], b_files: &[PathBuf]) -> Vec<PairingSuggestion> {
    let by_name: HashMap<String, &PathBuf> = b_files
        .iter()
        .filter_map(|path| file_name(path).map(|name| (name.to_lowercase(), path)))
        .collect();

    a_files
        .iter()
        .map(|a| {
            let source_b_path = file_name(a)
                .and_then(counterpart_name)
                .and_then(|name| by_name.get(&name.to_lowercase()))
                .map(|b| b.to_string_lossy().into_owned());

            PairingSuggestion {
                source_a_path: a.to_string_lossy().into_owned(),
                source_b_path,
            }
        })
        .collect()
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Source-B file name expected for a Source-A file name
pub fn counterpart_name(source_a_name: &str) -> Option<String> {
    let captures = SOURCE_A_NAME_REGEX.captures(source_a_name)?;
    Some(format!(
        "{}_{}_{}.{}",
        &captures[2], &captures[1], &captures[3], &captures[4]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart_name() {
        assert_eq!(
            counterpart_name("01_Artist_Some Title.mp3").as_deref(),
            Some("Artist_01_Some Title.mp3")
        );
        assert_eq!(
            counterpart_name("7_Band_Title_With_Underscores.MP3").as_deref(),
            Some("Band_7_Title_With_Underscores.MP3")
        );
        assert_eq!(counterpart_name("Artist - Title.mp3"), None);
        assert_eq!(counterpart_name("x_Artist_Title.mp3"), None);
    }

    #[test]
    fn test_suggest_pairings_matches_case_insensitively() {
        let a = vec![
            PathBuf::from("/a/01_Artist_Song.mp3"),
            PathBuf::from("/a/02_Other_Tune.mp3"),
            PathBuf::from("/a/loose.mp3"),
        ];
        let b = vec![
            PathBuf::from("/b/x/artist_01_song.mp3"),
            PathBuf::from("/b/Unrelated_02_Tune.mp3"),
        ];

        let suggestions = suggest_pairings(&a, &b);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(
            suggestions[0].source_b_path.as_deref(),
            Some("/b/x/artist_01_song.mp3")
        );
        assert_eq!(suggestions[1].source_b_path, None);
        assert_eq!(suggestions[2].source_a_path, "/a/loose.mp3");
        assert_eq!(suggestions[2].source_b_path, None);
    }
}
