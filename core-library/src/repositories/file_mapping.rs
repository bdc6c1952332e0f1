//! File mapping repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{validate_mapping_paths, FileMapping};
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Repository interface for Source-A to Source-B pairings
#[async_trait]
pub trait FileMappingRepository: Send + Sync {
    /// Find the mapping for a Source-A path
    async fn find_by_source_a(&self, source_a_path: &str) -> Result<Option<FileMapping>>;

    /// Every mapping, ordered by Source-A path
    async fn list_all(&self) -> Result<Vec<FileMapping>>;

    /// Create the mapping or repoint an existing one to a new Source-B path
    ///
    /// Repointing to a different Source-B file clears `last_sync_timestamp`,
    /// since the previous baseline described another file.
    ///
    /// # Errors
    /// Returns error if either path is empty, both are equal, or a database
    /// error occurs
    async fn upsert(&self, source_a_path: &str, source_b_path: &str) -> Result<FileMapping>;

    /// Delete the mapping of a Source-A path together with its ledger rows
    ///
    /// # Returns
    /// - `Ok(true)` if a mapping was deleted
    /// - `Ok(false)` if no mapping existed
    async fn delete_by_source_a(&self, source_a_path: &str) -> Result<bool>;
}

/// SQLite implementation of FileMappingRepository
pub struct SqliteFileMappingRepository {
    pool: SqlitePool,
}

impl SqliteFileMappingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileMappingRepository for SqliteFileMappingRepository {
    async fn find_by_source_a(&self, source_a_path: &str) -> Result<Option<FileMapping>> {
        let mapping = sqlx::query_as::<_, FileMapping>(
            r#"
            SELECT id, source_a_path, source_b_path, last_sync_timestamp
            FROM file_mappings
            WHERE source_a_path = ?
            "#,
        )
        .bind(source_a_path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(mapping)
    }

    async fn list_all(&self) -> Result<Vec<FileMapping>> {
        let mappings = sqlx::query_as::<_, FileMapping>(
            r#"
            SELECT id, source_a_path, source_b_path, last_sync_timestamp
            FROM file_mappings
            ORDER BY source_a_path
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(mappings)
    }

    async fn upsert(&self, source_a_path: &str, source_b_path: &str) -> Result<FileMapping> {
        validate_mapping_paths(source_a_path, source_b_path).map_err(|message| {
            LibraryError::InvalidInput {
                field: "FileMapping".to_string(),
                message,
            }
        })?;

        let mapping = sqlx::query_as::<_, FileMapping>(
            r#"
            INSERT INTO file_mappings (source_a_path, source_b_path, last_sync_timestamp)
            VALUES (?, ?, NULL)
            ON CONFLICT(source_a_path) DO UPDATE SET
                last_sync_timestamp = CASE
                    WHEN file_mappings.source_b_path = excluded.source_b_path
                        THEN file_mappings.last_sync_timestamp
                    ELSE NULL
                END,
                source_b_path = excluded.source_b_path
            RETURNING id, source_a_path, source_b_path, last_sync_timestamp
            "#,
        )
        .bind(source_a_path)
        .bind(source_b_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(mapping)
    }

    async fn delete_by_source_a(&self, source_a_path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM file_mappings WHERE source_a_path = ?")
            .bind(source_a_path)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
