//! Sync state tag (ledger) repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::SyncStateTag;
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

/// Repository interface for the per-pair, per-tag ledger
#[async_trait]
pub trait SyncStateTagRepository: Send + Sync {
    /// All ledger rows of a mapping, ordered by tag name
    async fn find_for_mapping(&self, file_mapping_id: i64) -> Result<Vec<SyncStateTag>>;

    /// Record new baselines for a pair and advance its last sync time
    ///
    /// Ledger rows and the mapping timestamp are written in one transaction,
    /// so a pair never ends up with a new baseline but an old timestamp.
    /// The baseline describes the pair as `source_b_path`; when the mapping
    /// was removed or repointed since, nothing is written.
    ///
    /// # Returns
    /// - `Ok(true)` if the baseline was recorded
    /// - `Ok(false)` if the mapping is gone or points at another file
    async fn commit_baseline(
        &self,
        file_mapping_id: i64,
        source_b_path: &str,
        tags: &[SyncStateTag],
        synced_at: i64,
    ) -> Result<bool>;

    /// Delete every ledger row of a mapping, returning how many were removed
    async fn delete_for_mapping(&self, file_mapping_id: i64) -> Result<u64>;
}

/// SQLite implementation of SyncStateTagRepository
pub struct SqliteSyncStateTagRepository {
    pool: SqlitePool,
}

impl SqliteSyncStateTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn validate(tag: &SyncStateTag) -> Result<()> {
        tag.validate().map_err(|message| LibraryError::InvalidInput {
            field: "SyncStateTag".to_string(),
            message,
        })
    }

    async fn upsert_in(tx: &mut Transaction<'_, Sqlite>, tag: &SyncStateTag) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(tag.file_mapping_id)
            .bind(&tag.tag_name)
            .bind(&tag.source_a_value)
            .bind(&tag.source_b_value)
            .bind(tag.updated_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO sync_state_tags (file_mapping_id, tag_name, source_a_value, source_b_value, updated_at)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(file_mapping_id, tag_name) DO UPDATE SET
        source_a_value = excluded.source_a_value,
        source_b_value = excluded.source_b_value,
        updated_at = excluded.updated_at
"#;

#[async_trait]
impl SyncStateTagRepository for SqliteSyncStateTagRepository {
    async fn find_for_mapping(&self, file_mapping_id: i64) -> Result<Vec<SyncStateTag>> {
        let tags = sqlx::query_as::<_, SyncStateTag>(
            r#"
            SELECT file_mapping_id, tag_name, source_a_value, source_b_value, updated_at
            FROM sync_state_tags
            WHERE file_mapping_id = ?
            ORDER BY tag_name
            "#,
        )
        .bind(file_mapping_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn commit_baseline(
        &self,
        file_mapping_id: i64,
        source_b_path: &str,
        tags: &[SyncStateTag],
        synced_at: i64,
    ) -> Result<bool> {
        for tag in tags {
            Self::validate(tag)?;
            if tag.file_mapping_id != file_mapping_id {
                return Err(LibraryError::InvalidInput {
                    field: "SyncStateTag".to_string(),
                    message: format!(
                        "Ledger row for mapping {} passed with mapping {}",
                        tag.file_mapping_id, file_mapping_id
                    ),
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE file_mappings SET last_sync_timestamp = ? WHERE id = ? AND source_b_path = ?",
        )
        .bind(synced_at)
        .bind(file_mapping_id)
        .bind(source_b_path)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(file_mapping_id, "Mapping changed, baseline not recorded");
            return Ok(false);
        }

        for tag in tags {
            Self::upsert_in(&mut tx, tag).await?;
        }

        tx.commit().await?;

        debug!(
            file_mapping_id,
            tags = tags.len(),
            synced_at,
            "Committed ledger baseline"
        );
        Ok(true)
    }

    async fn delete_for_mapping(&self, file_mapping_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sync_state_tags WHERE file_mapping_id = ?")
            .bind(file_mapping_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
