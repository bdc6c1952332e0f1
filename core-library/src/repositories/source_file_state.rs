//! Source file state repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::SourceFileState;
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Repository interface for cached Source-A file state
#[async_trait]
pub trait SourceFileStateRepository: Send + Sync {
    /// Find the cached state of a file
    ///
    /// # Returns
    /// - `Ok(Some(state))` if the file was scanned before
    /// - `Ok(None)` if not found
    async fn find_by_path(&self, path: &str) -> Result<Option<SourceFileState>>;

    /// Insert or replace the cached state of a file
    async fn upsert(&self, state: &SourceFileState) -> Result<()>;

    /// All files currently flagged as library members, ordered by path
    async fn list_in_library(&self) -> Result<Vec<SourceFileState>>;

    /// Every cached file, ordered by path
    async fn list_all(&self) -> Result<Vec<SourceFileState>>;

    /// Delete the cached state of a file
    ///
    /// # Returns
    /// - `Ok(true)` if a row was deleted
    /// - `Ok(false)` if the path was unknown
    async fn delete(&self, path: &str) -> Result<bool>;
}

/// SQLite implementation of SourceFileStateRepository
pub struct SqliteSourceFileStateRepository {
    pool: SqlitePool,
}

impl SqliteSourceFileStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceFileStateRepository for SqliteSourceFileStateRepository {
    async fn find_by_path(&self, path: &str) -> Result<Option<SourceFileState>> {
        let state = sqlx::query_as::<_, SourceFileState>(
            "SELECT path, last_modified_at, in_library, last_checked FROM source_file_states WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    async fn upsert(&self, state: &SourceFileState) -> Result<()> {
        state
            .validate()
            .map_err(|message| LibraryError::InvalidInput {
                field: "SourceFileState".to_string(),
                message,
            })?;

        sqlx::query(
            r#"
            INSERT INTO source_file_states (path, last_modified_at, in_library, last_checked)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                last_modified_at = excluded.last_modified_at,
                in_library = excluded.in_library,
                last_checked = excluded.last_checked
            "#,
        )
        .bind(&state.path)
        .bind(state.last_modified_at)
        .bind(state.in_library)
        .bind(state.last_checked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_in_library(&self) -> Result<Vec<SourceFileState>> {
        let states = sqlx::query_as::<_, SourceFileState>(
            r#"
            SELECT path, last_modified_at, in_library, last_checked
            FROM source_file_states
            WHERE in_library = 1
            ORDER BY path
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(states)
    }

    async fn list_all(&self) -> Result<Vec<SourceFileState>> {
        let states = sqlx::query_as::<_, SourceFileState>(
            "SELECT path, last_modified_at, in_library, last_checked FROM source_file_states ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(states)
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM source_file_states WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
