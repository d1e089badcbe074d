use challenge_core::model::{HistoryEntry, HistoryEntryId};

use super::SqliteRepository;
use super::mapping::{encode_achievements, encode_categories, map_history_row};
use crate::repository::{HistoryRepository, StorageError};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

#[async_trait::async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append_entry(&self, entry: &HistoryEntry) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO history_entries (
                    id, completed_at, score, correct_answers, total_cards,
                    categories, difficulty, duration_secs, achievements
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(entry.id().to_string())
        .bind(entry.completed_at())
        .bind(i64::from(entry.score()))
        .bind(i64::from(entry.correct_answers()))
        .bind(i64::from(entry.total_cards()))
        .bind(encode_categories(entry.categories())?)
        .bind(entry.difficulty().as_str())
        .bind(i64::from(entry.duration_secs()))
        .bind(encode_achievements(entry.achievements())?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;

        log::debug!("persisted history entry {}", entry.id());
        Ok(())
    }

    async fn get_entry(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, completed_at, score, correct_answers, total_cards,
                    categories, difficulty, duration_secs, achievements
                FROM history_entries
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_history_row(&row)
    }

    async fn list_entries(&self, limit: u32) -> Result<Vec<HistoryEntry>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, completed_at, score, correct_answers, total_cards,
                    categories, difficulty, duration_secs, achievements
                FROM history_entries
                ORDER BY completed_at DESC, seq DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_history_row).collect()
    }
}
