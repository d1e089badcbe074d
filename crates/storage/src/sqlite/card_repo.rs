use challenge_core::model::StudyCard;

use super::SqliteRepository;
use super::mapping::{card_id_to_i64, map_card_row};
use crate::repository::{CardRepository, StorageError};

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn upsert_card(&self, card: &StudyCard) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO study_cards (id, question, answer, hint, category, difficulty)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                question = excluded.question,
                answer = excluded.answer,
                hint = excluded.hint,
                category = excluded.category,
                difficulty = excluded.difficulty
            ",
        )
        .bind(card_id_to_i64(card.id())?)
        .bind(card.question().to_owned())
        .bind(card.answer().to_owned())
        .bind(card.hint().map(str::to_owned))
        .bind(card.category().to_owned())
        .bind(card.difficulty().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_cards(&self) -> Result<Vec<StudyCard>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question, answer, hint, category, difficulty
            FROM study_cards
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_card_row).collect()
    }
}
