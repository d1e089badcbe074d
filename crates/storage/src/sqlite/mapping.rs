use challenge_core::model::{
    CardId, ChallengeDifficulty, Difficulty, HistoryEntry, HistoryEntryId, StudyCard,
};
use challenge_core::AchievementId;
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn card_id_to_i64(id: CardId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("card_id overflow".into()))
}

fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    u64::try_from(v)
        .map(CardId::new)
        .map_err(|_| StorageError::Serialization("card_id sign overflow".into()))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_card_row(row: &sqlx::sqlite::SqliteRow) -> Result<StudyCard, StorageError> {
    let id = card_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    StudyCard::new(
        id,
        row.try_get::<String, _>("question").map_err(ser)?,
        row.try_get::<String, _>("answer").map_err(ser)?,
        row.try_get::<Option<String>, _>("hint").map_err(ser)?,
        row.try_get::<String, _>("category").map_err(ser)?,
        difficulty,
    )
    .map_err(ser)
}

pub(crate) fn encode_categories(categories: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(categories).map_err(ser)
}

pub(crate) fn encode_achievements(ids: &[AchievementId]) -> Result<String, StorageError> {
    let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    serde_json::to_string(&names).map_err(ser)
}

fn decode_achievements(raw: &str) -> Result<Vec<AchievementId>, StorageError> {
    let names: Vec<String> = serde_json::from_str(raw).map_err(ser)?;
    names
        .iter()
        .map(|name| name.parse::<AchievementId>().map_err(ser))
        .collect()
}

pub(crate) fn map_history_row(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryEntry, StorageError> {
    let id: HistoryEntryId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let correct_answers = u32_from_i64(
        "correct_answers",
        row.try_get::<i64, _>("correct_answers").map_err(ser)?,
    )?;
    let total_cards = u32_from_i64(
        "total_cards",
        row.try_get::<i64, _>("total_cards").map_err(ser)?,
    )?;
    let categories: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("categories").map_err(ser)?)
            .map_err(ser)?;
    let difficulty: ChallengeDifficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let duration_secs = u32_from_i64(
        "duration_secs",
        row.try_get::<i64, _>("duration_secs").map_err(ser)?,
    )?;
    let achievements = decode_achievements(&row.try_get::<String, _>("achievements").map_err(ser)?)?;

    Ok(HistoryEntry::from_persisted(
        id,
        completed_at,
        score,
        correct_answers,
        total_cards,
        categories,
        difficulty,
        duration_secs,
        achievements,
    ))
}
