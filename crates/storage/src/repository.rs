use async_trait::async_trait;
use challenge_core::model::{CardId, HistoryEntry, HistoryEntryId, StudyCard};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Source of the card pool a challenge draws from.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Persist or update a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn upsert_card(&self, card: &StudyCard) -> Result<(), StorageError>;

    /// Fetch the full card pool ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_cards(&self) -> Result<Vec<StudyCard>, StorageError>;
}

/// Append-only store of completed challenge sessions.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append a history entry. Appending an id that already exists is a conflict.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` for duplicate ids, or other storage errors.
    async fn append_entry(&self, entry: &HistoryEntry) -> Result<(), StorageError>;

    /// Fetch an entry by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_entry(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError>;

    /// List up to `limit` entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_entries(&self, limit: u32) -> Result<Vec<HistoryEntry>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    cards: Arc<Mutex<BTreeMap<CardId, StudyCard>>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn upsert_card(&self, card: &StudyCard) -> Result<(), StorageError> {
        let mut guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(card.id(), card.clone());
        Ok(())
    }

    async fn list_cards(&self) -> Result<Vec<StudyCard>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append_entry(&self, entry: &HistoryEntry) -> Result<(), StorageError> {
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.iter().any(|e| e.id() == entry.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(entry.clone());
        Ok(())
    }

    async fn get_entry(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|e| e.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_entries(&self, limit: u32) -> Result<Vec<HistoryEntry>, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Aggregates card and history repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub cards: Arc<dyn CardRepository>,
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let cards: Arc<dyn CardRepository> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryRepository> = Arc::new(repo);
        Self { cards, history }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use challenge_core::model::{
        AnswerTally, ChallengeSettings, Difficulty, SessionStats,
    };
    use challenge_core::time::fixed_now;

    fn build_card(id: u64) -> StudyCard {
        StudyCard::new(CardId::new(id), "Q", "A", None, "General", Difficulty::Easy).unwrap()
    }

    fn build_entry(correct: u32) -> HistoryEntry {
        let stats = SessionStats::compute(
            AnswerTally {
                correct,
                incorrect: 0,
                skipped: 10 - correct,
            },
            10,
            Some(2.0),
            0,
            correct,
            30,
            120,
        )
        .unwrap();
        HistoryEntry::from_session(&stats, &ChallengeSettings::default(), Vec::new(), fixed_now())
    }

    #[tokio::test]
    async fn upsert_replaces_card_with_same_id() {
        let repo = InMemoryRepository::new();
        repo.upsert_card(&build_card(1)).await.unwrap();
        let updated =
            StudyCard::new(CardId::new(1), "Q2", "A2", None, "General", Difficulty::Hard).unwrap();
        repo.upsert_card(&updated).await.unwrap();
        repo.upsert_card(&build_card(2)).await.unwrap();

        let cards = repo.list_cards().await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question(), "Q2");
    }

    #[tokio::test]
    async fn history_lists_newest_first_and_rejects_duplicates() {
        let repo = InMemoryRepository::new();
        let first = build_entry(3);
        let second = build_entry(7);
        repo.append_entry(&first).await.unwrap();
        repo.append_entry(&second).await.unwrap();

        let err = repo.append_entry(&first).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let listed = repo.list_entries(10).await.unwrap();
        assert_eq!(listed, vec![second.clone(), first.clone()]);
        assert_eq!(repo.list_entries(1).await.unwrap(), vec![second]);
        assert_eq!(repo.get_entry(first.id()).await.unwrap(), first);
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_entry(HistoryEntryId::generate()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
