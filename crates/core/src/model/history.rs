use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::achievements::AchievementId;
use crate::model::{ChallengeDifficulty, ChallengeSettings, HistoryEntryId, SessionStats};

/// Summary of one completed challenge session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    id: HistoryEntryId,
    completed_at: DateTime<Utc>,
    score: u32,
    correct_answers: u32,
    total_cards: u32,
    categories: Vec<String>,
    difficulty: ChallengeDifficulty,
    duration_secs: u32,
    achievements: Vec<AchievementId>,
}

impl HistoryEntry {
    /// Build the record for a session that just finished.
    #[must_use]
    pub fn from_session(
        stats: &SessionStats,
        settings: &ChallengeSettings,
        achievements: Vec<AchievementId>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryEntryId::generate(),
            completed_at,
            score: stats.score(),
            correct_answers: stats.correct_answers(),
            total_cards: stats.total_cards(),
            categories: settings.categories().iter().cloned().collect(),
            difficulty: settings.difficulty(),
            duration_secs: settings.duration_secs(),
            achievements,
        }
    }

    /// Rehydrate an entry from persisted storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: HistoryEntryId,
        completed_at: DateTime<Utc>,
        score: u32,
        correct_answers: u32,
        total_cards: u32,
        categories: Vec<String>,
        difficulty: ChallengeDifficulty,
        duration_secs: u32,
        achievements: Vec<AchievementId>,
    ) -> Self {
        Self {
            id,
            completed_at,
            score,
            correct_answers,
            total_cards,
            categories,
            difficulty,
            duration_secs,
            achievements,
        }
    }

    #[must_use]
    pub fn id(&self) -> HistoryEntryId {
        self.id
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn total_cards(&self) -> u32 {
        self.total_cards
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    #[must_use]
    pub fn difficulty(&self) -> ChallengeDifficulty {
        self.difficulty
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn achievements(&self) -> &[AchievementId] {
        &self.achievements
    }
}

/// Append-only log of history entries.
///
/// `append` returns a new log and leaves `self` untouched; entries are shared
/// behind `Arc` so older snapshots stay valid and cheap to hold.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Arc<Vec<Arc<HistoryEntry>>>,
}

impl HistoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn append(&self, entry: HistoryEntry) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend(self.entries.iter().cloned());
        entries.push(Arc::new(entry));
        Self {
            entries: Arc::new(entries),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last().map(AsRef::as_ref)
    }
}
