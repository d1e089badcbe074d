use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::CardId;

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tag carried by every study card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(CardError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card question cannot be empty")]
    EmptyQuestion,

    #[error("card answer cannot be empty")]
    EmptyAnswer,

    #[error("card category cannot be empty")]
    EmptyCategory,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── STUDY CARD ────────────────────────────────────────────────────────────────
//

/// A question/answer card supplied by the external card collection.
///
/// Cards are immutable once built; the challenge engine only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StudyCardDraft", into = "StudyCardDraft")]
pub struct StudyCard {
    id: CardId,
    question: String,
    answer: String,
    hint: Option<String>,
    category: String,
    difficulty: Difficulty,
}

impl StudyCard {
    /// Build a card, trimming text fields.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the question, answer or category is blank.
    pub fn new(
        id: CardId,
        question: impl Into<String>,
        answer: impl Into<String>,
        hint: Option<String>,
        category: impl Into<String>,
        difficulty: Difficulty,
    ) -> Result<Self, CardError> {
        let question = question.into().trim().to_owned();
        if question.is_empty() {
            return Err(CardError::EmptyQuestion);
        }
        let answer = answer.into().trim().to_owned();
        if answer.is_empty() {
            return Err(CardError::EmptyAnswer);
        }
        let category = category.into().trim().to_owned();
        if category.is_empty() {
            return Err(CardError::EmptyCategory);
        }
        let hint = hint
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty());

        Ok(Self {
            id,
            question,
            answer,
            hint,
            category,
            difficulty,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

/// Wire shape for a card as produced by the data-fetch layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyCardDraft {
    pub id: CardId,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub category: String,
    pub difficulty: Difficulty,
}

impl TryFrom<StudyCardDraft> for StudyCard {
    type Error = CardError;

    fn try_from(draft: StudyCardDraft) -> Result<Self, Self::Error> {
        StudyCard::new(
            draft.id,
            draft.question,
            draft.answer,
            draft.hint,
            draft.category,
            draft.difficulty,
        )
    }
}

impl From<StudyCard> for StudyCardDraft {
    fn from(card: StudyCard) -> Self {
        Self {
            id: card.id,
            question: card.question,
            answer: card.answer,
            hint: card.hint,
            category: card.category,
            difficulty: card.difficulty,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
