use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

use crate::model::card::Difficulty;

/// Accepted session lengths, in seconds.
pub const DURATION_SECS_RANGE: RangeInclusive<u32> = 30..=300;

/// Accepted card-set sizes.
pub const CARDS_COUNT_RANGE: RangeInclusive<u32> = 5..=30;

//
// ─── CHALLENGE DIFFICULTY ──────────────────────────────────────────────────────
//

/// Difficulty tier chosen for a challenge.
///
/// `Hard` and `Expert` select the same cards; `Expert` only changes which
/// achievements are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl ChallengeDifficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeDifficulty::Easy => "easy",
            ChallengeDifficulty::Medium => "medium",
            ChallengeDifficulty::Hard => "hard",
            ChallengeDifficulty::Expert => "expert",
        }
    }

    /// Whether a card of the given difficulty is eligible at this tier.
    #[must_use]
    pub fn admits(self, card: Difficulty) -> bool {
        match self {
            ChallengeDifficulty::Easy => card == Difficulty::Easy,
            ChallengeDifficulty::Medium => matches!(card, Difficulty::Easy | Difficulty::Medium),
            ChallengeDifficulty::Hard | ChallengeDifficulty::Expert => true,
        }
    }

    #[must_use]
    pub fn is_advanced(self) -> bool {
        matches!(self, ChallengeDifficulty::Hard | ChallengeDifficulty::Expert)
    }
}

impl fmt::Display for ChallengeDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown challenge difficulty: {0}")]
pub struct ParseChallengeDifficultyError(pub String);

impl FromStr for ChallengeDifficulty {
    type Err = ParseChallengeDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "expert" => Ok(Self::Expert),
            other => Err(ParseChallengeDifficultyError(other.to_owned())),
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Configuration for one challenge session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSettings {
    duration_secs: u32,
    cards_count: u32,
    difficulty: ChallengeDifficulty,
    categories: BTreeSet<String>,
    include_hints: bool,
}

impl ChallengeSettings {
    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn cards_count(&self) -> u32 {
        self.cards_count
    }

    #[must_use]
    pub fn difficulty(&self) -> ChallengeDifficulty {
        self.difficulty
    }

    /// Category filter; empty means every category.
    #[must_use]
    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    #[must_use]
    pub fn include_hints(&self) -> bool {
        self.include_hints
    }
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        ChallengeSettingsDraft::default().clamp()
    }
}

/// Caller-supplied settings before clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSettingsDraft {
    pub duration_secs: u32,
    pub cards_count: u32,
    pub difficulty: ChallengeDifficulty,
    pub categories: Vec<String>,
    pub include_hints: bool,
}

impl Default for ChallengeSettingsDraft {
    fn default() -> Self {
        Self {
            duration_secs: 120,
            cards_count: 10,
            difficulty: ChallengeDifficulty::Medium,
            categories: Vec::new(),
            include_hints: false,
        }
    }
}

impl ChallengeSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the draft into settings. Out-of-range numbers are clamped to
    /// the nearest bound, never rejected.
    #[must_use]
    pub fn clamp(self) -> ChallengeSettings {
        let duration_secs = clamp_logged("duration_secs", self.duration_secs, &DURATION_SECS_RANGE);
        let cards_count = clamp_logged("cards_count", self.cards_count, &CARDS_COUNT_RANGE);
        let categories = self
            .categories
            .into_iter()
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .collect();

        ChallengeSettings {
            duration_secs,
            cards_count,
            difficulty: self.difficulty,
            categories,
            include_hints: self.include_hints,
        }
    }
}

fn clamp_logged(field: &str, value: u32, range: &RangeInclusive<u32>) -> u32 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        log::warn!(
            "challenge setting {field}={value} outside {}..={}, clamped to {clamped}",
            range.start(),
            range.end()
        );
    }
    clamped
}
