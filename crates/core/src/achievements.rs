use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{ChallengeSettings, SessionStats};

/// Stable identifier of an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    PerfectScore,
    SpeedDemon,
    StreakMaster,
    QuickThinker,
    ChallengeChampion,
}

impl AchievementId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementId::PerfectScore => "perfect_score",
            AchievementId::SpeedDemon => "speed_demon",
            AchievementId::StreakMaster => "streak_master",
            AchievementId::QuickThinker => "quick_thinker",
            AchievementId::ChallengeChampion => "challenge_champion",
        }
    }

    /// Registry entry for this id.
    #[must_use]
    pub fn definition(self) -> &'static Achievement {
        let index = match self {
            AchievementId::PerfectScore => 0,
            AchievementId::SpeedDemon => 1,
            AchievementId::StreakMaster => 2,
            AchievementId::QuickThinker => 3,
            AchievementId::ChallengeChampion => 4,
        };
        &ACHIEVEMENTS[index]
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown achievement id: {0}")]
pub struct ParseAchievementIdError(pub String);

impl FromStr for AchievementId {
    type Err = ParseAchievementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ACHIEVEMENTS
            .iter()
            .map(|a| a.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ParseAchievementIdError(s.to_owned()))
    }
}

/// A named predicate over final session statistics.
///
/// Definitions carry no unlock state; whether an achievement is unlocked is
/// always recomputed from the stats at hand.
pub struct Achievement {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    predicate: fn(&SessionStats, &ChallengeSettings) -> bool,
}

impl Achievement {
    #[must_use]
    pub fn is_unlocked(&self, stats: &SessionStats, settings: &ChallengeSettings) -> bool {
        (self.predicate)(stats, settings)
    }
}

impl fmt::Debug for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Achievement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Achievement {}

pub static ACHIEVEMENTS: [Achievement; 5] = [
    Achievement {
        id: AchievementId::PerfectScore,
        name: "Perfect Score",
        description: "Answer every card correctly",
        predicate: perfect_score,
    },
    Achievement {
        id: AchievementId::SpeedDemon,
        name: "Speed Demon",
        description: "Finish with more than half the time left",
        predicate: speed_demon,
    },
    Achievement {
        id: AchievementId::StreakMaster,
        name: "Streak Master",
        description: "Get 5 or more correct answers in a row",
        predicate: streak_master,
    },
    Achievement {
        id: AchievementId::QuickThinker,
        name: "Quick Thinker",
        description: "Average under 5 seconds per answer",
        predicate: quick_thinker,
    },
    Achievement {
        id: AchievementId::ChallengeChampion,
        name: "Challenge Champion",
        description: "Score above 90% on hard or expert difficulty",
        predicate: challenge_champion,
    },
];

fn perfect_score(stats: &SessionStats, _: &ChallengeSettings) -> bool {
    stats.total_cards() > 0
        && stats.correct_answers() == stats.total_cards()
        && stats.incorrect_answers() == 0
}

fn speed_demon(stats: &SessionStats, settings: &ChallengeSettings) -> bool {
    stats.graded_answers() > 0
        && f64::from(stats.time_remaining_secs()) > f64::from(settings.duration_secs()) * 0.5
}

fn streak_master(stats: &SessionStats, _: &ChallengeSettings) -> bool {
    stats.longest_streak() >= 5
}

fn quick_thinker(stats: &SessionStats, _: &ChallengeSettings) -> bool {
    stats.graded_answers() > 0 && stats.average_response_secs() < 5.0
}

fn challenge_champion(stats: &SessionStats, settings: &ChallengeSettings) -> bool {
    stats.total_cards() > 0 && stats.accuracy() > 0.9 && settings.difficulty().is_advanced()
}

/// Every achievement whose predicate holds, in registry order.
#[must_use]
pub fn evaluate(stats: &SessionStats, settings: &ChallengeSettings) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| a.is_unlocked(stats, settings))
        .collect()
}

#[must_use]
pub fn unlocked_ids(stats: &SessionStats, settings: &ChallengeSettings) -> Vec<AchievementId> {
    evaluate(stats, settings).into_iter().map(|a| a.id).collect()
}
