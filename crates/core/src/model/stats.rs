use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::{ScoreBreakdown, ScoreInput, compute_score};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStatsError {
    #[error("answer counts ({sum}) do not match card total ({total})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("longest streak ({longest}) is shorter than current streak ({streak})")]
    StreakInvariant { streak: u32, longest: u32 },

    #[error("longest streak ({longest}) exceeds correct answers ({correct})")]
    StreakExceedsCorrect { longest: u32, correct: u32 },
}

/// Final answer counts for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerTally {
    pub correct: u32,
    pub incorrect: u32,
    pub skipped: u32,
}

impl AnswerTally {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct
            .saturating_add(self.incorrect)
            .saturating_add(self.skipped)
    }
}

/// Statistics derived once, at the end of a challenge session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    score: u32,
    breakdown: ScoreBreakdown,
    correct_answers: u32,
    incorrect_answers: u32,
    skipped_answers: u32,
    total_cards: u32,
    average_response_secs: f64,
    streak: u32,
    longest_streak: u32,
    time_remaining_secs: u32,
    duration_secs: u32,
}

impl SessionStats {
    /// Compute final statistics and the composite score.
    ///
    /// `average_response_secs` is `None` when no card was graded.
    ///
    /// # Errors
    ///
    /// Returns `SessionStatsError` if the tally or streaks are inconsistent.
    pub fn compute(
        tally: AnswerTally,
        total_cards: u32,
        average_response_secs: Option<f64>,
        streak: u32,
        longest_streak: u32,
        time_remaining_secs: u32,
        duration_secs: u32,
    ) -> Result<Self, SessionStatsError> {
        let sum = tally.total();
        if sum != total_cards {
            return Err(SessionStatsError::CountMismatch {
                total: total_cards,
                sum,
            });
        }
        if longest_streak < streak {
            return Err(SessionStatsError::StreakInvariant {
                streak,
                longest: longest_streak,
            });
        }
        if longest_streak > tally.correct {
            return Err(SessionStatsError::StreakExceedsCorrect {
                longest: longest_streak,
                correct: tally.correct,
            });
        }

        let breakdown = compute_score(ScoreInput {
            correct: tally.correct,
            incorrect: tally.incorrect,
            longest_streak,
            duration_secs,
            average_response_secs,
        });

        Ok(Self {
            score: breakdown.score(),
            breakdown,
            correct_answers: tally.correct,
            incorrect_answers: tally.incorrect,
            skipped_answers: tally.skipped,
            total_cards,
            average_response_secs: average_response_secs.unwrap_or(0.0),
            streak,
            longest_streak,
            time_remaining_secs: time_remaining_secs.min(duration_secs),
            duration_secs,
        })
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn breakdown(&self) -> ScoreBreakdown {
        self.breakdown
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> u32 {
        self.incorrect_answers
    }

    #[must_use]
    pub fn skipped_answers(&self) -> u32 {
        self.skipped_answers
    }

    /// Cards judged correct or incorrect.
    #[must_use]
    pub fn graded_answers(&self) -> u32 {
        self.correct_answers + self.incorrect_answers
    }

    #[must_use]
    pub fn total_cards(&self) -> u32 {
        self.total_cards
    }

    /// Mean time over correct/incorrect answers; `0.0` if none.
    #[must_use]
    pub fn average_response_secs(&self) -> f64 {
        self.average_response_secs
    }

    /// Streak at the moment the session ended.
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Fraction of cards answered correctly, `0.0` for an empty session.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total_cards == 0 {
            0.0
        } else {
            f64::from(self.correct_answers) / f64::from(self.total_cards)
        }
    }
}
