//! Composite score for a finished challenge.
//!
//! `score = max(0, base + speed + streak - penalty)` where
//! - `base = 100 * correct`
//! - `speed = round(2 * (duration - average_response_secs))`, zero when nothing was graded
//! - `streak = 20 * longest_streak`
//! - `penalty = 30 * incorrect`

use serde::{Deserialize, Serialize};

pub const POINTS_PER_CORRECT: i64 = 100;
pub const SPEED_WEIGHT: f64 = 2.0;
pub const POINTS_PER_STREAK: i64 = 20;
pub const PENALTY_PER_INCORRECT: i64 = 30;

/// Inputs to the score formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    pub correct: u32,
    pub incorrect: u32,
    pub longest_streak: u32,
    pub duration_secs: u32,
    /// `None` when no card was graded correct or incorrect.
    pub average_response_secs: Option<f64>,
}

/// Individual contributions, kept for display and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_points: i64,
    pub speed_bonus: i64,
    pub streak_bonus: i64,
    pub incorrect_penalty: i64,
}

impl ScoreBreakdown {
    /// Sum of contributions before the zero floor.
    #[must_use]
    pub fn raw_total(&self) -> i64 {
        self.base_points + self.speed_bonus + self.streak_bonus - self.incorrect_penalty
    }

    /// Final score; never negative.
    #[must_use]
    pub fn score(&self) -> u32 {
        u32::try_from(self.raw_total().max(0)).unwrap_or(u32::MAX)
    }
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn compute_score(input: ScoreInput) -> ScoreBreakdown {
    let speed_bonus = match input.average_response_secs {
        Some(avg) if avg.is_finite() => {
            (SPEED_WEIGHT * (f64::from(input.duration_secs) - avg)).round() as i64
        }
        _ => 0,
    };

    ScoreBreakdown {
        base_points: POINTS_PER_CORRECT * i64::from(input.correct),
        speed_bonus,
        streak_bonus: POINTS_PER_STREAK * i64::from(input.longest_streak),
        incorrect_penalty: PENALTY_PER_INCORRECT * i64::from(input.incorrect),
    }
}
