use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a single card within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    Correct,
    Incorrect,
    Skipped,
    /// The session ended before the card was answered.
    #[default]
    Unanswered,
}

impl ResponseOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseOutcome::Correct => "correct",
            ResponseOutcome::Incorrect => "incorrect",
            ResponseOutcome::Skipped => "skipped",
            ResponseOutcome::Unanswered => "unanswered",
        }
    }

    /// Correct or incorrect, i.e. the card was revealed and judged.
    #[must_use]
    pub fn is_graded(self) -> bool {
        matches!(self, ResponseOutcome::Correct | ResponseOutcome::Incorrect)
    }
}

impl fmt::Display for ResponseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-card result slot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub outcome: ResponseOutcome,
    pub response_secs: f64,
}

impl ResponseRecord {
    #[must_use]
    pub fn new(outcome: ResponseOutcome, response_secs: f64) -> Self {
        Self {
            outcome,
            response_secs: sanitize_secs(response_secs),
        }
    }

    #[must_use]
    pub fn unanswered() -> Self {
        Self::default()
    }
}

fn sanitize_secs(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 { secs } else { 0.0 }
}
