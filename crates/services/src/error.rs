//! Shared error types for the services crate.

use std::fmt;
use thiserror::Error;

use challenge_core::model::SessionStatsError;
use challenge_storage::repository::StorageError;

/// Controller phases, reported in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Setup,
    Running,
    Finished,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::Setup => "setup",
            SessionPhase::Running => "running",
            SessionPhase::Finished => "finished",
        })
    }
}

/// Errors emitted by the challenge session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("cannot start: no cards available")]
    EmptyPool,
    #[error("{action} is not accepted while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error("response for card {got} but card {expected} is current")]
    OutOfOrder { expected: usize, got: usize },
    #[error(transparent)]
    Stats(#[from] SessionStatsError),
}

/// Errors emitted by the async challenge runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
