#![forbid(unsafe_code)]

pub mod challenge;
pub mod error;

pub use challenge_core::Clock;

pub use challenge::{
    ChallengeRunner, CompletionHook, FinishReason, HistoryRecorder, RunnerEvent, SessionAction,
    SessionController, SessionOutcome, SessionTimer, TickerHandle, TimerTick, select_cards,
    select_cards_seeded,
};
pub use error::{ChallengeError, RunnerError, SessionPhase};
