//! Timed challenge sessions: card selection, countdown, scoring and history.

mod controller;
mod history;
mod runner;
mod scorer;
mod selector;
mod timer;

pub use controller::{CompletionHook, SessionController, SessionOutcome};
pub use history::HistoryRecorder;
pub use runner::{ChallengeRunner, RunnerEvent, SessionAction, TICK_PERIOD, TickerHandle};
pub use scorer::{FinishReason, RecordStep, ResponseSheet};
pub use selector::{CardPoolSelector, SelectionPlan, select_cards, select_cards_seeded};
pub use timer::{SessionTimer, TimerTick};
