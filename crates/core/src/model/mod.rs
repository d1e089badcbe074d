mod card;
mod history;
mod ids;
mod response;
mod settings;
mod stats;

pub use card::{CardError, Difficulty, StudyCard, StudyCardDraft};
pub use history::{HistoryEntry, HistoryLog};
pub use ids::{CardId, HistoryEntryId, ParseIdError};
pub use response::{ResponseOutcome, ResponseRecord};
pub use settings::{
    CARDS_COUNT_RANGE, ChallengeDifficulty, ChallengeSettings, ChallengeSettingsDraft,
    DURATION_SECS_RANGE, ParseChallengeDifficultyError,
};
pub use stats::{AnswerTally, SessionStats, SessionStatsError};
