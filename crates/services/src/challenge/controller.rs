use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;

use challenge_core::achievements;
use challenge_core::model::{
    ChallengeSettings, HistoryEntry, ResponseOutcome, ResponseRecord, SessionStats, StudyCard,
};
use challenge_core::AchievementId;

use super::history::HistoryRecorder;
use super::scorer::{FinishReason, RecordStep, ResponseSheet};
use super::selector::CardPoolSelector;
use super::timer::{SessionTimer, TimerTick};
use crate::error::{ChallengeError, SessionPhase};

/// Callback invoked once per completed session.
pub type CompletionHook = Box<dyn FnMut(&SessionStats, &HistoryEntry) + Send>;

/// Final result of a challenge session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub stats: SessionStats,
    pub entry: HistoryEntry,
    pub achievements: Vec<AchievementId>,
    pub reason: FinishReason,
    pub records: Vec<ResponseRecord>,
}

struct RunningSession {
    settings: ChallengeSettings,
    cards: Vec<StudyCard>,
    sheet: ResponseSheet,
    timer: SessionTimer,
    revealed: bool,
}

impl RunningSession {
    fn current_card(&self) -> Option<&StudyCard> {
        self.cards.get(self.sheet.cursor())
    }
}

struct FinishedSession {
    settings: ChallengeSettings,
    outcome: SessionOutcome,
}

enum State {
    Setup,
    Running(Box<RunningSession>),
    Finished(Box<FinishedSession>),
}

/// Drives one challenge at a time through `Setup -> Running -> Finished`.
///
/// The controller is synchronous: the caller feeds it player actions and
/// one-second ticks, one at a time, together with the current time. Actions
/// that are not valid in the current phase are rejected with a warning and
/// leave the session untouched.
pub struct SessionController {
    state: State,
    history: HistoryRecorder,
    on_complete: Option<CompletionHook>,
    rng: StdRng,
}

impl SessionController {
    #[must_use]
    pub fn new(history: HistoryRecorder) -> Self {
        Self {
            state: State::Setup,
            history,
            on_complete: None,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Use a fixed seed for card selection.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn with_on_complete(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self.state {
            State::Setup => SessionPhase::Setup,
            State::Running(_) => SessionPhase::Running,
            State::Finished(_) => SessionPhase::Finished,
        }
    }

    #[must_use]
    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// Settings of the running or last finished session.
    #[must_use]
    pub fn settings(&self) -> Option<&ChallengeSettings> {
        match &self.state {
            State::Setup => None,
            State::Running(running) => Some(&running.settings),
            State::Finished(finished) => Some(&finished.settings),
        }
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&StudyCard> {
        self.running().and_then(RunningSession::current_card)
    }

    /// Zero-based index of the current card.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.running().map(|r| r.sheet.cursor())
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        match &self.state {
            State::Setup => 0,
            State::Running(running) => running.cards.len(),
            State::Finished(finished) => finished.outcome.records.len(),
        }
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> Option<u32> {
        self.running().map(|r| r.timer.remaining_secs())
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.running().map_or(0, |r| r.sheet.streak())
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        match &self.state {
            State::Setup => 0,
            State::Running(running) => running.sheet.longest_streak(),
            State::Finished(finished) => finished.outcome.stats.longest_streak(),
        }
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.running().is_some_and(|r| r.revealed)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        match &self.state {
            State::Finished(finished) => Some(&finished.outcome),
            _ => None,
        }
    }

    /// Begin a new session from `Setup` or after a finished one.
    ///
    /// A finished session is discarded and replaced by a brand-new one.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::EmptyPool` if no card could be selected, and
    /// `ChallengeError::InvalidTransition` while a session is running.
    pub fn start(
        &mut self,
        pool: &[StudyCard],
        settings: ChallengeSettings,
        now: DateTime<Utc>,
    ) -> Result<(), ChallengeError> {
        if matches!(self.state, State::Running(_)) {
            return Err(self.reject("start"));
        }

        let plan = CardPoolSelector::new(&settings).build(pool, &mut self.rng);
        if plan.is_empty() {
            log::warn!("cannot start challenge: card pool is empty");
            return Err(ChallengeError::EmptyPool);
        }

        log::info!(
            "challenge started: {} cards ({} matched, {} backfilled), {}s, {}",
            plan.total(),
            plan.matched,
            plan.backfilled,
            settings.duration_secs(),
            settings.difficulty(),
        );

        let timer = SessionTimer::start(settings.duration_secs(), now);
        self.state = State::Running(Box::new(RunningSession {
            sheet: ResponseSheet::new(plan.cards.len()),
            cards: plan.cards,
            settings,
            timer,
            revealed: false,
        }));
        Ok(())
    }

    /// Discard a finished session and return to `Setup`.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidTransition` while a session is running.
    pub fn reset(&mut self) -> Result<(), ChallengeError> {
        if matches!(self.state, State::Running(_)) {
            return Err(self.reject("reset"));
        }
        self.state = State::Setup;
        Ok(())
    }

    /// Show the answer of the current card. Revealing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidTransition` outside `Running`.
    pub fn reveal(&mut self) -> Result<(), ChallengeError> {
        match self.running_mut() {
            Some(running) => {
                running.revealed = true;
                Ok(())
            }
            None => Err(self.reject("reveal")),
        }
    }

    /// Hint for the current card, if hints are enabled and the card has one.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidTransition` outside `Running`.
    pub fn hint(&self) -> Result<Option<&str>, ChallengeError> {
        match self.running() {
            Some(running) if running.settings.include_hints() => {
                Ok(running.current_card().and_then(StudyCard::hint))
            }
            Some(_) => Ok(None),
            None => Err(self.reject("hint")),
        }
    }

    /// Judge the revealed card as correct or incorrect.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidTransition` outside `Running`, before the
    /// card is revealed, or for an outcome other than correct/incorrect.
    pub fn respond(
        &mut self,
        outcome: ResponseOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), ChallengeError> {
        let accepted = self
            .running()
            .is_some_and(|r| r.revealed && outcome.is_graded());
        if !accepted {
            return Err(self.reject(if self.running().is_some() {
                "respond before reveal"
            } else {
                "respond"
            }));
        }
        self.advance(outcome, now)
    }

    /// Skip the current card.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidTransition` outside `Running`.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Result<(), ChallengeError> {
        if self.running().is_none() {
            return Err(self.reject("skip"));
        }
        self.advance(ResponseOutcome::Skipped, now)
    }

    /// Count down one second; finishes the session when time runs out.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidTransition` outside `Running`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TimerTick, ChallengeError> {
        let Some(running) = self.running_mut() else {
            return Err(self.reject("tick"));
        };
        let tick = running.timer.tick();
        if tick == TimerTick::Expired {
            log::info!("challenge time expired");
            self.finish(FinishReason::TimeExpired, now)?;
        }
        Ok(tick)
    }

    /// End the running session early.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::InvalidTransition` outside `Running`.
    pub fn terminate(&mut self, now: DateTime<Utc>) -> Result<(), ChallengeError> {
        if self.running().is_none() {
            return Err(self.reject("terminate"));
        }
        self.finish(FinishReason::Terminated, now)
    }

    fn advance(&mut self, outcome: ResponseOutcome, now: DateTime<Utc>) -> Result<(), ChallengeError> {
        let Some(running) = self.running_mut() else {
            return Err(self.reject("respond"));
        };
        let elapsed = if running.revealed {
            running.timer.elapsed_since_transition(now)
        } else {
            0.0
        };
        let index = running.sheet.cursor();
        match running.sheet.record(index, outcome, elapsed)? {
            RecordStep::Advanced { next } => {
                log::debug!("card {index} {outcome} in {elapsed:.1}s, next {next}");
                running.timer.mark_transition(now);
                running.revealed = false;
                Ok(())
            }
            RecordStep::Completed => {
                log::debug!("card {index} {outcome} in {elapsed:.1}s, last card");
                self.finish(FinishReason::AllAnswered, now)
            }
        }
    }

    fn finish(&mut self, reason: FinishReason, now: DateTime<Utc>) -> Result<(), ChallengeError> {
        let mut running = match std::mem::replace(&mut self.state, State::Setup) {
            State::Running(running) => running,
            other => {
                self.state = other;
                return Err(self.reject("finish"));
            }
        };
        running.timer.cancel();

        let stats = match running.sheet.finalize(
            reason,
            running.timer.remaining_secs(),
            running.settings.duration_secs(),
        ) {
            Ok(stats) => stats,
            Err(err) => {
                self.state = State::Running(running);
                return Err(err.into());
            }
        };

        let unlocked = achievements::unlocked_ids(&stats, &running.settings);
        let entry = HistoryEntry::from_session(&stats, &running.settings, unlocked.clone(), now);
        self.history.append(entry.clone());
        log::info!(
            "challenge finished ({reason:?}): score {}, {}/{} correct, achievements {:?}",
            stats.score(),
            stats.correct_answers(),
            stats.total_cards(),
            unlocked,
        );

        if let Some(hook) = self.on_complete.as_mut() {
            hook(&stats, &entry);
        }

        let RunningSession {
            settings, sheet, ..
        } = *running;
        self.state = State::Finished(Box::new(FinishedSession {
            settings,
            outcome: SessionOutcome {
                stats,
                entry,
                achievements: unlocked,
                reason,
                records: sheet.records().to_vec(),
            },
        }));
        Ok(())
    }

    fn running(&self) -> Option<&RunningSession> {
        match &self.state {
            State::Running(running) => Some(running),
            _ => None,
        }
    }

    fn running_mut(&mut self) -> Option<&mut RunningSession> {
        match &mut self.state {
            State::Running(running) => Some(running),
            _ => None,
        }
    }

    fn reject(&self, action: &'static str) -> ChallengeError {
        let phase = self.phase();
        log::warn!("ignoring {action} while {phase}");
        ChallengeError::InvalidTransition { action, phase }
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase())
            .field("current_index", &self.current_index())
            .field("total_cards", &self.total_cards())
            .field("time_remaining_secs", &self.time_remaining_secs())
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use challenge_core::model::{
        CardId, ChallengeDifficulty, ChallengeSettingsDraft, Difficulty,
    };
    use challenge_core::time::{Clock, fixed_clock};
    use std::sync::{Arc, Mutex};

    fn pool(n: u64) -> Vec<StudyCard> {
        (1..=n)
            .map(|i| {
                StudyCard::new(
                    CardId::new(i),
                    format!("Q{i}"),
                    format!("A{i}"),
                    Some(format!("H{i}")),
                    "Cardiology",
                    Difficulty::Easy,
                )
                .unwrap()
            })
            .collect()
    }

    fn settings(cards_count: u32, duration_secs: u32) -> ChallengeSettings {
        ChallengeSettingsDraft {
            cards_count,
            duration_secs,
            difficulty: ChallengeDifficulty::Medium,
            ..ChallengeSettingsDraft::default()
        }
        .clamp()
    }

    fn started(n: u64, cfg: ChallengeSettings, clock: &Clock) -> SessionController {
        let mut controller = SessionController::new(HistoryRecorder::new()).with_seed(5);
        controller.start(&pool(n), cfg, clock.now()).unwrap();
        controller
    }

    #[test]
    fn start_refuses_empty_pool() {
        let mut controller = SessionController::new(HistoryRecorder::new());
        let err = controller
            .start(&[], settings(10, 120), fixed_clock().now())
            .unwrap_err();
        assert!(matches!(err, ChallengeError::EmptyPool));
        assert_eq!(controller.phase(), SessionPhase::Setup);
    }

    #[test]
    fn actions_in_setup_are_rejected_without_side_effects() {
        let mut controller = SessionController::new(HistoryRecorder::new());
        let now = fixed_clock().now();
        assert!(matches!(
            controller.respond(ResponseOutcome::Correct, now),
            Err(ChallengeError::InvalidTransition {
                phase: SessionPhase::Setup,
                ..
            })
        ));
        assert!(controller.skip(now).is_err());
        assert!(controller.tick(now).is_err());
        assert!(controller.reveal().is_err());
        assert_eq!(controller.phase(), SessionPhase::Setup);
        assert!(controller.history().is_empty());
    }

    #[test]
    fn second_start_while_running_is_rejected() {
        let clock = fixed_clock();
        let mut controller = started(10, settings(10, 120), &clock);
        controller.reveal().unwrap();
        controller.respond(ResponseOutcome::Correct, clock.now()).unwrap();

        let err = controller
            .start(&pool(10), settings(5, 60), clock.now())
            .unwrap_err();
        assert!(matches!(err, ChallengeError::InvalidTransition { .. }));
        assert_eq!(controller.current_index(), Some(1));
        assert_eq!(controller.total_cards(), 10);
    }

    #[test]
    fn respond_requires_reveal() {
        let clock = fixed_clock();
        let mut controller = started(5, settings(5, 60), &clock);
        assert!(controller.respond(ResponseOutcome::Correct, clock.now()).is_err());
        assert_eq!(controller.current_index(), Some(0));

        controller.reveal().unwrap();
        assert!(controller.respond(ResponseOutcome::Skipped, clock.now()).is_err());
        controller.respond(ResponseOutcome::Incorrect, clock.now()).unwrap();
        assert_eq!(controller.current_index(), Some(1));
        assert!(!controller.is_revealed());
    }

    #[test]
    fn perfect_run_scores_1432_and_unlocks_achievements() {
        let mut clock = fixed_clock();
        let mut controller = started(12, settings(10, 120), &clock);

        for _ in 0..10 {
            clock.advance_secs(4.0);
            controller.tick(clock.now()).unwrap();
            controller.reveal().unwrap();
            controller.respond(ResponseOutcome::Correct, clock.now()).unwrap();
        }

        assert_eq!(controller.phase(), SessionPhase::Finished);
        let outcome = controller.outcome().unwrap();
        let stats = &outcome.stats;
        assert_eq!(outcome.reason, FinishReason::AllAnswered);
        assert_eq!(stats.correct_answers(), 10);
        assert!((stats.average_response_secs() - 4.0).abs() < 1e-9);
        assert_eq!(stats.longest_streak(), 10);
        assert_eq!(stats.score(), 1432);
        assert_eq!(stats.time_remaining_secs(), 110);
        assert_eq!(
            outcome.achievements,
            vec![
                AchievementId::PerfectScore,
                AchievementId::SpeedDemon,
                AchievementId::StreakMaster,
                AchievementId::QuickThinker,
            ]
        );
        assert_eq!(controller.history().len(), 1);
        assert_eq!(controller.history().entries()[0], outcome.entry);
    }

    #[test]
    fn expiry_without_answers_marks_everything_skipped() {
        let mut clock = fixed_clock();
        let mut controller = started(10, settings(10, 30), &clock);

        let mut expired = 0;
        for _ in 0..30 {
            clock.advance_secs(1.0);
            if controller.tick(clock.now()).unwrap() == TimerTick::Expired {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
        assert!(controller.tick(clock.now()).is_err());

        let outcome = controller.outcome().unwrap();
        assert_eq!(outcome.reason, FinishReason::TimeExpired);
        assert_eq!(outcome.stats.correct_answers(), 0);
        assert_eq!(outcome.stats.incorrect_answers(), 0);
        assert_eq!(outcome.stats.skipped_answers(), 10);
        assert_eq!(outcome.stats.score(), 0);
        assert_eq!(outcome.stats.time_remaining_secs(), 0);
        assert!(outcome
            .records
            .iter()
            .all(|r| r.outcome == ResponseOutcome::Unanswered));
    }

    #[test]
    fn skipping_every_card_unlocks_nothing() {
        let mut clock = fixed_clock();
        let mut controller = started(10, settings(10, 120), &clock);
        for _ in 0..10 {
            clock.advance_secs(1.0);
            controller.skip(clock.now()).unwrap();
        }
        let outcome = controller.outcome().unwrap();
        assert_eq!(outcome.stats.skipped_answers(), 10);
        assert_eq!(outcome.stats.correct_answers(), 0);
        assert_eq!(outcome.stats.incorrect_answers(), 0);
        assert_eq!(outcome.stats.score(), 0);
        assert!(outcome.achievements.is_empty());
        assert!(outcome.records.iter().all(|r| r.response_secs == 0.0));
    }

    #[test]
    fn skip_after_reveal_records_elapsed_time() {
        let mut clock = fixed_clock();
        let mut controller = started(5, settings(5, 60), &clock);
        controller.reveal().unwrap();
        clock.advance_secs(3.0);
        controller.skip(clock.now()).unwrap();
        controller.terminate(clock.now()).unwrap();

        let outcome = controller.outcome().unwrap();
        assert_eq!(outcome.reason, FinishReason::Terminated);
        assert_eq!(outcome.records[0].outcome, ResponseOutcome::Skipped);
        assert!((outcome.records[0].response_secs - 3.0).abs() < 1e-9);
        assert_eq!(outcome.stats.skipped_answers(), 5);
    }

    #[test]
    fn completion_hook_fires_once_per_session_and_restart_is_a_new_session() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let hook: CompletionHook = Box::new(move |stats, entry| {
            sink.lock().unwrap().push((stats.score(), entry.id()));
        });
        let clock = fixed_clock();
        let mut controller = SessionController::new(HistoryRecorder::new())
            .with_seed(1)
            .with_on_complete(hook);

        for _ in 0..2 {
            controller.start(&pool(5), settings(5, 60), clock.now()).unwrap();
            assert_eq!(controller.current_index(), Some(0));
            controller.terminate(clock.now()).unwrap();
            assert!(controller.terminate(clock.now()).is_err());
        }

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].1, calls[1].1);
        assert_eq!(controller.history().len(), 2);
    }

    #[test]
    fn hints_follow_settings() {
        let clock = fixed_clock();
        let controller = started(5, settings(5, 60), &clock);
        assert_eq!(controller.hint().unwrap(), None);

        let cfg = ChallengeSettingsDraft {
            include_hints: true,
            ..ChallengeSettingsDraft::default()
        }
        .clamp();
        let controller = started(5, cfg, &clock);
        let expected = controller.current_card().unwrap().hint().map(str::to_owned);
        assert_eq!(controller.hint().unwrap().map(str::to_owned), expected);
        assert!(expected.is_some());
    }

    #[test]
    fn counts_always_add_up() {
        let mut clock = fixed_clock();
        let mut controller = started(20, settings(8, 60), &clock);
        let script = [
            Some(ResponseOutcome::Correct),
            None,
            Some(ResponseOutcome::Incorrect),
            Some(ResponseOutcome::Correct),
        ];
        for step in script {
            clock.advance_secs(2.0);
            match step {
                Some(outcome) => {
                    controller.reveal().unwrap();
                    controller.respond(outcome, clock.now()).unwrap();
                }
                None => controller.skip(clock.now()).unwrap(),
            }
        }
        controller.terminate(clock.now()).unwrap();

        let stats = &controller.outcome().unwrap().stats;
        assert_eq!(stats.total_cards(), 8);
        assert_eq!(
            stats.correct_answers() + stats.incorrect_answers() + stats.skipped_answers(),
            8
        );
        assert_eq!(stats.skipped_answers(), 5);
        assert!(stats.longest_streak() >= stats.streak());
    }

    #[test]
    fn reset_returns_to_setup_only_when_not_running() {
        let clock = fixed_clock();
        let mut controller = started(5, settings(5, 60), &clock);
        assert!(controller.reset().is_err());
        controller.terminate(clock.now()).unwrap();
        controller.reset().unwrap();
        assert_eq!(controller.phase(), SessionPhase::Setup);
        assert!(controller.outcome().is_none());
        assert_eq!(controller.history().len(), 1);
    }
}
