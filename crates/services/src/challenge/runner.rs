use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use challenge_core::model::{ChallengeSettings, ResponseOutcome};
use challenge_storage::repository::{CardRepository, HistoryRepository};

use super::controller::{SessionController, SessionOutcome};
use super::timer::TimerTick;
use crate::Clock;
use crate::error::{ChallengeError, RunnerError, SessionPhase};

/// Period of the countdown ticker.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Player input fed to a running challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Reveal,
    Correct,
    Incorrect,
    Skip,
    Hint,
    Quit,
}

/// What the runner just did, reported to the observer after each event.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    Started,
    Tick(TimerTick),
    Applied(SessionAction),
    Rejected {
        action: SessionAction,
        reason: String,
    },
    Finished,
}

/// Background task that emits one event per elapsed period.
///
/// Cancelling aborts the task; it is idempotent and also happens on drop.
#[derive(Debug)]
pub struct TickerHandle {
    task: Option<JoinHandle<()>>,
    ticks: mpsc::Receiver<()>,
}

impl TickerHandle {
    /// Spawn a ticker on the current tokio runtime. The first tick fires one
    /// period after the call.
    #[must_use]
    pub fn spawn(period: Duration) -> Self {
        let (tx, ticks) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self {
            task: Some(task),
            ticks,
        }
    }

    /// Wait for the next tick; `None` once cancelled.
    pub async fn next_tick(&mut self) -> Option<()> {
        self.ticks.recv().await
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.ticks.close();
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Wall-clock start of a session plus monotonic elapsed time.
#[derive(Debug, Clone, Copy)]
struct SessionClock {
    started_at: DateTime<Utc>,
    anchor: Instant,
}

impl SessionClock {
    fn start(clock: Clock) -> Self {
        Self {
            started_at: clock.now(),
            anchor: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.started_at + elapsed
    }
}

/// Runs a challenge end to end: loads the card pool, drives the controller
/// from player actions and timer ticks, and persists the history entry.
#[derive(Clone)]
pub struct ChallengeRunner {
    clock: Clock,
    cards: Arc<dyn CardRepository>,
    history: Arc<dyn HistoryRepository>,
    tick_period: Duration,
}

impl ChallengeRunner {
    #[must_use]
    pub fn new(
        clock: Clock,
        cards: Arc<dyn CardRepository>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        Self {
            clock,
            cards,
            history,
            tick_period: TICK_PERIOD,
        }
    }

    #[must_use]
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    /// Play one session to completion.
    ///
    /// Ticks and actions are handled one at a time. A closed action channel
    /// ends the session as if the player quit. Observers see the controller
    /// after every event so they can redraw.
    ///
    /// The clock is read once at start; later timestamps add the monotonic
    /// time elapsed on the tokio clock.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Challenge` if the session cannot start, and
    /// `RunnerError::Storage` if the pool cannot be loaded or the finished
    /// entry cannot be saved.
    pub async fn run<F>(
        &self,
        controller: &mut SessionController,
        settings: ChallengeSettings,
        mut actions: mpsc::Receiver<SessionAction>,
        mut observe: F,
    ) -> Result<SessionOutcome, RunnerError>
    where
        F: FnMut(&SessionController, &RunnerEvent),
    {
        let pool = self.cards.list_cards().await?;
        let clock = SessionClock::start(self.clock);
        controller.start(&pool, settings, clock.now())?;
        observe(&*controller, &RunnerEvent::Started);

        let mut ticker = TickerHandle::spawn(self.tick_period);
        while controller.phase() == SessionPhase::Running {
            tokio::select! {
                biased;
                Some(()) = ticker.next_tick() => {
                    let tick = controller.tick(clock.now())?;
                    observe(&*controller, &RunnerEvent::Tick(tick));
                }
                action = actions.recv() => {
                    let action = action.unwrap_or(SessionAction::Quit);
                    let event = match Self::apply(controller, action, clock.now()) {
                        Ok(()) => RunnerEvent::Applied(action),
                        Err(err) => RunnerEvent::Rejected {
                            action,
                            reason: err.to_string(),
                        },
                    };
                    observe(&*controller, &event);
                }
            }
        }
        ticker.cancel();

        let outcome = controller
            .outcome()
            .cloned()
            .ok_or(ChallengeError::InvalidTransition {
                action: "collect outcome",
                phase: controller.phase(),
            })?;
        self.history.append_entry(&outcome.entry).await?;
        log::info!("saved challenge history entry {}", outcome.entry.id());
        observe(&*controller, &RunnerEvent::Finished);
        Ok(outcome)
    }

    fn apply(
        controller: &mut SessionController,
        action: SessionAction,
        now: DateTime<Utc>,
    ) -> Result<(), ChallengeError> {
        match action {
            SessionAction::Reveal => controller.reveal(),
            SessionAction::Correct => controller.respond(ResponseOutcome::Correct, now),
            SessionAction::Incorrect => controller.respond(ResponseOutcome::Incorrect, now),
            SessionAction::Skip => controller.skip(now),
            SessionAction::Hint => controller.hint().map(|_| ()),
            SessionAction::Quit => controller.terminate(now),
        }
    }
}

impl std::fmt::Debug for ChallengeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeRunner")
            .field("clock", &self.clock)
            .field("tick_period", &self.tick_period)
            .finish_non_exhaustive()
    }
}
