use chrono::{DateTime, Utc};

use challenge_core::time::elapsed_secs;

/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Running { remaining: u32 },
    /// Raised once, on the tick that reaches zero.
    Expired,
    /// Cancelled or already expired; the tick had no effect.
    Stopped,
}

/// Countdown clock for a single challenge session.
///
/// The timer is driven by external one-second ticks and does no scheduling of
/// its own. It also remembers when the current card was shown so responses can
/// be stamped with their elapsed time.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    duration_secs: u32,
    remaining_secs: u32,
    cancelled: bool,
    expired: bool,
    last_transition: DateTime<Utc>,
}

impl SessionTimer {
    #[must_use]
    pub fn start(duration_secs: u32, now: DateTime<Utc>) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            cancelled: false,
            expired: false,
            last_transition: now,
        }
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cancelled && !self.expired
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.expired
    }

    pub fn tick(&mut self) -> TimerTick {
        if !self.is_active() {
            return TimerTick::Stopped;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.expired = true;
            TimerTick::Expired
        } else {
            TimerTick::Running {
                remaining: self.remaining_secs,
            }
        }
    }

    /// Stop counting down. Cancelling a stopped timer is a no-op.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Record that a new card is now being shown.
    pub fn mark_transition(&mut self, now: DateTime<Utc>) {
        self.last_transition = now;
    }

    /// Seconds since the last card transition.
    #[must_use]
    pub fn elapsed_since_transition(&self, now: DateTime<Utc>) -> f64 {
        elapsed_secs(self.last_transition, now)
    }
}
