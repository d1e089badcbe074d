use std::sync::{Arc, Mutex, PoisonError};

use challenge_core::model::{HistoryEntry, HistoryLog};

/// Process-lifetime, append-only record of completed challenges.
///
/// Appends swap in a new `HistoryLog` snapshot; readers clone the current
/// snapshot and are never affected by later appends. Durable storage is the
/// embedding application's concern (see `ChallengeRunner`).
#[derive(Debug, Clone, Default)]
pub struct HistoryRecorder {
    log: Arc<Mutex<HistoryLog>>,
}

impl HistoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from entries loaded elsewhere, given oldest first.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let log = entries
            .into_iter()
            .fold(HistoryLog::new(), |log, entry| log.append(entry));
        Self {
            log: Arc::new(Mutex::new(log)),
        }
    }

    pub fn append(&self, entry: HistoryEntry) {
        let mut guard = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let next = guard.append(entry);
        *guard = next;
    }

    /// Current snapshot of the log.
    #[must_use]
    pub fn snapshot(&self) -> HistoryLog {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.snapshot().newest_first().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
