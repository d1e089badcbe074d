use challenge_core::model::{
    AnswerTally, ResponseOutcome, ResponseRecord, SessionStats, SessionStatsError,
};

use crate::error::{ChallengeError, SessionPhase};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The last card received a response.
    AllAnswered,
    /// The countdown reached zero.
    TimeExpired,
    /// The player ended the session early.
    Terminated,
}

/// What happened after a response was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStep {
    Advanced { next: usize },
    Completed,
}

/// Per-card response slots plus the running streak for one session.
#[derive(Debug, Clone)]
pub struct ResponseSheet {
    records: Vec<ResponseRecord>,
    cursor: usize,
    streak: u32,
    longest_streak: u32,
}

impl ResponseSheet {
    #[must_use]
    pub fn new(total_cards: usize) -> Self {
        Self {
            records: vec![ResponseRecord::unanswered(); total_cards],
            cursor: 0,
            streak: 0,
            longest_streak: 0,
        }
    }

    /// Index of the card awaiting a response.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.records.len()
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    #[must_use]
    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    /// Record the response for `index`, which must be the current card.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::OutOfOrder` for any index other than the
    /// cursor, and `ChallengeError::InvalidTransition` once every card is done
    /// or when asked to record `Unanswered`.
    pub fn record(
        &mut self,
        index: usize,
        outcome: ResponseOutcome,
        elapsed_secs: f64,
    ) -> Result<RecordStep, ChallengeError> {
        if self.is_complete() {
            return Err(ChallengeError::InvalidTransition {
                action: "record",
                phase: SessionPhase::Finished,
            });
        }
        if index != self.cursor {
            return Err(ChallengeError::OutOfOrder {
                expected: self.cursor,
                got: index,
            });
        }

        match outcome {
            ResponseOutcome::Correct => {
                self.streak += 1;
                self.longest_streak = self.longest_streak.max(self.streak);
            }
            ResponseOutcome::Incorrect | ResponseOutcome::Skipped => self.streak = 0,
            ResponseOutcome::Unanswered => {
                return Err(ChallengeError::InvalidTransition {
                    action: "record unanswered",
                    phase: SessionPhase::Running,
                });
            }
        }

        self.records[index] = ResponseRecord::new(outcome, elapsed_secs);
        self.cursor += 1;

        if self.is_complete() {
            Ok(RecordStep::Completed)
        } else {
            Ok(RecordStep::Advanced { next: self.cursor })
        }
    }

    /// Compute final statistics.
    ///
    /// Every card not graded correct or incorrect counts as skipped, whether it
    /// was skipped explicitly, in flight, or never reached. The tally is the
    /// same for every `reason`; it is only reported in the debug log.
    ///
    /// # Errors
    ///
    /// Returns `SessionStatsError` if counts do not add up, which would mean
    /// the sheet itself is corrupt.
    pub fn finalize(
        &self,
        reason: FinishReason,
        time_remaining_secs: u32,
        duration_secs: u32,
    ) -> Result<SessionStats, SessionStatsError> {
        let mut tally = AnswerTally::default();
        let mut graded_secs = 0.0;
        for record in &self.records {
            match record.outcome {
                ResponseOutcome::Correct => tally.correct += 1,
                ResponseOutcome::Incorrect => tally.incorrect += 1,
                ResponseOutcome::Skipped | ResponseOutcome::Unanswered => tally.skipped += 1,
            }
            if record.outcome.is_graded() {
                graded_secs += record.response_secs;
            }
        }

        let graded = tally.correct + tally.incorrect;
        let average = (graded > 0).then(|| graded_secs / f64::from(graded));
        let unreached = self.records.len() - self.cursor;
        log::debug!(
            "finalizing challenge ({reason:?}): {} correct, {} incorrect, {} skipped ({unreached} unreached)",
            tally.correct,
            tally.incorrect,
            tally.skipped,
        );

        let total = u32::try_from(self.records.len()).unwrap_or(u32::MAX);
        SessionStats::compute(
            tally,
            total,
            average,
            self.streak,
            self.longest_streak,
            time_remaining_secs,
            duration_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_tracks_consecutive_correct_answers() {
        let mut sheet = ResponseSheet::new(6);
        let outcomes = [
            ResponseOutcome::Correct,
            ResponseOutcome::Correct,
            ResponseOutcome::Incorrect,
            ResponseOutcome::Correct,
            ResponseOutcome::Skipped,
            ResponseOutcome::Correct,
        ];
        let mut longest_seen = 0;
        for (i, outcome) in outcomes.into_iter().enumerate() {
            sheet.record(i, outcome, 1.0).unwrap();
            assert!(sheet.longest_streak() >= sheet.streak());
            assert!(sheet.longest_streak() >= longest_seen);
            longest_seen = sheet.longest_streak();
        }
        assert_eq!(sheet.longest_streak(), 2);
        assert_eq!(sheet.streak(), 1);
    }

    #[test]
    fn last_record_completes_the_sheet() {
        let mut sheet = ResponseSheet::new(2);
        assert_eq!(
            sheet.record(0, ResponseOutcome::Correct, 1.0).unwrap(),
            RecordStep::Advanced { next: 1 }
        );
        assert_eq!(
            sheet.record(1, ResponseOutcome::Correct, 1.0).unwrap(),
            RecordStep::Completed
        );
        assert!(sheet.record(2, ResponseOutcome::Correct, 1.0).is_err());
    }

    #[test]
    fn out_of_order_index_is_rejected() {
        let mut sheet = ResponseSheet::new(3);
        let err = sheet.record(2, ResponseOutcome::Correct, 1.0).unwrap_err();
        assert!(matches!(err, ChallengeError::OutOfOrder { expected: 0, got: 2 }));
        assert_eq!(sheet.cursor(), 0);
    }

    #[test]
    fn average_ignores_skips_and_unreached_cards() {
        let mut sheet = ResponseSheet::new(5);
        sheet.record(0, ResponseOutcome::Correct, 2.0).unwrap();
        sheet.record(1, ResponseOutcome::Skipped, 9.0).unwrap();
        sheet.record(2, ResponseOutcome::Incorrect, 4.0).unwrap();

        let stats = sheet.finalize(FinishReason::TimeExpired, 0, 60).unwrap();
        assert_eq!(stats.correct_answers(), 1);
        assert_eq!(stats.incorrect_answers(), 1);
        assert_eq!(stats.skipped_answers(), 3);
        assert!((stats.average_response_secs() - 3.0).abs() < 1e-9);
        assert_eq!(
            stats.correct_answers() + stats.incorrect_answers() + stats.skipped_answers(),
            stats.total_cards()
        );
        assert_eq!(sheet.records()[4].outcome, ResponseOutcome::Unanswered);
    }

    #[test]
    fn finish_reason_does_not_change_the_tally() {
        let mut sheet = ResponseSheet::new(4);
        sheet.record(0, ResponseOutcome::Correct, 2.0).unwrap();
        sheet.record(1, ResponseOutcome::Skipped, 0.0).unwrap();

        let expired = sheet.finalize(FinishReason::TimeExpired, 10, 60).unwrap();
        let terminated = sheet.finalize(FinishReason::Terminated, 10, 60).unwrap();
        assert_eq!(expired, terminated);
        assert_eq!(expired.skipped_answers(), 3);
    }

    #[test]
    fn expiry_with_no_answers_scores_zero() {
        let sheet = ResponseSheet::new(10);
        let stats = sheet.finalize(FinishReason::TimeExpired, 0, 120).unwrap();
        assert_eq!(stats.correct_answers(), 0);
        assert_eq!(stats.incorrect_answers(), 0);
        assert_eq!(stats.skipped_answers(), 10);
        assert_eq!(stats.score(), 0);
    }

    #[test]
    fn score_never_negative_for_any_small_sheet() {
        let choices = [
            ResponseOutcome::Correct,
            ResponseOutcome::Incorrect,
            ResponseOutcome::Skipped,
        ];
        for mask in 0..(3_u32.pow(5)) {
            let mut sheet = ResponseSheet::new(5);
            let mut m = mask;
            for i in 0..5 {
                let outcome = choices[(m % 3) as usize];
                m /= 3;
                sheet.record(i, outcome, 45.0).unwrap();
            }
            let stats = sheet.finalize(FinishReason::AllAnswered, 0, 30).unwrap();
            assert_eq!(
                i64::from(stats.score()),
                stats.breakdown().raw_total().max(0)
            );
            assert_eq!(stats.total_cards(), 5);
        }
    }
}
