//! Time-derived phase of a round and the operations each phase admits.
//!
//! A round never stores its phase. Every caller classifies `(started_at, ended_at, now)` through
//! [`RoundPhase::classify`] so all gates agree on the boundaries:
//!
//! | phase   | condition                      | list questions | submit answers |
//! |---------|--------------------------------|----------------|----------------|
//! | Pending | `now < started_at`             | no             | no             |
//! | Active  | `started_at <= now < ended_at` | yes            | no             |
//! | Closed  | `ended_at <= now`              | yes            | yes            |

use std::time::SystemTime;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::models::RoundEntity;

/// Phase of a round at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Before `started_at`; nothing about the round is visible.
    Pending,
    /// Within `[started_at, ended_at)`; questions are visible, answers locked.
    Active,
    /// From `ended_at` on; answers are accepted.
    Closed,
}

/// Operations whose availability depends on the round phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatedOperation {
    /// Reading the questions of a round.
    ListQuestions,
    /// Recording an answer in the ledger.
    SubmitAnswer,
}

/// Raised when an operation is attempted outside the phases that admit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation:?} is not allowed while the round is {phase:?}")]
pub struct TimingViolation {
    /// Operation that was refused.
    pub operation: GatedOperation,
    /// Phase the round was in when it was attempted.
    pub phase: RoundPhase,
}

impl RoundPhase {
    /// Classify an instant against a `[started_at, ended_at)` window.
    pub fn classify(started_at: SystemTime, ended_at: SystemTime, now: SystemTime) -> Self {
        if now < started_at {
            RoundPhase::Pending
        } else if now < ended_at {
            RoundPhase::Active
        } else {
            RoundPhase::Closed
        }
    }

    /// Phase of `round` at `now`.
    pub fn of(round: &RoundEntity, now: SystemTime) -> Self {
        Self::classify(round.started_at, round.ended_at, now)
    }

    /// Questions become readable once the round opens and stay readable afterwards.
    pub fn allows_question_listing(self) -> bool {
        !matches!(self, RoundPhase::Pending)
    }

    /// Answers stay locked until the round clock has run out.
    pub fn accepts_answers(self) -> bool {
        matches!(self, RoundPhase::Closed)
    }

    /// Whether this phase admits `operation`.
    pub fn allows(self, operation: GatedOperation) -> bool {
        match operation {
            GatedOperation::ListQuestions => self.allows_question_listing(),
            GatedOperation::SubmitAnswer => self.accepts_answers(),
        }
    }
}

/// Check that `operation` is admitted by the phase of `round` at `now`.
pub fn check(
    round: &RoundEntity,
    now: SystemTime,
    operation: GatedOperation,
) -> Result<RoundPhase, TimingViolation> {
    let phase = RoundPhase::of(round, now);
    if phase.allows(operation) {
        Ok(phase)
    } else {
        Err(TimingViolation { operation, phase })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn round(start: u64, end: u64) -> RoundEntity {
        RoundEntity {
            id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            number: 1,
            started_at: at(start),
            ended_at: at(end),
        }
    }

    #[test]
    fn phase_boundaries_are_half_open() {
        assert_eq!(RoundPhase::classify(at(100), at(160), at(99)), RoundPhase::Pending);
        assert_eq!(RoundPhase::classify(at(100), at(160), at(100)), RoundPhase::Active);
        assert_eq!(RoundPhase::classify(at(100), at(160), at(159)), RoundPhase::Active);
        assert_eq!(RoundPhase::classify(at(100), at(160), at(160)), RoundPhase::Closed);
        assert_eq!(RoundPhase::classify(at(100), at(160), at(10_000)), RoundPhase::Closed);
    }

    #[test]
    fn listing_is_refused_only_while_pending() {
        let round = round(100, 160);
        assert_eq!(
            check(&round, at(99), GatedOperation::ListQuestions),
            Err(TimingViolation {
                operation: GatedOperation::ListQuestions,
                phase: RoundPhase::Pending,
            })
        );
        assert_eq!(
            check(&round, at(100), GatedOperation::ListQuestions),
            Ok(RoundPhase::Active)
        );
        assert_eq!(
            check(&round, at(200), GatedOperation::ListQuestions),
            Ok(RoundPhase::Closed)
        );
    }

    #[test]
    fn submission_opens_exactly_at_round_end() {
        let round = round(100, 160);
        let just_before = round.ended_at - Duration::from_secs(1);

        let err = check(&round, just_before, GatedOperation::SubmitAnswer).unwrap_err();
        assert_eq!(err.phase, RoundPhase::Active);
        assert!(check(&round, at(50), GatedOperation::SubmitAnswer).is_err());
        assert_eq!(
            check(&round, round.ended_at, GatedOperation::SubmitAnswer),
            Ok(RoundPhase::Closed)
        );
    }
}
