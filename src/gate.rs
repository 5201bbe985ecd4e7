//! Wrong-answer gate (circuit breaker)
//!
//! Independent of the penalty lock: when the room's accumulated wrong
//! answers reach a configured limit, submissions are blocked for the
//! whole room until someone enters the next code from a pre-shared,
//! ordered sequence of five. Each successful clearance resets the
//! counter and advances the sequence; after the fifth clearance the
//! gate is permanently inert for the room, no matter how many further
//! wrong answers accumulate.
//!
//! Everything here is derived from the room document's counters;
//! clearing is the only state change, and it is a single absolute-value
//! merge-write so that concurrent clearances of the same challenge
//! converge instead of double-advancing.

use serde::Serialize;

use crate::{constants, room::RoomDoc};

/// Derived status of the gate for a room snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GateStatus {
    /// The room has no wrong-answer limit configured
    Disabled,
    /// The gate is armed but has not tripped
    Armed {
        /// Wrong answers accumulated since the last clearance
        count: u32,
        /// Wrong answers at which the gate trips
        limit: u32,
    },
    /// The gate has tripped; submissions are blocked room-wide
    Tripped {
        /// 1-based number of the challenge that must be cleared
        task_number: u8,
    },
    /// All five clearances are used; the gate can never trip again
    Exhausted,
}

impl GateStatus {
    /// Whether the gate currently blocks answer submission
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Tripped { .. })
    }
}

/// Derives the gate status from a room snapshot
///
/// The activation predicate is `limit > 0 && completed_tasks < 5 &&
/// wrong_answer_count >= limit`; the `completed_tasks < 5` guard is what
/// makes the breaker trip a bounded number of times per room.
pub fn status(room: &RoomDoc) -> GateStatus {
    if room.wrong_answer_limit == 0 {
        return GateStatus::Disabled;
    }
    if room.completed_tasks >= constants::gate::MAX_CLEARANCES {
        return GateStatus::Exhausted;
    }
    if room.wrong_answer_count >= room.wrong_answer_limit {
        GateStatus::Tripped {
            task_number: room.completed_tasks + 1,
        }
    } else {
        GateStatus::Armed {
            count: room.wrong_answer_count,
            limit: room.wrong_answer_limit,
        }
    }
}

/// The challenge code expected for the next clearance
///
/// Indexed by how many challenges the room has already cleared; `None`
/// once the sequence is used up.
pub fn expected_code(completed_tasks: u8) -> Option<&'static str> {
    constants::gate::CHALLENGE_CODES
        .get(usize::from(completed_tasks))
        .copied()
}

/// Checks a submitted code against the expected one
///
/// The submitted code is trimmed before comparison; the challenger may
/// retry on mismatch with no state change.
pub fn verify_code(completed_tasks: u8, submitted: &str) -> bool {
    expected_code(completed_tasks).is_some_and(|expected| submitted.trim() == expected)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn room_with(limit: u32, count: u32, completed: u8) -> RoomDoc {
        RoomDoc {
            wrong_answer_limit: limit,
            wrong_answer_count: count,
            completed_tasks: completed,
            ..RoomDoc::default()
        }
    }

    #[test]
    fn test_disabled_when_limit_zero() {
        assert_eq!(status(&room_with(0, 99, 0)), GateStatus::Disabled);
    }

    #[test]
    fn test_armed_below_limit() {
        assert_eq!(
            status(&room_with(3, 2, 0)),
            GateStatus::Armed { count: 2, limit: 3 }
        );
    }

    #[test]
    fn test_trips_at_limit() {
        let gate = status(&room_with(3, 3, 0));
        assert_eq!(gate, GateStatus::Tripped { task_number: 1 });
        assert!(gate.is_blocking());
    }

    #[test]
    fn test_task_number_follows_clearances() {
        assert_eq!(
            status(&room_with(3, 5, 2)),
            GateStatus::Tripped { task_number: 3 }
        );
    }

    #[test]
    fn test_exhausted_after_five_clearances() {
        let gate = status(&room_with(3, 100, 5));
        assert_eq!(gate, GateStatus::Exhausted);
        assert!(!gate.is_blocking());
    }

    #[test]
    fn test_expected_code_sequence() {
        assert_eq!(expected_code(0), Some("2354"));
        assert_eq!(expected_code(4), Some("5937"));
        assert_eq!(expected_code(5), None);
    }

    #[test]
    fn test_verify_code_trims() {
        assert!(verify_code(0, " 2354 "));
        assert!(!verify_code(0, "9156"));
        assert!(!verify_code(5, "2354"));
    }
}
