//! Penalty lock window arithmetic
//!
//! The penalty lock is a time-windowed, room-global soft block: a wrong
//! answer arms `locked_at` with a server timestamp, and every client
//! independently derives "how long is left" from that one stored epoch
//! plus its own clock. Nothing ever clears the lock fields; expiry is
//! purely a matter of arithmetic, recomputed on a local polling timer.
//!
//! All functions here are pure. The guard that decides whether a wrong
//! answer re-arms the lock evaluates [`is_active`] inside a store
//! transaction using server time for `now`, which is what makes two
//! concurrent arming attempts resolve to exactly one winner.

use crate::store::Timestamp;

/// Milliseconds in one second, as used by the window math
const SECOND_MILLIS: u64 = 1000;

/// Whether a penalty window is active at `now`
///
/// A window is active while `now` is strictly before
/// `locked_at + penalty_seconds`. An unset `locked_at` means no window
/// was ever armed.
pub fn is_active(locked_at: Option<Timestamp>, penalty_seconds: u32, now: Timestamp) -> bool {
    match locked_at {
        Some(armed_at) => now < armed_at.plus_millis(u64::from(penalty_seconds) * SECOND_MILLIS),
        None => false,
    }
}

/// Whole seconds remaining in the penalty window at `now`, rounded up
///
/// Returns 0 once the window has expired (or was never armed). The
/// ceiling keeps the countdown from displaying 0 while submissions are
/// still blocked.
pub fn remaining_seconds(
    locked_at: Option<Timestamp>,
    penalty_seconds: u32,
    now: Timestamp,
) -> u32 {
    let Some(armed_at) = locked_at else {
        return 0;
    };
    let expires_at = armed_at.plus_millis(u64::from(penalty_seconds) * SECOND_MILLIS);
    let remaining_millis = now.millis_until(expires_at);
    remaining_millis.div_ceil(SECOND_MILLIS) as u32
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const ARMED_AT: Timestamp = Timestamp::from_millis(10_000);

    #[test]
    fn test_unarmed_is_inactive() {
        assert!(!is_active(None, 10, Timestamp::from_millis(0)));
        assert_eq!(remaining_seconds(None, 10, Timestamp::from_millis(0)), 0);
    }

    #[test]
    fn test_active_inside_window() {
        let now = Timestamp::from_millis(15_000);
        assert!(is_active(Some(ARMED_AT), 10, now));
        assert_eq!(remaining_seconds(Some(ARMED_AT), 10, now), 5);
    }

    #[test]
    fn test_expires_exactly_at_boundary() {
        let boundary = Timestamp::from_millis(20_000);
        assert!(!is_active(Some(ARMED_AT), 10, boundary));
        assert_eq!(remaining_seconds(Some(ARMED_AT), 10, boundary), 0);
    }

    #[test]
    fn test_remaining_rounds_up() {
        // 1ms into the window: 9999ms left must display as 10s.
        let now = Timestamp::from_millis(10_001);
        assert_eq!(remaining_seconds(Some(ARMED_AT), 10, now), 10);

        // 1ms before expiry still displays as 1s, not 0.
        let now = Timestamp::from_millis(19_999);
        assert_eq!(remaining_seconds(Some(ARMED_AT), 10, now), 1);
    }

    #[test]
    fn test_expired_long_ago() {
        let now = Timestamp::from_millis(100_000);
        assert!(!is_active(Some(ARMED_AT), 10, now));
        assert_eq!(remaining_seconds(Some(ARMED_AT), 10, now), 0);
    }

    #[test]
    fn test_zero_penalty_never_blocks() {
        assert!(!is_active(Some(ARMED_AT), 0, ARMED_AT));
        assert_eq!(remaining_seconds(Some(ARMED_AT), 0, ARMED_AT), 0);
    }
}
