//! Time and timestamp helpers.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

/// UTC timestamp used for `created_at`, `last_fired_at`, `execute_at`, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time, truncated to microseconds.
///
/// Matches the precision timestamps are persisted with.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Return `ts` shifted forward by `seconds`.
#[must_use]
pub fn after_seconds(ts: Timestamp, seconds: u32) -> Timestamp {
    ts + TimeDelta::seconds(i64::from(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now().trunc_subsecs(6);
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_drop_sub_microsecond_precision() {
        assert_eq!(now().timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn should_shift_timestamp_by_whole_seconds() {
        let ts = now();
        let later = after_seconds(ts, 60);
        assert_eq!((later - ts).num_seconds(), 60);
    }

    #[test]
    fn should_return_same_timestamp_for_zero_seconds() {
        let ts = now();
        assert_eq!(after_seconds(ts, 0), ts);
    }
}
