//! Adaptive delay: how long to wait before the next poll.
//!
//! The feed tells us when each channel's current phase ends. Nothing new
//! can appear before the soonest of those boundaries, so we sleep until
//! then, bounded below by [`MIN_DELAY`].

use std::time::Duration;

use crate::domain::TimingsSnapshot;

/// Floor applied to every adaptive delay.
pub const MIN_DELAY: Duration = Duration::from_millis(1_000);

/// Used when the feed gives no phase boundary or no trusted clock.
pub const UNKNOWN_DELAY: Duration = Duration::from_millis(10_000);

/// Fixed wait after a failed timings request.
pub const ERROR_BACKOFF: Duration = Duration::from_millis(10_000);

/// Milliseconds until the next poll is worthwhile.
///
/// `server_timestamp` is the feed's own clock in epoch seconds. If it is
/// absent, or no channel carries `active_phase_end_datetime`, the result
/// is [`UNKNOWN_DELAY`].
#[must_use]
pub fn next_delay_ms(timings: &TimingsSnapshot, server_timestamp: Option<i64>) -> u64 {
    let next_end = timings.channels().filter_map(|ch| ch.active_phase_end()).min();
    let (Some(next_end), Some(now)) = (next_end, server_timestamp) else {
        return millis(UNKNOWN_DELAY);
    };
    let delta_ms = next_end.saturating_sub(now).saturating_mul(1_000);
    // Negative or tiny deltas mean the phase already ended.
    u64::try_from(delta_ms)
        .unwrap_or(0)
        .max(millis(MIN_DELAY))
}

/// [`next_delay_ms`] as a [`Duration`], reading the clock from the snapshot.
#[must_use]
pub fn next_delay(timings: &TimingsSnapshot) -> Duration {
    Duration::from_millis(next_delay_ms(timings, timings.server_datetime()))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
