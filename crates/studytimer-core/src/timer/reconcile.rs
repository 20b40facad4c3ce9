//! Reconciliation: remaining time as a pure function of an anchor and `now`.
//!
//! Nothing here keeps state. Calling any function twice with the same inputs
//! gives the same answer, which is what lets a suspended host recompute the
//! countdown on resume instead of ticking while backgrounded.

const MS_PER_SEC: i64 = 1000;
const SECS_PER_MIN: u64 = 60;

/// Seconds left at `now_ms` for a countdown of `initial_remaining_secs`
/// started at `anchor_ms`.
///
/// A `now_ms` earlier than the anchor (clock skew) is treated as the anchor
/// itself, so the result never exceeds `initial_remaining_secs`.
pub fn remaining_seconds(anchor_ms: i64, initial_remaining_secs: u64, now_ms: i64) -> u64 {
    let now_ms = now_ms.max(anchor_ms);
    let elapsed_secs = (now_ms.saturating_sub(anchor_ms) / MS_PER_SEC) as u64;
    initial_remaining_secs.saturating_sub(elapsed_secs)
}

/// Countdown budget for a study day that has never been timed.
///
/// Only whole studied minutes count against the allocation.
pub fn initial_budget(allocated_minutes: u32, studied_minutes: f64) -> u64 {
    let allocated_secs = u64::from(allocated_minutes) * SECS_PER_MIN;
    let studied_whole = if studied_minutes.is_finite() && studied_minutes > 0.0 {
        studied_minutes.floor() as u64
    } else {
        0
    };
    allocated_secs.saturating_sub(studied_whole.saturating_mul(SECS_PER_MIN))
}

/// Minutes credited for a manual stop: whole minutes actually elapsed.
pub fn minutes_on_stop(initial_remaining_secs: u64, remaining_secs: u64) -> u64 {
    initial_remaining_secs.saturating_sub(remaining_secs) / SECS_PER_MIN
}

/// Minutes credited when the countdown reaches zero: the whole budget,
/// rounded up.
pub fn minutes_on_completion(initial_remaining_secs: u64) -> u64 {
    initial_remaining_secs.div_ceil(SECS_PER_MIN)
}

/// `MM:SS`, minutes not wrapped at the hour.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / SECS_PER_MIN, seconds % SECS_PER_MIN)
}
