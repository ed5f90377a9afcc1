//! Run timestamps.

use time::OffsetDateTime;

pub const HOUR_MS: i64 = 60 * 60 * 1000;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Timestamp (ms) a run records its snapshots under: 12:00 UTC of the day
/// `now` falls on, so every run of the same day shares one plot point.
pub fn day_timestamp(now: OffsetDateTime) -> i64 {
    let now_ms = (now.unix_timestamp_nanos() / 1_000_000) as i64;
    now_ms.div_euclid(DAY_MS) * DAY_MS + 12 * HOUR_MS
}
