#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Bridges embassy's 64-bit monotonic clock to the core's wrapping counter.

use clock_core::time::Millis;
use embassy_time::Instant;

/// Truncates `instant` to the 32-bit millisecond counter the core expects.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn millis_from_instant(instant: Instant) -> Millis {
    Millis::from_millis(instant.as_millis() as u32)
}

/// Current reading of the board's monotonic clock.
#[cfg(target_os = "none")]
pub fn now() -> Millis {
    millis_from_instant(Instant::now())
}

/// Converts a core duration into an embassy one, saturating on overflow.
#[must_use]
pub fn embassy_duration(duration: core::time::Duration) -> embassy_time::Duration {
    embassy_time::Duration::from_micros(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
}
