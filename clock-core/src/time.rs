//! Monotonic millisecond instants.
//!
//! The board exposes a free-running 32-bit millisecond counter that wraps
//! roughly every 49.7 days. [`Millis`] keeps that representation and performs
//! every comparison through wrapping subtraction so deadlines and elapsed
//! times stay correct across the wrap.

use core::ops::Add;
use core::time::Duration;

/// Sample of the monotonic millisecond counter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Millis(u32);

impl Millis {
    /// Counter value at power-on.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw counter reading.
    #[must_use]
    pub const fn from_millis(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw counter reading.
    #[must_use]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, valid across one counter wrap.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Elapsed time since `earlier` as a [`Duration`].
    #[must_use]
    pub fn duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(u64::from(self.elapsed_since(earlier)))
    }

    /// Returns `true` once `self` is at or past `deadline`.
    ///
    /// Instants less than half the counter range apart are ordered by their
    /// wrapped difference.
    #[must_use]
    pub const fn has_reached(self, deadline: Self) -> bool {
        self.0.wrapping_sub(deadline.0) < HALF_RANGE
    }

    /// Adds raw milliseconds, wrapping like the hardware counter.
    #[must_use]
    pub const fn wrapping_add_millis(self, millis: u32) -> Self {
        Self(self.0.wrapping_add(millis))
    }
}

const HALF_RANGE: u32 = 1 << 31;

/// Converts a duration into whole milliseconds, saturating at `u32::MAX`.
#[must_use]
pub fn duration_to_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

impl Add<Duration> for Millis {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.wrapping_add_millis(duration_to_millis(rhs))
    }
}
