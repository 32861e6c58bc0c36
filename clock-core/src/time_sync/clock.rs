//! Locally extrapolated wall clock.

use core::fmt;

use time::{Month, OffsetDateTime, Weekday};

use crate::time::Millis;

const MILLIS_PER_SECOND: u32 = 1_000;
const SECONDS_PER_DAY: u32 = 86_400;
const REBASE_AFTER_MILLIS: u32 = SECONDS_PER_DAY * MILLIS_PER_SECOND;

/// Seconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UnixSeconds(i64);

impl UnixSeconds {
    #[must_use]
    pub const fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn saturating_add(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// Breaks the instant into calendar fields, read as UTC.
    #[must_use]
    pub fn civil(self) -> Option<CivilTime> {
        let moment = OffsetDateTime::from_unix_timestamp(self.0).ok()?;
        Some(CivilTime {
            year: moment.year(),
            month: moment.month(),
            day: moment.day(),
            ordinal: moment.ordinal(),
            weekday: moment.weekday(),
            hour: moment.hour(),
            minute: moment.minute(),
            second: moment.second(),
        })
    }
}

impl fmt::Display for UnixSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Calendar fields of an instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CivilTime {
    pub year: i32,
    pub month: Month,
    pub day: u8,
    pub ordinal: u16,
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilTime {
    #[must_use]
    pub fn minutes_of_day(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    /// Three-letter English weekday.
    #[must_use]
    pub const fn weekday_abbrev(&self) -> &'static str {
        match self.weekday {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
        }
    }
}

/// Absolute time anchored to a monotonic reading.
///
/// `current_epoch = epoch_at_anchor + elapsed_since(anchor) / 1000`. Elapsed
/// time uses wrapping subtraction, and [`rebase`](Self::rebase) folds whole
/// seconds into the anchor once a day so the difference never grows near
/// the counter's half range.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SyncedClock {
    epoch_at_anchor: UnixSeconds,
    anchor: Millis,
    valid: bool,
}

impl SyncedClock {
    /// Clock that has never been synchronised.
    #[must_use]
    pub const fn unsynced() -> Self {
        Self {
            epoch_at_anchor: UnixSeconds::new(0),
            anchor: Millis::ZERO,
            valid: false,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub const fn anchor(&self) -> Millis {
        self.anchor
    }

    #[must_use]
    pub const fn epoch_at_anchor(&self) -> UnixSeconds {
        self.epoch_at_anchor
    }

    /// Anchors `epoch` to the monotonic reading `now`.
    pub fn set(&mut self, epoch: UnixSeconds, now: Millis) {
        self.epoch_at_anchor = epoch;
        self.anchor = now;
        self.valid = true;
    }

    /// Extrapolated wall-clock time, once synchronised.
    #[must_use]
    pub fn current_epoch(&self, now: Millis) -> Option<UnixSeconds> {
        self.valid.then(|| {
            let elapsed = now.elapsed_since(self.anchor) / MILLIS_PER_SECOND;
            self.epoch_at_anchor.saturating_add(i64::from(elapsed))
        })
    }

    /// Moves the anchor forward by whole seconds once a day has elapsed.
    ///
    /// Returns `true` when the anchor moved. The extrapolated time is unchanged.
    pub fn rebase(&mut self, now: Millis) -> bool {
        if !self.valid {
            return false;
        }
        let elapsed = now.elapsed_since(self.anchor);
        if elapsed < REBASE_AFTER_MILLIS {
            return false;
        }
        let whole_seconds = elapsed / MILLIS_PER_SECOND;
        self.epoch_at_anchor = self.epoch_at_anchor.saturating_add(i64::from(whole_seconds));
        self.anchor = self
            .anchor
            .wrapping_add_millis(whole_seconds * MILLIS_PER_SECOND);
        true
    }
}
