//! Seasonal offset rules.
//!
//! Summer time follows the European convention: it begins on the last Sunday
//! of March at 01:00 UTC and ends on the last Sunday of October at 01:00 UTC.

use time::{Date, Month, OffsetDateTime};

use crate::config::TimeConfig;

use super::clock::UnixSeconds;

/// Offset added while summer time is active.
pub const DST_SHIFT_SECS: i32 = 3600;

const TRANSITION_HOUR_UTC: u8 = 1;

/// Base offset plus the summer-time switch.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ZoneRule {
    pub base_offset_secs: i32,
    pub dst_enabled: bool,
}

impl ZoneRule {
    #[must_use]
    pub const fn new(base_offset_secs: i32, dst_enabled: bool) -> Self {
        Self {
            base_offset_secs,
            dst_enabled,
        }
    }

    /// Returns `true` when summer time applies at `epoch`.
    #[must_use]
    pub fn is_dst(&self, epoch: UnixSeconds) -> bool {
        self.dst_enabled && summer_time_at(epoch)
    }

    /// Offset from UTC in seconds at `epoch`.
    #[must_use]
    pub fn total_offset(&self, epoch: UnixSeconds) -> i32 {
        if self.is_dst(epoch) {
            self.base_offset_secs + DST_SHIFT_SECS
        } else {
            self.base_offset_secs
        }
    }

    /// Shifts a UTC instant into local wall-clock seconds.
    #[must_use]
    pub fn local_time(&self, epoch: UnixSeconds) -> UnixSeconds {
        epoch.saturating_add(i64::from(self.total_offset(epoch)))
    }
}

impl From<&TimeConfig> for ZoneRule {
    fn from(config: &TimeConfig) -> Self {
        Self::new(config.base_offset_secs, config.dst_enabled)
    }
}

fn summer_time_at(epoch: UnixSeconds) -> bool {
    let Ok(moment) = OffsetDateTime::from_unix_timestamp(epoch.as_i64()) else {
        return false;
    };

    match moment.month() {
        Month::April
        | Month::May
        | Month::June
        | Month::July
        | Month::August
        | Month::September => true,
        Month::March => match last_sunday(moment.year(), Month::March) {
            Some(sunday) => {
                moment.day() > sunday
                    || (moment.day() == sunday && moment.hour() >= TRANSITION_HOUR_UTC)
            }
            None => false,
        },
        Month::October => match last_sunday(moment.year(), Month::October) {
            Some(sunday) => {
                moment.day() < sunday
                    || (moment.day() == sunday && moment.hour() < TRANSITION_HOUR_UTC)
            }
            None => false,
        },
        _ => false,
    }
}

/// Day of month of the last Sunday in a 31-day month.
fn last_sunday(year: i32, month: Month) -> Option<u8> {
    let last = Date::from_calendar_date(year, month, 31).ok()?;
    Some(31 - last.weekday().number_days_from_sunday())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_sundays_of_2026() {
        assert_eq!(last_sunday(2026, Month::March), Some(29));
        assert_eq!(last_sunday(2026, Month::October), Some(25));
    }

    #[test]
    fn disabled_rule_never_shifts() {
        let rule = ZoneRule::new(3600, false);
        // 2026-07-01T00:00:00Z
        let summer = UnixSeconds::new(1_782_864_000);
        assert!(!rule.is_dst(summer));
        assert_eq!(rule.total_offset(summer), 3600);
    }

    #[test]
    fn winter_and_summer_months() {
        let rule = ZoneRule::new(0, true);
        // 2026-01-15T12:00:00Z
        assert!(!rule.is_dst(UnixSeconds::new(1_768_478_400)));
        // 2026-07-01T00:00:00Z
        assert!(rule.is_dst(UnixSeconds::new(1_782_864_000)));
        assert_eq!(
            rule.local_time(UnixSeconds::new(1_782_864_000)),
            UnixSeconds::new(1_782_867_600)
        );
    }
}
