//! Sunrise and sunset cache.

use heapless::String;
use time::{Date, Month};

use crate::text::{copy_truncated, hh_mm};
use crate::time_sync::CivilTime;

/// Placeholder shown before the first refresh.
pub const UNKNOWN_TIME: &str = "--:--";

const HOUR: core::ops::Range<usize> = 11..13;
const MINUTE: core::ops::Range<usize> = 14..16;
const DATE_LEN: usize = 10;

/// Day of the year, used to refresh the cache at most once per day.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CalendarDay {
    pub year: i32,
    pub ordinal: u16,
}

impl CalendarDay {
    #[must_use]
    pub const fn new(year: i32, ordinal: u16) -> Self {
        Self { year, ordinal }
    }

    #[must_use]
    pub const fn from_civil(civil: &CivilTime) -> Self {
        Self::new(civil.year, civil.ordinal)
    }

    /// Reads the `YYYY-MM-DD` prefix of an ISO-8601 timestamp.
    #[must_use]
    pub fn from_iso_date(iso: &str) -> Option<Self> {
        let date = iso.get(..DATE_LEN)?;
        let mut parts = date.split('-');
        let year = parts.next()?.parse::<i32>().ok()?;
        let month = parts.next()?.parse::<u8>().ok()?;
        let day = parts.next()?.parse::<u8>().ok()?;
        let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;
        Some(Self::new(date.year(), date.ordinal()))
    }
}

/// Sun time of day parsed from a timestamp.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SunTime {
    pub minutes: u16,
    pub text: String<5>,
}

/// Extracts `HH:MM` from a timestamp such as `2026-01-02T07:52`.
///
/// The hour sits at characters 11..13 and the minute at 14..16.
#[must_use]
pub fn parse_sun_time(iso: &str) -> Option<SunTime> {
    let hour = two_digits(iso.get(HOUR)?)?;
    let minute = two_digits(iso.get(MINUTE)?)?;
    if hour > 23 || minute > 59 {
        return None;
    }
    let minutes = u16::from(hour) * 60 + u16::from(minute);
    Some(SunTime {
        minutes,
        text: hh_mm(minutes),
    })
}

fn two_digits(field: &str) -> Option<u8> {
    match field.as_bytes() {
        [tens @ b'0'..=b'9', ones @ b'0'..=b'9'] => Some((tens - b'0') * 10 + (ones - b'0')),
        _ => None,
    }
}

/// Cached sun times for the current day.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SunTimes {
    pub sunrise_minutes: u16,
    pub sunset_minutes: u16,
    pub sunrise: String<5>,
    pub sunset: String<5>,
    pub calendar_day: Option<CalendarDay>,
}

impl Default for SunTimes {
    fn default() -> Self {
        Self {
            sunrise_minutes: 0,
            sunset_minutes: 0,
            sunrise: copy_truncated(UNKNOWN_TIME),
            sunset: copy_truncated(UNKNOWN_TIME),
            calendar_day: None,
        }
    }
}

impl SunTimes {
    /// Returns `true` once the cache has been populated.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.calendar_day.is_some()
    }

    /// Applies parsed times for `day`, unless `day` was already applied.
    ///
    /// Returns `true` when the cache changed.
    pub fn refresh(
        &mut self,
        day: CalendarDay,
        sunrise: Option<SunTime>,
        sunset: Option<SunTime>,
    ) -> bool {
        if self.calendar_day == Some(day) || (sunrise.is_none() && sunset.is_none()) {
            return false;
        }
        if let Some(sunrise) = sunrise {
            self.sunrise_minutes = sunrise.minutes;
            self.sunrise = sunrise.text;
        }
        if let Some(sunset) = sunset {
            self.sunset_minutes = sunset.minutes;
            self.sunset = sunset.text;
        }
        self.calendar_day = Some(day);
        true
    }

    /// Minutes between sunrise and sunset.
    #[must_use]
    pub const fn daylight_minutes(&self) -> u16 {
        self.sunset_minutes.saturating_sub(self.sunrise_minutes)
    }
}
