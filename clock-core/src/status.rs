//! Status surface shared by the firmware log and the emulator shell.
//!
//! [`StatusSnapshot`] captures everything an operator wants to see at once;
//! [`StatusFormatter`] keeps the text rendering identical across front-ends.

use core::fmt;
use core::time::Duration;

use heapless::String;

use crate::connectivity::ConnectivityState;
use crate::display::DisplayMode;
use crate::error::SourcedError;
use crate::time_sync::{TimeSyncState, UnixSeconds};
use crate::weather::{CalendarDay, WeatherSnapshot, WeatherState};

/// Point-in-time view of every engine.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub link: ConnectivityState,
    pub online: bool,
    pub link_retry_in: Option<Duration>,
    pub utc: Option<UnixSeconds>,
    pub local: Option<UnixSeconds>,
    pub dst_active: bool,
    pub offset_secs: i32,
    pub sync_state: TimeSyncState,
    pub sync_attempts: u32,
    pub sync_successes: u32,
    pub last_error: Option<SourcedError>,
    pub weather_state: WeatherState,
    pub weather: WeatherSnapshot,
    pub sunrise: String<5>,
    pub sunset: String<5>,
    pub sun_day: Option<CalendarDay>,
    pub display_mode: DisplayMode,
    pub transitioning: bool,
    pub rotation_warning: bool,
}

/// Renders a [`StatusSnapshot`] into stable, single-line records.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// `link state=connected online=true retry-in=n/a`
    pub fn write_link_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "link state={} online={} retry-in=",
            self.snapshot.link, self.snapshot.online
        )?;
        match self.snapshot.link_retry_in {
            Some(delay) => write!(writer, "{}s", delay.as_secs()),
            None => writer.write_str("n/a"),
        }
    }

    /// `time utc=1767340320 local=08:52:00 dst=false offset=+3600`
    pub fn write_time_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_str("time utc=")?;
        match self.snapshot.utc {
            Some(utc) => write!(writer, "{utc}")?,
            None => writer.write_str("unsynced")?,
        }
        writer.write_str(" local=")?;
        match self.snapshot.local {
            Some(local) => write_clock(writer, local)?,
            None => writer.write_str("--:--:--")?,
        }
        write!(
            writer,
            " dst={} offset={:+}",
            self.snapshot.dst_active, self.snapshot.offset_secs
        )
    }

    /// `sync state=idle attempts=3 successes=2 last-error=NTP timeout`
    pub fn write_sync_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "sync state={} attempts={} successes={} last-error=",
            self.snapshot.sync_state, self.snapshot.sync_attempts, self.snapshot.sync_successes
        )?;
        match self.snapshot.last_error {
            Some(error) => write!(writer, "{error}"),
            None => writer.write_str("none"),
        }
    }

    /// `weather state=idle valid=true temp=16.4 code=3 wind=11.2 humidity=n/a`
    pub fn write_weather_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let weather = &self.snapshot.weather;
        write!(
            writer,
            "weather state={} valid={} temp={:.1} code={} wind={:.1} humidity=",
            self.snapshot.weather_state,
            weather.valid,
            weather.temperature,
            weather.code,
            weather.windspeed
        )?;
        match weather.humidity {
            Some(humidity) => write!(writer, "{humidity:.0}%"),
            None => writer.write_str("n/a"),
        }
    }

    /// `sun rise=07:52 set=17:31 day=2026/2`
    pub fn write_sun_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "sun rise={} set={} day=",
            self.snapshot.sunrise, self.snapshot.sunset
        )?;
        match self.snapshot.sun_day {
            Some(day) => write!(writer, "{}/{}", day.year, day.ordinal),
            None => writer.write_str("none"),
        }
    }

    /// `display mode=time transitioning=false warning=false`
    pub fn write_display_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "display mode={} transitioning={} warning={}",
            self.snapshot.display_mode, self.snapshot.transitioning, self.snapshot.rotation_warning
        )
    }

    /// Writes every line, each terminated by `\n`.
    pub fn write_all<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        self.write_link_line(writer)?;
        writer.write_char('\n')?;
        self.write_time_line(writer)?;
        writer.write_char('\n')?;
        self.write_sync_line(writer)?;
        writer.write_char('\n')?;
        self.write_weather_line(writer)?;
        writer.write_char('\n')?;
        self.write_sun_line(writer)?;
        writer.write_char('\n')?;
        self.write_display_line(writer)?;
        writer.write_char('\n')
    }
}

fn write_clock<W: fmt::Write>(writer: &mut W, local: UnixSeconds) -> fmt::Result {
    let seconds_of_day = local.as_i64().rem_euclid(86_400);
    write!(
        writer,
        "{:02}:{:02}:{:02}",
        seconds_of_day / 3_600,
        (seconds_of_day / 60) % 60,
        seconds_of_day % 60
    )
}
