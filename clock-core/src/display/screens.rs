//! Screen layouts.
//!
//! The panel is split into a 48-pixel main zone on top and a 16-pixel footer.
//! Every screen starts from a cleared buffer and only draws; flushing is left
//! to the engine.

use core::fmt::Write as _;
use core::time::Duration;

use crate::connectivity::ConnectivityState;
use crate::text::FormatBuffer;
use crate::time_sync::CivilTime;
use crate::weather::{SunTimes, WeatherSnapshot};

use super::driver::{DisplayDriver, TextScale};
use super::framebuffer::WIDTH;
use super::rotation::DisplayMode;

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const SCREEN_WIDTH: i32 = WIDTH as i32;
const MAIN_TOP: i32 = 14;
const FOOTER_TOP: i32 = 48;
const SMALL_FOOTER_TOP: i32 = 52;

/// Read-only view of the engines' state used to draw a screen.
#[derive(Copy, Clone, Debug)]
pub struct ScreenContext<'a> {
    pub online: bool,
    pub link: ConnectivityState,
    /// Time until the next association attempt while the link is down.
    pub retry_in: Option<Duration>,
    /// Local wall-clock time, once synchronised.
    pub local: Option<CivilTime>,
    pub hour_format_24: bool,
    pub weather: &'a WeatherSnapshot,
    pub sun: &'a SunTimes,
    pub city: &'a str,
}

/// Draws `mode` into a cleared buffer.
pub fn render<D: DisplayDriver>(driver: &mut D, mode: DisplayMode, ctx: &ScreenContext<'_>) {
    driver.clear();
    match mode {
        DisplayMode::Time => time_screen(driver, ctx),
        DisplayMode::Weather => weather_screen(driver, ctx),
        DisplayMode::SunTimes => sun_screen(driver, ctx.sun),
    }
}

fn time_screen<D: DisplayDriver>(driver: &mut D, ctx: &ScreenContext<'_>) {
    let Some(local) = ctx.local else {
        if ctx.link == ConnectivityState::Failed {
            if let Some(retry_in) = ctx.retry_in {
                offline_banner(driver, retry_in);
                return;
            }
        }
        centered(driver, TextScale::Large, MAIN_TOP, "--:--");
        let status = if ctx.online { "Syncing NTP..." } else { "No WiFi" };
        centered(driver, TextScale::Small, SMALL_FOOTER_TOP, status);
        return;
    };

    let hours = display_hour(local.hour, ctx.hour_format_24);
    let colon = if local.second % 2 == 0 { ':' } else { ' ' };
    let mut clock = FormatBuffer::<8>::new();
    let _ = write!(clock, "{hours:02}{colon}{:02}", local.minute);
    centered(driver, TextScale::Large, MAIN_TOP, clock.as_str());

    let mut date = FormatBuffer::<16>::new();
    let marker = if ctx.online { "" } else { "!" };
    let _ = write!(
        date,
        "{marker}{} {:02}.{:02}",
        local.weekday_abbrev(),
        local.day,
        u8::from(local.month)
    );
    centered(driver, TextScale::Medium, FOOTER_TOP, date.as_str());
}

/// Converts a 0-23 hour for display.
#[must_use]
pub const fn display_hour(hour: u8, hour_format_24: bool) -> u8 {
    if hour_format_24 {
        hour
    } else if hour == 0 {
        12
    } else if hour > 12 {
        hour - 12
    } else {
        hour
    }
}

fn weather_screen<D: DisplayDriver>(driver: &mut D, ctx: &ScreenContext<'_>) {
    if !ctx.weather.valid {
        centered(driver, TextScale::Large, MAIN_TOP, "No Data");
        return;
    }

    let mut value = FormatBuffer::<12>::new();
    let _ = write!(value, "{:.1}", ctx.weather.temperature);
    let value_width = TextScale::Large.text_width(value.as_str());
    let unit_width = TextScale::Small.text_width("C");
    let left = (SCREEN_WIDTH - value_width - unit_width) / 2;

    driver.set_text_scale(TextScale::Large);
    driver.set_cursor(left, MAIN_TOP);
    driver.draw_text(value.as_str());
    driver.set_text_scale(TextScale::Small);
    driver.set_cursor(left + value_width, MAIN_TOP);
    driver.draw_text("C");

    centered(driver, TextScale::Medium, FOOTER_TOP, ctx.city);
}

fn sun_screen<D: DisplayDriver>(driver: &mut D, sun: &SunTimes) {
    if !sun.is_populated() {
        centered(driver, TextScale::Large, MAIN_TOP, "----");
        return;
    }

    let mut line = FormatBuffer::<16>::new();
    driver.set_text_scale(TextScale::Medium);
    let _ = write!(line, "Rise {}", sun.sunrise);
    driver.set_cursor(5, 4);
    driver.draw_text(line.as_str());

    line.clear();
    let _ = write!(line, "Set  {}", sun.sunset);
    driver.set_cursor(5, 26);
    driver.draw_text(line.as_str());

    let daylight = sun.daylight_minutes();
    line.clear();
    let _ = write!(line, "Day {}h {}m", daylight / 60, daylight % 60);
    centered(driver, TextScale::Small, SMALL_FOOTER_TOP, line.as_str());
}

/// Shown in place of the time screen while the link is down and no time is known.
pub fn offline_banner<D: DisplayDriver>(driver: &mut D, retry_in: Duration) {
    centered(driver, TextScale::Medium, 8, "No WiFi");

    let seconds = retry_in.as_secs();
    let mut line = FormatBuffer::<24>::new();
    if seconds < 60 {
        let _ = write!(line, "Retry in {seconds} sec");
    } else {
        let _ = write!(line, "Retry in {} min", seconds / 60);
    }
    centered(driver, TextScale::Small, SMALL_FOOTER_TOP, line.as_str());
}

fn centered<D: DisplayDriver>(driver: &mut D, scale: TextScale, y: i32, text: &str) {
    let x = ((SCREEN_WIDTH - scale.text_width(text)) / 2).max(0);
    driver.set_text_scale(scale);
    driver.set_cursor(x, y);
    driver.draw_text(text);
}
