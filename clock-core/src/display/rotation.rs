//! Presentation modes and the forward scan that picks the next one.

use core::fmt;

use crate::config::DisplayConfig;

/// Screen shown by the display engine.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DisplayMode {
    #[default]
    Time,
    Weather,
    SunTimes,
}

impl DisplayMode {
    pub const COUNT: u8 = 3;

    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            DisplayMode::Time => 0,
            DisplayMode::Weather => 1,
            DisplayMode::SunTimes => 2,
        }
    }

    /// Mode at `index`, wrapping modulo [`COUNT`](Self::COUNT).
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        match index % Self::COUNT {
            1 => DisplayMode::Weather,
            2 => DisplayMode::SunTimes,
            _ => DisplayMode::Time,
        }
    }

    #[must_use]
    pub const fn following(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            DisplayMode::Time => "time",
            DisplayMode::Weather => "weather",
            DisplayMode::SunTimes => "sun",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which optional modes currently have something to show.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ModeEligibility {
    pub weather: bool,
    pub sun_times: bool,
}

impl ModeEligibility {
    /// Combines the per-mode show flags with data availability.
    #[must_use]
    pub const fn from_state(config: &DisplayConfig, weather_valid: bool, sun_populated: bool) -> Self {
        Self {
            weather: config.show_weather && weather_valid,
            sun_times: config.show_sun_times && sun_populated,
        }
    }

    #[must_use]
    pub const fn allows(&self, mode: DisplayMode) -> bool {
        match mode {
            DisplayMode::Time => true,
            DisplayMode::Weather => self.weather,
            DisplayMode::SunTimes => self.sun_times,
        }
    }
}

/// Outcome of a rotation scan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RotationChoice {
    pub mode: DisplayMode,
    /// The scan wrapped around without finding another mode and fell back to
    /// [`DisplayMode::Time`].
    pub forced: bool,
}

/// Scans forward from `current` for the next eligible mode.
///
/// At most [`DisplayMode::COUNT`] candidates are taken; the last one is the
/// starting mode itself, which is replaced by a forced fall-back to time.
#[must_use]
pub fn select_next(current: DisplayMode, eligibility: ModeEligibility) -> RotationChoice {
    let mut candidate = current;
    for attempt in 1..=DisplayMode::COUNT {
        candidate = candidate.following();
        if attempt >= DisplayMode::COUNT {
            break;
        }
        if eligibility.allows(candidate) {
            return RotationChoice {
                mode: candidate,
                forced: false,
            };
        }
    }
    RotationChoice {
        mode: DisplayMode::Time,
        forced: true,
    }
}
