#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The clock task publishes a few fields of every [`StatusSnapshot`] into
//! lightweight atomics so the button task can read them without borrowing the
//! clock.

use clock_core::connectivity::ConnectivityState;
use clock_core::display::DisplayMode;
use clock_core::status::StatusSnapshot;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

static LINK_STATE: AtomicU8 = AtomicU8::new(0);
static SYNCED: AtomicBool = AtomicBool::new(false);
static SYNC_SUCCESSES: AtomicU32 = AtomicU32::new(0);
static WEATHER_VALID: AtomicBool = AtomicBool::new(false);
static DISPLAY_MODE: AtomicU8 = AtomicU8::new(0);
static ROTATION_WARNING: AtomicBool = AtomicBool::new(false);

/// Fields readable outside the clock task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSummary {
    pub link: ConnectivityState,
    pub synced: bool,
    pub sync_successes: u32,
    pub weather_valid: bool,
    pub display_mode: DisplayMode,
    pub rotation_warning: bool,
}

impl StatusSummary {
    pub const fn online(&self) -> bool {
        matches!(self.link, ConnectivityState::Connected)
    }
}

const fn link_code(state: ConnectivityState) -> u8 {
    match state {
        ConnectivityState::Idle => 0,
        ConnectivityState::Connecting => 1,
        ConnectivityState::Connected => 2,
        ConnectivityState::Failed => 3,
        ConnectivityState::ManualProvisioning => 4,
    }
}

const fn link_from_code(code: u8) -> ConnectivityState {
    match code {
        1 => ConnectivityState::Connecting,
        2 => ConnectivityState::Connected,
        3 => ConnectivityState::Failed,
        4 => ConnectivityState::ManualProvisioning,
        _ => ConnectivityState::Idle,
    }
}

/// Stores the fields of `snapshot` that other tasks read.
pub fn publish(snapshot: &StatusSnapshot) {
    LINK_STATE.store(link_code(snapshot.link), Ordering::Relaxed);
    SYNCED.store(snapshot.utc.is_some(), Ordering::Relaxed);
    SYNC_SUCCESSES.store(snapshot.sync_successes, Ordering::Relaxed);
    WEATHER_VALID.store(snapshot.weather.valid, Ordering::Relaxed);
    DISPLAY_MODE.store(snapshot.display_mode.index(), Ordering::Relaxed);
    ROTATION_WARNING.store(snapshot.rotation_warning, Ordering::Relaxed);
}

/// Reads back the last published fields.
pub fn summary() -> StatusSummary {
    StatusSummary {
        link: link_from_code(LINK_STATE.load(Ordering::Relaxed)),
        synced: SYNCED.load(Ordering::Relaxed),
        sync_successes: SYNC_SUCCESSES.load(Ordering::Relaxed),
        weather_valid: WEATHER_VALID.load(Ordering::Relaxed),
        display_mode: DisplayMode::from_index(DISPLAY_MODE.load(Ordering::Relaxed)),
        rotation_warning: ROTATION_WARNING.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::OfflineLink;
    use crate::panel::NullPanel;
    use clock_core::config::{ClockConfig, NetworkCredentials};
    use clock_core::cycle::WeatherClock;
    use clock_core::display::BufferedDisplay;
    use clock_core::time::Millis;

    #[test]
    fn link_codes_round_trip() {
        for state in [
            ConnectivityState::Idle,
            ConnectivityState::Connecting,
            ConnectivityState::Connected,
            ConnectivityState::Failed,
            ConnectivityState::ManualProvisioning,
        ] {
            assert_eq!(link_from_code(link_code(state)), state);
        }
        assert_eq!(link_from_code(200), ConnectivityState::Idle);
    }

    #[test]
    fn publishes_clock_status() {
        let config = ClockConfig {
            credentials: Some(NetworkCredentials::new("desk", "hunter22")),
            ..ClockConfig::default()
        };
        let mut clock = WeatherClock::new(config, BufferedDisplay::new(NullPanel)).unwrap();
        let mut link = OfflineLink::new();
        clock.boot(Millis::ZERO, &mut link);

        publish(&clock.status(Millis::from_millis(100)));
        let summary = summary();
        assert_eq!(summary.link, ConnectivityState::Connecting);
        assert!(!summary.online());
        assert!(!summary.synced);
        assert!(!summary.weather_valid);
        assert_eq!(summary.display_mode, DisplayMode::Time);
    }
}
