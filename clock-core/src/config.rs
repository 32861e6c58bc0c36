//! Configuration consumed by the engines.
//!
//! Loading and persisting these values is the job of an outside collaborator;
//! the core only reads them. The single write-back path is
//! [`ConfigUpdate::NetworkIdentity`], emitted when the radio attaches with
//! credentials the configuration did not know about.

use core::fmt;
use core::time::Duration;

use heapless::String;

use crate::text::copy_truncated;

pub const SSID_CAPACITY: usize = 32;
pub const PASSPHRASE_CAPACITY: usize = 64;
pub const SERVER_CAPACITY: usize = 64;
pub const CITY_CAPACITY: usize = 32;

/// Largest accepted UTC base offset (UTC+14).
pub const MAX_BASE_OFFSET_SECS: i32 = 14 * 3600;

pub const DEFAULT_TIME_SERVER: &str = "pool.ntp.org";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_WEATHER_INTERVAL: Duration = Duration::from_secs(1800);
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_LATITUDE: f32 = 37.19;
pub const DEFAULT_LONGITUDE: f32 = -8.54;
pub const DEFAULT_CITY: &str = "Portimao";

/// Stored network credentials.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkCredentials {
    pub ssid: String<SSID_CAPACITY>,
    pub passphrase: String<PASSPHRASE_CAPACITY>,
}

impl NetworkCredentials {
    /// Builds credentials, truncating either field to its capacity.
    #[must_use]
    pub fn new(ssid: &str, passphrase: &str) -> Self {
        Self {
            ssid: copy_truncated(ssid),
            passphrase: copy_truncated(passphrase),
        }
    }
}

/// Wall-clock presentation and synchronisation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeConfig {
    pub base_offset_secs: i32,
    pub dst_enabled: bool,
    pub hour_format_24: bool,
    pub server: String<SERVER_CAPACITY>,
    pub sync_interval: Duration,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            base_offset_secs: 0,
            dst_enabled: true,
            hour_format_24: true,
            server: copy_truncated(DEFAULT_TIME_SERVER),
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

/// Forecast acquisition settings.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub latitude: f32,
    pub longitude: f32,
    pub city: String<CITY_CAPACITY>,
    pub refresh_interval: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            city: copy_truncated(DEFAULT_CITY),
            refresh_interval: DEFAULT_WEATHER_INTERVAL,
        }
    }
}

/// Screen rotation settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    pub rotation_interval: Duration,
    pub show_weather: bool,
    pub show_sun_times: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            show_weather: true,
            show_sun_times: true,
        }
    }
}

/// Complete configuration snapshot handed to the clock at boot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClockConfig {
    pub credentials: Option<NetworkCredentials>,
    pub time: TimeConfig,
    pub weather: WeatherConfig,
    pub display: DisplayConfig,
}

/// Reasons a configuration snapshot is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    LatitudeOutOfRange,
    LongitudeOutOfRange,
    OffsetOutOfRange,
    ZeroInterval(IntervalField),
    EmptyTimeServer,
}

/// Interval setting named by [`ConfigError::ZeroInterval`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IntervalField {
    Sync,
    Weather,
    Rotation,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LatitudeOutOfRange => f.write_str("latitude must be within +/-90"),
            ConfigError::LongitudeOutOfRange => f.write_str("longitude must be within +/-180"),
            ConfigError::OffsetOutOfRange => f.write_str("UTC offset must be within +/-14h"),
            ConfigError::ZeroInterval(IntervalField::Sync) => {
                f.write_str("sync interval must be non-zero")
            }
            ConfigError::ZeroInterval(IntervalField::Weather) => {
                f.write_str("weather interval must be non-zero")
            }
            ConfigError::ZeroInterval(IntervalField::Rotation) => {
                f.write_str("rotation interval must be non-zero")
            }
            ConfigError::EmptyTimeServer => f.write_str("time server must be set"),
        }
    }
}

impl ClockConfig {
    /// Checks the snapshot for values the engines cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.weather.latitude) {
            return Err(ConfigError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&self.weather.longitude) {
            return Err(ConfigError::LongitudeOutOfRange);
        }
        if self.time.base_offset_secs.abs() > MAX_BASE_OFFSET_SECS {
            return Err(ConfigError::OffsetOutOfRange);
        }
        if self.time.server.is_empty() {
            return Err(ConfigError::EmptyTimeServer);
        }
        if self.time.sync_interval.is_zero() {
            return Err(ConfigError::ZeroInterval(IntervalField::Sync));
        }
        if self.weather.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroInterval(IntervalField::Weather));
        }
        if self.display.rotation_interval.is_zero() {
            return Err(ConfigError::ZeroInterval(IntervalField::Rotation));
        }
        Ok(())
    }
}

/// Configuration change the core asks the persistence collaborator to store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigUpdate {
    /// The link attached to a network the configuration did not name.
    NetworkIdentity(String<SSID_CAPACITY>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ClockConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.time.server.as_str(), "pool.ntp.org");
        assert!(config.credentials.is_none());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = ClockConfig::default();
        config.weather.latitude = 91.0;
        assert_eq!(config.validate(), Err(ConfigError::LatitudeOutOfRange));

        let mut config = ClockConfig::default();
        config.time.base_offset_secs = -15 * 3600;
        assert_eq!(config.validate(), Err(ConfigError::OffsetOutOfRange));

        let mut config = ClockConfig::default();
        config.display.rotation_interval = Duration::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval(IntervalField::Rotation))
        );
    }

    #[test]
    fn credentials_truncate_long_ssid() {
        let long = "a-very-long-network-name-that-exceeds-the-limit";
        let credentials = NetworkCredentials::new(long, "secret");
        assert_eq!(credentials.ssid.len(), SSID_CAPACITY);
    }
}
