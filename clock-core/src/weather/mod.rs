//! Forecast and sun-time acquisition.
//!
//! Requests run through an asynchronous [`HttpClient`]; the engine only
//! checks for completion on each poll. The HTTP status is evaluated before the
//! body, so a rejected request is never parsed and schedules exactly one
//! retry.

pub mod payload;
pub mod sun;

use core::fmt::{self, Write as _};
use core::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::config::WeatherConfig;
use crate::error::{ClockError, MalformedKind};
use crate::text::FormatBuffer;
use crate::time::{Millis, duration_to_millis};

pub use payload::{ForecastDocument, MAX_RESPONSE_LEN, PayloadError, parse_forecast_bytes};
pub use sun::{CalendarDay, SunTime, SunTimes, parse_sun_time};

/// Time allowed for a response before the request is abandoned.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Forecast service endpoint.
pub const FORECAST_ENDPOINT: &str = "http://api.open-meteo.com/v1/forecast";
/// Capacity of the request URL.
pub const URL_CAPACITY: usize = 192;

const HTTP_OK: u16 = 200;

/// Completed response reported by the HTTP collaborator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Bytes written into the caller's buffer.
    pub len: usize,
    /// The body did not fit into the buffer.
    pub truncated: bool,
}

/// Asynchronous HTTP collaborator.
pub trait HttpClient {
    /// Opens a GET request and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be opened.
    fn begin_get(&mut self, url: &str) -> Result<(), ClockError>;

    /// Copies the response body into `body` once the request has completed.
    ///
    /// # Errors
    ///
    /// Returns an error when the request failed before a status arrived.
    fn poll_response(&mut self, body: &mut [u8]) -> Result<Option<HttpResponse>, ClockError>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WeatherState {
    Idle,
    Requesting,
    Success,
    Failed,
}

impl WeatherState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            WeatherState::Idle => "idle",
            WeatherState::Requesting => "requesting",
            WeatherState::Success => "success",
            WeatherState::Failed => "failed",
        }
    }
}

impl fmt::Display for WeatherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Latest current-conditions reading.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature: f32,
    /// WMO weather code, `-1` when unknown.
    pub code: i16,
    pub windspeed: f32,
    pub humidity: Option<f32>,
    pub last_update: Millis,
    pub valid: bool,
}

impl WeatherSnapshot {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            temperature: 0.0,
            code: -1,
            windspeed: 0.0,
            humidity: None,
            last_update: Millis::ZERO,
            valid: false,
        }
    }
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Progress reported by [`WeatherEngine::poll`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WeatherEvent {
    RequestStarted { attempt: u8 },
    Updated { temperature: f32, sun_refreshed: bool },
    /// `retry_in` is `None` once retries are exhausted.
    Failed {
        error: ClockError,
        retry_in: Option<Duration>,
    },
}

/// Builds the forecast query for `config`.
///
/// # Errors
///
/// Returns [`ClockError::Transport`] if the URL does not fit its buffer.
pub fn forecast_url(config: &WeatherConfig) -> Result<FormatBuffer<URL_CAPACITY>, ClockError> {
    let mut url = FormatBuffer::new();
    let _ = write!(
        url,
        "{FORECAST_ENDPOINT}?latitude={:.6}&longitude={:.6}&current_weather=true\
         &daily=sunrise,sunset&timezone=auto&forecast_days=1",
        config.latitude, config.longitude
    );
    if url.truncated() {
        return Err(ClockError::Transport);
    }
    Ok(url)
}

/// Owns the weather state, snapshot and sun-time cache.
#[derive(Clone, Debug)]
pub struct WeatherEngine {
    state: WeatherState,
    snapshot: WeatherSnapshot,
    sun: SunTimes,
    backoff: BackoffPolicy,
    requested_at: Millis,
    cycle_started: Option<Millis>,
    refresh_pending: bool,
    last_error: Option<ClockError>,
}

impl WeatherEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: WeatherState::Idle,
            snapshot: WeatherSnapshot::empty(),
            sun: SunTimes::default(),
            backoff: BackoffPolicy::request(),
            requested_at: Millis::ZERO,
            cycle_started: None,
            refresh_pending: false,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> WeatherState {
        self.state
    }

    #[must_use]
    pub const fn snapshot(&self) -> &WeatherSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub const fn sun_times(&self) -> &SunTimes {
        &self.sun
    }

    #[must_use]
    pub const fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    #[must_use]
    pub const fn last_error(&self) -> Option<ClockError> {
        self.last_error
    }

    /// Asks for a fresh cycle at the next online poll. Ignored while a
    /// request is in flight.
    pub fn request_refresh(&mut self) {
        if self.state != WeatherState::Requesting {
            self.refresh_pending = true;
        }
    }

    /// Starts a request immediately. No-op unless idle, enabled and online.
    pub fn trigger<H: HttpClient>(
        &mut self,
        now: Millis,
        online: bool,
        config: &WeatherConfig,
        http: &mut H,
    ) -> Option<WeatherEvent> {
        if self.state != WeatherState::Idle || !config.enabled || !online {
            return None;
        }
        Some(self.start_request(now, config, http))
    }

    /// Advances the engine by at most one request or completion.
    ///
    /// `today` is the local calendar day from the synced clock, used to stamp
    /// the sun-time cache.
    pub fn poll<H: HttpClient>(
        &mut self,
        now: Millis,
        online: bool,
        config: &WeatherConfig,
        today: Option<CalendarDay>,
        http: &mut H,
    ) -> Option<WeatherEvent> {
        match self.state {
            WeatherState::Requesting => return self.poll_response(now, online, today, http),
            WeatherState::Success => self.state = WeatherState::Idle,
            WeatherState::Failed if self.backoff.next_eligible().is_some() => {
                self.state = WeatherState::Idle;
            }
            WeatherState::Idle | WeatherState::Failed => {}
        }

        if !config.enabled || !online {
            return None;
        }

        let periodic = self.cycle_started.is_none_or(|start| {
            now.elapsed_since(start) >= duration_to_millis(config.refresh_interval)
        });
        if periodic || self.refresh_pending {
            self.refresh_pending = false;
            self.cycle_started = Some(now);
            self.backoff.reset();
            self.state = WeatherState::Idle;
            return self.trigger(now, online, config, http);
        }

        if self.state == WeatherState::Idle && self.backoff.take_due(now) {
            return self.trigger(now, online, config, http);
        }

        None
    }

    fn start_request<H: HttpClient>(
        &mut self,
        now: Millis,
        config: &WeatherConfig,
        http: &mut H,
    ) -> WeatherEvent {
        let attempt = self.backoff.attempt();
        let opened = forecast_url(config).and_then(|url| http.begin_get(url.as_str()));
        match opened {
            Ok(()) => {
                self.state = WeatherState::Requesting;
                self.requested_at = now;
                WeatherEvent::RequestStarted { attempt }
            }
            Err(error) => self.fail(now, error),
        }
    }

    fn poll_response<H: HttpClient>(
        &mut self,
        now: Millis,
        online: bool,
        today: Option<CalendarDay>,
        http: &mut H,
    ) -> Option<WeatherEvent> {
        if now.elapsed_since(self.requested_at) > duration_to_millis(REQUEST_TIMEOUT) {
            return Some(self.fail(now, ClockError::Timeout));
        }
        if !online {
            return Some(self.fail(now, ClockError::LinkLoss));
        }

        let mut body = [0_u8; MAX_RESPONSE_LEN];
        let response = match http.poll_response(&mut body) {
            Ok(Some(response)) => response,
            Ok(None) => return None,
            Err(error) => return Some(self.fail(now, error)),
        };

        if response.status != HTTP_OK {
            return Some(self.fail(now, ClockError::RemoteRejection(response.status)));
        }
        if response.truncated {
            return Some(self.fail(
                now,
                ClockError::MalformedResponse(MalformedKind::Oversized),
            ));
        }

        let received = body.get(..response.len).unwrap_or(&body);
        match parse_forecast_bytes(received) {
            Ok(document) => Some(self.apply(now, today, &document)),
            Err(error) => Some(self.fail(now, error.into())),
        }
    }

    fn apply(
        &mut self,
        now: Millis,
        today: Option<CalendarDay>,
        document: &ForecastDocument,
    ) -> WeatherEvent {
        self.snapshot = WeatherSnapshot {
            temperature: document.temperature.unwrap_or(0.0),
            code: document.weather_code.unwrap_or(-1),
            windspeed: document.windspeed.unwrap_or(0.0),
            humidity: document.humidity,
            last_update: now,
            valid: true,
        };

        let sunrise = document.sunrise.as_deref();
        let day = today.or_else(|| sunrise.and_then(CalendarDay::from_iso_date));
        let sun_refreshed = day.is_some_and(|day| {
            self.sun.refresh(
                day,
                sunrise.and_then(parse_sun_time),
                document.sunset.as_deref().and_then(parse_sun_time),
            )
        });

        self.backoff.reset();
        self.last_error = None;
        self.state = WeatherState::Success;
        WeatherEvent::Updated {
            temperature: self.snapshot.temperature,
            sun_refreshed,
        }
    }

    fn fail(&mut self, now: Millis, error: ClockError) -> WeatherEvent {
        self.snapshot.valid = false;
        self.last_error = Some(error);
        self.state = WeatherState::Failed;
        let retry_in = self.backoff.schedule_retry(now);
        WeatherEvent::Failed { error, retry_in }
    }
}

impl Default for WeatherEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_six_decimal_coordinates() {
        let url = forecast_url(&WeatherConfig::default()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.open-meteo.com/v1/forecast?latitude=37.189999&longitude=-8.540000\
             &current_weather=true&daily=sunrise,sunset&timezone=auto&forecast_days=1"
        );
    }
}
