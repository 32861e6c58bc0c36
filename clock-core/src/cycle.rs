//! One cooperative cycle over every engine.
//!
//! [`WeatherClock`] is the single context object that owns the configuration,
//! the three acquisition engines, the display engine and the telemetry
//! history. Each call to [`WeatherClock::poll_cycle`] polls connectivity
//! first, so the online flag is fresh for time sync and weather, and the
//! display last, so it draws the freshest state.

use heapless::Vec;

use crate::config::{ClockConfig, ConfigError, ConfigUpdate, NetworkCredentials};
use crate::connectivity::{ConnectivityEvent, ConnectivityManager, NetworkLink};
use crate::display::{DisplayDriver, DisplayEngine, DisplayEvent, ScreenContext};
use crate::error::{ErrorSource, SourcedError};
use crate::status::StatusSnapshot;
use crate::telemetry::{TelemetryEventKind, TelemetryRecorder};
use crate::time::Millis;
use crate::time_sync::{
    CivilTime, DatagramTransport, TimeSyncEngine, TimeSyncEvent, UnixSeconds, ZoneRule,
};
use crate::weather::{CalendarDay, HttpClient, WeatherEngine, WeatherEvent};

/// Upper bound on events a single cycle can produce.
pub const MAX_CYCLE_EVENTS: usize = 4;

/// Network collaborators borrowed for one cycle.
pub struct NetworkIo<'a, L, T, H> {
    pub link: &'a mut L,
    pub datagrams: &'a mut T,
    pub http: &'a mut H,
}

impl<'a, L, T, H> NetworkIo<'a, L, T, H>
where
    L: NetworkLink,
    T: DatagramTransport,
    H: HttpClient,
{
    pub fn new(link: &'a mut L, datagrams: &'a mut T, http: &'a mut H) -> Self {
        Self {
            link,
            datagrams,
            http,
        }
    }
}

/// Event produced by one of the engines during a cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum ClockEvent {
    Connectivity(ConnectivityEvent),
    TimeSync(TimeSyncEvent),
    Weather(WeatherEvent),
    Display(DisplayEvent),
}

/// Everything a cycle reports back to its driver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleOutcome {
    pub events: Vec<ClockEvent, MAX_CYCLE_EVENTS>,
    /// Configuration change to hand to the persistence collaborator.
    pub config_update: Option<ConfigUpdate>,
}

/// The clock: configuration, engines, display and telemetry.
pub struct WeatherClock<D> {
    config: ClockConfig,
    connectivity: ConnectivityManager,
    time_sync: TimeSyncEngine,
    weather: WeatherEngine,
    display: DisplayEngine<D>,
    telemetry: TelemetryRecorder,
    last_error: Option<SourcedError>,
}

impl<D: DisplayDriver> WeatherClock<D> {
    /// Builds a clock around a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration field.
    pub fn new(config: ClockConfig, driver: D) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            connectivity: ConnectivityManager::new(),
            time_sync: TimeSyncEngine::new(),
            weather: WeatherEngine::new(),
            display: DisplayEngine::new(driver),
            telemetry: TelemetryRecorder::new(),
            last_error: None,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ClockConfig {
        &self.config
    }

    #[must_use]
    pub const fn connectivity(&self) -> &ConnectivityManager {
        &self.connectivity
    }

    #[must_use]
    pub const fn time_sync(&self) -> &TimeSyncEngine {
        &self.time_sync
    }

    #[must_use]
    pub const fn weather(&self) -> &WeatherEngine {
        &self.weather
    }

    #[must_use]
    pub const fn display(&self) -> &DisplayEngine<D> {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayEngine<D> {
        &mut self.display
    }

    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Most recent acquisition error, cleared when that engine next succeeds.
    #[must_use]
    pub const fn last_error(&self) -> Option<SourcedError> {
        self.last_error
    }

    /// Starts the first association attempt and the rotation timer.
    pub fn boot<L: NetworkLink>(&mut self, now: Millis, link: &mut L) -> ClockEvent {
        self.display.reset_rotation(now);
        let event = self
            .connectivity
            .start_connect(now, self.config.credentials.as_ref(), link);
        self.record_connectivity(now, &event);
        ClockEvent::Connectivity(event)
    }

    /// Resumes after provisioning produced credentials.
    pub fn provisioned<L: NetworkLink>(
        &mut self,
        now: Millis,
        credentials: NetworkCredentials,
        link: &mut L,
    ) -> ClockEvent {
        let event = self.connectivity.provisioned(now, credentials, link);
        self.record_connectivity(now, &event);
        ClockEvent::Connectivity(event)
    }

    /// Requests a time sync at the next online cycle.
    pub fn trigger_time_sync(&mut self) {
        self.time_sync.trigger();
    }

    /// Requests a weather refresh at the next online cycle.
    pub fn request_weather_refresh(&mut self) {
        self.weather.request_refresh();
    }

    /// Extrapolated UTC time.
    #[must_use]
    pub fn utc(&self, now: Millis) -> Option<UnixSeconds> {
        self.time_sync.current_epoch(now)
    }

    /// Local wall-clock time including the seasonal offset.
    #[must_use]
    pub fn local_time(&self, now: Millis) -> Option<UnixSeconds> {
        let zone = ZoneRule::from(&self.config.time);
        self.utc(now).map(|utc| zone.local_time(utc))
    }

    fn local_civil(&self, now: Millis) -> Option<CivilTime> {
        self.local_time(now).and_then(UnixSeconds::civil)
    }

    /// Polls every engine once, in dependency order.
    pub fn poll_cycle<L, T, H>(&mut self, now: Millis, io: &mut NetworkIo<'_, L, T, H>) -> CycleOutcome
    where
        L: NetworkLink,
        T: DatagramTransport,
        H: HttpClient,
    {
        let mut outcome = CycleOutcome::default();

        if let Some(event) = self.connectivity.poll(now, io.link) {
            self.record_connectivity(now, &event);
            if let ConnectivityEvent::Connected {
                learned_identity: Some(ssid),
            } = &event
            {
                outcome.config_update = Some(ConfigUpdate::NetworkIdentity(ssid.clone()));
            }
            push(&mut outcome, ClockEvent::Connectivity(event));
        }
        let online = self.connectivity.online();

        if let Some(event) = self
            .time_sync
            .poll(now, online, &self.config.time, io.datagrams)
        {
            self.record_time_sync(now, event);
            push(&mut outcome, ClockEvent::TimeSync(event));
        }

        let local = self.local_civil(now);
        let today = local.as_ref().map(CalendarDay::from_civil);
        if let Some(event) = self
            .weather
            .poll(now, online, &self.config.weather, today, io.http)
        {
            self.record_weather(now, event);
            push(&mut outcome, ClockEvent::Weather(event));
        }

        let ctx = ScreenContext {
            online,
            link: self.connectivity.state(),
            retry_in: self.connectivity.next_retry_in(now),
            local,
            hour_format_24: self.config.time.hour_format_24,
            weather: self.weather.snapshot(),
            sun: self.weather.sun_times(),
            city: self.config.weather.city.as_str(),
        };
        if let Some(event) = self.display.poll(now, &self.config.display, &ctx) {
            self.record_display(now, event);
            push(&mut outcome, ClockEvent::Display(event));
        }

        outcome
    }

    /// Captures the state of every engine.
    #[must_use]
    pub fn status(&self, now: Millis) -> StatusSnapshot {
        let zone = ZoneRule::from(&self.config.time);
        let utc = self.utc(now);
        let sun = self.weather.sun_times();
        StatusSnapshot {
            link: self.connectivity.state(),
            online: self.connectivity.online(),
            link_retry_in: self.connectivity.next_retry_in(now),
            utc,
            local: utc.map(|utc| zone.local_time(utc)),
            dst_active: utc.is_some_and(|utc| zone.is_dst(utc)),
            offset_secs: utc.map_or(zone.base_offset_secs, |utc| zone.total_offset(utc)),
            sync_state: self.time_sync.state(),
            sync_attempts: self.time_sync.attempts(),
            sync_successes: self.time_sync.successes(),
            last_error: self.last_error,
            weather_state: self.weather.state(),
            weather: *self.weather.snapshot(),
            sunrise: sun.sunrise.clone(),
            sunset: sun.sunset.clone(),
            sun_day: sun.calendar_day,
            display_mode: self.display.current_mode(),
            transitioning: self.display.is_transitioning(),
            rotation_warning: self.display.rotation_warning(),
        }
    }

    fn record_connectivity(&mut self, now: Millis, event: &ConnectivityEvent) {
        let kind = match event {
            ConnectivityEvent::Connecting { attempt } => {
                TelemetryEventKind::LinkConnecting { attempt: *attempt }
            }
            ConnectivityEvent::Connected { learned_identity } => {
                if learned_identity.is_some() {
                    self.telemetry
                        .record(TelemetryEventKind::IdentityLearned, now);
                }
                TelemetryEventKind::LinkAttached
            }
            ConnectivityEvent::AttemptFailed {
                error, retry_in, ..
            } => TelemetryEventKind::LinkAttemptFailed {
                error: *error,
                retry_in_secs: u32::try_from(retry_in.as_secs()).unwrap_or(u32::MAX),
            },
            ConnectivityEvent::LinkLost => TelemetryEventKind::LinkLost,
            ConnectivityEvent::ProvisioningRequired => TelemetryEventKind::ProvisioningRequired,
        };
        self.telemetry.record(kind, now);
    }

    fn record_time_sync(&mut self, now: Millis, event: TimeSyncEvent) {
        let kind = match event {
            TimeSyncEvent::RequestSent { attempt } => {
                TelemetryEventKind::TimeRequestSent { attempt }
            }
            TimeSyncEvent::Synced { epoch } => {
                self.clear_error(ErrorSource::TimeSync);
                TelemetryEventKind::TimeSynced { epoch }
            }
            TimeSyncEvent::Failed { error, retry_in } => {
                self.last_error = Some(SourcedError::new(ErrorSource::TimeSync, error));
                TelemetryEventKind::TimeSyncFailed {
                    error,
                    exhausted: retry_in.is_none(),
                }
            }
        };
        self.telemetry.record(kind, now);
    }

    fn record_weather(&mut self, now: Millis, event: WeatherEvent) {
        let kind = match event {
            WeatherEvent::RequestStarted { attempt } => {
                TelemetryEventKind::WeatherRequested { attempt }
            }
            WeatherEvent::Updated {
                temperature,
                sun_refreshed,
            } => {
                self.clear_error(ErrorSource::Weather);
                TelemetryEventKind::WeatherUpdated {
                    temperature,
                    sun_refreshed,
                }
            }
            WeatherEvent::Failed { error, retry_in } => {
                self.last_error = Some(SourcedError::new(ErrorSource::Weather, error));
                TelemetryEventKind::WeatherFailed {
                    error,
                    exhausted: retry_in.is_none(),
                }
            }
        };
        self.telemetry.record(kind, now);
    }

    fn record_display(&mut self, now: Millis, event: DisplayEvent) {
        match event {
            DisplayEvent::TransitionStarted { from, to, forced } => {
                if forced {
                    self.telemetry
                        .record(TelemetryEventKind::RotationFallback, now);
                }
                self.telemetry
                    .record(TelemetryEventKind::TransitionStarted { from, to }, now);
            }
            DisplayEvent::TransitionFinished { mode } => {
                self.telemetry
                    .record(TelemetryEventKind::TransitionFinished { mode }, now);
            }
        }
    }

    fn clear_error(&mut self, source: ErrorSource) {
        if self.last_error.is_some_and(|error| error.source == source) {
            self.last_error = None;
        }
    }
}

fn push(outcome: &mut CycleOutcome, event: ClockEvent) {
    // One slot per engine, so this never overflows.
    let _ = outcome.events.push(event);
}
