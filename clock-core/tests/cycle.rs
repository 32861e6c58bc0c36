#![allow(clippy::float_cmp)]

mod common;

use clock_core::config::{ClockConfig, ConfigError, ConfigUpdate, NetworkCredentials, TimeConfig};
use clock_core::connectivity::ConnectivityEvent;
use clock_core::cycle::{ClockEvent, CycleOutcome, NetworkIo, WeatherClock};
use clock_core::display::{BufferedDisplay, DisplayEvent, DisplayMode};
use clock_core::error::{ClockError, ErrorSource};
use clock_core::status::StatusFormatter;
use clock_core::telemetry::TelemetryEventKind;
use clock_core::time_sync::{TimeSyncEvent, UnixSeconds};
use clock_core::weather::WeatherEvent;

use common::{
    CapturePanel, FORECAST, FRIDAY_MORNING, ScriptedHttp, ScriptedLink, ScriptedNtp,
    capture_display, ms,
};

type TestClock = WeatherClock<BufferedDisplay<CapturePanel>>;

struct Bench {
    clock: TestClock,
    link: ScriptedLink,
    ntp: ScriptedNtp,
    http: ScriptedHttp,
}

impl Bench {
    fn new(config: ClockConfig) -> Self {
        Self {
            clock: WeatherClock::new(config, capture_display()).expect("valid config"),
            link: ScriptedLink::detached(),
            ntp: ScriptedNtp::default(),
            http: ScriptedHttp::default(),
        }
    }

    fn with_credentials() -> Self {
        Self::new(ClockConfig {
            credentials: Some(NetworkCredentials::new("desk", "hunter22")),
            ..ClockConfig::default()
        })
    }

    fn cycle(&mut self, now: u32) -> CycleOutcome {
        let mut io = NetworkIo::new(&mut self.link, &mut self.ntp, &mut self.http);
        self.clock.poll_cycle(ms(now), &mut io)
    }

    fn boot_online(&mut self) {
        self.clock.boot(ms(0), &mut self.link);
        self.link.attach("desk");
        self.cycle(100);
        self.ntp.reply(FRIDAY_MORNING);
        self.http.respond(200, FORECAST);
        self.cycle(200);
    }
}

#[test]
fn rejects_invalid_configuration() {
    let mut config = ClockConfig::default();
    config.weather.latitude = 91.0;

    assert!(matches!(
        WeatherClock::new(config, capture_display()),
        Err(ConfigError::LatitudeOutOfRange)
    ));
}

#[test]
fn first_online_cycle_starts_time_and_weather_requests() {
    let mut bench = Bench::with_credentials();

    assert_eq!(
        bench.clock.boot(ms(0), &mut bench.link),
        ClockEvent::Connectivity(ConnectivityEvent::Connecting { attempt: 0 })
    );
    assert!(bench.cycle(50).events.is_empty());

    bench.link.attach("desk");
    let outcome = bench.cycle(100);
    assert_eq!(
        outcome.events.as_slice(),
        [
            ClockEvent::Connectivity(ConnectivityEvent::Connected {
                learned_identity: None
            }),
            ClockEvent::TimeSync(TimeSyncEvent::RequestSent { attempt: 0 }),
            ClockEvent::Weather(WeatherEvent::RequestStarted { attempt: 0 }),
        ]
    );
    assert_eq!(outcome.config_update, None);
    assert_eq!(bench.ntp.sent.len(), 1);
    assert_eq!(bench.http.urls.len(), 1);
}

#[test]
fn synced_cycle_reports_time_weather_and_status() {
    let mut bench = Bench::with_credentials();
    bench.clock.boot(ms(0), &mut bench.link);
    bench.link.attach("desk");
    bench.cycle(100);

    bench.ntp.reply(FRIDAY_MORNING);
    bench.http.respond(200, FORECAST);
    let outcome = bench.cycle(200);
    assert_eq!(
        outcome.events.as_slice(),
        [
            ClockEvent::TimeSync(TimeSyncEvent::Synced {
                epoch: UnixSeconds::new(i64::from(FRIDAY_MORNING))
            }),
            ClockEvent::Weather(WeatherEvent::Updated {
                temperature: 16.4,
                sun_refreshed: true,
            }),
        ]
    );

    let snapshot = bench.clock.status(ms(1_200));
    let mut text = String::new();
    StatusFormatter::new(&snapshot)
        .write_all(&mut text)
        .expect("string sink");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "link state=connected online=true retry-in=n/a",
            "time utc=1767340321 local=07:52:01 dst=false offset=+0",
            "sync state=success attempts=1 successes=1 last-error=none",
            "weather state=success valid=true temp=16.4 code=3 wind=11.2 humidity=n/a",
            "sun rise=07:52 set=17:31 day=2026/2",
            "display mode=time transitioning=false warning=false",
        ]
    );
}

#[test]
fn telemetry_follows_the_cycle() {
    let mut bench = Bench::with_credentials();
    bench.boot_online();

    let kinds: Vec<TelemetryEventKind> = bench
        .clock
        .telemetry()
        .oldest_first()
        .map(|record| record.event)
        .collect();
    assert_eq!(
        kinds,
        [
            TelemetryEventKind::LinkConnecting { attempt: 0 },
            TelemetryEventKind::LinkAttached,
            TelemetryEventKind::TimeRequestSent { attempt: 0 },
            TelemetryEventKind::WeatherRequested { attempt: 0 },
            TelemetryEventKind::TimeSynced {
                epoch: UnixSeconds::new(i64::from(FRIDAY_MORNING))
            },
            TelemetryEventKind::WeatherUpdated {
                temperature: 16.4,
                sun_refreshed: true,
            },
        ]
    );

    let seen = bench.clock.telemetry().latest().map(|record| record.id);
    bench.cycle(5_101);
    let fresh: Vec<TelemetryEventKind> = bench
        .clock
        .telemetry()
        .since(seen)
        .map(|record| record.event)
        .collect();
    assert_eq!(
        fresh,
        [TelemetryEventKind::TransitionStarted {
            from: DisplayMode::Time,
            to: DisplayMode::Weather,
        }]
    );
}

#[test]
fn rotation_reaches_every_screen_once_data_arrives() {
    let mut bench = Bench::with_credentials();
    bench.boot_online();

    let mut finished = Vec::new();
    let mut now = 200;
    while now < 30_000 {
        now += 50;
        for event in bench.cycle(now).events {
            if let ClockEvent::Display(DisplayEvent::TransitionFinished { mode }) = event {
                finished.push(mode);
            }
        }
    }

    assert!(finished.len() >= 3, "only saw {finished:?}");
    assert_eq!(
        &finished[..3],
        [DisplayMode::Weather, DisplayMode::SunTimes, DisplayMode::Time]
    );
    assert!(!bench.clock.display().rotation_warning());
}

#[test]
fn learned_identity_is_handed_to_persistence() {
    let mut bench = Bench::new(ClockConfig::default());
    bench.link.stored_identity = true;

    bench.clock.boot(ms(0), &mut bench.link);
    bench.link.attach("attic");
    let outcome = bench.cycle(100);

    assert_eq!(
        outcome.config_update,
        Some(ConfigUpdate::NetworkIdentity("attic".try_into().expect("fits")))
    );
    assert!(
        bench
            .clock
            .telemetry()
            .oldest_first()
            .any(|record| record.event == TelemetryEventKind::IdentityLearned)
    );
    assert_eq!(bench.clock.config().credentials, None);
}

#[test]
fn provisioning_resumes_connection() {
    let mut bench = Bench::new(ClockConfig::default());

    assert_eq!(
        bench.clock.boot(ms(0), &mut bench.link),
        ClockEvent::Connectivity(ConnectivityEvent::ProvisioningRequired)
    );
    assert!(bench.cycle(1_000).events.is_empty());
    assert!(bench.ntp.sent.is_empty());

    let resumed = bench.clock.provisioned(
        ms(21_000),
        NetworkCredentials::new("desk", "hunter22"),
        &mut bench.link,
    );
    assert_eq!(
        resumed,
        ClockEvent::Connectivity(ConnectivityEvent::Connecting { attempt: 0 })
    );
    assert_eq!(bench.link.last_ssid.as_deref(), Some("desk"));
}

#[test]
fn last_error_tracks_failing_engine_until_it_recovers() {
    let mut bench = Bench::with_credentials();
    bench.clock.boot(ms(0), &mut bench.link);
    bench.link.attach("desk");
    bench.cycle(100);
    bench.http.respond(200, FORECAST);
    bench.cycle(200);

    bench.cycle(5_101);
    let error = bench.clock.last_error().expect("time request timed out");
    assert_eq!(error.source, ErrorSource::TimeSync);
    assert_eq!(error.error, ClockError::Timeout);
    assert_eq!(error.to_string(), "NTP timeout");

    assert!(matches!(
        bench.cycle(6_101).events.as_slice(),
        [ClockEvent::TimeSync(TimeSyncEvent::RequestSent { attempt: 1 }), ..]
    ));
    bench.ntp.reply(FRIDAY_MORNING);
    bench.cycle(6_200);
    assert_eq!(bench.clock.last_error(), None);
    assert_eq!(
        bench.clock.utc(ms(7_200)),
        Some(UnixSeconds::new(i64::from(FRIDAY_MORNING) + 1))
    );
}

#[test]
fn summer_offset_reaches_the_screen_clock() {
    let mut bench = Bench::new(ClockConfig {
        credentials: Some(NetworkCredentials::new("desk", "hunter22")),
        time: TimeConfig {
            base_offset_secs: 3_600,
            ..TimeConfig::default()
        },
        ..ClockConfig::default()
    });
    bench.clock.boot(ms(0), &mut bench.link);
    bench.link.attach("desk");
    bench.cycle(100);
    // 2026-07-01T12:00:00Z
    bench.ntp.reply(1_782_907_200);
    bench.cycle(200);

    let snapshot = bench.clock.status(ms(200));
    assert!(snapshot.dst_active);
    assert_eq!(snapshot.offset_secs, 7_200);
    assert_eq!(
        bench.clock.local_time(ms(200)),
        Some(UnixSeconds::new(1_782_907_200 + 7_200))
    );
}
