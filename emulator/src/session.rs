use std::convert::Infallible;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clock_core::config::{ClockConfig, ConfigUpdate, NetworkCredentials};
use clock_core::connectivity::{LinkStatus, NetworkLink};
use clock_core::cycle::{NetworkIo, WeatherClock};
use clock_core::display::framebuffer::{HEIGHT, WIDTH};
use clock_core::display::{BufferedDisplay, Framebuffer, Panel};
use clock_core::error::ClockError;
use clock_core::status::StatusFormatter;
use clock_core::telemetry::EventId;
use clock_core::time::Millis;
use clock_core::time_sync::packet::NTP_UNIX_OFFSET;
use clock_core::time_sync::{DatagramTransport, NTP_PACKET_LEN};
use clock_core::weather::{HttpClient, HttpResponse};

/// Simulated cycle period, matching the firmware ticker.
pub const CYCLE_STEP_MS: u32 = 20;

/// Wall-clock time served by the simulated time server at session start
/// (2026-01-02T07:52:00Z).
pub const SIM_EPOCH: u32 = 1_767_340_320;

const SIM_SSID: &str = "desk-lab";

const FORECAST_BODY: &str = r#"{"latitude":37.19,"longitude":-8.54,"current_weather":{"temperature":16.4,"windspeed":11.2,"winddirection":270,"weathercode":3,"time":"2026-01-02T14:00"},"daily":{"time":["2026-01-02"],"sunrise":["2026-01-02T07:52"],"sunset":["2026-01-02T17:31"]}}"#;

const GARBAGE_BODY: &str = r#"{"current_weather": {"temperature": }"#;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("step", "step <ms>                       - advance simulated time"),
    ("run", "run <secs>                      - advance simulated time in seconds"),
    ("status", "status                          - print every engine's state"),
    ("show", "show                            - draw the last flushed frame"),
    ("link", "link up|down                    - attach or drop the network link"),
    ("ntp", "ntp ok|drop                     - answer or drop time requests"),
    (
        "weather",
        "weather ok|fail <code>|garbage  - choose the forecast service reply",
    ),
    ("sync", "sync                            - request a time sync now"),
    ("refresh", "refresh                         - request a weather refresh now"),
    ("help", "help [topic]                    - show help for a command"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    /// Radio remembers a network; every service answers.
    Online,
    /// Configured network never comes up.
    Offline,
    /// Link is up but time requests drop and the forecast service fails.
    Flaky,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Online => "transcripts/emulator-online.log",
            TranscriptProfile::Offline => "transcripts/emulator-offline.log",
            TranscriptProfile::Flaky => "transcripts/emulator-flaky.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Online => "Weather clock emulator online transcript",
            TranscriptProfile::Offline => "Weather clock emulator offline transcript",
            TranscriptProfile::Flaky => "Weather clock emulator flaky-network transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("online") {
            Ok(Self::Online)
        } else if tag.eq_ignore_ascii_case("offline") {
            Ok(Self::Offline)
        } else if tag.eq_ignore_ascii_case("flaky") {
            Ok(Self::Flaky)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }

    fn config(self) -> ClockConfig {
        match self {
            TranscriptProfile::Online | TranscriptProfile::Flaky => ClockConfig::default(),
            TranscriptProfile::Offline => ClockConfig {
                credentials: Some(NetworkCredentials::new(SIM_SSID, "correct horse")),
                ..ClockConfig::default()
            },
        }
    }

    fn link(self) -> SimLink {
        match self {
            TranscriptProfile::Online | TranscriptProfile::Flaky => SimLink::new(true, true),
            TranscriptProfile::Offline => SimLink::new(false, false),
        }
    }

    fn time_server(self) -> SimTimeServer {
        match self {
            TranscriptProfile::Online | TranscriptProfile::Offline => {
                SimTimeServer::new(NtpMode::Answer)
            }
            TranscriptProfile::Flaky => SimTimeServer::new(NtpMode::Drop),
        }
    }

    fn forecast(self) -> SimForecast {
        match self {
            TranscriptProfile::Online | TranscriptProfile::Offline => {
                SimForecast::new(WeatherMode::Ok)
            }
            TranscriptProfile::Flaky => SimForecast::new(WeatherMode::Fail(503)),
        }
    }
}

pub struct Session {
    clock: WeatherClock<BufferedDisplay<SimPanel>>,
    link: SimLink,
    time_server: SimTimeServer,
    forecast: SimForecast,
    now: Millis,
    last_seen: Option<EventId>,
    transcript: TranscriptLogger,
    command_count: usize,
}

impl Session {
    /// Starts a session that writes its transcript to the profile log.
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(profile)?;
        Self::with_transcript(profile, transcript)
    }

    /// Starts a session whose transcript is discarded.
    #[cfg(test)]
    pub fn detached(profile: TranscriptProfile) -> io::Result<Self> {
        Self::with_transcript(profile, TranscriptLogger::sink())
    }

    fn with_transcript(profile: TranscriptProfile, transcript: TranscriptLogger) -> io::Result<Self> {
        let display = BufferedDisplay::new(SimPanel::default());
        let clock = WeatherClock::new(profile.config(), display)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

        let mut session = Self {
            clock,
            link: profile.link(),
            time_server: profile.time_server(),
            forecast: profile.forecast(),
            now: Millis::ZERO,
            last_seen: None,
            transcript,
            command_count: 0,
        };

        session.clock.boot(session.now, &mut session.link);
        let lines = session.drain_telemetry();
        session.record_output(&lines)?;
        Ok(session)
    }

    pub const fn now(&self) -> Millis {
        self.now
    }

    pub const fn command_count(&self) -> usize {
        self.command_count
    }

    #[cfg(test)]
    pub fn clock(&self) -> &WeatherClock<BufferedDisplay<SimPanel>> {
        &self.clock
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        self.command_count += 1;
        self.transcript
            .append_line(self.now, TranscriptRole::Host, trimmed)?;

        let mut words = trimmed.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let lines = match (verb.as_str(), args.as_slice()) {
            ("help", []) => help_lines(None),
            ("help", [topic]) => help_lines(Some(*topic)),
            ("step", [ms]) => match ms.parse::<u32>() {
                Ok(ms) => self.advance(ms),
                Err(_) => vec![format!("ERR syntax expected milliseconds, got `{ms}`")],
            },
            ("run", [secs]) => match secs.parse::<u32>().ok().and_then(|s| s.checked_mul(1_000)) {
                Some(ms) => self.advance(ms),
                None => vec![format!("ERR syntax expected seconds, got `{secs}`")],
            },
            ("status", []) => self.status_lines(),
            ("show", []) => self.frame_lines(),
            ("link", [state]) => self.set_link(state),
            ("ntp", [mode]) => self.set_ntp(mode),
            ("weather", ["ok"]) => self.set_weather(WeatherMode::Ok),
            ("weather", ["garbage"]) => self.set_weather(WeatherMode::Garbage),
            ("weather", ["fail", code]) => match code.parse::<u16>() {
                Ok(code) => self.set_weather(WeatherMode::Fail(code)),
                Err(_) => vec![format!("ERR syntax expected status code, got `{code}`")],
            },
            ("sync", []) => {
                self.clock.trigger_time_sync();
                vec!["OK time sync requested".to_string()]
            }
            ("refresh", []) => {
                self.clock.request_weather_refresh();
                vec!["OK weather refresh requested".to_string()]
            }
            _ => vec![format!("ERR unknown command `{trimmed}` (type `help`)")],
        };

        self.record_output(&lines)?;
        Ok(lines)
    }

    /// Runs cycles every [`CYCLE_STEP_MS`] until `ms` of simulated time passed.
    fn advance(&mut self, ms: u32) -> Vec<String> {
        let mut lines = Vec::new();
        let target = self.now.wrapping_add_millis(ms);

        while !self.now.has_reached(target) {
            let step = CYCLE_STEP_MS.min(target.elapsed_since(self.now));
            self.now = self.now.wrapping_add_millis(step);
            self.time_server.sync_with(self.now, self.link.up);
            self.forecast.reachable = self.link.up;

            let mut io = NetworkIo::new(&mut self.link, &mut self.time_server, &mut self.forecast);
            let outcome = self.clock.poll_cycle(self.now, &mut io);
            if let Some(ConfigUpdate::NetworkIdentity(ssid)) = outcome.config_update {
                lines.push(format!("config: store network identity `{ssid}`"));
            }
            lines.extend(self.drain_telemetry());
        }

        lines.push(format!("OK t={}ms", self.now.as_millis()));
        lines
    }

    fn drain_telemetry(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        for record in self.clock.telemetry().since(self.last_seen) {
            lines.push(record.to_string());
            self.last_seen = Some(record.id);
        }
        lines
    }

    fn status_lines(&self) -> Vec<String> {
        let snapshot = self.clock.status(self.now);
        let mut text = String::new();
        if StatusFormatter::new(&snapshot).write_all(&mut text).is_err() {
            return vec!["ERR status formatting failed".to_string()];
        }
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        if let Some(error) = snapshot.last_error {
            lines.push(format!("last error: {error}"));
        }
        lines
    }

    fn frame_lines(&self) -> Vec<String> {
        let panel = self.clock.display().driver().panel();
        match &panel.last {
            Some(frame) => {
                let mut lines = vec![format!("frame #{}", panel.frames)];
                lines.extend(render_frame(frame));
                lines
            }
            None => vec!["no frame flushed yet".to_string()],
        }
    }

    fn set_link(&mut self, state: &str) -> Vec<String> {
        match state {
            "up" => self.link.up = true,
            "down" => self.link.up = false,
            other => return vec![format!("ERR syntax expected up|down, got `{other}`")],
        }
        vec![format!("OK link {state}")]
    }

    fn set_ntp(&mut self, mode: &str) -> Vec<String> {
        self.time_server.mode = match mode {
            "ok" => NtpMode::Answer,
            "drop" => NtpMode::Drop,
            other => return vec![format!("ERR syntax expected ok|drop, got `{other}`")],
        };
        vec![format!("OK ntp {mode}")]
    }

    fn set_weather(&mut self, mode: WeatherMode) -> Vec<String> {
        self.forecast.mode = mode;
        let label = match mode {
            WeatherMode::Ok => "ok".to_string(),
            WeatherMode::Fail(code) => format!("fail {code}"),
            WeatherMode::Garbage => "garbage".to_string(),
        };
        vec![format!("OK weather {label}")]
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(self.now, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

/// Draws a frame two pixel rows per character cell.
pub fn render_frame(frame: &Framebuffer) -> Vec<String> {
    let border = format!("+{}+", "-".repeat(WIDTH));
    let mut lines = Vec::with_capacity(HEIGHT / 2 + 2);
    lines.push(border.clone());
    for y in (0..HEIGHT).step_by(2) {
        let mut row = String::with_capacity(WIDTH + 2);
        row.push('|');
        for x in 0..WIDTH {
            row.push(match (frame.pixel(x, y), frame.pixel(x, y + 1)) {
                (false, false) => ' ',
                (true, false) => '\u{2580}',
                (false, true) => '\u{2584}',
                (true, true) => '\u{2588}',
            });
        }
        row.push('|');
        lines.push(row);
    }
    lines.push(border);
    lines
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Panel that keeps the last flushed frame.
#[derive(Default)]
pub struct SimPanel {
    pub frames: u32,
    pub last: Option<Framebuffer>,
}

impl Panel for SimPanel {
    type Error = Infallible;

    fn write_frame(&mut self, frame: &Framebuffer) -> Result<(), Self::Error> {
        self.frames += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}

/// Radio that attaches once an attempt was started while the link is up.
struct SimLink {
    up: bool,
    stored_identity: bool,
    begun: bool,
}

impl SimLink {
    const fn new(up: bool, stored_identity: bool) -> Self {
        Self {
            up,
            stored_identity,
            begun: false,
        }
    }
}

impl NetworkLink for SimLink {
    fn begin(&mut self, _credentials: Option<&NetworkCredentials>) -> Result<(), ClockError> {
        self.begun = true;
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        if self.up && self.begun {
            LinkStatus::Attached
        } else {
            LinkStatus::Detached
        }
    }

    fn attached_ssid(&self) -> Option<&str> {
        (self.status() == LinkStatus::Attached).then_some(SIM_SSID)
    }

    fn has_stored_identity(&self) -> bool {
        self.stored_identity
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum NtpMode {
    Answer,
    Drop,
}

/// Time server answering with [`SIM_EPOCH`] plus simulated uptime.
struct SimTimeServer {
    mode: NtpMode,
    reachable: bool,
    now: Millis,
    pending: Option<[u8; NTP_PACKET_LEN]>,
}

impl SimTimeServer {
    const fn new(mode: NtpMode) -> Self {
        Self {
            mode,
            reachable: true,
            now: Millis::ZERO,
            pending: None,
        }
    }

    fn sync_with(&mut self, now: Millis, reachable: bool) {
        self.now = now;
        self.reachable = reachable;
    }

    fn reply(&self) -> [u8; NTP_PACKET_LEN] {
        let seconds = SIM_EPOCH
            .wrapping_add(self.now.as_millis() / 1_000)
            .wrapping_add(NTP_UNIX_OFFSET);
        let mut packet = [0_u8; NTP_PACKET_LEN];
        packet[0] = 0x24;
        packet[40..44].copy_from_slice(&seconds.to_be_bytes());
        packet
    }
}

impl DatagramTransport for SimTimeServer {
    fn send_to(&mut self, _host: &str, _port: u16, _payload: &[u8]) -> Result<(), ClockError> {
        if !self.reachable {
            return Err(ClockError::LinkLoss);
        }
        if self.mode == NtpMode::Answer {
            self.pending = Some(self.reply());
        }
        Ok(())
    }

    fn try_receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ClockError> {
        let Some(packet) = self.pending.take() else {
            return Ok(None);
        };
        let len = packet.len().min(buf.len());
        buf[..len].copy_from_slice(&packet[..len]);
        Ok(Some(len))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum WeatherMode {
    Ok,
    Fail(u16),
    Garbage,
}

/// Forecast service whose reply is chosen by [`WeatherMode`].
struct SimForecast {
    mode: WeatherMode,
    reachable: bool,
    pending: Option<(u16, &'static str)>,
}

impl SimForecast {
    const fn new(mode: WeatherMode) -> Self {
        Self {
            mode,
            reachable: true,
            pending: None,
        }
    }
}

impl HttpClient for SimForecast {
    fn begin_get(&mut self, _url: &str) -> Result<(), ClockError> {
        if !self.reachable {
            return Err(ClockError::LinkLoss);
        }
        self.pending = Some(match self.mode {
            WeatherMode::Ok => (200, FORECAST_BODY),
            WeatherMode::Fail(code) => (code, ""),
            WeatherMode::Garbage => (200, GARBAGE_BODY),
        });
        Ok(())
    }

    fn poll_response(&mut self, body: &mut [u8]) -> Result<Option<HttpResponse>, ClockError> {
        let Some((status, payload)) = self.pending.take() else {
            return Ok(None);
        };
        let bytes = payload.as_bytes();
        let len = bytes.len().min(body.len());
        body[..len].copy_from_slice(&bytes[..len]);
        Ok(Some(HttpResponse {
            status,
            len,
            truncated: bytes.len() > body.len(),
        }))
    }
}

struct TranscriptLogger {
    writer: Box<dyn Write>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: Box::new(BufWriter::new(file)),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    #[cfg(test)]
    fn sink() -> Self {
        Self {
            writer: Box::new(io::sink()),
        }
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(self.writer, "# Timestamps are simulated milliseconds since boot")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, now: Millis, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>8} ms] {} {}",
            now.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
