//! Telemetry event catalog and the fixed-capacity history shared by the
//! firmware and the host emulator.
//!
//! Every engine event the cycle observes lands here as a
//! [`TelemetryRecord`]. Records carry a monotonically increasing id so a
//! consumer can mirror only the entries it has not seen yet.

use core::fmt;

use heapless::HistoryBuf;

use crate::display::DisplayMode;
use crate::error::ClockError;
use crate::time::Millis;
use crate::time_sync::UnixSeconds;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

pub type EventId = u32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TelemetryEventKind {
    LinkConnecting { attempt: u8 },
    LinkAttached,
    LinkAttemptFailed { error: ClockError, retry_in_secs: u32 },
    LinkLost,
    ProvisioningRequired,
    IdentityLearned,
    TimeRequestSent { attempt: u8 },
    TimeSynced { epoch: UnixSeconds },
    TimeSyncFailed { error: ClockError, exhausted: bool },
    WeatherRequested { attempt: u8 },
    WeatherUpdated { temperature: f32, sun_refreshed: bool },
    WeatherFailed { error: ClockError, exhausted: bool },
    TransitionStarted { from: DisplayMode, to: DisplayMode },
    TransitionFinished { mode: DisplayMode },
    RotationFallback,
}

impl TelemetryEventKind {
    /// Compact discriminant for status registers and wire transports.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            TelemetryEventKind::LinkConnecting { .. } => 0x0001,
            TelemetryEventKind::LinkAttached => 0x0002,
            TelemetryEventKind::LinkAttemptFailed { .. } => 0x0003,
            TelemetryEventKind::LinkLost => 0x0004,
            TelemetryEventKind::ProvisioningRequired => 0x0005,
            TelemetryEventKind::IdentityLearned => 0x0006,
            TelemetryEventKind::TimeRequestSent { .. } => 0x0010,
            TelemetryEventKind::TimeSynced { .. } => 0x0011,
            TelemetryEventKind::TimeSyncFailed { .. } => 0x0012,
            TelemetryEventKind::WeatherRequested { .. } => 0x0020,
            TelemetryEventKind::WeatherUpdated { .. } => 0x0021,
            TelemetryEventKind::WeatherFailed { .. } => 0x0022,
            TelemetryEventKind::TransitionStarted { .. } => 0x0030,
            TelemetryEventKind::TransitionFinished { .. } => 0x0031,
            TelemetryEventKind::RotationFallback => 0x0032,
        }
    }

    /// Returns `true` for events that indicate something went wrong.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            TelemetryEventKind::LinkAttemptFailed { .. }
                | TelemetryEventKind::LinkLost
                | TelemetryEventKind::ProvisioningRequired
                | TelemetryEventKind::TimeSyncFailed { .. }
                | TelemetryEventKind::WeatherFailed { .. }
                | TelemetryEventKind::RotationFallback
        )
    }
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::LinkConnecting { attempt } => {
                write!(f, "link-connecting attempt={attempt}")
            }
            TelemetryEventKind::LinkAttached => f.write_str("link-attached"),
            TelemetryEventKind::LinkAttemptFailed {
                error,
                retry_in_secs,
            } => write!(f, "link-failed error=\"{error}\" retry-in={retry_in_secs}s"),
            TelemetryEventKind::LinkLost => f.write_str("link-lost"),
            TelemetryEventKind::ProvisioningRequired => f.write_str("provisioning-required"),
            TelemetryEventKind::IdentityLearned => f.write_str("identity-learned"),
            TelemetryEventKind::TimeRequestSent { attempt } => {
                write!(f, "time-request attempt={attempt}")
            }
            TelemetryEventKind::TimeSynced { epoch } => write!(f, "time-synced epoch={epoch}"),
            TelemetryEventKind::TimeSyncFailed { error, exhausted } => {
                write!(f, "time-failed error=\"{error}\" exhausted={exhausted}")
            }
            TelemetryEventKind::WeatherRequested { attempt } => {
                write!(f, "weather-request attempt={attempt}")
            }
            TelemetryEventKind::WeatherUpdated {
                temperature,
                sun_refreshed,
            } => write!(
                f,
                "weather-updated temp={temperature:.1} sun-refreshed={sun_refreshed}"
            ),
            TelemetryEventKind::WeatherFailed { error, exhausted } => {
                write!(f, "weather-failed error=\"{error}\" exhausted={exhausted}")
            }
            TelemetryEventKind::TransitionStarted { from, to } => {
                write!(f, "transition-started from={from} to={to}")
            }
            TelemetryEventKind::TransitionFinished { mode } => {
                write!(f, "transition-finished mode={mode}")
            }
            TelemetryEventKind::RotationFallback => f.write_str("rotation-fallback"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Millis,
    pub event: TelemetryEventKind,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} t={}ms {}",
            self.id,
            self.timestamp.as_millis(),
            self.event
        )
    }
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: TelemetryRing<CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Records `event` and returns its id.
    pub fn record(&mut self, event: TelemetryEventKind, timestamp: Millis) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
        });
        id
    }

    /// Iterates the retained records in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.ring.oldest_ordered()
    }

    /// Records written after `last_seen`, oldest first. `None` yields everything.
    pub fn since(&self, last_seen: Option<EventId>) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.ring.oldest_ordered().filter(move |record| {
            last_seen.is_none_or(|seen| record.id.wrapping_sub(seen).wrapping_sub(1) < EventId::MAX / 2)
        })
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Id the next record will receive.
    #[must_use]
    pub const fn next_id(&self) -> EventId {
        self.next_event_id
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
