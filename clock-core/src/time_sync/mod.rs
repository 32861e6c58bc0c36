//! Network time acquisition.
//!
//! One request is in flight at most. A request times out after
//! [`REQUEST_TIMEOUT`]; failures back off through a bounded
//! [`BackoffPolicy`], and an exhausted policy parks the engine in
//! [`TimeSyncState::Failed`] until the next periodic cycle or an explicit
//! [`trigger`](TimeSyncEngine::trigger).

pub mod clock;
pub mod dst;
pub mod packet;

use core::fmt;
use core::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::config::TimeConfig;
use crate::error::ClockError;
use crate::time::{Millis, duration_to_millis};

pub use clock::{CivilTime, SyncedClock, UnixSeconds};
pub use dst::ZoneRule;
pub use packet::{NTP_PACKET_LEN, NTP_PORT, build_request, decode_transmit_time};

/// Time allowed for a reply before the request is abandoned.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on stale datagrams discarded before a new request.
pub const MAX_STALE_DRAIN: usize = 4;

/// Datagram collaborator used for time requests.
pub trait DatagramTransport {
    /// Sends `payload` to `host:port` without waiting for a reply.
    ///
    /// # Errors
    ///
    /// [`ClockError::Resolution`] when `host` cannot be resolved,
    /// [`ClockError::Transport`] when the datagram cannot be queued.
    fn send_to(&mut self, host: &str, port: u16, payload: &[u8]) -> Result<(), ClockError>;

    /// Copies one pending datagram into `buf`, returning its length.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the socket failed.
    fn try_receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ClockError>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimeSyncState {
    Idle,
    RequestSent,
    Success,
    Failed,
}

impl TimeSyncState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TimeSyncState::Idle => "idle",
            TimeSyncState::RequestSent => "request-sent",
            TimeSyncState::Success => "success",
            TimeSyncState::Failed => "failed",
        }
    }
}

impl fmt::Display for TimeSyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress reported by [`TimeSyncEngine::poll`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimeSyncEvent {
    /// A request left; `attempt` is the retry index within the cycle.
    RequestSent { attempt: u8 },
    /// A reply anchored the clock.
    Synced { epoch: UnixSeconds },
    /// The request failed. `retry_in` is `None` once retries are exhausted.
    Failed {
        error: ClockError,
        retry_in: Option<Duration>,
    },
}

/// Owns the time-sync state, the synced clock and their counters.
#[derive(Clone, Debug)]
pub struct TimeSyncEngine {
    state: TimeSyncState,
    clock: SyncedClock,
    backoff: BackoffPolicy,
    sent_at: Millis,
    cycle_started: Option<Millis>,
    trigger_pending: bool,
    attempts: u32,
    successes: u32,
    last_error: Option<ClockError>,
}

impl TimeSyncEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TimeSyncState::Idle,
            clock: SyncedClock::unsynced(),
            backoff: BackoffPolicy::request(),
            sent_at: Millis::ZERO,
            cycle_started: None,
            trigger_pending: false,
            attempts: 0,
            successes: 0,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> TimeSyncState {
        self.state
    }

    #[must_use]
    pub const fn clock(&self) -> &SyncedClock {
        &self.clock
    }

    #[must_use]
    pub const fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Requests sent since boot.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Replies accepted since boot.
    #[must_use]
    pub const fn successes(&self) -> u32 {
        self.successes
    }

    /// Most recent failure, cleared by a successful sync.
    #[must_use]
    pub const fn last_error(&self) -> Option<ClockError> {
        self.last_error
    }

    /// Extrapolated UTC time, once synchronised.
    #[must_use]
    pub fn current_epoch(&self, now: Millis) -> Option<UnixSeconds> {
        self.clock.current_epoch(now)
    }

    /// Starts a fresh cycle at the next online poll. Ignored while a request
    /// is outstanding.
    pub fn trigger(&mut self) {
        if self.state != TimeSyncState::RequestSent {
            self.trigger_pending = true;
        }
    }

    /// Advances the engine by at most one request or reply.
    pub fn poll<T: DatagramTransport>(
        &mut self,
        now: Millis,
        online: bool,
        config: &TimeConfig,
        transport: &mut T,
    ) -> Option<TimeSyncEvent> {
        self.clock.rebase(now);

        if self.state == TimeSyncState::Success {
            self.state = TimeSyncState::Idle;
        }

        if self.state == TimeSyncState::RequestSent {
            return self.poll_reply(now, online, transport);
        }

        let periodic = self
            .cycle_started
            .is_none_or(|start| {
                now.elapsed_since(start) >= duration_to_millis(config.sync_interval)
            });
        let fresh_cycle = periodic || self.trigger_pending;

        if !online {
            return None;
        }

        if fresh_cycle {
            self.trigger_pending = false;
            self.cycle_started = Some(now);
            self.backoff.reset();
            self.state = TimeSyncState::Idle;
            return Some(self.send_request(now, config, transport));
        }

        if self.state == TimeSyncState::Idle && self.backoff.take_due(now) {
            return Some(self.send_request(now, config, transport));
        }

        None
    }

    fn poll_reply<T: DatagramTransport>(
        &mut self,
        now: Millis,
        online: bool,
        transport: &mut T,
    ) -> Option<TimeSyncEvent> {
        if now.elapsed_since(self.sent_at) > duration_to_millis(REQUEST_TIMEOUT) {
            return Some(self.fail(now, ClockError::Timeout));
        }
        if !online {
            return Some(self.fail(now, ClockError::LinkLoss));
        }

        let mut buf = [0_u8; NTP_PACKET_LEN];
        match transport.try_receive(&mut buf) {
            Ok(None) => None,
            Ok(Some(len)) => {
                let received = buf.get(..len).unwrap_or(&buf);
                match decode_transmit_time(received) {
                    Ok(epoch) => {
                        self.clock.set(epoch, now);
                        self.backoff.reset();
                        self.successes = self.successes.saturating_add(1);
                        self.last_error = None;
                        self.state = TimeSyncState::Success;
                        Some(TimeSyncEvent::Synced { epoch })
                    }
                    Err(error) => Some(self.fail(now, error.into())),
                }
            }
            Err(error) => Some(self.fail(now, error)),
        }
    }

    fn send_request<T: DatagramTransport>(
        &mut self,
        now: Millis,
        config: &TimeConfig,
        transport: &mut T,
    ) -> TimeSyncEvent {
        let mut stale = [0_u8; NTP_PACKET_LEN];
        for _ in 0..MAX_STALE_DRAIN {
            if !matches!(transport.try_receive(&mut stale), Ok(Some(_))) {
                break;
            }
        }

        self.attempts = self.attempts.saturating_add(1);
        let attempt = self.backoff.attempt();
        match transport.send_to(config.server.as_str(), NTP_PORT, &build_request()) {
            Ok(()) => {
                self.state = TimeSyncState::RequestSent;
                self.sent_at = now;
                TimeSyncEvent::RequestSent { attempt }
            }
            Err(error) => self.fail(now, error),
        }
    }

    fn fail(&mut self, now: Millis, error: ClockError) -> TimeSyncEvent {
        self.last_error = Some(error);
        let retry_in = self.backoff.schedule_retry(now);
        self.state = if retry_in.is_some() {
            TimeSyncState::Idle
        } else {
            TimeSyncState::Failed
        };
        TimeSyncEvent::Failed { error, retry_in }
    }
}

impl Default for TimeSyncEngine {
    fn default() -> Self {
        Self::new()
    }
}
