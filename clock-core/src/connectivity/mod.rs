//! Network attachment state machine.
//!
//! The manager never blocks on the radio. Each association attempt gets a
//! fixed [`CONNECT_TIMEOUT`]; a timed-out attempt moves to
//! [`ConnectivityState::Failed`] and waits on an unbounded backoff before the
//! next one. Only [`ConnectivityState::Connected`] counts as online for the
//! other engines.

use core::fmt;
use core::time::Duration;

use heapless::String;

use crate::backoff::BackoffPolicy;
use crate::config::{NetworkCredentials, SSID_CAPACITY};
use crate::error::ClockError;
use crate::text::copy_truncated;
use crate::time::{Millis, duration_to_millis};

/// Time allowed for one association attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Link-layer attachment reported by the radio.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkStatus {
    Attached,
    Detached,
}

/// Radio collaborator driven by the connectivity manager.
pub trait NetworkLink {
    /// Starts an association attempt without waiting for it to finish.
    ///
    /// `None` asks the radio to use the credentials it retained itself.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Transport`] when the radio refuses the request.
    fn begin(&mut self, credentials: Option<&NetworkCredentials>) -> Result<(), ClockError>;

    /// Current attachment status.
    fn status(&self) -> LinkStatus;

    /// Network name of the current attachment, when attached.
    fn attached_ssid(&self) -> Option<&str>;

    /// Returns `true` when the radio retained credentials from an earlier session.
    fn has_stored_identity(&self) -> bool;
}

/// Connectivity lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectivityState {
    Idle,
    Connecting,
    Connected,
    Failed,
    ManualProvisioning,
}

impl ConnectivityState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ConnectivityState::Idle => "idle",
            ConnectivityState::Connecting => "connecting",
            ConnectivityState::Connected => "connected",
            ConnectivityState::Failed => "failed",
            ConnectivityState::ManualProvisioning => "provisioning",
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// State change reported by [`ConnectivityManager::poll`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConnectivityEvent {
    /// A new association attempt started.
    Connecting { attempt: u8 },
    /// The link attached. `learned_identity` names a network the configuration
    /// did not know, so it can be persisted.
    Connected {
        learned_identity: Option<String<SSID_CAPACITY>>,
    },
    /// An attempt failed; the next one is due after `retry_in`.
    AttemptFailed {
        error: ClockError,
        retry_in: Duration,
        attempt: u8,
    },
    /// An established link dropped.
    LinkLost,
    /// No credentials exist anywhere; provisioning must run first.
    ProvisioningRequired,
}

/// Owns the connectivity state and its retry schedule.
#[derive(Clone, Debug)]
pub struct ConnectivityManager {
    state: ConnectivityState,
    attempt_start: Millis,
    backoff: BackoffPolicy,
    credentials: Option<NetworkCredentials>,
    identity_known: bool,
}

impl ConnectivityManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ConnectivityState::Idle,
            attempt_start: Millis::ZERO,
            backoff: BackoffPolicy::connectivity(),
            credentials: None,
            identity_known: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Returns `true` while the link is attached.
    #[must_use]
    pub const fn online(&self) -> bool {
        matches!(self.state, ConnectivityState::Connected)
    }

    #[must_use]
    pub const fn attempt_start(&self) -> Millis {
        self.attempt_start
    }

    #[must_use]
    pub const fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Time until the next association attempt, while failed.
    #[must_use]
    pub fn next_retry_in(&self, now: Millis) -> Option<Duration> {
        match self.state {
            ConnectivityState::Failed => self.backoff.remaining(now),
            _ => None,
        }
    }

    /// Begins connecting with `credentials`, falling back to the radio's own.
    ///
    /// Without either, the manager parks in
    /// [`ConnectivityState::ManualProvisioning`] until
    /// [`provisioned`](Self::provisioned) is called.
    pub fn start_connect<L: NetworkLink>(
        &mut self,
        now: Millis,
        credentials: Option<&NetworkCredentials>,
        link: &mut L,
    ) -> ConnectivityEvent {
        self.credentials = credentials.cloned();
        self.identity_known = credentials.is_some();
        self.backoff.reset();

        if credentials.is_none() && !link.has_stored_identity() {
            self.state = ConnectivityState::ManualProvisioning;
            return ConnectivityEvent::ProvisioningRequired;
        }

        self.begin_attempt(now, link)
    }

    /// Resumes after the provisioning collaborator obtained credentials.
    pub fn provisioned<L: NetworkLink>(
        &mut self,
        now: Millis,
        credentials: NetworkCredentials,
        link: &mut L,
    ) -> ConnectivityEvent {
        self.credentials = Some(credentials);
        self.identity_known = false;
        self.backoff.reset();
        self.begin_attempt(now, link)
    }

    /// Advances the state machine; never blocks.
    pub fn poll<L: NetworkLink>(&mut self, now: Millis, link: &mut L) -> Option<ConnectivityEvent> {
        match self.state {
            ConnectivityState::Idle | ConnectivityState::ManualProvisioning => None,
            ConnectivityState::Connecting | ConnectivityState::Failed
                if link.status() == LinkStatus::Attached =>
            {
                Some(self.attached(link))
            }
            ConnectivityState::Connecting => {
                if now.elapsed_since(self.attempt_start) >= duration_to_millis(CONNECT_TIMEOUT) {
                    Some(self.fail(now, ClockError::Timeout))
                } else {
                    None
                }
            }
            ConnectivityState::Failed => {
                if self.backoff.take_due(now) {
                    Some(self.begin_attempt(now, link))
                } else {
                    None
                }
            }
            ConnectivityState::Connected => {
                if link.status() == LinkStatus::Detached {
                    self.state = ConnectivityState::Connecting;
                    self.attempt_start = now;
                    if let Err(error) = link.begin(self.credentials.as_ref()) {
                        return Some(self.fail(now, error));
                    }
                    Some(ConnectivityEvent::LinkLost)
                } else {
                    None
                }
            }
        }
    }

    fn begin_attempt<L: NetworkLink>(&mut self, now: Millis, link: &mut L) -> ConnectivityEvent {
        self.attempt_start = now;
        match link.begin(self.credentials.as_ref()) {
            Ok(()) => {
                self.state = ConnectivityState::Connecting;
                ConnectivityEvent::Connecting {
                    attempt: self.backoff.attempt(),
                }
            }
            Err(error) => self.fail(now, error),
        }
    }

    fn attached<L: NetworkLink>(&mut self, link: &L) -> ConnectivityEvent {
        self.state = ConnectivityState::Connected;
        self.backoff.reset();

        let learned_identity = if self.identity_known {
            None
        } else {
            link.attached_ssid()
                .filter(|ssid| !ssid.is_empty())
                .map(copy_truncated::<SSID_CAPACITY>)
        };
        if learned_identity.is_some() {
            self.identity_known = true;
        }

        ConnectivityEvent::Connected { learned_identity }
    }

    fn fail(&mut self, now: Millis, error: ClockError) -> ConnectivityEvent {
        self.state = ConnectivityState::Failed;
        let retry_in = self.backoff.schedule_retry(now).unwrap_or_default();
        ConnectivityEvent::AttemptFailed {
            error,
            retry_in,
            attempt: self.backoff.attempt(),
        }
    }
}

impl Default for ConnectivityManager {
    fn default() -> Self {
        Self::new()
    }
}
