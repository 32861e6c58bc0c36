//! Error kinds surfaced by the acquisition engines.
//!
//! Engines never propagate these out of `poll`; they record the error, back
//! off and expose its [`Display`](core::fmt::Display) text as the "last error"
//! shown by status reporting.

use core::fmt;

/// Failure raised by a network collaborator or while decoding its payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockError {
    /// Host name lookup failed.
    Resolution,
    /// No reply arrived before the engine deadline.
    Timeout,
    /// A reply arrived but could not be decoded.
    MalformedResponse(MalformedKind),
    /// The remote end answered with a non-success status.
    RemoteRejection(u16),
    /// Connectivity dropped while the operation was in flight.
    LinkLoss,
    /// The transport refused to send the request.
    Transport,
}

/// Describes why a payload could not be decoded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MalformedKind {
    /// Datagram shorter than the fixed packet length.
    ShortPacket,
    /// Transmit timestamp field was zero.
    EmptyTimestamp,
    /// JSON body did not follow the grammar.
    UnexpectedToken,
    /// JSON nesting exceeded the parser limit.
    TooDeep,
    /// Body exceeded the receive buffer.
    Oversized,
    /// A field carried a value of the wrong shape.
    InvalidField,
}

/// Which engine an error belongs to, used to prefix the display text.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorSource {
    Link,
    TimeSync,
    Weather,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MalformedKind::ShortPacket => "short packet",
            MalformedKind::EmptyTimestamp => "empty timestamp",
            MalformedKind::UnexpectedToken => "unexpected token",
            MalformedKind::TooDeep => "nesting too deep",
            MalformedKind::Oversized => "body too large",
            MalformedKind::InvalidField => "invalid field",
        })
    }
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::Resolution => f.write_str("DNS lookup failed"),
            ClockError::Timeout => f.write_str("timeout"),
            ClockError::MalformedResponse(kind) => write!(f, "malformed: {kind}"),
            ClockError::RemoteRejection(code) => write!(f, "status {code}"),
            ClockError::LinkLoss => f.write_str("link lost"),
            ClockError::Transport => f.write_str("send failed"),
        }
    }
}

/// Error tagged with the engine that raised it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SourcedError {
    pub source: ErrorSource,
    pub error: ClockError,
}

impl SourcedError {
    #[must_use]
    pub const fn new(source: ErrorSource, error: ClockError) -> Self {
        Self { source, error }
    }
}

impl fmt::Display for SourcedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.source, self.error) {
            (ErrorSource::TimeSync, ClockError::Timeout) => f.write_str("NTP timeout"),
            (ErrorSource::TimeSync, ClockError::Resolution) => f.write_str("NTP DNS failed"),
            (ErrorSource::TimeSync, other) => write!(f, "NTP {other}"),
            (ErrorSource::Weather, ClockError::RemoteRejection(code)) => {
                write!(f, "Weather API: {code}")
            }
            (ErrorSource::Weather, ClockError::MalformedResponse(kind)) => {
                write!(f, "JSON: {kind}")
            }
            (ErrorSource::Weather, other) => write!(f, "Weather {other}"),
            (ErrorSource::Link, other) => write!(f, "WiFi {other}"),
        }
    }
}
