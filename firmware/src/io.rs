#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Network collaborators for a board without a radio.
//!
//! The link reports a remembered network that is never in range, so the
//! connectivity engine keeps retrying on its capped backoff while the time
//! and weather engines stay idle and the display shows its offline screens.

use clock_core::config::NetworkCredentials;
use clock_core::connectivity::{LinkStatus, NetworkLink};
use clock_core::error::ClockError;
use clock_core::time_sync::DatagramTransport;
use clock_core::weather::{HttpClient, HttpResponse};

/// Link with a remembered network that accepts association requests and
/// never attaches.
#[derive(Debug, Default)]
pub struct OfflineLink {
    begins: u32,
}

impl OfflineLink {
    pub const fn new() -> Self {
        Self { begins: 0 }
    }

    /// Number of association attempts requested so far.
    pub const fn begins(&self) -> u32 {
        self.begins
    }
}

impl NetworkLink for OfflineLink {
    fn begin(&mut self, _credentials: Option<&NetworkCredentials>) -> Result<(), ClockError> {
        self.begins = self.begins.saturating_add(1);
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        LinkStatus::Detached
    }

    fn attached_ssid(&self) -> Option<&str> {
        None
    }

    fn has_stored_identity(&self) -> bool {
        true
    }
}

/// Datagram socket without a network behind it.
#[derive(Debug, Default)]
pub struct OfflineDatagrams;

impl DatagramTransport for OfflineDatagrams {
    fn send_to(&mut self, _host: &str, _port: u16, _payload: &[u8]) -> Result<(), ClockError> {
        Err(ClockError::LinkLoss)
    }

    fn try_receive(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, ClockError> {
        Ok(None)
    }
}

/// HTTP client without a network behind it.
#[derive(Debug, Default)]
pub struct OfflineHttp;

impl HttpClient for OfflineHttp {
    fn begin_get(&mut self, _url: &str) -> Result<(), ClockError> {
        Err(ClockError::LinkLoss)
    }

    fn poll_response(&mut self, _body: &mut [u8]) -> Result<Option<HttpResponse>, ClockError> {
        Ok(None)
    }
}
