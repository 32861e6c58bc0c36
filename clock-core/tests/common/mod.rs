#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;

use clock_core::config::NetworkCredentials;
use clock_core::connectivity::{LinkStatus, NetworkLink};
use clock_core::display::{BufferedDisplay, Framebuffer, Panel};
use clock_core::error::ClockError;
use clock_core::time::Millis;
use clock_core::time_sync::{DatagramTransport, NTP_PACKET_LEN};
use clock_core::weather::{HttpClient, HttpResponse};

pub const NTP_UNIX_OFFSET: u32 = 2_208_988_800;

/// 2026-01-02T07:52:00Z
pub const FRIDAY_MORNING: u32 = 1_767_340_320;

pub const FORECAST: &str = r#"{
    "latitude": 37.19,
    "longitude": -8.54,
    "current_weather": {"temperature": 16.4, "windspeed": 11.2, "winddirection": 270, "weathercode": 3, "time": "2026-01-02T14:00"},
    "daily": {"time": ["2026-01-02"], "sunrise": ["2026-01-02T07:52"], "sunset": ["2026-01-02T17:31"]}
}"#;

pub const fn ms(value: u32) -> Millis {
    Millis::from_millis(value)
}

pub fn ntp_reply(unix_seconds: u32) -> Vec<u8> {
    let mut packet = vec![0_u8; NTP_PACKET_LEN];
    packet[0] = 0x24;
    packet[40..44].copy_from_slice(&unix_seconds.wrapping_add(NTP_UNIX_OFFSET).to_be_bytes());
    packet
}

pub struct ScriptedLink {
    pub status: LinkStatus,
    pub stored_identity: bool,
    pub ssid: Option<&'static str>,
    pub begins: usize,
    pub last_ssid: Option<String>,
}

impl ScriptedLink {
    pub fn detached() -> Self {
        Self {
            status: LinkStatus::Detached,
            stored_identity: false,
            ssid: None,
            begins: 0,
            last_ssid: None,
        }
    }

    pub fn attach(&mut self, ssid: &'static str) {
        self.status = LinkStatus::Attached;
        self.ssid = Some(ssid);
    }

    pub fn detach(&mut self) {
        self.status = LinkStatus::Detached;
        self.ssid = None;
    }
}

impl NetworkLink for ScriptedLink {
    fn begin(&mut self, credentials: Option<&NetworkCredentials>) -> Result<(), ClockError> {
        self.begins += 1;
        self.last_ssid = credentials.map(|creds| creds.ssid.as_str().to_owned());
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        self.status
    }

    fn attached_ssid(&self) -> Option<&str> {
        self.ssid
    }

    fn has_stored_identity(&self) -> bool {
        self.stored_identity
    }
}

#[derive(Default)]
pub struct ScriptedNtp {
    pub sent: Vec<(String, u16)>,
    pub inbox: VecDeque<Result<Vec<u8>, ClockError>>,
    pub send_error: Option<ClockError>,
}

impl ScriptedNtp {
    pub fn reply(&mut self, unix_seconds: u32) {
        self.inbox.push_back(Ok(ntp_reply(unix_seconds)));
    }
}

impl DatagramTransport for ScriptedNtp {
    fn send_to(&mut self, host: &str, port: u16, payload: &[u8]) -> Result<(), ClockError> {
        assert_eq!(payload.len(), NTP_PACKET_LEN);
        if let Some(error) = self.send_error {
            return Err(error);
        }
        self.sent.push((host.to_owned(), port));
        Ok(())
    }

    fn try_receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ClockError> {
        match self.inbox.pop_front() {
            None => Ok(None),
            Some(Err(error)) => Err(error),
            Some(Ok(datagram)) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok(Some(len))
            }
        }
    }
}

#[derive(Default)]
pub struct ScriptedHttp {
    pub urls: Vec<String>,
    pub response: Option<(u16, Vec<u8>)>,
    pub open_error: Option<ClockError>,
    pub polls: usize,
}

impl ScriptedHttp {
    pub fn respond(&mut self, status: u16, body: &str) {
        self.response = Some((status, body.as_bytes().to_vec()));
    }
}

impl HttpClient for ScriptedHttp {
    fn begin_get(&mut self, url: &str) -> Result<(), ClockError> {
        if let Some(error) = self.open_error {
            return Err(error);
        }
        self.urls.push(url.to_owned());
        Ok(())
    }

    fn poll_response(&mut self, body: &mut [u8]) -> Result<Option<HttpResponse>, ClockError> {
        self.polls += 1;
        let Some((status, payload)) = self.response.take() else {
            return Ok(None);
        };
        let len = payload.len().min(body.len());
        body[..len].copy_from_slice(&payload[..len]);
        Ok(Some(HttpResponse {
            status,
            len,
            truncated: payload.len() > body.len(),
        }))
    }
}

/// Panel that counts frames and keeps the last one.
#[derive(Default)]
pub struct CapturePanel {
    pub frames: usize,
    pub last: Option<Framebuffer>,
}

impl Panel for CapturePanel {
    type Error = Infallible;

    fn write_frame(&mut self, frame: &Framebuffer) -> Result<(), Self::Error> {
        self.frames += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}

pub fn capture_display() -> BufferedDisplay<CapturePanel> {
    BufferedDisplay::new(CapturePanel::default())
}
