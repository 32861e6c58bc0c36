#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Mirrors the core telemetry ring to defmt on the board and stdout on the host.

use clock_core::config::ConfigUpdate;
use clock_core::telemetry::{EventId, TelemetryRecord, TelemetryRecorder};

/// Remembers the last record already logged.
#[derive(Debug, Default)]
pub struct TelemetryMirror {
    last_seen: Option<EventId>,
}

impl TelemetryMirror {
    pub const fn new() -> Self {
        Self { last_seen: None }
    }

    /// Logs every record newer than the previous call. Returns how many.
    pub fn mirror<const CAPACITY: usize>(&mut self, recorder: &TelemetryRecorder<CAPACITY>) -> usize {
        let mut emitted = 0;
        for record in recorder.since(self.last_seen) {
            emit_record(record);
            self.last_seen = Some(record.id);
            emitted += 1;
        }
        emitted
    }

    pub const fn last_seen(&self) -> Option<EventId> {
        self.last_seen
    }
}

/// Logs a configuration change the board cannot persist yet.
pub fn log_config_update(update: &ConfigUpdate) {
    match update {
        ConfigUpdate::NetworkIdentity(ssid) => emit_identity(ssid.as_str()),
    }
}

#[cfg(target_os = "none")]
fn emit_record(record: &TelemetryRecord) {
    if record.event.is_warning() {
        defmt::warn!("telemetry {}", defmt::Display2Format(record));
    } else {
        defmt::info!("telemetry {}", defmt::Display2Format(record));
    }
}

#[cfg(not(target_os = "none"))]
fn emit_record(record: &TelemetryRecord) {
    println!("telemetry {record}");
}

#[cfg(target_os = "none")]
fn emit_identity(ssid: &str) {
    defmt::info!("config: learned network identity ssid={}", ssid);
}

#[cfg(not(target_os = "none"))]
fn emit_identity(ssid: &str) {
    println!("config: learned network identity ssid={ssid}");
}
