//! Fixed-format time request and reply handling.

use crate::error::{ClockError, MalformedKind};

use super::clock::UnixSeconds;

/// Length of request and reply datagrams.
pub const NTP_PACKET_LEN: usize = 48;
/// Well-known service port.
pub const NTP_PORT: u16 = 123;
/// Seconds between 1900-01-01 and 1970-01-01.
pub const NTP_UNIX_OFFSET: u32 = 2_208_988_800;

const LEAP_VERSION_MODE: u8 = 0b1110_0011;
const POLL_INTERVAL: u8 = 6;
const PRECISION: u8 = 0xEC;
const TRANSMIT_SECONDS: core::ops::Range<usize> = 40..44;
const ERA_LENGTH: i64 = 1 << 32;

/// Reasons a reply datagram is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PacketError {
    /// Fewer bytes than a full packet arrived.
    Short(usize),
    /// The transmit timestamp was zero, which servers send when unsynchronised.
    EmptyTimestamp,
}

impl From<PacketError> for ClockError {
    fn from(error: PacketError) -> Self {
        match error {
            PacketError::Short(_) => ClockError::MalformedResponse(MalformedKind::ShortPacket),
            PacketError::EmptyTimestamp => {
                ClockError::MalformedResponse(MalformedKind::EmptyTimestamp)
            }
        }
    }
}

/// Builds a client request: unknown leap indicator, version 4, client mode.
#[must_use]
pub const fn build_request() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0_u8; NTP_PACKET_LEN];
    packet[0] = LEAP_VERSION_MODE;
    packet[2] = POLL_INTERVAL;
    packet[3] = PRECISION;
    packet
}

/// Extracts the transmit timestamp of a reply as Unix seconds.
///
/// Values below [`NTP_UNIX_OFFSET`] belong to era 1 (after February 2036).
///
/// # Errors
///
/// Returns [`PacketError`] for short packets and zero timestamps.
pub fn decode_transmit_time(packet: &[u8]) -> Result<UnixSeconds, PacketError> {
    let field = packet
        .get(TRANSMIT_SECONDS)
        .filter(|_| packet.len() >= NTP_PACKET_LEN)
        .ok_or(PacketError::Short(packet.len()))?;

    let high = u16::from_be_bytes([field[0], field[1]]);
    let low = u16::from_be_bytes([field[2], field[3]]);
    let seconds = (u32::from(high) << 16) | u32::from(low);
    if seconds == 0 {
        return Err(PacketError::EmptyTimestamp);
    }

    let unix = if seconds >= NTP_UNIX_OFFSET {
        i64::from(seconds - NTP_UNIX_OFFSET)
    } else {
        i64::from(seconds) + ERA_LENGTH - i64::from(NTP_UNIX_OFFSET)
    };
    Ok(UnixSeconds::new(unix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_with(seconds: u32) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0_u8; NTP_PACKET_LEN];
        packet[40..44].copy_from_slice(&seconds.to_be_bytes());
        packet
    }

    #[test]
    fn request_sets_header_bytes() {
        let packet = build_request();
        assert_eq!(&packet[..4], &[0xE3, 0x00, 0x06, 0xEC]);
        assert!(packet[4..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn decodes_era_zero_timestamp() {
        let reply = reply_with(NTP_UNIX_OFFSET + 1_767_312_000);
        assert_eq!(
            decode_transmit_time(&reply),
            Ok(UnixSeconds::new(1_767_312_000))
        );
    }

    #[test]
    fn wraps_into_era_one() {
        let reply = reply_with(5);
        assert_eq!(
            decode_transmit_time(&reply),
            Ok(UnixSeconds::new(ERA_LENGTH - i64::from(NTP_UNIX_OFFSET) + 5))
        );
    }

    #[test]
    fn rejects_short_and_empty_replies() {
        assert_eq!(
            decode_transmit_time(&[0_u8; 44]),
            Err(PacketError::Short(44))
        );
        assert_eq!(
            decode_transmit_time(&reply_with(0)),
            Err(PacketError::EmptyTimestamp)
        );
    }
}
