#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! SSD1306 128x64 OLED over I2C.

use clock_core::display::{Framebuffer, Panel};

/// Default 7-bit address of the module.
pub const SSD1306_ADDRESS: u8 = 0x3C;

const COMMAND: u8 = 0x00;
const DATA: u8 = 0x40;
const DATA_CHUNK: usize = 16;

/// Power-up sequence: horizontal addressing, charge pump on, flipped to the
/// enclosure's orientation.
const INIT_SEQUENCE: [u8; 25] = [
    0xAE, // display off
    0xD5, 0x80, // clock divide
    0xA8, 0x3F, // multiplex 64
    0xD3, 0x00, // no offset
    0x40, // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x00, // horizontal addressing
    0xA1, // segment remap
    0xC8, // COM scan descending
    0xDA, 0x12, // COM pins
    0x81, 0xCF, // contrast
    0xD9, 0xF1, // pre-charge
    0xDB, 0x40, // VCOMH deselect
    0xA4, // resume from RAM
    0xA6, // normal polarity
    0xAF, // display on
];

/// Full-frame window: columns 0-127, pages 0-7.
const FRAME_WINDOW: [u8; 6] = [0x21, 0x00, 0x7F, 0x22, 0x00, 0x07];

/// Blocking I2C writes.
pub trait I2cWrite {
    type Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Panel driver pushing whole frames.
pub struct Ssd1306Panel<B> {
    bus: B,
    address: u8,
}

impl<B: I2cWrite> Ssd1306Panel<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus,
            address: SSD1306_ADDRESS,
        }
    }

    /// Sends the power-up sequence.
    ///
    /// # Errors
    ///
    /// Propagates the first bus error.
    pub fn init(&mut self) -> Result<(), B::Error> {
        self.commands(&INIT_SEQUENCE)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn commands(&mut self, commands: &[u8]) -> Result<(), B::Error> {
        let mut packet = [0_u8; INIT_SEQUENCE.len() + 1];
        packet[0] = COMMAND;
        let len = commands.len().min(INIT_SEQUENCE.len());
        packet[1..=len].copy_from_slice(&commands[..len]);
        self.bus.write(self.address, &packet[..=len])
    }
}

impl<B: I2cWrite> Panel for Ssd1306Panel<B> {
    type Error = B::Error;

    fn write_frame(&mut self, frame: &Framebuffer) -> Result<(), Self::Error> {
        self.commands(&FRAME_WINDOW)?;
        let mut packet = [0_u8; DATA_CHUNK + 1];
        packet[0] = DATA;
        for chunk in frame.as_bytes().chunks(DATA_CHUNK) {
            packet[1..=chunk.len()].copy_from_slice(chunk);
            self.bus.write(self.address, &packet[..=chunk.len()])?;
        }
        Ok(())
    }
}

/// Panel that discards frames, for boards without a display attached.
#[derive(Debug, Default)]
pub struct NullPanel;

impl Panel for NullPanel {
    type Error = core::convert::Infallible;

    fn write_frame(&mut self, _frame: &Framebuffer) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(target_os = "none")]
impl I2cWrite for embassy_stm32::i2c::I2c<'_, embassy_stm32::mode::Blocking> {
    type Error = embassy_stm32::i2c::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.blocking_write(address, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock_core::display::framebuffer::BUFFER_LEN;

    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u8, Vec<u8>)>,
    }

    impl I2cWrite for RecordingBus {
        type Error = ();

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
            self.writes.push((address, bytes.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn init_sends_one_command_packet() {
        let mut panel = Ssd1306Panel::new(RecordingBus::default());
        panel.init().unwrap();

        let (address, packet) = &panel.bus().writes[0];
        assert_eq!(*address, SSD1306_ADDRESS);
        assert_eq!(packet[0], COMMAND);
        assert_eq!(&packet[1..], INIT_SEQUENCE);
    }

    #[test]
    fn frame_goes_out_in_page_order_chunks() {
        let mut panel = Ssd1306Panel::new(RecordingBus::default());
        let mut frame = Framebuffer::new();
        frame.set_pixel(0, 0, true);
        frame.set_pixel(127, 63, true);
        panel.write_frame(&frame).unwrap();

        let writes = &panel.bus().writes;
        assert_eq!(writes[0].1, [COMMAND, 0x21, 0x00, 0x7F, 0x22, 0x00, 0x07]);
        assert_eq!(writes.len(), 1 + BUFFER_LEN / DATA_CHUNK);
        assert!(writes[1..].iter().all(|(_, packet)| packet[0] == DATA));

        let payload: Vec<u8> = writes[1..]
            .iter()
            .flat_map(|(_, packet)| packet[1..].iter().copied())
            .collect();
        assert_eq!(payload, frame.as_bytes());
        assert_eq!(payload[0], 0x01);
        assert_eq!(payload[BUFFER_LEN - 1], 0x80);
    }
}
