//! Monochrome framebuffer in SSD1306 page order.
//!
//! Rows are grouped into eight-pixel pages; byte `page * WIDTH + x` holds
//! rows `page * 8 ..= page * 8 + 7` of column `x`, least significant bit on
//! top. This is the layout the panel consumes, so a flush is a straight copy.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;
pub const PAGES: usize = HEIGHT / 8;
pub const BUFFER_LEN: usize = WIDTH * PAGES;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Framebuffer {
    bytes: [u8; BUFFER_LEN],
}

impl Framebuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; BUFFER_LEN],
        }
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BUFFER_LEN] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; BUFFER_LEN] {
        &mut self.bytes
    }

    /// Returns whether the pixel is lit; out-of-range reads are dark.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        locate(x, y).is_some_and(|(index, mask)| self.bytes[index] & mask != 0)
    }

    /// Sets or clears a pixel; out-of-range writes are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if let Some((index, mask)) = locate(x, y) {
            if on {
                self.bytes[index] |= mask;
            } else {
                self.bytes[index] &= !mask;
            }
        }
    }

    /// Number of lit pixels.
    #[must_use]
    pub fn lit_pixels(&self) -> u32 {
        self.bytes.iter().map(|byte| byte.count_ones()).sum()
    }

    /// Shifts every row right by `columns`, filling the left edge with blank.
    pub fn shift_right(&mut self, columns: usize) {
        let columns = columns.min(WIDTH);
        for page in self.bytes.chunks_exact_mut(WIDTH) {
            page.copy_within(..WIDTH - columns, columns);
            page[..columns].fill(0);
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Panel size for `embedded-graphics`; both sides fit in a `u32`.
#[allow(clippy::cast_possible_truncation)]
const SIZE: Size = Size::new(WIDTH as u32, HEIGHT as u32);

fn locate(x: usize, y: usize) -> Option<(usize, u8)> {
    (x < WIDTH && y < HEIGHT).then(|| ((y / 8) * WIDTH + x, 1 << (y % 8)))
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        SIZE
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) else {
                continue;
            };
            self.set_pixel(x, y, color.is_on());
        }
        Ok(())
    }
}
