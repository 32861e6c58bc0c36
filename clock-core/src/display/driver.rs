//! Text-and-pixel drawing surface used by the screens.

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15, FONT_10X20};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{Drawable, Point};
use embedded_graphics::text::{Baseline, Text};

use super::framebuffer::Framebuffer;

/// Glyph sizes available to the screens.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TextScale {
    #[default]
    Small,
    Medium,
    Large,
}

impl TextScale {
    #[must_use]
    pub fn font(self) -> &'static MonoFont<'static> {
        match self {
            TextScale::Small => &FONT_6X10,
            TextScale::Medium => &FONT_9X15,
            TextScale::Large => &FONT_10X20,
        }
    }

    /// Horizontal advance per character, including spacing.
    #[must_use]
    pub fn advance(self) -> i32 {
        let font = self.font();
        i32::try_from(font.character_size.width + font.character_spacing).unwrap_or(i32::MAX)
    }

    #[must_use]
    pub fn line_height(self) -> i32 {
        i32::try_from(self.font().character_size.height).unwrap_or(i32::MAX)
    }

    /// Width of `text` set at this scale.
    #[must_use]
    pub fn text_width(self, text: &str) -> i32 {
        i32::try_from(text.chars().count()).map_or(i32::MAX, |count| count * self.advance())
    }
}

/// Drawing capability the display engine drives.
pub trait DisplayDriver {
    /// Blanks the framebuffer without touching the panel.
    fn clear(&mut self);
    fn set_cursor(&mut self, x: i32, y: i32);
    fn set_text_scale(&mut self, scale: TextScale);
    /// Draws `text` at the cursor and advances the cursor past it.
    fn draw_text(&mut self, text: &str);
    fn buffer_mut(&mut self) -> &mut Framebuffer;
    fn set_pixel(&mut self, x: usize, y: usize, on: bool);
    /// Sends the framebuffer to the panel.
    fn flush(&mut self);
}

/// Physical panel that receives finished frames.
pub trait Panel {
    type Error;

    /// Writes a complete frame.
    ///
    /// # Errors
    ///
    /// Returns the bus error raised by the panel.
    fn write_frame(&mut self, frame: &Framebuffer) -> Result<(), Self::Error>;
}

/// [`DisplayDriver`] that renders into a local framebuffer with the
/// `embedded-graphics` mono fonts and pushes whole frames to a [`Panel`].
#[derive(Debug)]
pub struct BufferedDisplay<P> {
    frame: Framebuffer,
    panel: P,
    cursor: Point,
    scale: TextScale,
    flushes: u32,
    flush_errors: u32,
}

impl<P: Panel> BufferedDisplay<P> {
    #[must_use]
    pub const fn new(panel: P) -> Self {
        Self {
            frame: Framebuffer::new(),
            panel,
            cursor: Point::zero(),
            scale: TextScale::Small,
            flushes: 0,
            flush_errors: 0,
        }
    }

    #[must_use]
    pub const fn frame(&self) -> &Framebuffer {
        &self.frame
    }

    #[must_use]
    pub const fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    /// Successful flushes since creation.
    #[must_use]
    pub const fn flushes(&self) -> u32 {
        self.flushes
    }

    #[must_use]
    pub const fn flush_errors(&self) -> u32 {
        self.flush_errors
    }
}

impl<P: Panel> DisplayDriver for BufferedDisplay<P> {
    fn clear(&mut self) {
        self.frame.clear();
        self.cursor = Point::zero();
    }

    fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = Point::new(x, y);
    }

    fn set_text_scale(&mut self, scale: TextScale) {
        self.scale = scale;
    }

    fn draw_text(&mut self, text: &str) {
        let style = MonoTextStyle::new(self.scale.font(), BinaryColor::On);
        let Ok(next) =
            Text::with_baseline(text, self.cursor, style, Baseline::Top).draw(&mut self.frame);
        self.cursor = next;
    }

    fn buffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.frame
    }

    fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        self.frame.set_pixel(x, y, on);
    }

    fn flush(&mut self) {
        match self.panel.write_frame(&self.frame) {
            Ok(()) => self.flushes = self.flushes.saturating_add(1),
            Err(_) => self.flush_errors = self.flush_errors.saturating_add(1),
        }
    }
}
