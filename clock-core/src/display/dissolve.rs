//! Two-phase dissolve between screens.
//!
//! During the first half the outgoing screen loses an increasing share of its
//! pixels and drifts right; during the second half the incoming screen gains
//! them back. Pixels are cleared at random positions, four times the nominal
//! count to make up for repeat hits.

use core::time::Duration;

use super::framebuffer::{Framebuffer, HEIGHT, WIDTH};

pub const DISSOLVE_DURATION: Duration = Duration::from_millis(2_000);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);
pub const DRIFT_COLUMNS: usize = 2;
/// Drift starts once more than this share of pixels is hidden.
pub const DRIFT_THRESHOLD_PERCENT: u8 = 10;

const DURATION_MS: u32 = 2_000;
const HALF_MS: u32 = DURATION_MS / 2;
const OVERDRAW_FACTOR: u32 = 4;

/// Which screen a dissolve frame shows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DissolvePhase {
    Outgoing,
    Incoming,
}

/// Rendering instructions for one transition frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DissolveFrame {
    pub phase: DissolvePhase,
    pub hide_percent: u8,
}

impl DissolveFrame {
    /// Returns `true` when the frame is shifted right before clearing.
    #[must_use]
    pub const fn drifts(&self) -> bool {
        matches!(self.phase, DissolvePhase::Outgoing) && self.hide_percent > DRIFT_THRESHOLD_PERCENT
    }
}

/// Frame parameters `elapsed_ms` into a transition, or `None` once it ended.
#[must_use]
pub fn frame_at(elapsed_ms: u32) -> Option<DissolveFrame> {
    if elapsed_ms >= DURATION_MS {
        return None;
    }
    let frame = if elapsed_ms < HALF_MS {
        DissolveFrame {
            phase: DissolvePhase::Outgoing,
            hide_percent: percent(elapsed_ms),
        }
    } else {
        DissolveFrame {
            phase: DissolvePhase::Incoming,
            hide_percent: 100 - percent(elapsed_ms - HALF_MS),
        }
    };
    Some(frame)
}

fn percent(elapsed_in_phase: u32) -> u8 {
    u8::try_from(elapsed_in_phase * 100 / HALF_MS).unwrap_or(100)
}

#[allow(clippy::cast_possible_truncation)]
const PIXELS: u32 = (WIDTH * HEIGHT) as u32;

/// Number of random clears performed for `hide_percent`.
#[must_use]
pub fn pixels_to_hide(hide_percent: u8) -> u32 {
    PIXELS * u32::from(hide_percent.min(100)) * OVERDRAW_FACTOR / 100
}

/// Small xorshift generator for pixel positions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// Seeds the generator; a zero seed is replaced since it would stall.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Value in `0..bound`, taken from the high bits.
    pub fn below(&mut self, bound: usize) -> usize {
        let bound = u64::try_from(bound).unwrap_or(u64::from(u32::MAX));
        let scaled = (u64::from(self.next_u32()) * bound) >> 32;
        usize::try_from(scaled).unwrap_or(0)
    }
}

/// Applies `frame` to an already rendered framebuffer.
pub fn apply(target: &mut Framebuffer, frame: DissolveFrame, rng: &mut Xorshift32) {
    if frame.drifts() {
        target.shift_right(DRIFT_COLUMNS);
    }
    for _ in 0..pixels_to_hide(frame.hide_percent) {
        let x = rng.below(WIDTH);
        let y = rng.below(HEIGHT);
        target.set_pixel(x, y, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries() {
        assert_eq!(
            frame_at(0),
            Some(DissolveFrame {
                phase: DissolvePhase::Outgoing,
                hide_percent: 0
            })
        );
        let quarter = frame_at(500);
        assert_eq!(
            quarter,
            Some(DissolveFrame {
                phase: DissolvePhase::Outgoing,
                hide_percent: 50
            })
        );
        assert!(quarter.is_some_and(|frame| frame.drifts()));
        assert_eq!(frame_at(999).map(|frame| frame.hide_percent), Some(99));
        assert_eq!(
            frame_at(1_000),
            Some(DissolveFrame {
                phase: DissolvePhase::Incoming,
                hide_percent: 100
            })
        );
        assert_eq!(frame_at(1_500).map(|frame| frame.hide_percent), Some(50));
        assert_eq!(frame_at(2_000), None);
    }

    #[test]
    fn drift_only_in_outgoing_phase_above_threshold() {
        assert!(!frame_at(100).unwrap().drifts());
        assert!(frame_at(110).unwrap().drifts());
        assert!(!frame_at(1_100).unwrap().drifts());
    }

    #[test]
    fn full_hide_clears_most_pixels() {
        let mut frame = Framebuffer::new();
        frame.as_bytes_mut().fill(0xFF);
        let mut rng = Xorshift32::new(7);
        apply(
            &mut frame,
            DissolveFrame {
                phase: DissolvePhase::Incoming,
                hide_percent: 100,
            },
            &mut rng,
        );
        // Four clears per pixel leave roughly e^-4 of the screen lit.
        assert!(frame.lit_pixels() < 1_000);
    }

    #[test]
    fn zero_hide_leaves_frame_untouched() {
        let mut frame = Framebuffer::new();
        frame.as_bytes_mut().fill(0xFF);
        let mut rng = Xorshift32::new(1);
        apply(
            &mut frame,
            DissolveFrame {
                phase: DissolvePhase::Outgoing,
                hide_percent: 0,
            },
            &mut rng,
        );
        assert_eq!(frame.lit_pixels(), 8192);
    }
}
