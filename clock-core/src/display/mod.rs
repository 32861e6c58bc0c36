//! Display rotation and dissolve transitions.
//!
//! While steady the engine re-renders the current screen at most every
//! [`STEADY_REFRESH`]. When the rotation interval expires it picks the next
//! eligible mode and animates a [`dissolve`] over [`DISSOLVE_DURATION`],
//! producing one frame per [`FRAME_INTERVAL`]. The active mode only changes
//! once the transition ends, and that last frame is always a clean render.

pub mod dissolve;
pub mod driver;
pub mod framebuffer;
pub mod rotation;
pub mod screens;

use core::time::Duration;

use crate::config::DisplayConfig;
use crate::time::{Millis, duration_to_millis};

pub use dissolve::{
    DISSOLVE_DURATION, DissolveFrame, DissolvePhase, FRAME_INTERVAL, Xorshift32, frame_at,
};
pub use driver::{BufferedDisplay, DisplayDriver, Panel, TextScale};
pub use framebuffer::Framebuffer;
pub use rotation::{DisplayMode, ModeEligibility, RotationChoice, select_next};
pub use screens::{ScreenContext, render};

/// Minimum spacing of steady-state redraws.
pub const STEADY_REFRESH: Duration = Duration::from_millis(500);

const DEFAULT_SEED: u32 = 0x2545_F491;

/// Transition in progress.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub start: Millis,
    pub last_frame: Option<Millis>,
}

/// Rotation change reported by [`DisplayEngine::poll`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DisplayEvent {
    TransitionStarted {
        from: DisplayMode,
        to: DisplayMode,
        forced: bool,
    },
    TransitionFinished {
        mode: DisplayMode,
    },
}

/// Owns the display driver and the rotation state.
pub struct DisplayEngine<D> {
    driver: D,
    current: DisplayMode,
    next: DisplayMode,
    last_switch: Millis,
    transition: Option<Transition>,
    last_render: Option<Millis>,
    rotation_warning: bool,
    rng: Xorshift32,
}

impl<D: DisplayDriver> DisplayEngine<D> {
    #[must_use]
    pub const fn new(driver: D) -> Self {
        Self::with_seed(driver, DEFAULT_SEED)
    }

    /// Creates an engine whose dissolve pattern derives from `seed`.
    #[must_use]
    pub const fn with_seed(driver: D, seed: u32) -> Self {
        Self {
            driver,
            current: DisplayMode::Time,
            next: DisplayMode::Time,
            last_switch: Millis::ZERO,
            transition: None,
            last_render: None,
            rotation_warning: false,
            rng: Xorshift32::new(seed),
        }
    }

    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    #[must_use]
    pub const fn current_mode(&self) -> DisplayMode {
        self.current
    }

    #[must_use]
    pub const fn next_mode(&self) -> DisplayMode {
        self.next
    }

    #[must_use]
    pub const fn transition(&self) -> Option<Transition> {
        self.transition
    }

    #[must_use]
    pub const fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Set when the last rotation found no eligible mode and fell back to time.
    #[must_use]
    pub const fn rotation_warning(&self) -> bool {
        self.rotation_warning
    }

    #[must_use]
    pub const fn last_switch(&self) -> Millis {
        self.last_switch
    }

    /// Restarts the rotation timer, typically at boot.
    pub fn reset_rotation(&mut self, now: Millis) {
        self.last_switch = now;
        self.transition = None;
        self.last_render = None;
    }

    /// Advances rotation and draws at most one frame.
    pub fn poll(
        &mut self,
        now: Millis,
        config: &DisplayConfig,
        ctx: &ScreenContext<'_>,
    ) -> Option<DisplayEvent> {
        if let Some(transition) = self.transition {
            return self.poll_transition(now, transition, ctx);
        }

        let interval = duration_to_millis(config.rotation_interval);
        if now.elapsed_since(self.last_switch) > interval {
            let eligibility =
                ModeEligibility::from_state(config, ctx.weather.valid, ctx.sun.is_populated());
            let choice = select_next(self.current, eligibility);
            self.next = choice.mode;
            self.rotation_warning = choice.forced;
            self.last_switch = now;
            self.transition = Some(Transition {
                start: now,
                last_frame: None,
            });
            return Some(DisplayEvent::TransitionStarted {
                from: self.current,
                to: choice.mode,
                forced: choice.forced,
            });
        }

        let refresh_due = self.last_render.is_none_or(|last| {
            now.elapsed_since(last) >= duration_to_millis(STEADY_REFRESH)
        });
        if refresh_due {
            self.draw_full(now, self.current, ctx);
        }
        None
    }

    fn poll_transition(
        &mut self,
        now: Millis,
        transition: Transition,
        ctx: &ScreenContext<'_>,
    ) -> Option<DisplayEvent> {
        let elapsed = now.elapsed_since(transition.start);
        let Some(frame) = frame_at(elapsed) else {
            self.current = self.next;
            self.transition = None;
            self.draw_full(now, self.current, ctx);
            return Some(DisplayEvent::TransitionFinished { mode: self.current });
        };

        let frame_due = transition.last_frame.is_none_or(|last| {
            now.elapsed_since(last) >= duration_to_millis(FRAME_INTERVAL)
        });
        if !frame_due {
            return None;
        }

        self.transition = Some(Transition {
            last_frame: Some(now),
            ..transition
        });
        let mode = match frame.phase {
            DissolvePhase::Outgoing => self.current,
            DissolvePhase::Incoming => self.next,
        };
        render(&mut self.driver, mode, ctx);
        dissolve::apply(self.driver.buffer_mut(), frame, &mut self.rng);
        self.driver.flush();
        None
    }

    fn draw_full(&mut self, now: Millis, mode: DisplayMode, ctx: &ScreenContext<'_>) {
        render(&mut self.driver, mode, ctx);
        self.driver.flush();
        self.last_render = Some(now);
    }
}
