use std::time::Duration;

use crate::coords::Viewport;
use crate::device::Gpu;
use crate::input::{InputEvent, InputState};

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Whether a callback changed anything that is visible on screen.
///
/// The runtime only draws when some callback answered [`Redraw::Request`];
/// repeated requests before the next frame collapse into one.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Redraw {
    #[default]
    Skip,
    Request,
}

impl Redraw {
    #[inline]
    pub fn is_requested(self) -> bool {
        self == Redraw::Request
    }

    /// Combines two answers; either request wins.
    #[inline]
    pub fn or(self, other: Redraw) -> Redraw {
        if self.is_requested() || other.is_requested() { Redraw::Request } else { Redraw::Skip }
    }
}

impl From<bool> for Redraw {
    fn from(b: bool) -> Self {
        if b { Redraw::Request } else { Redraw::Skip }
    }
}

/// Answer to [`App::on_idle`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Idle {
    pub redraw: Redraw,
    /// Wake the event loop again after this long even without input, so
    /// background work (e.g. texture decoding) can be polled.
    pub wake_after: Option<Duration>,
}

/// Application contract implemented by higher layers.
///
/// All callbacks run on the event-loop thread.
pub trait App {
    /// Called once after the window and GPU context exist.
    fn on_init(&mut self, gpu: &Gpu<'_>) -> anyhow::Result<()> {
        let _ = gpu;
        Ok(())
    }

    /// Called for every translated input event, after `state` has been updated.
    fn on_input(&mut self, event: &InputEvent, state: &InputState) -> Redraw {
        let _ = (event, state);
        Redraw::Skip
    }

    /// Called when the drawable area changes (logical pixels).
    fn on_resize(&mut self, viewport: Viewport) -> Redraw {
        let _ = viewport;
        Redraw::Request
    }

    /// Called when the event loop is about to sleep.
    fn on_idle(&mut self) -> Idle {
        Idle::default()
    }

    /// Called once per drawn frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
