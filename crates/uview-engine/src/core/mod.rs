//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop) and
//! higher layers (viewport, studio). It keeps winit and wgpu lifecycle details
//! out of application code and provides a consistent per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl, Idle, Redraw};
pub use ctx::{FrameCtx, FrameStatus, WindowCtx};
