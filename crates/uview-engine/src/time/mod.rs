//! Frame timing.
//!
//! One `FrameClock` per window; `tick()` once per presented frame. The frame
//! index doubles as the retirement stamp for GPU resources replaced mid-session.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
