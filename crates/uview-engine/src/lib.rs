//! uview engine crate.
//!
//! Owns the platform + GPU runtime pieces the viewport is built on: window
//! and event loop, wgpu device and surface, input translation, frame timing,
//! logging and screen-space text.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;
pub mod text;
