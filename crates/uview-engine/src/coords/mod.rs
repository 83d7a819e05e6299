//! Screen-space geometry types.
//!
//! Canonical CPU space for anything drawn in pixels (text, cursor, viewport):
//! - logical pixels (DPI-aware)
//! - origin top-left
//! - +X right, +Y down
//!
//! UV-space math lives with the viewport and uses `glam`.

mod vec2;
mod viewport;

pub use vec2::Vec2;
pub use viewport::Viewport;
