//! GPU rendering subsystem.
//!
//! Renderers issue GPU commands via wgpu and own their GPU resources
//! (pipelines, buffers, atlases). Higher layers build their own renderers on
//! the shared helpers in [`common`].
//!
//! Convention:
//! - CPU screen geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shaders convert to NDC using a viewport uniform.

mod atlas;
pub mod common;
mod ctx;
mod text;

pub use atlas::ShelfPacker;
pub use ctx::{RenderCtx, RenderTarget};
pub use text::{TextRenderer, TextRun};
