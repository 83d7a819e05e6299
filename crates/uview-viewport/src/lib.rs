//! uview viewport core.
//!
//! A camera-driven orthographic viewport for inspecting UV layouts and the
//! textures bound to them. The host pushes a mesh selection and an active UV
//! set; the viewport keeps GPU-resident geometry and textures for it and
//! draws grid, textures, wireframe, borders and overlays on demand.
//!
//! Layering, leaf first:
//! - [`mesh`]: UV mesh data model and edge extraction
//! - [`geometry`]: per-mesh vertex/index batches and their GPU buffers
//! - [`texture`]: texture cache with background decoding and UDIM tiles
//! - [`camera`]: pan/zoom state and UV <-> screen mapping
//! - [`overlay`]: grid, axis labels, borders and the cursor readout
//! - [`scene`]: frame planning and the wgpu pipelines that execute a plan
//! - [`controller`]: input to camera updates and redraw requests
//! - [`session`]: the host-facing facade tying it together

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod overlay;
mod retire;
pub mod scene;
pub mod session;
pub mod texture;

pub use camera::Camera2D;
pub use config::{Theme, ViewConfig, ViewportSettings};
pub use controller::{RedrawGate, ViewportController};
pub use error::{Diagnostic, Severity, TopologyError, ViewerError};
pub use geometry::GeometryBuffer;
pub use mesh::{Bounds, EdgeList, Interpolation, UvMesh, UvSet};
pub use overlay::OverlayRenderer;
pub use scene::{DrawCall, FramePlan, SceneRenderer};
pub use session::{SceneSource, UvViewport, ViewportEvent, ViewportObserver};
pub use texture::{Dispatch, FsImageLoader, ImageLoader, LoadState, TextureCache, TextureHandle};
