//! CPU-side frame planning.
//!
//! [`plan_frame`] turns the view flags, the geometry batch and the texture
//! states into the ordered list of draw calls a frame consists of. It touches
//! no GPU state, so frame composition is testable headless.

use std::collections::HashSet;

use glam::Vec2;
use uview_engine::paint::Color;

use crate::config::ViewConfig;
use crate::geometry::MeshGeometry;
use crate::mesh::Bounds;
use crate::overlay::readout;
use crate::texture::{udim, LoadState, TextureHandle, TextureId};

/// Half extent of the wrapped texture plane.
pub const REPEAT_PLANE_EXTENT: f32 = 5.0;

/// One step of a frame, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear { color: Color },
    Grid,
    /// A texture drawn as a background rectangle.
    TexturePlane { texture: TextureId, rect: Bounds, tile_origin: Vec2, repeat: bool },
    /// A mesh's faces filled with a texture.
    MeshTexture { mesh: usize, texture: TextureId, tile_origin: Vec2, repeat: bool },
    /// Flat color where a texture failed to load.
    PlanePlaceholder { rect: Bounds },
    MeshPlaceholder { mesh: usize },
    Wireframe { mesh: usize },
    Borders { mesh: usize },
    AxisLabels,
    CursorReadout { pixel: Vec2 },
    Present,
}

/// Ordered draw calls of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    pub calls: Vec<DrawCall>,
}

impl FramePlan {
    pub fn iter(&self) -> std::slice::Iter<'_, DrawCall> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&DrawCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn has_grid(&self) -> bool {
        self.calls.contains(&DrawCall::Grid)
    }
}

/// A texture handle together with the current state of each of its tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub udim: bool,
    pub tiles: Vec<(u32, TextureId, LoadState)>,
}

impl TextureBinding {
    /// Pairs `handle` with the states reported by `state`. Tiles without a
    /// state (evicted since resolving) are dropped.
    pub fn new(handle: &TextureHandle, state: impl Fn(TextureId) -> Option<LoadState>) -> Self {
        Self {
            udim: matches!(handle, TextureHandle::Udim { .. }),
            tiles: handle
                .tiles()
                .into_iter()
                .filter_map(|(tile, id)| state(id).map(|s| (tile, id, s)))
                .collect(),
        }
    }
}

/// Where the texture pass takes its textures from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TextureSource {
    #[default]
    None,
    /// An explicitly loaded texture, drawn as a plane behind the meshes.
    Plane(TextureBinding),
    /// Each mesh's first bound material texture, indexed like the batch.
    PerMesh(Vec<Option<TextureBinding>>),
}

impl TextureSource {
    /// Every texture referred to, whatever its load state.
    pub fn texture_ids(&self) -> HashSet<TextureId> {
        let bindings: Vec<&TextureBinding> = match self {
            TextureSource::None => Vec::new(),
            TextureSource::Plane(binding) => vec![binding],
            TextureSource::PerMesh(bindings) => bindings.iter().flatten().collect(),
        };
        bindings.iter().flat_map(|b| b.tiles.iter().map(|&(_, id, _)| id)).collect()
    }
}

/// Everything [`plan_frame`] reads.
pub struct FrameInputs<'a> {
    pub config: &'a ViewConfig,
    pub meshes: &'a [MeshGeometry],
    pub textures: &'a TextureSource,
    pub background: Color,
    /// Pointer position in logical pixels, if over the window.
    pub cursor: Option<Vec2>,
    pub viewport: Vec2,
}

pub fn plan_frame(inputs: &FrameInputs<'_>) -> FramePlan {
    let config = inputs.config;
    let mut calls = vec![DrawCall::Clear { color: inputs.background }];

    if config.show_grid {
        calls.push(DrawCall::Grid);
    }

    if config.show_texture {
        match inputs.textures {
            TextureSource::None => {}
            TextureSource::Plane(binding) => plan_plane(&mut calls, binding, config.repeat_texture),
            TextureSource::PerMesh(bindings) => {
                for (mesh, geometry) in inputs.meshes.iter().enumerate() {
                    if geometry.fill_indices.is_empty() {
                        continue;
                    }
                    if let Some(Some(binding)) = bindings.get(mesh) {
                        plan_mesh_texture(&mut calls, mesh, binding, config.repeat_texture);
                    }
                }
            }
        }
    }

    for (mesh, geometry) in inputs.meshes.iter().enumerate() {
        if !geometry.edge_indices.is_empty() {
            calls.push(DrawCall::Wireframe { mesh });
        }
    }

    if config.show_borders {
        for (mesh, geometry) in inputs.meshes.iter().enumerate() {
            if !geometry.borders.is_empty() {
                calls.push(DrawCall::Borders { mesh });
            }
        }
    }

    if config.show_grid {
        calls.push(DrawCall::AxisLabels);
    }

    if config.show_uv_position {
        if let Some(pixel) = inputs.cursor.filter(|p| readout::cursor_in_viewport(*p, inputs.viewport)) {
            calls.push(DrawCall::CursorReadout { pixel });
        }
    }

    calls.push(DrawCall::Present);
    FramePlan { calls }
}

fn plan_plane(calls: &mut Vec<DrawCall>, binding: &TextureBinding, repeat: bool) {
    for &(tile, texture, state) in &binding.tiles {
        let (rect, tile_origin, wrap) = if binding.udim {
            let Some(origin) = udim_origin(tile) else { continue };
            (Bounds::new(origin, origin + Vec2::ONE), origin, false)
        } else if repeat {
            let e = REPEAT_PLANE_EXTENT;
            (Bounds::new(Vec2::splat(-e), Vec2::splat(e)), Vec2::ZERO, true)
        } else {
            (Bounds::UNIT, Vec2::ZERO, false)
        };

        match state {
            LoadState::Pending => {}
            LoadState::Loaded => {
                calls.push(DrawCall::TexturePlane { texture, rect, tile_origin, repeat: wrap })
            }
            LoadState::Failed => calls.push(DrawCall::PlanePlaceholder { rect }),
        }
    }
}

fn plan_mesh_texture(calls: &mut Vec<DrawCall>, mesh: usize, binding: &TextureBinding, repeat: bool) {
    let mut placeholder = false;
    for &(tile, texture, state) in &binding.tiles {
        let (origin, wrap) = if binding.udim {
            let Some(origin) = udim_origin(tile) else { continue };
            (origin, false)
        } else {
            (Vec2::ZERO, repeat)
        };
        match state {
            LoadState::Pending => {}
            LoadState::Loaded => calls.push(DrawCall::MeshTexture {
                mesh,
                texture,
                tile_origin: origin,
                repeat: wrap,
            }),
            LoadState::Failed => placeholder = true,
        }
    }
    if placeholder {
        calls.push(DrawCall::MeshPlaceholder { mesh });
    }
}

fn udim_origin(tile: u32) -> Option<Vec2> {
    udim::tile_origin(tile).map(|(u, v)| Vec2::new(u as f32, v as f32))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::geometry::GeometryBuffer;
    use crate::mesh::{Interpolation, UvMesh, UvSet};

    fn mesh_a() -> UvMesh {
        let st = UvSet {
            positions: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            indices: None,
            interpolation: Interpolation::Vertex,
        };
        UvMesh {
            id: "/World/MeshA".into(),
            face_vertex_counts: vec![4],
            face_vertex_indices: vec![0, 1, 2, 3],
            uv_sets: BTreeMap::from([("st".to_string(), st)]),
        }
    }

    fn batch() -> GeometryBuffer {
        let mut g = GeometryBuffer::new();
        assert!(g.set_meshes(vec![mesh_a()]).is_empty());
        assert!(g.set_active_uv_set(Some("st")).is_empty());
        g
    }

    fn plan(config: &ViewConfig, meshes: &[MeshGeometry], textures: &TextureSource) -> FramePlan {
        plan_frame(&FrameInputs {
            config,
            meshes,
            textures,
            background: Color::BLACK,
            cursor: None,
            viewport: Vec2::new(800.0, 600.0),
        })
    }

    fn id(n: u64) -> TextureId {
        TextureId::from_raw(n)
    }

    // ── order ─────────────────────────────────────────────────────────────

    #[test]
    fn full_frame_follows_fixed_order() {
        let g = batch();
        let plan = plan_frame(&FrameInputs {
            config: &ViewConfig::default(),
            meshes: g.meshes(),
            textures: &TextureSource::PerMesh(vec![Some(TextureBinding {
                udim: false,
                tiles: vec![(1001, id(1), LoadState::Loaded)],
            })]),
            background: Color::BLACK,
            cursor: Some(Vec2::new(10.0, 10.0)),
            viewport: Vec2::new(800.0, 600.0),
        });

        let rank = |c: &DrawCall| match c {
            DrawCall::Clear { .. } => 0,
            DrawCall::Grid => 1,
            DrawCall::TexturePlane { .. }
            | DrawCall::MeshTexture { .. }
            | DrawCall::PlanePlaceholder { .. }
            | DrawCall::MeshPlaceholder { .. } => 2,
            DrawCall::Wireframe { .. } => 3,
            DrawCall::Borders { .. } => 4,
            DrawCall::AxisLabels => 5,
            DrawCall::CursorReadout { .. } => 6,
            DrawCall::Present => 7,
        };
        let ranks: Vec<u8> = plan.iter().map(rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    // ── flags ─────────────────────────────────────────────────────────────

    #[test]
    fn borders_off_keeps_wireframe() {
        let g = batch();
        assert_eq!(g.meshes()[0].vertex_count(), 4);

        let config = ViewConfig { show_borders: false, ..Default::default() };
        let plan = plan(&config, g.meshes(), &TextureSource::None);
        assert_eq!(plan.count(|c| matches!(c, DrawCall::Borders { .. })), 0);
        assert_eq!(plan.count(|c| matches!(c, DrawCall::Wireframe { .. })), 1);
    }

    #[test]
    fn grid_off_drops_grid_and_labels() {
        let config = ViewConfig { show_grid: false, ..Default::default() };
        let plan = plan(&config, &[], &TextureSource::None);
        assert!(!plan.has_grid());
        assert!(!plan.calls.contains(&DrawCall::AxisLabels));
        assert_eq!(plan.calls.first(), Some(&DrawCall::Clear { color: Color::BLACK }));
        assert_eq!(plan.calls.last(), Some(&DrawCall::Present));
    }

    #[test]
    fn empty_selection_draws_no_mesh_calls() {
        let plan = plan(&ViewConfig::default(), &[], &TextureSource::None);
        assert_eq!(plan.calls, vec![
            DrawCall::Clear { color: Color::BLACK },
            DrawCall::Grid,
            DrawCall::AxisLabels,
            DrawCall::Present,
        ]);
    }

    #[test]
    fn readout_needs_cursor_inside_viewport() {
        let config = ViewConfig::default();
        let outside = plan_frame(&FrameInputs {
            config: &config,
            meshes: &[],
            textures: &TextureSource::None,
            background: Color::BLACK,
            cursor: Some(Vec2::new(900.0, 10.0)),
            viewport: Vec2::new(800.0, 600.0),
        });
        assert_eq!(outside.count(|c| matches!(c, DrawCall::CursorReadout { .. })), 0);

        let hidden = ViewConfig { show_uv_position: false, ..Default::default() };
        let off = plan_frame(&FrameInputs {
            config: &hidden,
            meshes: &[],
            textures: &TextureSource::None,
            background: Color::BLACK,
            cursor: Some(Vec2::new(10.0, 10.0)),
            viewport: Vec2::new(800.0, 600.0),
        });
        assert_eq!(off.count(|c| matches!(c, DrawCall::CursorReadout { .. })), 0);
    }

    // ── textures ──────────────────────────────────────────────────────────

    #[test]
    fn plane_is_unit_square_or_wrapped() {
        let binding = TextureBinding { udim: false, tiles: vec![(1001, id(1), LoadState::Loaded)] };
        let source = TextureSource::Plane(binding);

        let plan_unit = plan(&ViewConfig::default(), &[], &source);
        assert!(plan_unit.calls.contains(&DrawCall::TexturePlane {
            texture: id(1),
            rect: Bounds::UNIT,
            tile_origin: Vec2::ZERO,
            repeat: false,
        }));

        let repeat = ViewConfig { repeat_texture: true, ..Default::default() };
        let plan_wrap = plan(&repeat, &[], &source);
        assert!(plan_wrap.calls.contains(&DrawCall::TexturePlane {
            texture: id(1),
            rect: Bounds::new(Vec2::splat(-5.0), Vec2::splat(5.0)),
            tile_origin: Vec2::ZERO,
            repeat: true,
        }));
    }

    #[test]
    fn udim_plane_draws_one_quad_per_tile() {
        let binding = TextureBinding {
            udim: true,
            tiles: vec![(1001, id(1), LoadState::Loaded), (1002, id(2), LoadState::Loaded)],
        };
        let plan = plan(&ViewConfig::default(), &[], &TextureSource::Plane(binding));
        assert!(plan.calls.contains(&DrawCall::TexturePlane {
            texture: id(2),
            rect: Bounds::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0)),
            tile_origin: Vec2::new(1.0, 0.0),
            repeat: false,
        }));
        assert_eq!(plan.count(|c| matches!(c, DrawCall::TexturePlane { .. })), 2);
    }

    #[test]
    fn pending_draws_nothing_and_failed_draws_placeholder() {
        let g = batch();
        let pending = TextureSource::PerMesh(vec![Some(TextureBinding {
            udim: false,
            tiles: vec![(1001, id(1), LoadState::Pending)],
        })]);
        let plan_pending = plan(&ViewConfig::default(), g.meshes(), &pending);
        assert_eq!(
            plan_pending.count(|c| matches!(
                c,
                DrawCall::MeshTexture { .. } | DrawCall::MeshPlaceholder { .. }
            )),
            0
        );

        let failed = TextureSource::PerMesh(vec![Some(TextureBinding {
            udim: false,
            tiles: vec![(1001, id(1), LoadState::Failed)],
        })]);
        let plan_failed = plan(&ViewConfig::default(), g.meshes(), &failed);
        assert!(plan_failed.calls.contains(&DrawCall::MeshPlaceholder { mesh: 0 }));
    }

    #[test]
    fn show_texture_off_skips_texture_pass() {
        let binding = TextureBinding { udim: false, tiles: vec![(1001, id(1), LoadState::Loaded)] };
        let config = ViewConfig { show_texture: false, ..Default::default() };
        let plan = plan(&config, &[], &TextureSource::Plane(binding));
        assert_eq!(plan.count(|c| matches!(c, DrawCall::TexturePlane { .. })), 0);
    }

    #[test]
    fn binding_drops_evicted_tiles() {
        let handle = TextureHandle::Udim {
            tiles: BTreeMap::from([(1001, id(1)), (1002, id(2))]),
        };
        let binding = TextureBinding::new(&handle, |t| (t == id(1)).then_some(LoadState::Loaded));
        assert!(binding.udim);
        assert_eq!(binding.tiles, vec![(1001, id(1), LoadState::Loaded)]);
    }
}
