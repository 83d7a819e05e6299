//! Frame orchestration.
//!
//! A frame is planned on the CPU ([`plan_frame`]) and then executed by the
//! [`SceneRenderer`]: one cleared pass for everything geometric, followed by
//! the glyph pass for axis numbers and the readout.

mod plan;
pub mod pipelines;
pub mod uniforms;

use std::ops::Range;

use glam::Vec2;
use wgpu::util::DeviceExt;

use uview_engine::render::{RenderCtx, RenderTarget};
use uview_engine::text::{FontId, FontSystem};

use crate::camera::Camera2D;
use crate::config::{Theme, ViewportSettings};
use crate::error::ViewerError;
use crate::geometry::GeometryBuffer;
use crate::mesh::Bounds;
use crate::overlay::OverlayRenderer;
use crate::texture::{TextureCache, TextureId};

pub use plan::{
    plan_frame, DrawCall, FrameInputs, FramePlan, TextureBinding, TextureSource,
    REPEAT_PLANE_EXTENT,
};

use pipelines::Pipelines;
use uniforms::{DrawUniform, DrawUniforms, ViewUniform};

/// Borrowed state a frame is drawn from.
pub struct SceneFrame<'a> {
    pub plan: &'a FramePlan,
    pub camera: &'a Camera2D,
    pub geometry: &'a GeometryBuffer,
    pub textures: &'a TextureCache,
}

/// A draw resolved to buffers and a uniform slot, but not yet recorded.
enum Op {
    Grid { range: Range<u32> },
    Plane { vertices: Range<u32>, texture: Option<TextureId> },
    MeshFill { mesh: usize, texture: Option<TextureId> },
    Wireframe { mesh: usize },
    Borders { mesh: usize },
}

pub struct SceneRenderer {
    theme: Theme,
    pipelines: Pipelines,
    view_ubo: wgpu::Buffer,
    view_group: wgpu::BindGroup,
    draws: DrawUniforms,
    overlay: OverlayRenderer,

    plane_vbo: Option<wgpu::Buffer>,
    plane_capacity: usize,
}

impl SceneRenderer {
    /// Creates every pipeline. Fails only if a shader does not compile.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        settings: &ViewportSettings,
    ) -> Result<Self, ViewerError> {
        let pipelines = Pipelines::new(device, format)?;

        let view_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uview view ubo"),
            contents: bytemuck::bytes_of(&ViewUniform::new(glam::Mat4::IDENTITY, Vec2::ONE)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let view_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uview view bind group"),
            layout: &pipelines.view_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: view_ubo.as_entire_binding() }],
        });

        Ok(Self {
            theme: settings.theme.clone(),
            draws: DrawUniforms::new(device),
            overlay: OverlayRenderer::new(settings),
            pipelines,
            view_ubo,
            view_group,
            plane_vbo: None,
            plane_capacity: 0,
        })
    }

    pub fn set_font(&mut self, fonts: FontSystem, font: FontId) {
        self.overlay.set_font(fonts, font);
    }

    pub fn overlay(&self) -> &OverlayRenderer {
        &self.overlay
    }

    /// Layout textures must be created against to bind at group 2.
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.pipelines.texture_layout
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.pipelines.sampler
    }

    /// Executes `frame.plan`. The first pass clears the target.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, frame: &SceneFrame<'_>) {
        let camera = frame.camera;
        let view = ViewUniform::new(camera.view_projection(), camera.viewport());
        ctx.queue.write_buffer(&self.view_ubo, 0, bytemuck::bytes_of(&view));

        if frame.plan.has_grid() {
            self.overlay.prepare_grid(ctx.device, ctx.queue, camera);
        }

        let mut clear = Theme::color(self.theme.background).to_wgpu();
        let mut ops = Vec::new();
        let mut draws = Vec::new();
        let mut planes: Vec<Vec2> = Vec::new();

        for call in frame.plan.iter() {
            match call {
                DrawCall::Clear { color } => clear = color.to_wgpu(),
                DrawCall::Grid => {
                    for (kind, range) in &self.overlay.grid().ranges {
                        draws.push(DrawUniform::solid(Theme::color(kind.color(&self.theme))));
                        ops.push(Op::Grid { range: range.clone() });
                    }
                }
                DrawCall::TexturePlane { texture, rect, tile_origin, repeat } => {
                    draws.push(DrawUniform::textured(*tile_origin, *repeat));
                    ops.push(Op::Plane { vertices: push_rect(&mut planes, *rect), texture: Some(*texture) });
                }
                DrawCall::PlanePlaceholder { rect } => {
                    draws.push(DrawUniform::solid(Theme::color(self.theme.placeholder)));
                    ops.push(Op::Plane { vertices: push_rect(&mut planes, *rect), texture: None });
                }
                DrawCall::MeshTexture { mesh, texture, tile_origin, repeat } => {
                    draws.push(DrawUniform::textured(*tile_origin, *repeat));
                    ops.push(Op::MeshFill { mesh: *mesh, texture: Some(*texture) });
                }
                DrawCall::MeshPlaceholder { mesh } => {
                    draws.push(DrawUniform::solid(Theme::color(self.theme.placeholder)));
                    ops.push(Op::MeshFill { mesh: *mesh, texture: None });
                }
                DrawCall::Wireframe { mesh } => {
                    draws.push(DrawUniform::solid(Theme::color(self.theme.wireframe)));
                    ops.push(Op::Wireframe { mesh: *mesh });
                }
                DrawCall::Borders { mesh } => {
                    draws.push(DrawUniform::stroke(
                        Theme::color(self.theme.border),
                        self.overlay.border_width(),
                    ));
                    ops.push(Op::Borders { mesh: *mesh });
                }
                DrawCall::AxisLabels | DrawCall::CursorReadout { .. } | DrawCall::Present => {}
            }
        }

        self.draws.write(ctx.device, ctx.queue, &self.pipelines.draw_layout, &draws);
        if !planes.is_empty() {
            self.upload_planes(ctx, &planes);
        }

        {
            let mut pass = target.begin_pass("uview scene pass", Some(clear));
            if let Some(draw_group) = self.draws.bind_group() {
                pass.set_bind_group(0, &self.view_group, &[]);
                for (slot, op) in ops.into_iter().enumerate() {
                    self.record(&mut pass, draw_group, self.draws.offset(slot as u32), op, frame);
                }
            }
        }

        let runs = self.overlay.text_runs(frame.plan.iter(), camera, &self.theme);
        if !runs.is_empty() {
            self.overlay.render_text(ctx, target, &runs);
        }
    }

    fn record(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        draw_group: &wgpu::BindGroup,
        offset: u32,
        op: Op,
        frame: &SceneFrame<'_>,
    ) {
        let p = &self.pipelines;
        match op {
            Op::Grid { range } => self.overlay.draw_grid(pass, p, draw_group, offset, range),

            Op::Plane { vertices, texture } => {
                let Some(vbo) = self.plane_vbo.as_ref() else { return; };
                if !bind_fill(pass, p, draw_group, offset, texture, frame.textures) {
                    return;
                }
                pass.set_vertex_buffer(0, vbo.slice(..));
                pass.draw(vertices, 0..1);
            }

            Op::MeshFill { mesh, texture } => {
                let Some(gpu) = frame.geometry.gpu_mesh(mesh) else { return; };
                let (Some(vbo), Some(fill)) = (gpu.vertices.as_ref(), gpu.fill.as_ref()) else {
                    return;
                };
                if !bind_fill(pass, p, draw_group, offset, texture, frame.textures) {
                    return;
                }
                pass.set_vertex_buffer(0, vbo.slice(..));
                pass.set_index_buffer(fill.buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..fill.count, 0, 0..1);
            }

            Op::Wireframe { mesh } => {
                let Some(gpu) = frame.geometry.gpu_mesh(mesh) else { return; };
                let (Some(vbo), Some(edges)) = (gpu.vertices.as_ref(), gpu.edges.as_ref()) else {
                    return;
                };
                pass.set_pipeline(&p.lines);
                pass.set_bind_group(1, draw_group, &[offset]);
                pass.set_vertex_buffer(0, vbo.slice(..));
                pass.set_index_buffer(edges.buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..edges.count, 0, 0..1);
            }

            Op::Borders { mesh } => {
                let Some(borders) = frame.geometry.gpu_mesh(mesh).and_then(|g| g.borders.as_ref())
                else {
                    return;
                };
                self.overlay.draw_borders(pass, p, draw_group, offset, borders);
            }
        }
    }

    fn upload_planes(&mut self, ctx: &RenderCtx<'_>, vertices: &[Vec2]) {
        if self.plane_vbo.is_none() || self.plane_capacity < vertices.len() {
            let capacity = vertices.len().next_power_of_two().max(64);
            self.plane_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("uview texture plane vbo"),
                size: (capacity * std::mem::size_of::<Vec2>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.plane_capacity = capacity;
        }
        let Some(vbo) = self.plane_vbo.as_ref() else { return; };
        ctx.queue.write_buffer(vbo, 0, bytemuck::cast_slice(vertices));
    }
}

/// Binds the textured pipeline for `Some(texture)` or the flat fill pipeline
/// for a placeholder. Returns false if the texture has no GPU copy yet.
fn bind_fill(
    pass: &mut wgpu::RenderPass<'_>,
    p: &Pipelines,
    draw_group: &wgpu::BindGroup,
    offset: u32,
    texture: Option<TextureId>,
    textures: &TextureCache,
) -> bool {
    match texture {
        Some(id) => {
            let Some(gpu) = textures.gpu(id) else { return false };
            pass.set_pipeline(&p.textured);
            pass.set_bind_group(2, &gpu.bind_group, &[]);
        }
        None => pass.set_pipeline(&p.fill),
    }
    pass.set_bind_group(1, draw_group, &[offset]);
    true
}

/// Appends `rect` as two triangles; returns its vertex range.
fn push_rect(vertices: &mut Vec<Vec2>, rect: Bounds) -> Range<u32> {
    let start = vertices.len() as u32;
    let [a, b, c, d] = rect.corners();
    vertices.extend_from_slice(&[a, b, c, a, c, d]);
    start..vertices.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::LineKind;

    #[test]
    fn rect_becomes_two_triangles() {
        let mut v = Vec::new();
        let first = push_rect(&mut v, Bounds::UNIT);
        let second = push_rect(&mut v, Bounds::new(Vec2::splat(-5.0), Vec2::splat(5.0)));
        assert_eq!(first, 0..6);
        assert_eq!(second, 6..12);
        assert!(v[..6].contains(&Vec2::ONE));
        assert!(v[6..].contains(&Vec2::splat(-5.0)));
    }

    #[test]
    fn line_kinds_have_distinct_default_colors() {
        let theme = Theme::default();
        assert_ne!(LineKind::Minor.color(&theme), LineKind::Major.color(&theme));
        assert_ne!(LineKind::UAxis.color(&theme), LineKind::VAxis.color(&theme));
    }
}
