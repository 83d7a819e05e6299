//! Reference overlays: grid, axis numbers, UV borders and the cursor readout.
//!
//! Geometry generation lives in the submodules and is GPU-free. The
//! [`OverlayRenderer`] owns the grid vertex buffer and the glyph renderer and
//! records its draws into the scene pass with the scene's pipelines.

pub mod grid;
pub mod labels;
pub mod readout;

use std::ops::Range;

use glam::Vec2;
use uview_engine::coords::Vec2 as ScreenVec2;
use uview_engine::paint::Color;
use uview_engine::render::{RenderCtx, RenderTarget, TextRenderer, TextRun};
use uview_engine::text::{FontId, FontSystem};

use crate::camera::Camera2D;
use crate::config::{Theme, ViewportSettings};
use crate::geometry::CountedBuffer;
use crate::scene::pipelines::Pipelines;
use crate::scene::DrawCall;

pub use grid::{GridLines, GridSpacing, LineKind};
pub use labels::{AxisLabel, LabelStep};

pub struct OverlayRenderer {
    grid_min_px: f32,
    label_min_px: f32,
    label_font_size: f32,
    readout_font_size: f32,
    border_width: f32,

    fonts: Option<(FontSystem, FontId)>,
    text: TextRenderer,

    grid: GridLines,
    grid_vbo: Option<wgpu::Buffer>,
    grid_capacity: usize,
}

impl OverlayRenderer {
    pub fn new(settings: &ViewportSettings) -> Self {
        Self {
            grid_min_px: settings.grid_min_px,
            label_min_px: settings.label_min_px,
            label_font_size: settings.label_font_size,
            readout_font_size: settings.readout_font_size,
            border_width: settings.border_width,
            fonts: None,
            text: TextRenderer::new(),
            grid: GridLines::default(),
            grid_vbo: None,
            grid_capacity: 0,
        }
    }

    /// Installs the font used for axis numbers and the readout. Without a
    /// font, text overlays are skipped.
    pub fn set_font(&mut self, fonts: FontSystem, font: FontId) {
        self.fonts = Some((fonts, font));
    }

    pub fn has_font(&self) -> bool {
        self.fonts.is_some()
    }

    #[inline]
    pub fn border_width(&self) -> f32 {
        self.border_width
    }

    // ── grid ──────────────────────────────────────────────────────────────

    /// Regenerates grid lines for the camera and uploads them.
    pub fn prepare_grid(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, camera: &Camera2D) {
        self.grid = GridLines::build(camera, GridSpacing::for_scale(camera.scale(), self.grid_min_px));
        if self.grid.is_empty() {
            return;
        }
        self.ensure_grid_capacity(device, self.grid.vertices.len());
        let Some(vbo) = self.grid_vbo.as_ref() else { return; };
        queue.write_buffer(vbo, 0, bytemuck::cast_slice(&self.grid.vertices));
    }

    pub fn grid(&self) -> &GridLines {
        &self.grid
    }

    fn ensure_grid_capacity(&mut self, device: &wgpu::Device, needed: usize) {
        if self.grid_vbo.is_some() && self.grid_capacity >= needed {
            return;
        }
        let capacity = needed.next_power_of_two().max(64);
        self.grid_vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uview grid vbo"),
            size: (capacity * std::mem::size_of::<Vec2>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.grid_capacity = capacity;
    }

    /// Records one grid line group. Group 0 must already be bound.
    pub(crate) fn draw_grid(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipelines: &Pipelines,
        draw_group: &wgpu::BindGroup,
        offset: u32,
        range: Range<u32>,
    ) {
        let Some(vbo) = self.grid_vbo.as_ref() else { return; };
        pass.set_pipeline(&pipelines.lines);
        pass.set_bind_group(1, draw_group, &[offset]);
        pass.set_vertex_buffer(0, vbo.slice(..));
        pass.draw(range, 0..1);
    }

    // ── borders ───────────────────────────────────────────────────────────

    /// Records one mesh's border strokes as instanced quads.
    pub(crate) fn draw_borders(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipelines: &Pipelines,
        draw_group: &wgpu::BindGroup,
        offset: u32,
        borders: &CountedBuffer,
    ) {
        pass.set_pipeline(&pipelines.stroke);
        pass.set_bind_group(1, draw_group, &[offset]);
        pass.set_vertex_buffer(0, pipelines.quad_vbo.slice(..));
        pass.set_vertex_buffer(1, borders.buffer.slice(..));
        pass.set_index_buffer(pipelines.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..6, 0, 0..borders.count);
    }

    // ── text ──────────────────────────────────────────────────────────────

    /// Text runs for the label and readout calls in `calls`.
    pub fn text_runs<'c>(
        &self,
        calls: impl IntoIterator<Item = &'c DrawCall>,
        camera: &Camera2D,
        theme: &Theme,
    ) -> Vec<TextRun> {
        let Some((fonts, font)) = self.fonts.as_ref() else {
            return Vec::new();
        };
        let font = *font;
        let mut runs = Vec::new();

        for call in calls {
            match call {
                DrawCall::AxisLabels => {
                    let size = self.label_font_size;
                    let step = LabelStep::for_scale(camera.scale(), self.label_min_px);
                    let line_height = fonts.line_height(font, size);
                    let color = Theme::color(theme.axis_label);
                    runs.extend(labels::axis_labels(camera, step, line_height).into_iter().map(
                        |label| text_run(label.text, label.origin, size, color, font),
                    ));
                }
                DrawCall::CursorReadout { pixel } => {
                    runs.extend(self.cursor_readout(*pixel, camera, theme));
                }
                _ => {}
            }
        }
        runs
    }

    /// The `UV: u, v` readout for `pixel`, anchored bottom-left. `None`
    /// without a font or when `pixel` is outside the viewport.
    pub fn cursor_readout(&self, pixel: Vec2, camera: &Camera2D, theme: &Theme) -> Option<TextRun> {
        let (fonts, font) = self.fonts.as_ref()?;
        let uv = readout::cursor_uv(camera, Some(pixel))?;
        let size = self.readout_font_size;
        let origin = readout::readout_origin(camera.viewport(), fonts.line_height(*font, size));
        let color = Theme::color(theme.readout);
        Some(text_run(readout::readout_text(uv), origin, size, color, *font))
    }

    /// Draws `runs` over the current target contents.
    pub fn render_text(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, runs: &[TextRun]) {
        let Some((fonts, _)) = self.fonts.as_ref() else { return; };
        self.text.render(ctx, target, runs, fonts);
    }
}

fn text_run(text: String, origin: Vec2, size: f32, color: Color, font: FontId) -> TextRun {
    TextRun { text, origin: ScreenVec2::new(origin.x, origin.y), size, color, font }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera2D {
        Camera2D::new(800.0, 600.0, &ViewportSettings::default())
    }

    #[test]
    fn no_font_means_no_text() {
        let overlay = OverlayRenderer::new(&ViewportSettings::default());
        assert!(!overlay.has_font());
        let calls = [DrawCall::AxisLabels, DrawCall::CursorReadout { pixel: Vec2::new(10.0, 10.0) }];
        let runs = overlay.text_runs(&calls, &camera(), &Theme::default());
        assert!(runs.is_empty());
        assert!(overlay.cursor_readout(Vec2::new(10.0, 10.0), &camera(), &Theme::default()).is_none());
    }

    #[test]
    fn grid_starts_empty() {
        let overlay = OverlayRenderer::new(&ViewportSettings::default());
        assert!(overlay.grid().is_empty());
        assert_eq!(overlay.border_width(), 2.0);
    }
}
