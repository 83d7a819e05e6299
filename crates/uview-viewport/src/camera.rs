use glam::{Mat4, Vec2};

use crate::config::ViewportSettings;
use crate::mesh::Bounds;

/// Orthographic 2D camera over UV space.
///
/// State is the UV point at the viewport center plus a uniform scale in
/// logical pixels per UV unit. Screen space is top-left origin with +Y down;
/// UV space has +V up, so the two Y axes are opposed.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2D {
    center: Vec2,
    scale: f32,
    viewport: Vec2,
    min_scale: f32,
    max_scale: f32,
    focus_margin: f32,
}

impl Camera2D {
    /// A camera for a `width × height` viewport, focused on the unit square.
    pub fn new(width: f32, height: f32, settings: &ViewportSettings) -> Self {
        let mut camera = Self {
            center: Vec2::splat(0.5),
            scale: 1.0,
            viewport: sanitize_viewport(width, height),
            min_scale: settings.min_scale,
            max_scale: settings.max_scale.max(settings.min_scale),
            focus_margin: settings.focus_margin,
        };
        camera.focus(None);
        camera
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Updates the viewport size. Center and scale are kept, so a larger
    /// window shows more UV area at the same zoom.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = sanitize_viewport(width, height);
    }

    /// Moves the view by a pointer drag of `delta` logical pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.center.x -= delta.x / self.scale;
        self.center.y += delta.y / self.scale;
    }

    /// Multiplies the scale by `factor`, keeping the UV point under `pivot`
    /// fixed on screen. Returns whether the scale changed.
    pub fn zoom(&mut self, factor: f32, pivot: Vec2) -> bool {
        if !(factor.is_finite() && factor > 0.0) {
            return false;
        }
        self.zoom_to(self.scale * factor, pivot)
    }

    /// Sets the scale directly (clamped), pivoting like [`zoom`](Self::zoom).
    ///
    /// A focus may leave the scale below `min_scale`; from there the view
    /// can zoom in but not further out.
    pub fn zoom_to(&mut self, scale: f32, pivot: Vec2) -> bool {
        if !(scale.is_finite() && scale > 0.0) {
            return false;
        }
        let scale = scale.clamp(self.min_scale.min(self.scale), self.max_scale);
        if scale == self.scale {
            return false;
        }
        let anchor = self.screen_to_uv(pivot);
        self.scale = scale;
        let offset = pivot - self.viewport * 0.5;
        self.center = Vec2::new(anchor.x - offset.x / scale, anchor.y + offset.y / scale);
        true
    }

    /// Fits `bounds` plus the focus margin inside the viewport.
    ///
    /// Zero-width or zero-height bounds are widened to one UV unit around
    /// their center; `None` focuses the unit square. Only `max_scale` limits
    /// the result, so large bounds still fit.
    pub fn focus(&mut self, bounds: Option<Bounds>) {
        let bounds = bounds.unwrap_or(Bounds::UNIT);
        let center = bounds.center();
        let mut size = bounds.size();
        if size.x <= f32::EPSILON {
            size.x = 1.0;
        }
        if size.y <= f32::EPSILON {
            size.y = 1.0;
        }
        let padded = size * (1.0 + 2.0 * self.focus_margin);

        let scale = (self.viewport.x / padded.x).min(self.viewport.y / padded.y);
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale.min(self.max_scale);
        }
        self.center = center;
    }

    /// UV rectangle currently visible.
    pub fn visible_bounds(&self) -> Bounds {
        let half = self.viewport * 0.5 / self.scale;
        Bounds::new(self.center - half, self.center + half)
    }

    /// Orthographic projection mapping the visible UV rectangle to NDC.
    pub fn view_projection(&self) -> Mat4 {
        let b = self.visible_bounds();
        Mat4::orthographic_rh(b.min.x, b.max.x, b.min.y, b.max.y, -1.0, 1.0)
    }

    pub fn screen_to_uv(&self, p: Vec2) -> Vec2 {
        let offset = p - self.viewport * 0.5;
        Vec2::new(self.center.x + offset.x / self.scale, self.center.y - offset.y / self.scale)
    }

    pub fn uv_to_screen(&self, uv: Vec2) -> Vec2 {
        let d = (uv - self.center) * self.scale;
        Vec2::new(self.viewport.x * 0.5 + d.x, self.viewport.y * 0.5 - d.y)
    }

    /// Logical pixel to NDC (+Y up).
    pub fn screen_to_ndc(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x / self.viewport.x * 2.0 - 1.0, 1.0 - p.y / self.viewport.y * 2.0)
    }
}

fn sanitize_viewport(width: f32, height: f32) -> Vec2 {
    let fix = |v: f32| if v.is_finite() && v >= 1.0 { v } else { 1.0 };
    Vec2::new(fix(width), fix(height))
}
