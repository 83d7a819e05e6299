//! Cursor position readout.

use glam::Vec2;

use crate::camera::Camera2D;

/// Distance of the readout from the bottom-left corner, in logical pixels.
pub const READOUT_PADDING: f32 = 5.0;

pub fn readout_text(uv: Vec2) -> String {
    format!("UV: {:.3}, {:.3}", uv.x, uv.y)
}

/// UV under `cursor`, or `None` when the cursor is outside the viewport.
pub fn cursor_uv(camera: &Camera2D, cursor: Option<Vec2>) -> Option<Vec2> {
    let p = cursor?;
    cursor_in_viewport(p, camera.viewport()).then(|| camera.screen_to_uv(p))
}

/// Half-open containment test in logical pixels.
pub fn cursor_in_viewport(p: Vec2, viewport: Vec2) -> bool {
    p.is_finite() && p.x >= 0.0 && p.y >= 0.0 && p.x < viewport.x && p.y < viewport.y
}

/// Top-left of the readout line box, anchored bottom-left.
pub fn readout_origin(viewport: Vec2, line_height: f32) -> Vec2 {
    Vec2::new(READOUT_PADDING, (viewport.y - READOUT_PADDING - line_height).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportSettings;

    fn camera() -> Camera2D {
        Camera2D::new(800.0, 600.0, &ViewportSettings::default())
    }

    #[test]
    fn text_has_three_decimals() {
        assert_eq!(readout_text(Vec2::new(0.5, -0.25)), "UV: 0.500, -0.250");
    }

    #[test]
    fn center_reads_camera_center() {
        let c = camera();
        let uv = cursor_uv(&c, Some(Vec2::new(400.0, 300.0)));
        assert_eq!(uv, Some(Vec2::splat(0.5)));
    }

    #[test]
    fn hidden_outside_viewport() {
        let c = camera();
        assert_eq!(cursor_uv(&c, None), None);
        assert_eq!(cursor_uv(&c, Some(Vec2::new(-1.0, 10.0))), None);
        assert_eq!(cursor_uv(&c, Some(Vec2::new(800.0, 10.0))), None);
    }

    #[test]
    fn origin_is_bottom_left() {
        assert_eq!(readout_origin(Vec2::new(800.0, 600.0), 16.0), Vec2::new(5.0, 579.0));
    }
}
