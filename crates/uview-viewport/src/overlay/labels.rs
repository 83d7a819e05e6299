//! Axis numbers along the U and V origin lines.

use glam::Vec2;

use crate::camera::Camera2D;

use super::grid::{power_of_ten_at_least, steps};

/// Gap between an axis line and its labels, in logical pixels.
pub const LABEL_OFFSET: f32 = 3.0;

/// One axis number in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub text: String,
    /// Top-left of the label box in logical pixels.
    pub origin: Vec2,
}

/// Label step and the number of decimals it needs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelStep {
    pub step: f64,
    pub decimals: usize,
}

impl LabelStep {
    pub fn for_scale(scale: f32, min_px: f32) -> Self {
        let step = power_of_ten_at_least(min_px as f64 / scale.max(f32::MIN_POSITIVE) as f64);
        let decimals = (-step.log10().round()).max(0.0) as usize;
        Self { step, decimals }
    }

    pub fn format(&self, k: i64) -> String {
        let value = k as f64 * self.step;
        // Avoid "-0.0".
        let value = if value == 0.0 { 0.0 } else { value };
        format!("{:.*}", self.decimals, value)
    }
}

/// Labels for every step along U (below the V=0 line) and along V (right of
/// the U=0 line).
///
/// When an origin line is off screen its labels stick to the nearest
/// viewport edge. `line_height` is the label text height, used to keep the
/// U row inside the viewport.
pub fn axis_labels(camera: &Camera2D, step: LabelStep, line_height: f32) -> Vec<AxisLabel> {
    let visible = camera.visible_bounds();
    let size = camera.viewport();
    let origin = camera.uv_to_screen(Vec2::ZERO);
    let mut labels = Vec::new();

    let row_y = (origin.y + LABEL_OFFSET).clamp(0.0, (size.y - line_height).max(0.0));
    for k in steps(visible.min.x, visible.max.x, step.step) {
        let x = camera.uv_to_screen(Vec2::new((k as f64 * step.step) as f32, 0.0)).x;
        labels.push(AxisLabel { text: step.format(k), origin: Vec2::new(x + LABEL_OFFSET, row_y) });
    }

    let column_x = (origin.x + LABEL_OFFSET).clamp(0.0, size.x);
    for k in steps(visible.min.y, visible.max.y, step.step) {
        // The origin already has its U label.
        if k == 0 {
            continue;
        }
        let y = camera.uv_to_screen(Vec2::new(0.0, (k as f64 * step.step) as f32)).y + LABEL_OFFSET;
        if y > size.y - line_height {
            continue;
        }
        labels.push(AxisLabel { text: step.format(k), origin: Vec2::new(column_x, y) });
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportSettings;

    fn camera() -> Camera2D {
        Camera2D::new(800.0, 600.0, &ViewportSettings::default())
    }

    // ── step ──────────────────────────────────────────────────────────────

    #[test]
    fn decimals_follow_the_step() {
        let coarse = LabelStep::for_scale(10.0, 48.0);
        assert_eq!(coarse.decimals, 0);
        assert_eq!(coarse.format(3), "30");

        let fine = LabelStep::for_scale(50_000.0, 48.0);
        assert_eq!(fine.decimals, 3);
        assert_eq!(fine.format(-7), "-0.007");
    }

    #[test]
    fn zero_never_prints_negative() {
        let s = LabelStep::for_scale(500.0, 48.0);
        assert_eq!(s.format(0), "0.0");
    }

    // ── placement ─────────────────────────────────────────────────────────

    #[test]
    fn unit_view_labels_both_axes() {
        let c = camera();
        let labels = axis_labels(&c, LabelStep::for_scale(c.scale(), 48.0), 12.0);
        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert!(texts.contains(&"0.0"));
        assert!(texts.contains(&"1.0"));
        // "0.0" only once: the V column skips the origin.
        assert_eq!(texts.iter().filter(|t| **t == "0.0").count(), 1);
    }

    #[test]
    fn labels_stick_to_edge_when_axis_is_off_screen() {
        let mut c = camera();
        // Move the V=0 line far above the top edge.
        c.pan(glam::Vec2::new(0.0, -5000.0));
        let labels = axis_labels(&c, LabelStep::for_scale(c.scale(), 48.0), 12.0);
        assert!(!labels.is_empty());
        for l in &labels {
            assert!(l.origin.y >= 0.0 && l.origin.y <= 600.0);
        }
    }
}
