//! View flags and tunables.
//!
//! Everything here deserializes from JSON with every field optional; missing
//! fields take the defaults below.

use serde::Deserialize;
use uview_engine::paint::Color;

/// What the viewport draws. Mutated by the UI, read every frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub show_borders: bool,
    pub show_grid: bool,
    pub show_uv_position: bool,
    pub show_texture: bool,
    pub repeat_texture: bool,
    /// Requested UV set; `None` picks the default for the selection.
    pub active_uv_set: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            show_borders: true,
            show_grid: true,
            show_uv_position: true,
            show_texture: true,
            repeat_texture: false,
            active_uv_set: None,
        }
    }
}

/// sRGB colors of every element the viewport draws.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: [f32; 3],
    pub grid_minor: [f32; 3],
    pub grid_major: [f32; 3],
    pub grid_origin: [f32; 3],
    pub u_axis: [f32; 3],
    pub v_axis: [f32; 3],
    pub wireframe: [f32; 3],
    pub border: [f32; 3],
    pub placeholder: [f32; 3],
    pub axis_label: [f32; 3],
    pub readout: [f32; 3],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: [0.3, 0.3, 0.3],
            grid_minor: [0.23, 0.23, 0.23],
            grid_major: [0.0, 0.0, 0.0],
            grid_origin: [0.0, 0.0, 1.0],
            u_axis: [1.0, 0.0, 0.0],
            v_axis: [1.0, 1.0, 0.0],
            wireframe: [1.0, 1.0, 1.0],
            border: [1.0, 0.55, 0.1],
            placeholder: [0.8, 0.2, 0.8],
            axis_label: [0.0, 0.0, 0.0],
            readout: [1.0, 1.0, 1.0],
        }
    }
}

impl Theme {
    #[inline]
    pub fn color(rgb: [f32; 3]) -> Color {
        Color::from_srgb_rgb(rgb)
    }
}

/// Interaction and rendering tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Zoom limits in logical pixels per UV unit.
    pub min_scale: f32,
    pub max_scale: f32,
    /// Fraction of the bounds' extent added on every side by focus.
    pub focus_margin: f32,
    /// Relative zoom per wheel notch.
    pub wheel_zoom_step: f32,
    /// Multiplier on the Alt+right-drag zoom response.
    pub drag_zoom_sensitivity: f32,
    /// Lower bound of the drag zoom factor.
    pub min_drag_zoom: f32,
    /// Border stroke width in logical pixels.
    pub border_width: f32,
    /// Smallest on-screen distance between minor grid lines.
    pub grid_min_px: f32,
    /// Smallest on-screen distance between axis labels.
    pub label_min_px: f32,
    pub label_font_size: f32,
    pub readout_font_size: f32,
    pub max_resident_textures: usize,
    pub theme: Theme,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 1.0e6,
            focus_margin: 0.1,
            wheel_zoom_step: 0.03,
            drag_zoom_sensitivity: 1.0,
            min_drag_zoom: 0.01,
            border_width: 2.0,
            grid_min_px: 8.0,
            label_min_px: 48.0,
            label_font_size: 11.0,
            readout_font_size: 14.0,
            max_resident_textures: 64,
            theme: Theme::default(),
        }
    }
}

impl ViewportSettings {
    /// Returns a copy with out-of-range values replaced by usable ones.
    ///
    /// Scale limits must be positive and ordered; a config file that swaps
    /// them gets them swapped back rather than rejected.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        if !(self.min_scale > 0.0 && self.min_scale.is_finite()) {
            self.min_scale = d.min_scale;
        }
        if !(self.max_scale > 0.0 && self.max_scale.is_finite()) {
            self.max_scale = d.max_scale;
        }
        if self.min_scale > self.max_scale {
            std::mem::swap(&mut self.min_scale, &mut self.max_scale);
        }
        self.focus_margin = self.focus_margin.clamp(0.0, 1.0);
        if !(self.wheel_zoom_step > 0.0 && self.wheel_zoom_step < 1.0) {
            self.wheel_zoom_step = d.wheel_zoom_step;
        }
        if !(self.min_drag_zoom > 0.0) {
            self.min_drag_zoom = d.min_drag_zoom;
        }
        self.border_width = self.border_width.max(0.5);
        self.grid_min_px = self.grid_min_px.max(1.0);
        self.label_min_px = self.label_min_px.max(self.grid_min_px);
        self.max_resident_textures = self.max_resident_textures.max(1);
        self
    }
}
