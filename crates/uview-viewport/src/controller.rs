//! Input handling: translates pointer, wheel and key events into camera
//! updates and redraw requests.
//!
//! Bindings:
//! - Alt + middle drag: pan
//! - Alt + right drag: zoom around the drag start
//! - wheel: zoom around the cursor
//! - F: focus the selection (or the unit square)

use glam::Vec2;
use uview_engine::core::Redraw;
use uview_engine::input::{InputEvent, Key, KeyState, MouseButton, MouseButtonState, PIXELS_PER_LINE};

use crate::camera::Camera2D;
use crate::config::ViewportSettings;
use crate::mesh::Bounds;

/// Coalesces redraw requests until the next frame is drawn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RedrawGate {
    pending: bool,
}

impl RedrawGate {
    /// Marks a redraw as pending. True only on the idle to pending transition.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Called once a frame has been drawn.
    pub fn frame_drawn(&mut self) {
        self.pending = false;
    }
}

#[derive(Debug, Clone)]
enum Drag {
    Pan { last: Vec2 },
    Zoom { start: Vec2, camera: Camera2D },
}

impl Drag {
    fn button(&self) -> MouseButton {
        match self {
            Drag::Pan { .. } => MouseButton::Middle,
            Drag::Zoom { .. } => MouseButton::Right,
        }
    }
}

pub struct ViewportController {
    wheel_zoom_step: f32,
    drag_zoom_sensitivity: f32,
    min_drag_zoom: f32,

    drag: Option<Drag>,
    cursor: Option<Vec2>,
    gate: RedrawGate,
}

impl ViewportController {
    pub fn new(settings: &ViewportSettings) -> Self {
        Self {
            wheel_zoom_step: settings.wheel_zoom_step,
            drag_zoom_sensitivity: settings.drag_zoom_sensitivity,
            min_drag_zoom: settings.min_drag_zoom,
            drag: None,
            cursor: None,
            gate: RedrawGate::default(),
        }
    }

    /// Last pointer position over the window, in logical pixels.
    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn gate(&self) -> &RedrawGate {
        &self.gate
    }

    pub fn frame_drawn(&mut self) {
        self.gate.frame_drawn();
    }

    /// Requests a redraw for a change made outside input handling.
    pub fn invalidate(&mut self) -> Redraw {
        Redraw::from(self.gate.request())
    }

    /// Applies `event` to `camera`.
    ///
    /// `readout_visible` makes bare pointer motion redraw; `focus_bounds` is
    /// only called for the focus key.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        camera: &mut Camera2D,
        readout_visible: bool,
        focus_bounds: impl FnOnce() -> Option<Bounds>,
    ) -> Redraw {
        let changed = match event {
            InputEvent::PointerButton(ev) => {
                let p = Vec2::new(ev.x, ev.y);
                self.cursor = Some(p);
                match ev.state {
                    MouseButtonState::Pressed if ev.modifiers.alt && self.drag.is_none() => {
                        self.drag = match ev.button {
                            MouseButton::Middle => Some(Drag::Pan { last: p }),
                            MouseButton::Right => Some(Drag::Zoom { start: p, camera: camera.clone() }),
                            _ => None,
                        };
                        false
                    }
                    MouseButtonState::Released
                        if self.drag.as_ref().is_some_and(|d| d.button() == ev.button) =>
                    {
                        self.drag = None;
                        false
                    }
                    _ => false,
                }
            }

            InputEvent::PointerMoved(ev) => {
                let p = Vec2::new(ev.x, ev.y);
                self.cursor = Some(p);
                match &mut self.drag {
                    Some(Drag::Pan { last }) => {
                        let delta = p - *last;
                        *last = p;
                        camera.pan(delta);
                        delta != Vec2::ZERO
                    }
                    Some(Drag::Zoom { start, camera: at_start }) => {
                        let factor = drag_zoom_factor(
                            p - *start,
                            camera.viewport(),
                            self.drag_zoom_sensitivity,
                            self.min_drag_zoom,
                        );
                        let size = camera.viewport();
                        *camera = at_start.clone();
                        camera.set_viewport(size.x, size.y);
                        camera.zoom(factor, *start);
                        true
                    }
                    None => readout_visible,
                }
            }

            InputEvent::PointerLeft => {
                self.cursor = None;
                readout_visible
            }

            InputEvent::MouseWheel { delta, .. } => {
                let lines = delta.vertical_lines(PIXELS_PER_LINE);
                if lines == 0.0 || !lines.is_finite() {
                    false
                } else {
                    let pivot = self.cursor.unwrap_or(camera.viewport() * 0.5);
                    camera.zoom((1.0 + self.wheel_zoom_step).powf(lines), pivot)
                }
            }

            InputEvent::Key { key: Key::F, state: KeyState::Pressed, repeat: false, modifiers } => {
                if modifiers.ctrl || modifiers.alt || modifiers.meta {
                    false
                } else {
                    camera.focus(focus_bounds());
                    true
                }
            }

            InputEvent::Focused(false) => {
                self.drag = None;
                false
            }

            _ => false,
        };

        if changed { Redraw::from(self.gate.request()) } else { Redraw::Skip }
    }
}

/// Zoom factor for a drag of `delta` pixels from the drag start.
///
/// Right and down zoom in; a full viewport diagonal doubles the scale at
/// unit sensitivity.
pub fn drag_zoom_factor(delta: Vec2, viewport: Vec2, sensitivity: f32, min_factor: f32) -> f32 {
    let w = viewport.x.max(1.0);
    let h = viewport.y.max(1.0);
    (1.0 + (delta.x / w + delta.y / h) * sensitivity).max(min_factor)
}
