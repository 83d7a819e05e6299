use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use uview_engine::coords::Viewport;
use uview_engine::core::{App, AppControl, FrameCtx, FrameStatus, Idle, Redraw};
use uview_engine::device::Gpu;
use uview_engine::input::{InputEvent, InputState, Key, KeyState};
use uview_engine::text::FontSystem;
use uview_viewport::{
    Dispatch, FsImageLoader, UvViewport, ViewConfig, ViewportEvent, ViewportObserver,
    ViewportSettings,
};

use crate::scene::JsonScene;

const FONT_CANDIDATES: [&str; 5] = [
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

/// How often the loop wakes to collect texture decodes.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Logs what the viewport reports besides diagnostics, which it logs itself.
struct EventLog;

impl ViewportObserver for EventLog {
    fn on_event(&mut self, event: &ViewportEvent) {
        match event {
            ViewportEvent::Diagnostic(_) => {}
            ViewportEvent::SelectionChanged { mesh_ids } => {
                log::info!("selected: {}", mesh_ids.join(", "));
            }
            ViewportEvent::UvSetChanged { name } => {
                log::info!("uv set: {}", name.as_deref().unwrap_or("<none>"));
            }
            ViewportEvent::TextureStateChanged { path, state } => {
                log::debug!("{}: {state:?}", path.display());
            }
        }
    }
}

pub struct StudioApp {
    viewport: UvViewport,
    scene: JsonScene,
}

impl StudioApp {
    pub fn new(
        settings: ViewportSettings,
        config: ViewConfig,
        scene: JsonScene,
        texture: Option<PathBuf>,
    ) -> Self {
        let mut viewport = UvViewport::new(settings, Arc::new(FsImageLoader), Dispatch::Background);
        viewport.subscribe(Box::new(EventLog));
        viewport.set_view_config(config);
        viewport.refresh_selection(&scene);
        if let Some(path) = texture {
            viewport.load_texture(path);
        }
        Self { viewport, scene }
    }

    /// Studio shortcuts. Navigation keys are handled by the viewport.
    fn handle_key(&mut self, key: Key) -> Redraw {
        let mut config = self.viewport.config().clone();
        match key {
            Key::G => config.show_grid = !config.show_grid,
            Key::B => config.show_borders = !config.show_borders,
            Key::T => config.show_texture = !config.show_texture,
            Key::P => config.show_uv_position = !config.show_uv_position,
            Key::W => config.repeat_texture = !config.repeat_texture,
            Key::R => return self.viewport.reload_texture(),
            Key::C => return self.viewport.clear_texture(),
            Key::S => return self.viewport.refresh_selection(&self.scene),
            Key::U => return self.cycle_uv_set(),
            _ => return Redraw::Skip,
        }
        self.viewport.set_view_config(config)
    }

    fn cycle_uv_set(&mut self) -> Redraw {
        let names = self.viewport.available_uv_set_names();
        if names.is_empty() {
            return Redraw::Skip;
        }
        let next = match self.viewport.active_uv_set() {
            Some(current) => names
                .iter()
                .position(|n| n == current)
                .map_or(0, |i| (i + 1) % names.len()),
            None => 0,
        };
        let name = names[next].clone();
        self.viewport.set_active_uv_set(Some(&name))
    }
}

impl App for StudioApp {
    fn on_init(&mut self, gpu: &Gpu<'_>) -> anyhow::Result<()> {
        self.viewport
            .attach_gpu(gpu.device(), gpu.surface_format())
            .context("failed to create viewport renderer")?;

        let mut fonts = FontSystem::new();
        match fonts.load_first(&FONT_CANDIDATES[..]) {
            Some(font) => self.viewport.set_font(fonts, font),
            None => log::warn!("no system font found; axis numbers and readout are disabled"),
        }
        Ok(())
    }

    fn on_input(&mut self, event: &InputEvent, _state: &InputState) -> Redraw {
        let redraw = self.viewport.handle_input(event);
        match event {
            InputEvent::Key { key, state: KeyState::Pressed, repeat: false, modifiers }
                if !modifiers.any() =>
            {
                redraw.or(self.handle_key(*key))
            }
            _ => redraw,
        }
    }

    fn on_resize(&mut self, viewport: Viewport) -> Redraw {
        self.viewport.resize(viewport.width, viewport.height)
    }

    fn on_idle(&mut self) -> Idle {
        Idle {
            redraw: self.viewport.poll(),
            wake_after: self.viewport.has_pending_loads().then_some(LOAD_POLL_INTERVAL),
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        // Not every platform reports an initial resize.
        let size = ctx.window.viewport();
        let current = self.viewport.camera().viewport();
        if size.is_valid() && (current.x != size.width || current.y != size.height) {
            self.viewport.resize(size.width, size.height);
        }

        let viewport = &mut self.viewport;
        match ctx.render(|rctx, target| viewport.render(rctx, target)) {
            FrameStatus::Presented { frame_index } => viewport.frame_presented(frame_index),
            FrameStatus::Skipped => viewport.frame_skipped(),
            FrameStatus::Fatal => {
                log::error!("surface lost; exiting");
                return AppControl::Exit;
            }
        }
        AppControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const SCENE: &str = r#"{ "meshes": [ {
        "id": "/World/A",
        "face_vertex_counts": [4],
        "face_vertex_indices": [0, 1, 2, 3],
        "uv_sets": {
            "st": { "positions": [[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0]], "interpolation": "vertex" },
            "uv": { "positions": [[0.0,0.0],[0.5,0.0],[0.5,0.5],[0.0,0.5]], "interpolation": "vertex" }
        }
    } ] }"#;

    fn app() -> StudioApp {
        let scene = JsonScene::parse(SCENE, Path::new("")).unwrap();
        StudioApp::new(ViewportSettings::default(), ViewConfig::default(), scene, None)
    }

    #[test]
    fn starts_on_default_uv_set() {
        let app = app();
        assert_eq!(app.viewport.active_uv_set(), Some("uv"));
        assert_eq!(app.viewport.geometry().vertex_count("/World/A"), Some(4));
    }

    #[test]
    fn u_cycles_uv_sets() {
        let mut app = app();
        app.handle_key(Key::U);
        assert_eq!(app.viewport.active_uv_set(), Some("st"));
        app.handle_key(Key::U);
        assert_eq!(app.viewport.active_uv_set(), Some("uv"));
    }

    #[test]
    fn g_toggles_grid() {
        let mut app = app();
        app.handle_key(Key::G);
        assert!(!app.viewport.config().show_grid);
        app.handle_key(Key::G);
        assert!(app.viewport.config().show_grid);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let mut app = app();
        assert_eq!(app.handle_key(Key::Q), Redraw::Skip);
    }
}
