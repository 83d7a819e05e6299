//! Host-facing facade.
//!
//! [`UvViewport`] owns one viewport's camera, controller, geometry, texture
//! cache and renderer. The host talks to it through plain method calls and
//! hears back through [`ViewportObserver`]s; scene data comes in through a
//! [`SceneSource`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uview_engine::core::Redraw;
use uview_engine::input::InputEvent;
use uview_engine::render::{RenderCtx, RenderTarget};
use uview_engine::text::{FontId, FontSystem};

use crate::camera::Camera2D;
use crate::config::{Theme, ViewConfig, ViewportSettings};
use crate::controller::ViewportController;
use crate::error::{Diagnostic, ViewerError};
use crate::geometry::GeometryBuffer;
use crate::mesh::UvMesh;
use crate::overlay::readout;
use crate::scene::{
    plan_frame, FrameInputs, FramePlan, SceneFrame, SceneRenderer, TextureBinding, TextureSource,
};
use crate::texture::{Dispatch, ImageLoader, LoadState, TextureCache};

/// UV set names preferred as the default, in order.
pub const DEFAULT_UV_SET_NAMES: [&str; 2] = ["uv", "st"];

/// Length of the recent texture list.
pub const MAX_RECENT_TEXTURES: usize = 5;

/// Where the viewport gets meshes and their material textures.
pub trait SceneSource {
    /// Currently selected meshes, in selection order.
    fn selected_meshes(&self) -> Vec<UvMesh>;

    /// Texture files bound to `mesh_id`'s material, most relevant first.
    fn bound_material_texture_paths(&self, mesh_id: &str) -> Vec<PathBuf>;
}

/// Something the host may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    Diagnostic(Diagnostic),
    SelectionChanged { mesh_ids: Vec<String> },
    UvSetChanged { name: Option<String> },
    TextureStateChanged { path: PathBuf, state: LoadState },
}

pub trait ViewportObserver {
    fn on_event(&mut self, event: &ViewportEvent);
}

pub struct UvViewport {
    settings: ViewportSettings,
    config: ViewConfig,

    camera: Camera2D,
    sized: bool,
    controller: ViewportController,

    geometry: GeometryBuffer,
    bound_textures: Vec<Vec<PathBuf>>,

    textures: TextureCache,
    explicit_texture: Option<PathBuf>,
    recent_textures: Vec<PathBuf>,

    renderer: Option<SceneRenderer>,
    font: Option<(FontSystem, FontId)>,

    observers: Vec<Box<dyn ViewportObserver>>,
}

impl UvViewport {
    pub fn new(settings: ViewportSettings, loader: Arc<dyn ImageLoader>, dispatch: Dispatch) -> Self {
        let settings = settings.sanitized();
        Self {
            camera: Camera2D::new(1.0, 1.0, &settings),
            sized: false,
            controller: ViewportController::new(&settings),
            config: ViewConfig::default(),
            geometry: GeometryBuffer::new(),
            bound_textures: Vec::new(),
            textures: TextureCache::new(loader, dispatch),
            explicit_texture: None,
            recent_textures: Vec::new(),
            renderer: None,
            font: None,
            observers: Vec::new(),
            settings,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn is_gpu_attached(&self) -> bool {
        self.renderer.is_some()
    }

    // ── host API ──────────────────────────────────────────────────────────

    pub fn subscribe(&mut self, observer: Box<dyn ViewportObserver>) {
        self.observers.push(observer);
    }

    pub fn set_view_config(&mut self, config: ViewConfig) -> Redraw {
        let uv_set_changed = config.active_uv_set != self.config.active_uv_set;
        self.config = config;
        if uv_set_changed {
            self.apply_uv_set();
        }
        self.controller.invalidate()
    }

    /// Selects the UV set to display. `None` returns to the default.
    ///
    /// Meshes lacking the set contribute nothing and are reported as warnings.
    pub fn set_active_uv_set(&mut self, name: Option<&str>) -> Redraw {
        self.config.active_uv_set = name.map(str::to_string);
        self.apply_uv_set();
        self.controller.invalidate()
    }

    /// UV set names over the current selection, sorted, without duplicates.
    pub fn available_uv_set_names(&self) -> Vec<String> {
        available_uv_set_names(self.geometry.source_meshes())
    }

    /// UV set geometry is currently built from.
    pub fn active_uv_set(&self) -> Option<&str> {
        self.geometry.active_uv_set()
    }

    /// Pulls the selection from `source` and rebuilds geometry.
    pub fn refresh_selection(&mut self, source: &dyn SceneSource) -> Redraw {
        let meshes = source.selected_meshes();
        self.bound_textures =
            meshes.iter().map(|m| source.bound_material_texture_paths(&m.id)).collect();
        let mesh_ids: Vec<String> = meshes.iter().map(|m| m.id.clone()).collect();
        log::info!("selection: {} mesh(es)", mesh_ids.len());

        let previous = self.geometry.active_uv_set().map(str::to_string);
        let uv_set = self.effective_uv_set(&meshes);
        let diagnostics = self.geometry.set_selection(meshes, uv_set.as_deref());

        self.report(diagnostics);
        self.emit(&ViewportEvent::SelectionChanged { mesh_ids });
        if previous != uv_set {
            self.emit(&ViewportEvent::UvSetChanged { name: uv_set });
        }
        self.controller.invalidate()
    }

    /// Shows `path` as a background plane instead of the bound textures.
    pub fn load_texture(&mut self, path: impl AsRef<Path>) -> Redraw {
        let path = path.as_ref().to_path_buf();
        log::info!("loading texture {}", path.display());
        self.textures.resolve(&path, self.config.repeat_texture);

        self.recent_textures.retain(|p| *p != path);
        self.recent_textures.insert(0, path.clone());
        self.recent_textures.truncate(MAX_RECENT_TEXTURES);

        self.explicit_texture = Some(path);
        self.controller.invalidate()
    }

    /// Returns to drawing each mesh's bound texture.
    pub fn clear_texture(&mut self) -> Redraw {
        self.explicit_texture = None;
        self.controller.invalidate()
    }

    /// Reloads the explicit texture from disk, superseding any load in flight.
    pub fn reload_texture(&mut self) -> Redraw {
        let Some(path) = self.explicit_texture.clone() else {
            return Redraw::Skip;
        };
        self.textures.reload(&path, self.config.repeat_texture);
        self.controller.invalidate()
    }

    /// Most recently loaded texture paths, newest first.
    pub fn recent_texture_paths(&self) -> &[PathBuf] {
        &self.recent_textures
    }

    pub fn active_texture_path(&self) -> Option<&Path> {
        self.explicit_texture.as_deref()
    }

    /// Bound material textures over the selection, sorted, without duplicates.
    pub fn available_texture_paths(&self) -> Vec<PathBuf> {
        let set: BTreeSet<&PathBuf> = self.bound_textures.iter().flatten().collect();
        set.into_iter().cloned().collect()
    }

    pub fn cursor_uv_position(&self) -> Option<(f32, f32)> {
        readout::cursor_uv(&self.camera, self.controller.cursor()).map(|uv| (uv.x, uv.y))
    }

    /// Fits the selection, or the unit square when nothing is resident.
    pub fn focus(&mut self) -> Redraw {
        self.camera.focus(self.geometry.bounds());
        self.controller.invalidate()
    }

    // ── runtime hooks ─────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: &InputEvent) -> Redraw {
        let readout_visible = self.config.show_uv_position;
        let geometry = &self.geometry;
        self.controller.handle(event, &mut self.camera, readout_visible, || geometry.bounds())
    }

    /// New drawable size in logical pixels. The first size also focuses the
    /// unit square.
    pub fn resize(&mut self, width: f32, height: f32) -> Redraw {
        self.camera.set_viewport(width, height);
        if !self.sized {
            self.camera.focus(None);
            self.sized = true;
        }
        self.controller.invalidate()
    }

    /// Collects finished texture loads and notifies observers.
    pub fn poll(&mut self) -> Redraw {
        let (events, diagnostics) = self.textures.poll();
        self.report(diagnostics);
        for e in &events {
            self.emit(&ViewportEvent::TextureStateChanged { path: e.path.clone(), state: e.state });
        }
        if events.is_empty() { Redraw::Skip } else { self.controller.invalidate() }
    }

    pub fn has_pending_loads(&self) -> bool {
        self.textures.has_pending_loads()
    }

    /// Installs the font for axis numbers and the readout.
    pub fn set_font(&mut self, fonts: FontSystem, font: FontId) {
        match self.renderer.as_mut() {
            Some(renderer) => renderer.set_font(fonts, font),
            None => self.font = Some((fonts, font)),
        }
    }

    /// Creates the renderer. A shader failure is returned and also reported
    /// to observers.
    pub fn attach_gpu(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<(), ViewerError> {
        let mut renderer = match SceneRenderer::new(device, format, &self.settings) {
            Ok(r) => r,
            Err(e) => {
                self.report(vec![Diagnostic::new(e.clone())]);
                return Err(e);
            }
        };
        if let Some((fonts, font)) = self.font.take() {
            renderer.set_font(fonts, font);
        }
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Plans the current frame, issuing texture loads as needed.
    pub fn plan(&mut self) -> FramePlan {
        let textures = self.texture_source();
        self.plan_with(&textures)
    }

    /// Uploads pending resources and records the frame.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        // This frame shows the current state; later changes need a new one.
        self.controller.frame_drawn();
        if self.renderer.is_none() {
            return;
        }

        let plan = self.prepare_frame(ctx.device.limits().max_texture_dimension_2d);
        self.geometry.ensure_uploaded(ctx.device, ctx.frame_index);

        let Some(renderer) = self.renderer.as_mut() else { return; };
        self.textures.upload_pending(
            ctx.device,
            ctx.queue,
            renderer.texture_layout(),
            renderer.sampler(),
            ctx.frame_index,
        );
        renderer.render(ctx, target, &SceneFrame {
            plan: &plan,
            camera: &self.camera,
            geometry: &self.geometry,
            textures: &self.textures,
        });
    }

    /// The host got no frame to draw into (minimized window, surface
    /// timeout). The next change requests a redraw again.
    pub fn frame_skipped(&mut self) {
        self.controller.frame_drawn();
    }

    /// Releases resources retired at or before `frame_index`.
    pub fn frame_presented(&mut self, frame_index: u64) {
        self.geometry.release_retired(frame_index);
        self.textures.release_retired(frame_index);
    }

    /// Stops texture loading and drops every GPU resource.
    pub fn shutdown(&mut self) {
        self.textures.shutdown();
        self.geometry.release_gpu();
        self.renderer = None;
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// The GPU-free part of a frame: fails images the device cannot hold,
    /// plans, then evicts textures this frame does not use.
    fn prepare_frame(&mut self, max_texture_dimension: u32) -> FramePlan {
        let (events, diagnostics) = self.textures.reject_oversized(max_texture_dimension);
        self.report(diagnostics);
        for e in &events {
            self.emit(&ViewportEvent::TextureStateChanged { path: e.path.clone(), state: e.state });
        }

        let textures = self.texture_source();
        let plan = self.plan_with(&textures);

        let evicted =
            self.textures.evict_lru(self.settings.max_resident_textures, &textures.texture_ids());
        if evicted > 0 {
            log::debug!("evicted {evicted} texture(s)");
        }
        plan
    }

    fn plan_with(&self, textures: &TextureSource) -> FramePlan {
        plan_frame(&FrameInputs {
            config: &self.config,
            meshes: self.geometry.meshes(),
            textures,
            background: Theme::color(self.settings.theme.background),
            cursor: self.controller.cursor(),
            viewport: self.camera.viewport(),
        })
    }

    fn apply_uv_set(&mut self) {
        let previous = self.geometry.active_uv_set().map(str::to_string);
        let uv_set = self.effective_uv_set(self.geometry.source_meshes());
        if previous == uv_set {
            return;
        }
        let diagnostics = self.geometry.set_active_uv_set(uv_set.as_deref());
        self.report(diagnostics);
        self.emit(&ViewportEvent::UvSetChanged { name: uv_set });
    }

    /// The requested set if any, else the default for `meshes`.
    fn effective_uv_set(&self, meshes: &[UvMesh]) -> Option<String> {
        self.config.active_uv_set.clone().or_else(|| default_uv_set(meshes))
    }

    fn texture_source(&mut self) -> TextureSource {
        if !self.config.show_texture {
            return TextureSource::None;
        }
        let repeat = self.config.repeat_texture;

        if let Some(path) = self.explicit_texture.as_deref() {
            let handle = self.textures.resolve(path, repeat);
            return TextureSource::Plane(TextureBinding::new(&handle, |id| self.textures.state(id)));
        }

        let mut per_mesh = Vec::with_capacity(self.bound_textures.len());
        for paths in &self.bound_textures {
            let binding = match paths.first() {
                Some(path) => {
                    let handle = self.textures.resolve(path, repeat);
                    Some(TextureBinding::new(&handle, |id| self.textures.state(id)))
                }
                None => None,
            };
            per_mesh.push(binding);
        }
        if per_mesh.iter().all(Option::is_none) {
            TextureSource::None
        } else {
            TextureSource::PerMesh(per_mesh)
        }
    }

    fn report(&mut self, diagnostics: Vec<Diagnostic>) {
        for d in diagnostics {
            d.log();
            self.emit(&ViewportEvent::Diagnostic(d));
        }
    }

    fn emit(&mut self, event: &ViewportEvent) {
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }
}

impl Drop for UvViewport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sorted, deduplicated UV set names over `meshes`.
pub fn available_uv_set_names(meshes: &[UvMesh]) -> Vec<String> {
    let names: BTreeSet<&str> = meshes.iter().flat_map(UvMesh::uv_set_names).collect();
    names.into_iter().map(str::to_string).collect()
}

/// First of [`DEFAULT_UV_SET_NAMES`] present on any mesh, else the first
/// available name.
pub fn default_uv_set(meshes: &[UvMesh]) -> Option<String> {
    let names = available_uv_set_names(meshes);
    DEFAULT_UV_SET_NAMES
        .iter()
        .find(|d| names.iter().any(|n| n == *d))
        .map(|d| d.to_string())
        .or_else(|| names.into_iter().next())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashMap};
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::error::Severity;
    use crate::mesh::{Interpolation, UvSet};
    use crate::scene::DrawCall;
    use crate::texture::DecodedImage;

    struct OkLoader;

    impl ImageLoader for OkLoader {
        fn load(&self, path: &Path) -> Result<DecodedImage, String> {
            if path.to_string_lossy().contains("missing") {
                return Err("no such file".into());
            }
            Ok(DecodedImage { width: 2, height: 2, rgba: vec![128; 16] })
        }

        fn list_udim_tiles(&self, _pattern: &Path) -> Vec<u32> {
            vec![1001, 1002]
        }
    }

    #[derive(Default)]
    struct Scene {
        meshes: Vec<UvMesh>,
        textures: HashMap<String, Vec<PathBuf>>,
    }

    impl SceneSource for Scene {
        fn selected_meshes(&self) -> Vec<UvMesh> {
            self.meshes.clone()
        }

        fn bound_material_texture_paths(&self, mesh_id: &str) -> Vec<PathBuf> {
            self.textures.get(mesh_id).cloned().unwrap_or_default()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<ViewportEvent>>>);

    impl ViewportObserver for Recorder {
        fn on_event(&mut self, event: &ViewportEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    fn square(offset: f32) -> UvSet {
        UvSet {
            positions: vec![
                Vec2::new(offset, 0.0),
                Vec2::new(offset + 1.0, 0.0),
                Vec2::new(offset + 1.0, 1.0),
                Vec2::new(offset, 1.0),
            ],
            indices: None,
            interpolation: Interpolation::Vertex,
        }
    }

    fn mesh(id: &str, sets: &[(&str, f32)]) -> UvMesh {
        UvMesh {
            id: id.into(),
            face_vertex_counts: vec![4],
            face_vertex_indices: vec![0, 1, 2, 3],
            uv_sets: sets.iter().map(|(n, o)| (n.to_string(), square(*o))).collect::<BTreeMap<_, _>>(),
        }
    }

    fn viewport() -> UvViewport {
        let mut v = UvViewport::new(ViewportSettings::default(), Arc::new(OkLoader), Dispatch::Deferred);
        v.resize(800.0, 600.0);
        // No surface in tests: every requested frame is skipped.
        v.frame_skipped();
        v
    }

    // ── uv sets ───────────────────────────────────────────────────────────

    #[test]
    fn default_uv_set_prefers_uv_then_st() {
        assert_eq!(default_uv_set(&[mesh("/a", &[("st", 0.0), ("uv", 0.0)])]), Some("uv".into()));
        assert_eq!(default_uv_set(&[mesh("/a", &[("st", 0.0), ("map1", 0.0)])]), Some("st".into()));
        assert_eq!(default_uv_set(&[mesh("/a", &[("zeta", 0.0), ("map1", 0.0)])]), Some("map1".into()));
        assert_eq!(default_uv_set(&[]), None);
    }

    #[test]
    fn available_names_are_sorted_and_unique() {
        let mut v = viewport();
        let scene = Scene {
            meshes: vec![mesh("/a", &[("st", 0.0), ("uv", 0.0)]), mesh("/b", &[("st", 0.0), ("lightmap", 0.0)])],
            ..Default::default()
        };
        v.refresh_selection(&scene);
        assert_eq!(v.available_uv_set_names(), vec!["lightmap", "st", "uv"]);
        assert_eq!(v.active_uv_set(), Some("uv"));
    }

    #[test]
    fn missing_set_empties_only_that_mesh_and_warns() {
        let mut v = viewport();
        let events = Recorder::default();
        v.subscribe(Box::new(events.clone()));

        let scene = Scene {
            meshes: vec![mesh("/a", &[("st", 0.0)]), mesh("/b", &[("uv", 0.0)])],
            ..Default::default()
        };
        v.refresh_selection(&scene);
        v.set_active_uv_set(Some("st"));

        assert_eq!(v.geometry().vertex_count("/a"), Some(4));
        assert_eq!(v.geometry().vertex_count("/b"), Some(0));

        let events = events.0.borrow();
        let warning = events.iter().find_map(|e| match e {
            ViewportEvent::Diagnostic(d) => Some(d),
            _ => None,
        });
        assert_eq!(warning.map(|d| d.severity), Some(Severity::Warning));
        assert!(events.contains(&ViewportEvent::UvSetChanged { name: Some("st".into()) }));
    }

    // ── selection ─────────────────────────────────────────────────────────

    #[test]
    fn selection_change_is_broadcast() {
        let mut v = viewport();
        let events = Recorder::default();
        v.subscribe(Box::new(events.clone()));
        let scene = Scene { meshes: vec![mesh("/World/MeshA", &[("st", 0.0)])], ..Default::default() };
        assert_eq!(v.refresh_selection(&scene), Redraw::Request);
        assert!(events.0.borrow().contains(&ViewportEvent::SelectionChanged {
            mesh_ids: vec!["/World/MeshA".into()],
        }));
    }

    #[test]
    fn st_selection_without_borders_keeps_wireframe() {
        let mut v = viewport();
        let scene = Scene { meshes: vec![mesh("/World/MeshA", &[("st", 0.0)])], ..Default::default() };
        v.refresh_selection(&scene);
        v.set_active_uv_set(Some("st"));
        v.set_view_config(ViewConfig {
            show_borders: false,
            active_uv_set: Some("st".into()),
            ..Default::default()
        });

        assert_eq!(v.geometry().meshes()[0].vertex_count(), 4);
        let plan = v.plan();
        assert_eq!(plan.count(|c| matches!(c, DrawCall::Borders { .. })), 0);
        assert_eq!(plan.count(|c| matches!(c, DrawCall::Wireframe { .. })), 1);
    }

    #[test]
    fn focus_uses_selection_bounds() {
        let mut v = viewport();
        let scene = Scene { meshes: vec![mesh("/a", &[("uv", 3.0)])], ..Default::default() };
        v.refresh_selection(&scene);
        v.focus();
        assert_eq!(v.camera().center(), Vec2::new(3.5, 0.5));
    }

    // ── textures ──────────────────────────────────────────────────────────

    #[test]
    fn recent_textures_are_capped_and_deduplicated() {
        let mut v = viewport();
        for name in ["a", "b", "c", "d", "e", "f", "c"] {
            v.load_texture(format!("{name}.png"));
        }
        let recent: Vec<String> =
            v.recent_texture_paths().iter().map(|p| p.display().to_string()).collect();
        assert_eq!(recent, vec!["c.png", "f.png", "e.png", "d.png", "b.png"]);
        assert_eq!(v.active_texture_path(), Some(Path::new("c.png")));
    }

    #[test]
    fn explicit_texture_draws_as_plane_once_loaded() {
        let mut v = viewport();
        v.load_texture("grid.png");
        assert_eq!(v.plan().count(|c| matches!(c, DrawCall::TexturePlane { .. })), 0);

        v.frame_skipped();
        assert_eq!(v.poll(), Redraw::Request);
        assert!(!v.has_pending_loads());
        assert_eq!(v.plan().count(|c| matches!(c, DrawCall::TexturePlane { .. })), 1);
    }

    #[test]
    fn failed_bound_texture_falls_back_to_placeholder() {
        let mut v = viewport();
        let events = Recorder::default();
        v.subscribe(Box::new(events.clone()));
        let scene = Scene {
            meshes: vec![mesh("/a", &[("uv", 0.0)])],
            textures: HashMap::from([("/a".to_string(), vec![PathBuf::from("missing.png")])]),
        };
        v.refresh_selection(&scene);
        v.plan();
        v.poll();

        let plan = v.plan();
        assert!(plan.calls.contains(&DrawCall::MeshPlaceholder { mesh: 0 }));
        assert!(events.0.borrow().contains(&ViewportEvent::TextureStateChanged {
            path: "missing.png".into(),
            state: LoadState::Failed,
        }));
    }

    #[test]
    fn available_textures_are_sorted_union() {
        let mut v = viewport();
        let scene = Scene {
            meshes: vec![mesh("/a", &[("uv", 0.0)]), mesh("/b", &[("uv", 0.0)])],
            textures: HashMap::from([
                ("/a".to_string(), vec![PathBuf::from("z.png"), PathBuf::from("a.png")]),
                ("/b".to_string(), vec![PathBuf::from("a.png")]),
            ]),
        };
        v.refresh_selection(&scene);
        assert_eq!(v.available_texture_paths(), vec![PathBuf::from("a.png"), PathBuf::from("z.png")]);
    }

    #[test]
    fn reloading_texture_keeps_drawing_the_old_one() {
        let mut v = viewport();
        v.load_texture("grid.png");
        v.plan();
        v.poll();
        v.reload_texture();
        assert!(v.has_pending_loads());
        assert_eq!(v.plan().count(|c| matches!(c, DrawCall::TexturePlane { .. })), 1);
    }

    #[test]
    fn frames_needing_more_than_resident_limit_keep_their_textures() {
        let settings = ViewportSettings { max_resident_textures: 1, ..Default::default() };
        let mut v = UvViewport::new(settings, Arc::new(OkLoader), Dispatch::Deferred);
        let scene = Scene {
            meshes: vec![mesh("/a", &[("uv", 0.0)]), mesh("/b", &[("uv", 0.0)])],
            textures: HashMap::from([
                ("/a".to_string(), vec![PathBuf::from("a.png")]),
                ("/b".to_string(), vec![PathBuf::from("b.png")]),
            ]),
        };
        v.refresh_selection(&scene);
        v.prepare_frame(8192);
        v.poll();

        for _ in 0..3 {
            let plan = v.prepare_frame(8192);
            assert_eq!(plan.count(|c| matches!(c, DrawCall::MeshTexture { .. })), 2);
            assert!(!v.has_pending_loads());
        }
        assert_eq!(v.textures().len(), 2);

        // Once unused, the extra texture goes.
        v.load_texture("c.png");
        v.prepare_frame(8192);
        assert_eq!(v.textures().len(), 1);
    }

    #[test]
    fn texture_over_device_limit_draws_placeholder() {
        let mut v = viewport();
        let events = Recorder::default();
        v.subscribe(Box::new(events.clone()));
        v.load_texture("grid.png");
        v.plan();
        v.poll();

        let plan = v.prepare_frame(1);
        assert_eq!(plan.count(|c| matches!(c, DrawCall::PlanePlaceholder { .. })), 1);
        assert_eq!(plan.count(|c| matches!(c, DrawCall::TexturePlane { .. })), 0);
        assert!(events.0.borrow().contains(&ViewportEvent::TextureStateChanged {
            path: "grid.png".into(),
            state: LoadState::Failed,
        }));
    }

    #[test]
    fn udim_plane_in_repeat_mode_has_a_quad_per_tile() {
        let mut v = viewport();
        v.set_view_config(ViewConfig { repeat_texture: true, ..Default::default() });
        v.load_texture("albedo.<UDIM>.png");
        v.plan();
        v.poll();
        assert_eq!(v.plan().count(|c| matches!(c, DrawCall::TexturePlane { .. })), 2);
    }

    // ── redraw ────────────────────────────────────────────────────────────

    #[test]
    fn changes_after_a_skipped_frame_request_a_redraw() {
        use uview_engine::input::{Modifiers, MouseWheelDelta};

        let mut v = UvViewport::new(ViewportSettings::default(), Arc::new(OkLoader), Dispatch::Deferred);
        assert_eq!(v.resize(800.0, 600.0), Redraw::Request);
        // Coalesced until a frame is attempted.
        assert_eq!(v.focus(), Redraw::Skip);

        v.frame_skipped();
        let wheel = InputEvent::MouseWheel {
            delta: MouseWheelDelta::Line { x: 0.0, y: 3.0 },
            modifiers: Modifiers::default(),
        };
        let before = v.camera().scale();
        assert_eq!(v.handle_input(&wheel), Redraw::Request);
        assert_ne!(v.camera().scale(), before);

        v.frame_skipped();
        assert_eq!(v.resize(1024.0, 768.0), Redraw::Request);
    }

    // ── cursor ────────────────────────────────────────────────────────────

    #[test]
    fn cursor_position_tracks_pointer() {
        use uview_engine::input::PointerMoveEvent;

        let mut v = viewport();
        assert_eq!(v.cursor_uv_position(), None);
        v.handle_input(&InputEvent::PointerMoved(PointerMoveEvent { x: 400.0, y: 300.0 }));
        assert_eq!(v.cursor_uv_position(), Some((0.5, 0.5)));
        v.handle_input(&InputEvent::PointerLeft);
        assert_eq!(v.cursor_uv_position(), None);
    }
}
