use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::{Diagnostic, ViewerError};
use crate::retire::RetireQueue;

use super::loader::{DecodedImage, ImageLoader};
use super::udim;

/// Identifies one cached texture (one file, or one UDIM tile).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        TextureId(raw)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing to show yet; the first load is in flight.
    Pending,
    /// Drawable. A reload may be in flight.
    Loaded,
    Failed,
}

/// What [`TextureCache::resolve`] hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureHandle {
    Single(TextureId),
    /// Existing tiles of a `<UDIM>` pattern by tile number.
    Udim { tiles: BTreeMap<u32, TextureId> },
}

impl TextureHandle {
    /// The texture for `tile`, if that tile exists. Single textures answer
    /// for tile 1001 only.
    pub fn tile(&self, tile: u32) -> Option<TextureId> {
        match self {
            TextureHandle::Single(id) => (tile == udim::FIRST_TILE).then_some(*id),
            TextureHandle::Udim { tiles } => tiles.get(&tile).copied(),
        }
    }

    /// `(tile, id)` pairs; a single texture reports tile 1001.
    pub fn tiles(&self) -> Vec<(u32, TextureId)> {
        match self {
            TextureHandle::Single(id) => vec![(udim::FIRST_TILE, *id)],
            TextureHandle::Udim { tiles } => tiles.iter().map(|(t, id)| (*t, *id)).collect(),
        }
    }
}

/// How decode work is dispatched.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A worker thread decodes; results arrive through `poll`.
    Background,
    /// Decoding runs on the caller's thread inside `poll`.
    Deferred,
}

/// GPU resources of a loaded texture.
pub struct GpuTexture {
    _texture: wgpu::Texture,
    _view: wgpu::TextureView,
    pub(crate) bind_group: wgpu::BindGroup,
}

struct Entry {
    path: PathBuf,
    state: LoadState,
    request: u64,
    size: Option<(u32, u32)>,
    decoded: Option<DecodedImage>,
    gpu: Option<GpuTexture>,
    /// A job for `request` has been submitted and not answered.
    in_flight: bool,
    last_touched: u64,
}

struct Job {
    id: TextureId,
    request: u64,
    path: PathBuf,
}

struct Done {
    id: TextureId,
    request: u64,
    result: Result<DecodedImage, String>,
}

enum Worker {
    Background {
        jobs: Option<Sender<Job>>,
        done: Receiver<Done>,
        cancel: Arc<AtomicBool>,
        thread: Option<JoinHandle<()>>,
    },
    Deferred {
        queue: VecDeque<Job>,
    },
}

/// Something observable changed during [`TextureCache::poll`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextureEvent {
    pub path: PathBuf,
    pub state: LoadState,
}

/// GPU textures keyed by resolved path.
///
/// At most one entry exists per path. Entries are created by `resolve` in
/// the `Pending` state, become `Loaded` or `Failed` through `poll`, get GPU
/// resources through `upload_pending` and leave through `evict_lru`.
pub struct TextureCache {
    loader: Arc<dyn ImageLoader>,
    worker: Worker,

    entries: HashMap<TextureId, Entry>,
    by_path: HashMap<PathBuf, TextureId>,
    udim_tiles: HashMap<PathBuf, Vec<u32>>,

    /// Jobs the worker never received, answered on the next `poll`.
    undelivered: Vec<Done>,

    next_id: u64,
    next_request: u64,
    clock: u64,
    last_used_frame: u64,
    retired: RetireQueue<GpuTexture>,
}

impl TextureCache {
    pub fn new(loader: Arc<dyn ImageLoader>, dispatch: Dispatch) -> Self {
        let worker = match dispatch {
            Dispatch::Deferred => Worker::Deferred { queue: VecDeque::new() },
            Dispatch::Background => spawn_worker(Arc::clone(&loader)),
        };
        Self {
            loader,
            worker,
            entries: HashMap::new(),
            by_path: HashMap::new(),
            udim_tiles: HashMap::new(),
            undelivered: Vec::new(),
            next_id: 0,
            next_request: 0,
            clock: 0,
            last_used_frame: 0,
            retired: RetireQueue::default(),
        }
    }

    /// Returns the handle for `path`, issuing loads for anything not cached.
    ///
    /// For `<UDIM>` patterns, `udim_repeat` resolves every tile the loader
    /// reports; otherwise only tile 1001 is resolved.
    pub fn resolve(&mut self, path: &Path, udim_repeat: bool) -> TextureHandle {
        if !udim::is_udim_pattern(path) {
            return TextureHandle::Single(self.resolve_single(path));
        }

        let tiles: Vec<u32> = if udim_repeat {
            self.udim_tiles_for(path)
        } else {
            vec![udim::FIRST_TILE]
        };

        let tiles = tiles
            .into_iter()
            .map(|t| (t, self.resolve_single(&udim::tile_path(path, t))))
            .collect();
        TextureHandle::Udim { tiles }
    }

    fn udim_tiles_for(&mut self, pattern: &Path) -> Vec<u32> {
        if let Some(tiles) = self.udim_tiles.get(pattern) {
            return tiles.clone();
        }
        let tiles = self.loader.list_udim_tiles(pattern);
        log::debug!("{}: UDIM tiles {:?}", pattern.display(), tiles);
        self.udim_tiles.insert(pattern.to_path_buf(), tiles.clone());
        tiles
    }

    fn resolve_single(&mut self, path: &Path) -> TextureId {
        self.clock += 1;
        if let Some(&id) = self.by_path.get(path) {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.last_touched = self.clock;
            }
            return id;
        }

        let id = TextureId(self.next_id);
        self.next_id += 1;
        let request = self.next_request();
        self.entries.insert(
            id,
            Entry {
                path: path.to_path_buf(),
                state: LoadState::Pending,
                request,
                size: None,
                decoded: None,
                gpu: None,
                in_flight: true,
                last_touched: self.clock,
            },
        );
        self.by_path.insert(path.to_path_buf(), id);
        self.submit(Job { id, request, path: path.to_path_buf() });
        id
    }

    /// Re-reads `path` from disk, resolving it the way [`resolve`](Self::resolve)
    /// does for the same `udim_repeat`.
    ///
    /// An in-flight load for it is superseded and its result discarded. A
    /// loaded texture stays `Loaded` and drawable until the new image is
    /// uploaded; a failed one goes back to `Pending`.
    pub fn reload(&mut self, path: &Path, udim_repeat: bool) -> TextureHandle {
        let paths: Vec<PathBuf> = if !udim::is_udim_pattern(path) {
            vec![path.to_path_buf()]
        } else if udim_repeat {
            // Tiles may have been added or removed on disk.
            self.udim_tiles.remove(path);
            self.udim_tiles_for(path)
                .into_iter()
                .map(|t| udim::tile_path(path, t))
                .collect()
        } else {
            vec![udim::tile_path(path, udim::FIRST_TILE)]
        };

        for p in paths {
            let Some(&id) = self.by_path.get(&p) else { continue };
            let request = self.next_request();
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.request = request;
                entry.in_flight = true;
                if entry.state == LoadState::Failed {
                    entry.state = LoadState::Pending;
                }
                self.submit(Job { id, request, path: p });
            }
        }

        // Anything not cached yet is loaded fresh.
        self.resolve(path, udim_repeat)
    }

    fn next_request(&mut self) -> u64 {
        self.next_request += 1;
        self.next_request
    }

    fn submit(&mut self, job: Job) {
        match &mut self.worker {
            Worker::Deferred { queue } => queue.push_back(job),
            Worker::Background { jobs, .. } => {
                let unsent = match jobs.as_ref() {
                    Some(tx) => tx.send(job).err().map(|e| e.into_inner()),
                    None => Some(job),
                };
                if let Some(job) = unsent {
                    self.undelivered.push(Done {
                        id: job.id,
                        request: job.request,
                        result: Err("texture loader is not running".into()),
                    });
                }
            }
        }
    }

    /// Consumes finished loads. Returns the state changes and the failures.
    ///
    /// In deferred mode this is where decoding happens.
    pub fn poll(&mut self) -> (Vec<TextureEvent>, Vec<Diagnostic>) {
        let mut finished = std::mem::take(&mut self.undelivered);
        let mut worker_lost = false;
        match &mut self.worker {
            Worker::Deferred { queue } => {
                while let Some(job) = queue.pop_front() {
                    let current = self
                        .entries
                        .get(&job.id)
                        .is_some_and(|e| e.request == job.request);
                    if !current {
                        continue;
                    }
                    let result = self.loader.load(&job.path);
                    finished.push(Done { id: job.id, request: job.request, result });
                }
            }
            Worker::Background { jobs, done, .. } => loop {
                match done.try_recv() {
                    Ok(d) => finished.push(d),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        // Later submits fail straight away.
                        if jobs.take().is_some() {
                            log::warn!("texture worker stopped");
                            worker_lost = true;
                        }
                        break;
                    }
                }
            },
        }

        if worker_lost {
            let answered: HashSet<(TextureId, u64)> =
                finished.iter().map(|d| (d.id, d.request)).collect();
            for (id, entry) in &self.entries {
                if entry.in_flight && !answered.contains(&(*id, entry.request)) {
                    finished.push(Done {
                        id: *id,
                        request: entry.request,
                        result: Err("texture loader stopped".into()),
                    });
                }
            }
        }

        let mut events = Vec::new();
        let mut diagnostics = Vec::new();
        for done in finished {
            let Some(entry) = self.entries.get_mut(&done.id) else {
                log::debug!("discarding texture result for evicted entry");
                continue;
            };
            if entry.request != done.request {
                log::debug!("discarding superseded load of {}", entry.path.display());
                continue;
            }
            entry.in_flight = false;
            match done.result {
                Ok(image) => {
                    log::debug!(
                        "decoded {} ({}x{})",
                        entry.path.display(),
                        image.width,
                        image.height
                    );
                    entry.state = LoadState::Loaded;
                    entry.size = Some((image.width, image.height));
                    entry.decoded = Some(image);
                }
                Err(reason) => {
                    entry.state = LoadState::Failed;
                    entry.decoded = None;
                    if let Some(old) = entry.gpu.take() {
                        self.retired.retire(self.last_used_frame, old);
                    }
                    diagnostics.push(Diagnostic::new(ViewerError::TextureLoad {
                        path: entry.path.clone(),
                        reason,
                    }));
                }
            }
            events.push(TextureEvent { path: entry.path.clone(), state: entry.state });
        }
        (events, diagnostics)
    }

    /// True while any load or reload is in flight.
    pub fn has_pending_loads(&self) -> bool {
        self.entries.values().any(|e| e.in_flight)
    }

    /// Fails decoded images the GPU cannot hold, so `upload_pending` never
    /// creates a texture past `max_dimension` on either side.
    pub fn reject_oversized(&mut self, max_dimension: u32) -> (Vec<TextureEvent>, Vec<Diagnostic>) {
        let mut events = Vec::new();
        let mut diagnostics = Vec::new();
        for entry in self.entries.values_mut() {
            let Some((w, h)) = entry.decoded.as_ref().map(|i| (i.width, i.height)) else {
                continue;
            };
            if w <= max_dimension && h <= max_dimension {
                continue;
            }
            entry.decoded = None;
            entry.state = LoadState::Failed;
            if let Some(old) = entry.gpu.take() {
                self.retired.retire(self.last_used_frame, old);
            }
            diagnostics.push(Diagnostic::new(ViewerError::TextureLoad {
                path: entry.path.clone(),
                reason: format!("{w}x{h} exceeds the GPU limit of {max_dimension} pixels"),
            }));
            events.push(TextureEvent { path: entry.path.clone(), state: entry.state });
        }
        (events, diagnostics)
    }

    /// Creates GPU textures for decoded images not yet on the GPU. Images
    /// over the device limit are left for [`reject_oversized`](Self::reject_oversized).
    pub fn upload_pending(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        frame_index: u64,
    ) {
        let limit = device.limits().max_texture_dimension_2d;
        for entry in self.entries.values_mut() {
            if entry.decoded.as_ref().is_some_and(|i| i.width > limit || i.height > limit) {
                continue;
            }
            let Some(image) = entry.decoded.take() else { continue };
            let gpu = create_gpu_texture(device, queue, layout, sampler, &entry.path, &image);
            if let Some(old) = entry.gpu.replace(gpu) {
                self.retired.retire(self.last_used_frame, old);
            }
        }
        self.last_used_frame = frame_index;
    }

    /// Evicts least-recently-resolved entries until at most `max_resident`
    /// remain. Entries in `in_use` are never evicted, so the cache may stay
    /// over the limit while a frame needs more. Returns the number evicted.
    pub fn evict_lru(&mut self, max_resident: usize, in_use: &HashSet<TextureId>) -> usize {
        if self.entries.len() <= max_resident {
            return 0;
        }
        let mut by_age: Vec<(u64, TextureId)> = self
            .entries
            .iter()
            .filter(|(id, _)| !in_use.contains(id))
            .map(|(id, e)| (e.last_touched, *id))
            .collect();
        by_age.sort_unstable();

        let excess = (self.entries.len() - max_resident).min(by_age.len());
        for &(_, id) in by_age.iter().take(excess) {
            if let Some(entry) = self.entries.remove(&id) {
                log::debug!("evicting texture {}", entry.path.display());
                self.by_path.remove(&entry.path);
                if let Some(gpu) = entry.gpu {
                    self.retired.retire(self.last_used_frame, gpu);
                }
            }
        }
        excess
    }

    /// Releases evicted or replaced textures whose last frame has been presented.
    pub fn release_retired(&mut self, presented_frame: u64) {
        self.retired.release_through(presented_frame);
    }

    pub fn state(&self, id: TextureId) -> Option<LoadState> {
        self.entries.get(&id).map(|e| e.state)
    }

    /// Aggregate state of a handle: failed if any tile failed, pending if
    /// any tile is pending, else loaded.
    pub fn handle_state(&self, handle: &TextureHandle) -> Option<LoadState> {
        let states: Vec<LoadState> =
            handle.tiles().iter().filter_map(|(_, id)| self.state(*id)).collect();
        if states.is_empty() {
            None
        } else if states.contains(&LoadState::Failed) {
            Some(LoadState::Failed)
        } else if states.contains(&LoadState::Pending) {
            Some(LoadState::Pending)
        } else {
            Some(LoadState::Loaded)
        }
    }

    pub fn size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.entries.get(&id).and_then(|e| e.size)
    }

    pub fn path(&self, id: TextureId) -> Option<&Path> {
        self.entries.get(&id).map(|e| e.path.as_path())
    }

    pub(crate) fn gpu(&self, id: TextureId) -> Option<&GpuTexture> {
        self.entries.get(&id).and_then(|e| e.gpu.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stops the worker and releases every GPU texture. Idempotent.
    ///
    /// Queued loads are abandoned; only a decode already running is waited for.
    pub fn shutdown(&mut self) {
        if let Worker::Background { jobs, cancel, thread, .. } = &mut self.worker {
            cancel.store(true, Ordering::Release);
            jobs.take();
            if let Some(handle) = thread.take() {
                if handle.join().is_err() {
                    log::warn!("texture worker panicked");
                }
            }
        }
        self.entries.clear();
        self.by_path.clear();
        self.udim_tiles.clear();
        self.undelivered.clear();
        self.retired.release_all();
    }
}

impl Drop for TextureCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(loader: Arc<dyn ImageLoader>) -> Worker {
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
    let (done_tx, done_rx) = crossbeam_channel::unbounded::<Done>();
    let cancel = Arc::new(AtomicBool::new(false));

    let worker_cancel = Arc::clone(&cancel);
    let spawned = std::thread::Builder::new()
        .name("uview-texture-loader".into())
        .spawn(move || {
            for job in job_rx.iter() {
                if worker_cancel.load(Ordering::Acquire) {
                    break;
                }
                let result = loader.load(&job.path);
                if done_tx.send(Done { id: job.id, request: job.request, result }).is_err() {
                    break;
                }
            }
        });

    match spawned {
        Ok(thread) => Worker::Background {
            jobs: Some(job_tx),
            done: done_rx,
            cancel,
            thread: Some(thread),
        },
        Err(e) => {
            log::warn!("cannot spawn texture worker ({e}); decoding on the render thread");
            Worker::Deferred { queue: VecDeque::new() }
        }
    }
}

fn create_gpu_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    path: &Path,
    image: &DecodedImage,
) -> GpuTexture {
    let label = path.to_string_lossy();
    let size = wgpu::Extent3d {
        width: image.width.max(1),
        height: image.height.max(1),
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    if image.width > 0 && image.height > 0 {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&label),
        layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
        ],
    });

    GpuTexture { _texture: texture, _view: view, bind_group }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    use super::*;

    /// Loader that fails for paths containing "broken" and counts calls.
    #[derive(Default)]
    struct MockLoader {
        loads: AtomicUsize,
        tiles: Mutex<Vec<u32>>,
    }

    impl ImageLoader for MockLoader {
        fn load(&self, path: &Path) -> Result<DecodedImage, String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let name = path.to_string_lossy();
            if name.contains("broken") {
                return Err("corrupt file".into());
            }
            if name.contains("huge") {
                return Ok(DecodedImage { width: 9000, height: 1, rgba: vec![255; 9000 * 4] });
            }
            Ok(DecodedImage { width: 1, height: 1, rgba: vec![255; 4] })
        }

        fn list_udim_tiles(&self, _pattern: &Path) -> Vec<u32> {
            self.tiles.lock().map(|t| t.clone()).unwrap_or_default()
        }
    }

    /// Takes `delay` per decode and panics on paths containing "panic".
    struct SlowLoader {
        delay: Duration,
        loads: AtomicUsize,
    }

    impl ImageLoader for SlowLoader {
        fn load(&self, path: &Path) -> Result<DecodedImage, String> {
            if path.to_string_lossy().contains("panic") {
                panic!("decoder crashed");
            }
            std::thread::sleep(self.delay);
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(DecodedImage { width: 1, height: 1, rgba: vec![255; 4] })
        }

        fn list_udim_tiles(&self, _pattern: &Path) -> Vec<u32> {
            Vec::new()
        }
    }

    fn poll_until_idle(cache: &mut TextureCache) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while cache.has_pending_loads() && Instant::now() < deadline {
            cache.poll();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn cache_with(tiles: Vec<u32>) -> (TextureCache, Arc<MockLoader>) {
        let loader = Arc::new(MockLoader { tiles: Mutex::new(tiles), ..Default::default() });
        let cache = TextureCache::new(loader.clone(), Dispatch::Deferred);
        (cache, loader)
    }

    // ── resolve ───────────────────────────────────────────────────────────

    #[test]
    fn same_path_resolves_to_same_handle_with_one_load() {
        let (mut cache, loader) = cache_with(vec![]);
        let a = cache.resolve(Path::new("albedo.png"), false);
        cache.poll();
        let b = cache.resolve(Path::new("albedo.png"), false);
        cache.poll();
        assert_eq!(a, b);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_handle_is_pending_until_polled() {
        let (mut cache, _) = cache_with(vec![]);
        let TextureHandle::Single(id) = cache.resolve(Path::new("a.png"), false) else {
            panic!("expected single handle");
        };
        assert_eq!(cache.state(id), Some(LoadState::Pending));
        assert!(cache.has_pending_loads());

        let (events, diags) = cache.poll();
        assert_eq!(cache.state(id), Some(LoadState::Loaded));
        assert_eq!(cache.size(id), Some((1, 1)));
        assert_eq!(events, vec![TextureEvent { path: "a.png".into(), state: LoadState::Loaded }]);
        assert!(diags.is_empty());
        assert!(!cache.has_pending_loads());
    }

    #[test]
    fn failed_load_is_reported_and_not_fatal() {
        let (mut cache, _) = cache_with(vec![]);
        let handle = cache.resolve(Path::new("broken.png"), false);
        let (_, diags) = cache.poll();
        assert_eq!(cache.handle_state(&handle), Some(LoadState::Failed));
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].error, ViewerError::TextureLoad { .. }));
    }

    // ── UDIM ──────────────────────────────────────────────────────────────

    #[test]
    fn udim_repeat_resolves_existing_tiles_only() {
        let (mut cache, _) = cache_with(vec![1001, 1002]);
        let handle = cache.resolve(Path::new("texture.<UDIM>.png"), true);
        assert!(handle.tile(1001).is_some());
        assert!(handle.tile(1002).is_some());
        assert_eq!(handle.tile(1003), None);
        assert_ne!(handle.tile(1001), handle.tile(1002));
        assert_eq!(cache.path(handle.tile(1002).unwrap()), Some(Path::new("texture.1002.png")));
    }

    #[test]
    fn udim_without_repeat_resolves_first_tile_only() {
        let (mut cache, _) = cache_with(vec![1001, 1002]);
        let handle = cache.resolve(Path::new("texture.<UDIM>.png"), false);
        assert_eq!(handle.tiles().len(), 1);
        assert!(handle.tile(1001).is_some());
    }

    #[test]
    fn udim_tiles_share_cache_with_direct_paths() {
        let (mut cache, loader) = cache_with(vec![1001]);
        let handle = cache.resolve(Path::new("t.<UDIM>.png"), true);
        let direct = cache.resolve(Path::new("t.1001.png"), false);
        cache.poll();
        assert_eq!(handle.tile(1001), direct.tile(1001));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    // ── cancellation ──────────────────────────────────────────────────────

    #[test]
    fn reload_supersedes_in_flight_request() {
        let (mut cache, loader) = cache_with(vec![]);
        cache.resolve(Path::new("a.png"), false);
        cache.reload(Path::new("a.png"), false);
        let (events, _) = cache.poll();
        // The superseded job is skipped before decoding.
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn reload_of_loaded_texture_loads_again() {
        let (mut cache, loader) = cache_with(vec![]);
        let h = cache.resolve(Path::new("a.png"), false);
        cache.poll();
        cache.reload(Path::new("a.png"), false);
        cache.poll();
        assert_eq!(cache.handle_state(&h), Some(LoadState::Loaded));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn loaded_texture_stays_drawable_while_reloading() {
        let (mut cache, _) = cache_with(vec![]);
        let h = cache.resolve(Path::new("a.png"), false);
        cache.poll();
        cache.reload(Path::new("a.png"), false);
        assert_eq!(cache.handle_state(&h), Some(LoadState::Loaded));
        assert!(cache.has_pending_loads());
        cache.poll();
        assert!(!cache.has_pending_loads());
    }

    #[test]
    fn reload_of_failed_texture_is_pending_again() {
        let (mut cache, _) = cache_with(vec![]);
        let h = cache.resolve(Path::new("broken.png"), false);
        cache.poll();
        cache.reload(Path::new("broken.png"), false);
        assert_eq!(cache.handle_state(&h), Some(LoadState::Pending));
    }

    #[test]
    fn udim_reload_without_repeat_touches_first_tile_only() {
        let (mut cache, loader) = cache_with(vec![1001, 1002]);
        let pattern = Path::new("t.<UDIM>.png");
        cache.resolve(pattern, false);
        cache.poll();
        let handle = cache.reload(pattern, false);
        cache.poll();
        assert_eq!(handle.tiles().len(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    // ── eviction / shutdown ───────────────────────────────────────────────

    #[test]
    fn evict_lru_drops_least_recently_resolved() {
        let (mut cache, loader) = cache_with(vec![]);
        let a = cache.resolve(Path::new("a.png"), false);
        cache.resolve(Path::new("b.png"), false);
        cache.resolve(Path::new("a.png"), false);
        cache.resolve(Path::new("c.png"), false);
        cache.poll();

        assert_eq!(cache.evict_lru(2, &HashSet::new()), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.path(a.tile(1001).unwrap()), Some(Path::new("a.png")));

        // Evicted paths load again on the next resolve.
        cache.resolve(Path::new("b.png"), false);
        cache.poll();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn evict_lru_spares_textures_in_use() {
        let (mut cache, _) = cache_with(vec![]);
        let a = cache.resolve(Path::new("a.png"), false).tile(1001).unwrap();
        let b = cache.resolve(Path::new("b.png"), false).tile(1001).unwrap();
        cache.resolve(Path::new("c.png"), false);
        cache.poll();

        let in_use = HashSet::from([a, b]);
        assert_eq!(cache.evict_lru(1, &in_use), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.state(a), Some(LoadState::Loaded));
        assert_eq!(cache.state(b), Some(LoadState::Loaded));
        assert_eq!(cache.evict_lru(1, &in_use), 0);
    }

    // ── GPU limits ────────────────────────────────────────────────────────

    #[test]
    fn oversized_image_fails_instead_of_uploading() {
        let (mut cache, _) = cache_with(vec![]);
        let big = cache.resolve(Path::new("huge.png"), false);
        let small = cache.resolve(Path::new("a.png"), false);
        cache.poll();

        let (events, diags) = cache.reject_oversized(8192);
        assert_eq!(cache.handle_state(&big), Some(LoadState::Failed));
        assert_eq!(cache.handle_state(&small), Some(LoadState::Loaded));
        assert_eq!(events, vec![TextureEvent { path: "huge.png".into(), state: LoadState::Failed }]);
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].error, ViewerError::TextureLoad { .. }));

        let (events, _) = cache.reject_oversized(8192);
        assert!(events.is_empty());
    }

    #[test]
    fn shutdown_clears_entries() {
        let (mut cache, _) = cache_with(vec![]);
        cache.resolve(Path::new("a.png"), false);
        cache.shutdown();
        assert!(cache.is_empty());
        cache.shutdown();
    }

    #[test]
    fn background_worker_delivers_results() {
        let loader = Arc::new(MockLoader::default());
        let mut cache = TextureCache::new(loader, Dispatch::Background);
        let handle = cache.resolve(Path::new("a.png"), false);
        poll_until_idle(&mut cache);
        assert_eq!(cache.handle_state(&handle), Some(LoadState::Loaded));
        cache.shutdown();
    }

    #[test]
    fn shutdown_abandons_queued_loads() {
        let loader = Arc::new(SlowLoader { delay: Duration::from_millis(200), loads: AtomicUsize::new(0) });
        let mut cache = TextureCache::new(loader.clone(), Dispatch::Background);
        for name in ["a.png", "b.png", "c.png", "d.png", "e.png"] {
            cache.resolve(Path::new(name), false);
        }

        let start = Instant::now();
        cache.shutdown();
        assert!(start.elapsed() < Duration::from_millis(600), "took {:?}", start.elapsed());
        assert!(loader.loads.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn loads_fail_once_the_worker_is_gone() {
        let loader = Arc::new(SlowLoader { delay: Duration::ZERO, loads: AtomicUsize::new(0) });
        let mut cache = TextureCache::new(loader, Dispatch::Background);

        let crashed = cache.resolve(Path::new("panic.png"), false);
        poll_until_idle(&mut cache);
        assert_eq!(cache.handle_state(&crashed), Some(LoadState::Failed));

        let later = cache.resolve(Path::new("a.png"), false);
        let (events, diags) = cache.poll();
        assert_eq!(cache.handle_state(&later), Some(LoadState::Failed));
        assert!(!cache.has_pending_loads());
        assert_eq!(events, vec![TextureEvent { path: "a.png".into(), state: LoadState::Failed }]);
        assert!(matches!(diags[0].error, ViewerError::TextureLoad { .. }));
        cache.shutdown();
    }
}
