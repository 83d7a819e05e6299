//! Per-mesh vertex and index batches.
//!
//! The CPU batch is rebuilt wholesale whenever the selection or the active UV
//! set changes and swapped in only once complete. GPU buffers mirror the
//! current batch and are created lazily on the render thread; buffers of a
//! replaced batch go through a retire queue.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::error::{Diagnostic, TopologyError, ViewerError};
use crate::mesh::{Bounds, EdgeList, UvMesh, UvSet};
use crate::retire::RetireQueue;

/// One border edge, expanded to a screen-space quad by the stroke shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct StrokeInstance {
    pub a: [f32; 2],
    pub b: [f32; 2],
}

impl StrokeInstance {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        1 => Float32x2, // a
        2 => Float32x2  // b
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StrokeInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Layout of UV-space vertex buffers (`@location(0) pos`).
pub fn uv_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vec2>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRS,
    }
}

/// CPU geometry of one mesh in the active UV set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub id: String,
    pub vertices: Vec<Vec2>,
    /// Fan-triangulated faces.
    pub fill_indices: Vec<u32>,
    /// Wireframe edges as a line list.
    pub edge_indices: Vec<u32>,
    pub borders: Vec<StrokeInstance>,
}

impl MeshGeometry {
    fn empty(id: &str) -> Self {
        Self { id: id.to_string(), ..Default::default() }
    }

    fn build(mesh: &UvMesh, set: &UvSet) -> Result<Self, TopologyError> {
        let corners = mesh.resolve_corners(set)?;
        let edges = EdgeList::build(mesh, set)?;

        let mut fill_indices = Vec::with_capacity(corners.len() * 3);
        for (offset, n) in mesh.faces() {
            let face = &corners[offset..offset + n];
            for i in 1..n.saturating_sub(1) {
                fill_indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
            }
        }

        let edge_indices = edges.edges().iter().flat_map(|e| [e.a, e.b]).collect();

        let borders = edges
            .borders()
            .map(|e| StrokeInstance {
                a: set.positions[e.a as usize].to_array(),
                b: set.positions[e.b as usize].to_array(),
            })
            .collect();

        Ok(Self {
            id: mesh.id.clone(),
            vertices: set.positions.clone(),
            fill_indices,
            edge_indices,
            borders,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.vertices)
    }
}

/// An index or instance buffer plus its element count.
pub(crate) struct CountedBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) count: u32,
}

/// GPU mirror of one [`MeshGeometry`]. Empty parts have no buffer.
#[derive(Default)]
pub(crate) struct MeshGpu {
    pub(crate) vertices: Option<wgpu::Buffer>,
    pub(crate) fill: Option<CountedBuffer>,
    pub(crate) edges: Option<CountedBuffer>,
    pub(crate) borders: Option<CountedBuffer>,
}

impl MeshGpu {
    fn upload(device: &wgpu::Device, mesh: &MeshGeometry) -> Self {
        if mesh.is_empty() {
            return Self::default();
        }

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} uv vbo", mesh.id)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index = |label: String, data: &[u32]| {
            (!data.is_empty()).then(|| CountedBuffer {
                buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&label),
                    contents: bytemuck::cast_slice(data),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                count: data.len() as u32,
            })
        };

        let borders = (!mesh.borders.is_empty()).then(|| CountedBuffer {
            buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_edgeBorders", mesh.id)),
                contents: bytemuck::cast_slice(&mesh.borders),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            count: mesh.borders.len() as u32,
        });

        Self {
            vertices: Some(vertices),
            fill: index(format!("{} fill ibo", mesh.id), &mesh.fill_indices),
            edges: index(format!("{} edge ibo", mesh.id), &mesh.edge_indices),
            borders,
        }
    }
}

/// Resident UV geometry for the current selection.
#[derive(Default)]
pub struct GeometryBuffer {
    meshes: Vec<UvMesh>,
    active_uv_set: Option<String>,

    batch: Vec<MeshGeometry>,
    generation: u64,

    gpu: Vec<MeshGpu>,
    gpu_generation: Option<u64>,
    last_used_frame: u64,
    retired: RetireQueue<Vec<MeshGpu>>,
}

impl GeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection and rebuilds the batch.
    pub fn set_meshes(&mut self, meshes: Vec<UvMesh>) -> Vec<Diagnostic> {
        self.meshes = meshes;
        self.rebuild()
    }

    /// Switches the UV set geometry is built from and rebuilds the batch.
    pub fn set_active_uv_set(&mut self, name: Option<&str>) -> Vec<Diagnostic> {
        self.active_uv_set = name.map(str::to_string);
        self.rebuild()
    }

    /// Replaces the selection and the UV set with a single rebuild.
    pub fn set_selection(&mut self, meshes: Vec<UvMesh>, uv_set: Option<&str>) -> Vec<Diagnostic> {
        self.meshes = meshes;
        self.active_uv_set = uv_set.map(str::to_string);
        self.rebuild()
    }

    pub fn active_uv_set(&self) -> Option<&str> {
        self.active_uv_set.as_deref()
    }

    /// Source meshes of the current selection, in selection order.
    pub fn source_meshes(&self) -> &[UvMesh] {
        &self.meshes
    }

    /// Built geometry, one entry per selected mesh in selection order.
    pub fn meshes(&self) -> &[MeshGeometry] {
        &self.batch
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Vertex count of the mesh with `id`, or `None` if it is not selected.
    pub fn vertex_count(&self, id: &str) -> Option<usize> {
        self.batch.iter().find(|m| m.id == id).map(MeshGeometry::vertex_count)
    }

    /// UV bounding box of all resident vertices.
    pub fn bounds(&self) -> Option<Bounds> {
        self.batch
            .iter()
            .filter_map(MeshGeometry::bounds)
            .reduce(Bounds::union)
    }

    /// Builds the complete batch, then swaps it in.
    fn rebuild(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut batch = Vec::with_capacity(self.meshes.len());

        for mesh in &self.meshes {
            let set = self.active_uv_set.as_deref().and_then(|name| mesh.uv_set(name));
            let Some(set) = set else {
                if let Some(name) = &self.active_uv_set {
                    diagnostics.push(Diagnostic::new(ViewerError::InvalidUvSet {
                        mesh: mesh.id.clone(),
                        name: name.clone(),
                    }));
                }
                batch.push(MeshGeometry::empty(&mesh.id));
                continue;
            };

            match MeshGeometry::build(mesh, set) {
                Ok(geometry) => batch.push(geometry),
                Err(source) => {
                    diagnostics.push(Diagnostic::new(ViewerError::MalformedTopology {
                        mesh: mesh.id.clone(),
                        source,
                    }));
                    batch.push(MeshGeometry::empty(&mesh.id));
                }
            }
        }

        self.batch = batch;
        self.generation += 1;
        log::debug!(
            "geometry rebuilt: {} mesh(es), uv set {:?}, generation {}",
            self.batch.len(),
            self.active_uv_set,
            self.generation
        );
        diagnostics
    }

    // ── GPU ───────────────────────────────────────────────────────────────

    /// Uploads the current batch if the GPU copy is stale.
    ///
    /// Call once per frame before drawing; `frame_index` is the frame about
    /// to be recorded.
    pub fn ensure_uploaded(&mut self, device: &wgpu::Device, frame_index: u64) {
        if self.gpu_generation != Some(self.generation) {
            let fresh: Vec<MeshGpu> =
                self.batch.iter().map(|m| MeshGpu::upload(device, m)).collect();
            let old = std::mem::replace(&mut self.gpu, fresh);
            if !old.is_empty() {
                self.retired.retire(self.last_used_frame, old);
            }
            self.gpu_generation = Some(self.generation);
        }
        self.last_used_frame = frame_index;
    }

    pub(crate) fn gpu_mesh(&self, index: usize) -> Option<&MeshGpu> {
        if self.gpu_generation != Some(self.generation) {
            return None;
        }
        self.gpu.get(index)
    }

    /// Releases retired buffers whose last frame has been presented.
    pub fn release_retired(&mut self, presented_frame: u64) {
        let n = self.retired.release_through(presented_frame);
        if n > 0 {
            log::debug!("released {n} retired geometry batch(es)");
        }
    }

    /// Drops every GPU buffer immediately.
    pub fn release_gpu(&mut self) {
        self.gpu.clear();
        self.gpu_generation = None;
        self.retired.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::Severity;
    use crate::mesh::Interpolation;

    fn quad(id: &str, set_name: &str, offset: f32) -> UvMesh {
        let positions = vec![
            Vec2::new(offset, 0.0),
            Vec2::new(offset + 1.0, 0.0),
            Vec2::new(offset + 1.0, 1.0),
            Vec2::new(offset, 1.0),
        ];
        UvMesh {
            id: id.into(),
            face_vertex_counts: vec![4],
            face_vertex_indices: vec![0, 1, 2, 3],
            uv_sets: BTreeMap::from([(
                set_name.to_string(),
                UvSet { positions, indices: None, interpolation: Interpolation::Vertex },
            )]),
        }
    }

    // ── batch contents ────────────────────────────────────────────────────

    #[test]
    fn quad_is_fan_triangulated() {
        let mut g = GeometryBuffer::new();
        g.set_active_uv_set(Some("st"));
        g.set_meshes(vec![quad("/a", "st", 0.0)]);
        let m = &g.meshes()[0];
        assert_eq!(m.fill_indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(m.edge_indices, vec![0, 1, 1, 2, 2, 3, 0, 3]);
        assert_eq!(m.borders.len(), 4);
    }

    #[test]
    fn border_instances_carry_uv_endpoints() {
        let mut g = GeometryBuffer::new();
        g.set_active_uv_set(Some("st"));
        g.set_meshes(vec![quad("/a", "st", 0.0)]);
        assert_eq!(g.meshes()[0].borders[0], StrokeInstance { a: [0.0, 0.0], b: [1.0, 0.0] });
    }

    #[test]
    fn mesh_without_active_set_is_empty_and_isolated() {
        let mut g = GeometryBuffer::new();
        g.set_active_uv_set(Some("st"));
        let diags = g.set_meshes(vec![quad("/a", "st", 0.0), quad("/b", "uv", 2.0)]);
        assert_eq!(g.vertex_count("/a"), Some(4));
        assert_eq!(g.vertex_count("/b"), Some(0));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn malformed_mesh_is_skipped_with_report() {
        let mut bad = quad("/bad", "st", 0.0);
        bad.face_vertex_indices = vec![0, 1, 9, 3];
        let mut g = GeometryBuffer::new();
        g.set_active_uv_set(Some("st"));
        let diags = g.set_meshes(vec![bad, quad("/good", "st", 0.0)]);
        assert_eq!(g.vertex_count("/bad"), Some(0));
        assert_eq!(g.vertex_count("/good"), Some(4));
        assert!(matches!(diags[0].error, ViewerError::MalformedTopology { .. }));
    }

    #[test]
    fn empty_selection_clears_the_batch() {
        let mut g = GeometryBuffer::new();
        g.set_active_uv_set(Some("st"));
        g.set_meshes(vec![quad("/a", "st", 0.0)]);
        g.set_meshes(Vec::new());
        assert!(g.meshes().is_empty());
        assert_eq!(g.bounds(), None);
    }

    // ── bounds / generation ───────────────────────────────────────────────

    #[test]
    fn bounds_cover_all_meshes() {
        let mut g = GeometryBuffer::new();
        g.set_active_uv_set(Some("st"));
        g.set_meshes(vec![quad("/a", "st", 0.0), quad("/b", "st", 3.0)]);
        assert_eq!(g.bounds(), Some(Bounds::new(Vec2::ZERO, Vec2::new(4.0, 1.0))));
    }

    #[test]
    fn every_rebuild_bumps_generation() {
        let mut g = GeometryBuffer::new();
        let g0 = g.generation();
        g.set_meshes(vec![quad("/a", "st", 0.0)]);
        g.set_active_uv_set(Some("st"));
        assert_eq!(g.generation(), g0 + 2);
    }
}
