//! UV mesh data model.
//!
//! A [`UvMesh`] carries polygon topology plus any number of named UV sets.
//! Geometry is always built against one UV set at a time; [`EdgeList`]
//! derives the wireframe and border edges for a mesh/set pair.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use serde::Deserialize;

use crate::error::TopologyError;

/// How UV values map onto the mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    /// One UV per face corner.
    FaceVarying,
    /// One UV per mesh point.
    Vertex,
}

/// One named UV primvar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UvSet {
    pub positions: Vec<Vec2>,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
    pub interpolation: Interpolation,
}

/// A mesh as seen by the viewport: topology plus UV sets keyed by name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UvMesh {
    /// Stable identifier (the prim path).
    pub id: String,
    pub face_vertex_counts: Vec<u32>,
    pub face_vertex_indices: Vec<u32>,
    #[serde(default)]
    pub uv_sets: BTreeMap<String, UvSet>,
}

impl UvMesh {
    pub fn uv_set(&self, name: &str) -> Option<&UvSet> {
        self.uv_sets.get(name)
    }

    pub fn uv_set_names(&self) -> impl Iterator<Item = &str> {
        self.uv_sets.keys().map(String::as_str)
    }

    /// Resolves every face corner to an index into `set.positions`.
    ///
    /// Fails when the face counts overrun the topology, a face has fewer than
    /// two corners, or any index map points past its target.
    pub fn resolve_corners(&self, set: &UvSet) -> Result<Vec<u32>, TopologyError> {
        let corner_count = self.corner_count()?;
        (0..corner_count as u32).map(|c| self.resolve_corner(set, c)).collect()
    }

    /// Total corner count, validating the face counts on the way.
    fn corner_count(&self) -> Result<usize, TopologyError> {
        let mut offset = 0usize;
        for (face, &n) in self.face_vertex_counts.iter().enumerate() {
            if n < 2 {
                return Err(TopologyError::DegenerateFace { face, corners: n });
            }
            let available = self.face_vertex_indices.len().saturating_sub(offset);
            if n as usize > available {
                return Err(TopologyError::FaceOverrun { face, needed: n as usize, available });
            }
            offset += n as usize;
        }
        Ok(offset)
    }

    fn resolve_corner(&self, set: &UvSet, corner: u32) -> Result<u32, TopologyError> {
        let mut index = corner;
        if set.interpolation == Interpolation::Vertex {
            index = lookup(&self.face_vertex_indices, index, "face vertex indices")?;
        }
        if let Some(uv_indices) = &set.indices {
            index = lookup(uv_indices, index, "uv indices")?;
        }
        if index as usize >= set.positions.len() {
            return Err(TopologyError::IndexOutOfRange {
                what: "uv positions",
                index,
                len: set.positions.len(),
            });
        }
        Ok(index)
    }

    /// Iterates `(offset, corner_count)` per face.
    pub(crate) fn faces(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.face_vertex_counts.iter().scan(0usize, |offset, &n| {
            let face = (*offset, n as usize);
            *offset += n as usize;
            Some(face)
        })
    }
}

fn lookup(map: &[u32], index: u32, what: &'static str) -> Result<u32, TopologyError> {
    map.get(index as usize)
        .copied()
        .ok_or(TopologyError::IndexOutOfRange { what, index, len: map.len() })
}

// ── edges ─────────────────────────────────────────────────────────────────

/// An undirected edge between two UV position indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Edge {
    pub a: u32,
    pub b: u32,
    /// Referenced by exactly one face.
    pub border: bool,
}

/// Wireframe edges of one mesh in one UV set, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeList {
    edges: Vec<Edge>,
    borders_known: bool,
}

impl EdgeList {
    /// Builds the edge list for `mesh` in `set`.
    ///
    /// Border status comes from how many faces reference an edge in the
    /// index space of `set`, never from UV positions. Face-varying sets
    /// without an index buffer give every corner its own UV, so their edges
    /// are the raw corner pairs and no borders can be determined.
    pub fn build(mesh: &UvMesh, set: &UvSet) -> Result<Self, TopologyError> {
        let corners = mesh.resolve_corners(set)?;

        let shared_indices =
            set.interpolation == Interpolation::Vertex || set.indices.is_some();

        if !shared_indices {
            let edges = mesh
                .faces()
                .flat_map(|(offset, n)| {
                    (0..n).map(move |i| (offset + i, offset + (i + 1) % n))
                })
                .map(|(i, j)| Edge { a: corners[i], b: corners[j], border: false })
                .collect();
            return Ok(Self { edges, borders_known: false });
        }

        let mut order: Vec<(u32, u32)> = Vec::new();
        let mut refs: HashMap<(u32, u32), u32> = HashMap::new();
        for (offset, n) in mesh.faces() {
            for i in 0..n {
                let a = corners[offset + i];
                let b = corners[offset + (i + 1) % n];
                let key = (a.min(b), a.max(b));
                let count = refs.entry(key).or_insert(0);
                if *count == 0 {
                    order.push(key);
                }
                *count += 1;
            }
        }

        let edges = order
            .into_iter()
            .map(|(a, b)| Edge { a, b, border: refs.get(&(a, b)) == Some(&1) })
            .collect();
        Ok(Self { edges, borders_known: true })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn borders(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.border)
    }

    /// False for face-varying sets without indices.
    pub fn borders_known(&self) -> bool {
        self.borders_known
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

// ── bounds ────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in UV space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub const UNIT: Bounds = Bounds { min: Vec2::ZERO, max: Vec2::ONE };

    #[inline]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min: min.min(max), max: min.max(max) }
    }

    /// Bounds of `points`, skipping non-finite values; `None` when nothing is left.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec2>) -> Option<Self> {
        points
            .into_iter()
            .filter(|p| p.is_finite())
            .fold(None, |acc: Option<Bounds>, &p| match acc {
                None => Some(Bounds { min: p, max: p }),
                Some(b) => Some(Bounds { min: b.min.min(p), max: b.max.max(p) }),
            })
    }

    #[inline]
    pub fn union(self, other: Bounds) -> Bounds {
        Bounds { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Grows each side by `fraction` of the extent along that axis.
    #[inline]
    pub fn expand_fraction(self, fraction: f32) -> Bounds {
        let pad = self.size() * fraction;
        Bounds { min: self.min - pad, max: self.max + pad }
    }

    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn corners(self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}
