//! Tracking which internal vertices are copies of which caller vertex.

use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::{handle::Handle, mesh::SurfaceMesh, VertexHandle};


/// Maps a vertex to the copies that were made of it.
pub(crate) type CopyRecord = FxHashMap<VertexHandle, SmallVec<[VertexHandle; 4]>>;


/// Adds a new vertex with the same position and properties as `v`.
///
/// Connectivity is not stored in the property registry, so the new vertex
/// is isolated.
pub(crate) fn duplicate_vertex(mesh: &mut SurfaceMesh, v: VertexHandle) -> VertexHandle {
    let new_v = mesh.add_vertex(mesh.position(v));
    mesh.vertex_props_mut().copy(v, new_v);
    new_v
}


/// Session bookkeeping: the original vertex of every vertex and the copies
/// made of every original vertex.
#[derive(Debug)]
pub(super) struct Copies {
    /// `original[v]` is the caller vertex `v` was copied from, or `v` itself.
    original: Vec<VertexHandle>,

    /// All copies, keyed by original vertex.
    record: CopyRecord,

    /// The subset of `record` made to link a face through a blocked gap.
    /// Only used for the report.
    for_linking: CopyRecord,
}

impl Copies {
    /// Starts the bookkeeping for `mesh`. All vertices already in the mesh
    /// are their own originals.
    pub(super) fn new(mesh: &SurfaceMesh) -> Self {
        Self {
            original: (0..mesh.vertices_size()).map(VertexHandle::from_usize).collect(),
            record: CopyRecord::default(),
            for_linking: CopyRecord::default(),
        }
    }

    pub(super) fn record(&self) -> &CopyRecord {
        &self.record
    }

    pub(super) fn for_linking(&self) -> &CopyRecord {
        &self.for_linking
    }

    /// Registers a vertex the caller added. It is its own original.
    pub(super) fn add_original(&mut self, v: VertexHandle) {
        self.set_original(v, v);
    }

    pub(super) fn original(&self, v: VertexHandle) -> VertexHandle {
        self.original.get(v.to_usize()).copied().unwrap_or(v)
    }

    /// Returns the vertex to use for a corner referring to caller vertex
    /// `v`: `v` itself or one of its copies if they are on the boundary,
    /// otherwise a new copy.
    pub(super) fn get(&mut self, mesh: &mut SurfaceMesh, v: VertexHandle) -> VertexHandle {
        let reusable = match self.record.get(&v) {
            None => Some(v).filter(|&v| mesh.is_boundary_vertex(v)),
            Some(copies) => copies.iter().copied().find(|&c| mesh.is_boundary_vertex(c)),
        };

        match reusable {
            Some(v) => v,
            None => self.copy_vertex(mesh, v),
        }
    }

    /// Creates a new copy of the original vertex of `v`.
    pub(super) fn copy_vertex(&mut self, mesh: &mut SurfaceMesh, v: VertexHandle) -> VertexHandle {
        let original = self.original(v);
        let new_v = duplicate_vertex(mesh, original);
        self.set_original(new_v, original);
        self.record.entry(original).or_default().push(new_v);
        new_v
    }

    /// Remembers that `copy` was made to link a face into the mesh.
    pub(super) fn note_linking_copy(&mut self, copy: VertexHandle) {
        let original = self.original(copy);
        self.for_linking.entry(original).or_default().push(copy);
    }

    fn set_original(&mut self, v: VertexHandle, original: VertexHandle) {
        let idx = v.to_usize();
        if idx >= self.original.len() {
            let start = self.original.len();
            self.original.extend((start..=idx).map(VertexHandle::from_usize));
        }
        self.original[idx] = original;
    }
}
