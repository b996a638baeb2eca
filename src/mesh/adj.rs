//! Circulators around vertices and faces.

use crate::{FaceHandle, HalfedgeHandle, VertexHandle};
use super::SurfaceMesh;


// ===============================================================================================
// ===== Circulators
// ===============================================================================================

/// Iterates over the outgoing half edges of a vertex in clockwise order,
/// starting with [`SurfaceMesh::halfedge`].
///
/// Only the cycle reachable from the stored outgoing half edge is visited.
/// For a non-manifold vertex with several separate fans, that's just one of
/// them.
#[derive(Debug, Clone)]
pub enum HalfedgesAroundVertex<'a> {
    Empty,
    NonEmpty {
        mesh: &'a SurfaceMesh,
        current: HalfedgeHandle,
        start: HalfedgeHandle,
    },
}

impl Iterator for HalfedgesAroundVertex<'_> {
    type Item = HalfedgeHandle;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        match *self {
            HalfedgesAroundVertex::Empty => None,
            HalfedgesAroundVertex::NonEmpty { mesh, ref mut current, start } => {
                let out = *current;

                // Advance iterator
                let next = mesh.he(out.opposite()).next;
                if next == start {
                    // We went around once, we're done.
                    *self = HalfedgesAroundVertex::Empty;
                } else {
                    *current = next;
                }

                Some(out)
            }
        }
    }
}


/// Iterates over the inner half edges of a face in counter-clockwise order.
#[derive(Debug, Clone)]
pub enum HalfedgesAroundFace<'a> {
    Empty,
    NonEmpty {
        mesh: &'a SurfaceMesh,
        current: HalfedgeHandle,
        start: HalfedgeHandle,
    },
}

impl Iterator for HalfedgesAroundFace<'_> {
    type Item = HalfedgeHandle;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        match *self {
            HalfedgesAroundFace::Empty => None,
            HalfedgesAroundFace::NonEmpty { mesh, ref mut current, start } => {
                let out = *current;

                let next = mesh.he(out).next;
                if next == start {
                    *self = HalfedgesAroundFace::Empty;
                } else {
                    *current = next;
                }

                Some(out)
            }
        }
    }
}

/// Iterates over the vertices of a face in counter-clockwise order.
#[derive(Debug, Clone)]
pub struct VerticesAroundFace<'a>(HalfedgesAroundFace<'a>);

impl Iterator for VerticesAroundFace<'_> {
    type Item = VertexHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let mesh = match self.0 {
            HalfedgesAroundFace::Empty => return None,
            HalfedgesAroundFace::NonEmpty { mesh, .. } => mesh,
        };
        self.0.next().map(|h| mesh.to_vertex(h))
    }
}


// ===============================================================================================
// ===== Constructors on the mesh
// ===============================================================================================

impl SurfaceMesh {
    /// Circulates around `v`, yielding outgoing half edges. Yields nothing
    /// if `v` is isolated.
    pub fn halfedges_around_vertex(&self, v: VertexHandle) -> HalfedgesAroundVertex<'_> {
        match self.halfedge(v) {
            None => HalfedgesAroundVertex::Empty,
            Some(start) => HalfedgesAroundVertex::NonEmpty {
                mesh: self,
                current: start,
                start,
            },
        }
    }

    /// Circulates around `f`, yielding its inner half edges.
    pub fn halfedges_around_face(&self, f: FaceHandle) -> HalfedgesAroundFace<'_> {
        let start = self.face_halfedge(f);
        HalfedgesAroundFace::NonEmpty {
            mesh: self,
            current: start,
            start,
        }
    }

    /// Circulates around `f`, yielding its vertices.
    pub fn vertices_around_face(&self, f: FaceHandle) -> VerticesAroundFace<'_> {
        VerticesAroundFace(self.halfedges_around_face(f))
    }
}
