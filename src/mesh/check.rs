//! Verifying the structural invariants of a `SurfaceMesh`.

use failure::Fail;

use crate::{
    handle::Handle,
    FaceHandle, HalfedgeHandle, VertexHandle,
};
use super::SurfaceMesh;


/// A violated invariant found by [`SurfaceMesh::check_integrity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Fail)]
pub enum IntegrityError {
    #[fail(display = "{:?} links to {:?}, which does not exist", _0, _1)]
    DanglingLink(HalfedgeHandle, HalfedgeHandle),

    #[fail(display = "prev(next({:?})) is {:?}", _0, _1)]
    NextPrevMismatch(HalfedgeHandle, HalfedgeHandle),

    #[fail(display = "{:?} ends at {:?}, but its next half edge does not start there", _0, _1)]
    DisconnectedNext(HalfedgeHandle, VertexHandle),

    #[fail(display = "{:?} and its next half edge border different faces", _0)]
    FaceMismatch(HalfedgeHandle),

    #[fail(display = "{:?} points to {:?}, which is deleted or does not exist", _0, _1)]
    InvalidTarget(HalfedgeHandle, VertexHandle),

    #[fail(display = "the half edge loop of {:?} is not closed or contains foreign half edges", _0)]
    BrokenFaceLoop(FaceHandle),

    #[fail(display = "outgoing half edge {:?} of {:?} does not start at that vertex", _1, _0)]
    WrongOutgoing(VertexHandle, HalfedgeHandle),
}


impl SurfaceMesh {
    /// Checks the connectivity of the whole mesh and returns the first
    /// violated invariant, if any.
    ///
    /// Checked are: every half edge points to an existing vertex, `next` and
    /// `prev` are inverse to one another, consecutive half edges share a
    /// vertex and border the same face (or are both boundary), every face
    /// loop is closed and only contains half edges of that face, and every
    /// vertex's outgoing half edge starts at that vertex.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let num_halfedges = self.halfedges.len();

        for (i, he) in self.halfedges.iter().enumerate() {
            let h = HalfedgeHandle::from_usize(i);

            if !self.contains_vertex(he.target) {
                return Err(IntegrityError::InvalidTarget(h, he.target));
            }
            for &other in &[he.next, he.prev] {
                if other.to_usize() >= num_halfedges {
                    return Err(IntegrityError::DanglingLink(h, other));
                }
            }

            let next = &self.halfedges[he.next.to_usize()];
            if next.prev != h {
                return Err(IntegrityError::NextPrevMismatch(h, next.prev));
            }
            if self.from_vertex(he.next) != he.target {
                return Err(IntegrityError::DisconnectedNext(h, he.target));
            }
            if self.face(he.next) != self.face(h) {
                return Err(IntegrityError::FaceMismatch(h));
            }
        }

        for f in self.faces() {
            let start = self.faces[f.to_usize()].halfedge;
            let mut h = start;
            let mut closed = false;
            for _ in 0..num_halfedges {
                if self.face(h) != Some(f) {
                    break;
                }
                h = self.next_halfedge(h);
                if h == start {
                    closed = true;
                    break;
                }
            }

            if !closed {
                return Err(IntegrityError::BrokenFaceLoop(f));
            }
        }

        for v in self.vertices() {
            if let Some(h) = self.halfedge(v) {
                if h.to_usize() >= num_halfedges || self.from_vertex(h) != v {
                    return Err(IntegrityError::WrongOutgoing(v, h));
                }
            }
        }

        Ok(())
    }
}
