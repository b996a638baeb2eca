//! Inserting a single face, copying vertices where the face couldn't be
//! linked otherwise.

use log::debug;
use smallvec::{smallvec, SmallVec};

use crate::{
    handle::Handle,
    mesh::{FreeGap, SurfaceMesh},
    FaceHandle, HalfedgeHandle, VertexHandle,
};
use super::{
    validate::{validate, FaceIssue},
    Session,
};


impl Session {
    /// Adds the face `vertices` (caller vertex handles) to the mesh.
    ///
    /// The internal vertices actually used are written to `face_vertices`.
    /// On error, the connectivity of the mesh is unchanged, but copies of
    /// vertices might have been added.
    pub(super) fn link_face(
        &mut self,
        mesh: &mut SurfaceMesh,
        vertices: &[VertexHandle],
        face_vertices: &mut Vec<VertexHandle>,
    ) -> Result<FaceHandle, FaceIssue> {
        face_vertices.clear();
        validate(mesh, vertices)?;

        let n = vertices.len();

        // Prefer existing vertices and copies that are still on the boundary.
        for &v in vertices {
            let w = self.copies.get(mesh, v);
            face_vertices.push(w);
        }

        // ===================================================================
        // ===== Duplicate edges
        // ===================================================================
        // If an edge of the new face already has a face on the side we need,
        // the target vertex of that edge is replaced by a fresh copy. Only
        // the target is checked: when the last edge copies the first vertex,
        // the first edge starts at an isolated vertex and thus is new.
        let mut halfedges: SmallVec<[Option<HalfedgeHandle>; 8]> = smallvec![None; n];
        for s in 0..n {
            let t = (s + 1) % n;
            let mut h = mesh.find_halfedge(face_vertices[s], face_vertices[t]);
            if h.map_or(false, |h| !mesh.is_boundary(h)) {
                face_vertices[t] = self.copies.copy_vertex(mesh, vertices[t]);
                h = mesh.find_halfedge(face_vertices[s], face_vertices[t]);
                if t == 0 {
                    halfedges[0] = None;
                }
            }

            halfedges[s] = h;
        }

        // ===================================================================
        // ===== Linking gaps
        // ===================================================================
        // Two existing boundary half edges meet at a corner, but are not
        // linked. The mesh can move the patch between them elsewhere if there
        // is another free gap around the vertex. If the only gap is the one
        // we'd need ourselves, the corner gets a fresh copy instead.
        for s in 0..n {
            let t = (s + 1) % n;
            let (inner_prev, inner_next) = match (halfedges[s], halfedges[t]) {
                (Some(prev), Some(next)) => (prev, next),
                _ => continue,
            };
            if mesh.next_halfedge(inner_prev) == inner_next {
                continue;
            }

            match mesh.find_free_gap(inner_prev, inner_next) {
                FreeGap::Found { .. } => {}
                FreeGap::Blocked => {
                    let copy = self.copies.copy_vertex(mesh, vertices[t]);
                    self.copies.note_linking_copy(copy);
                    face_vertices[t] = copy;
                    halfedges[s] = None;
                    halfedges[t] = None;
                }
                FreeGap::Exhausted => {
                    debug!(
                        "no free gap around {:?} while adding face {:?}",
                        face_vertices[t],
                        vertices,
                    );
                    return Err(FaceIssue::UnknownTopology);
                }
            }
        }

        // ===================================================================
        // ===== Commit
        // ===================================================================
        let face = mesh.add_face(face_vertices).map_err(|e| {
            debug!("mesh refused face {:?} (internally {:?}): {}", vertices, face_vertices, e);
            FaceIssue::UnknownTopology
        })?;

        for s in 0..n {
            let t = (s + 1) % n;
            self.record_edge(vertices[s], vertices[t]);
        }

        Ok(face)
    }

    /// Remembers the directed edge `from -> to` in terms of caller vertices.
    fn record_edge(&mut self, from: VertexHandle, to: VertexHandle) {
        let idx = from.to_usize();
        if idx >= self.adjacency.len() {
            self.adjacency.resize_with(idx + 1, SmallVec::new);
        }
        self.adjacency[idx].push(to);
    }
}

/// Counts how often directed edges between caller vertices were used by more
/// than one face. An edge used `k` times counts `k - 1` times.
pub(super) fn count_non_manifold_edges(adjacency: &[SmallVec<[VertexHandle; 6]>]) -> usize {
    adjacency.iter()
        .map(|targets| {
            let mut unique = targets.clone();
            unique.sort();
            unique.dedup();
            targets.len() - unique.len()
        })
        .sum()
}
