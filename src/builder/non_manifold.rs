//! Splitting non-manifold vertices into one vertex per manifold sector.
//!
//! There are two kinds of non-manifold vertices left after all faces are
//! added:
//!
//! - vertices with several separate umbrellas (cycles of half edges), e.g.
//!   the tip shared by two cones,
//! - vertices with a single umbrella containing more than one gap, e.g. the
//!   center of a bowtie. `SurfaceMesh::add_face` happily creates those.
//!
//! Both are resolved by moving all but one of the umbrellas (or sectors) to
//! new copies of the vertex.

use log::{error, trace};

use crate::{
    handle::Handle,
    mesh::SurfaceMesh,
    HalfedgeHandle, VertexHandle,
};
use super::copies::{duplicate_vertex, CopyRecord};


/// What [`split_non_manifold_vertices`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Number of distinct non-manifold vertices found.
    pub non_manifold_vertices: usize,

    /// Number of new vertices created to resolve them.
    pub new_vertices: usize,
}

/// Finds all non-manifold vertices of `mesh` and splits them, such that every
/// vertex afterwards has exactly one umbrella with at most one gap.
///
/// New vertices are copies (position and all properties) of the vertex they
/// were split from. Vertices might be left isolated by this; see
/// [`remove_isolated_vertices`][super::remove_isolated_vertices].
pub fn split_non_manifold_vertices(mesh: &mut SurfaceMesh) -> SplitOutcome {
    split_with(mesh, duplicate_vertex)
}

/// Like [`split_non_manifold_vertices`], but new vertices are created via
/// `copy(mesh, old_vertex)`.
pub(super) fn split_with<F>(mesh: &mut SurfaceMesh, mut copy: F) -> SplitOutcome
where
    F: FnMut(&mut SurfaceMesh, VertexHandle) -> VertexHandle,
{
    let cones = find_non_manifold_cones(mesh);

    // A vertex is in the record as soon as one of its umbrellas was kept.
    let mut record = CopyRecord::default();
    let mut touched = Vec::new();
    let mut new_vertices = 0;
    for h in cones {
        new_vertices += split_cone(mesh, h, &mut record, &mut touched, &mut copy);
    }

    // Outgoing half edges were set to arbitrary half edges of their sector
    // while splitting. Now that all cycles are final, prefer boundary ones.
    for v in touched {
        mesh.adjust_outgoing_halfedge(v);
    }

    SplitOutcome {
        non_manifold_vertices: record.len(),
        new_vertices,
    }
}

/// Counts the vertices that are still not manifold, i.e. that have several
/// umbrellas or an umbrella with several gaps. The first one is logged.
pub(super) fn count_non_manifold_vertices(mesh: &SurfaceMesh) -> usize {
    let mut flagged = vec![false; mesh.vertices_size()];
    let mut count = 0;
    for h in find_non_manifold_cones(mesh) {
        let v = mesh.to_vertex(h);
        if flagged[v.to_usize()] {
            continue;
        }

        if count == 0 {
            error!("vertex {:?} is not manifold (this is the first record)", v);
        }
        flagged[v.to_usize()] = true;
        count += 1;
    }

    count
}


/// Walks all umbrellas and returns one incoming half edge for each umbrella
/// that has to be split off or split up.
fn find_non_manifold_cones(mesh: &SurfaceMesh) -> Vec<HalfedgeHandle> {
    // The half edge with which a vertex was first reached.
    let mut first_cone: Vec<Option<HalfedgeHandle>> = vec![None; mesh.vertices_size()];
    let mut known_non_manifold = vec![false; mesh.vertices_size()];
    let mut visited = vec![false; mesh.num_halfedges()];

    let mut cones = Vec::new();
    for h in mesh.halfedges() {
        if visited[h.to_usize()] {
            continue;
        }

        let v = mesh.to_vertex(h);
        let vi = v.to_usize();
        let mut is_non_manifold = false;

        match first_cone[vi] {
            // Already seen this vertex, but not from this umbrella.
            Some(first) => {
                is_non_manifold = true;

                // The first umbrella was manifold on its own, so it was not
                // reported yet.
                if !known_non_manifold[vi] {
                    cones.push(first);
                }
            }
            None => first_cone[vi] = Some(h),
        }

        // More than one gap in one umbrella means the vertex is pinched.
        let mut border_counter = 0;
        for ih in umbrella(mesh, h) {
            visited[ih.to_usize()] = true;
            if mesh.is_boundary(ih) {
                border_counter += 1;
            }
        }
        if border_counter > 1 {
            is_non_manifold = true;
        }

        if is_non_manifold {
            cones.push(h);
            known_non_manifold[vi] = true;
        }
    }

    cones
}

/// Splits the umbrella containing the incoming half edge `h`. Returns the
/// number of new vertices.
fn split_cone<F>(
    mesh: &mut SurfaceMesh,
    h: HalfedgeHandle,
    record: &mut CopyRecord,
    touched: &mut Vec<VertexHandle>,
    copy: &mut F,
) -> usize
where
    F: FnMut(&mut SurfaceMesh, VertexHandle) -> VertexHandle,
{
    let old_v = mesh.to_vertex(h);

    let mut border_counter = 0;
    let mut border_h = h;
    for ih in umbrella(mesh, h) {
        if mesh.is_boundary(ih) {
            border_h = ih;
            border_counter += 1;
        }
    }

    trace!("splitting umbrella of {:?} at {:?} ({} gaps)", old_v, h, border_counter);

    // ----- A single manifold umbrella ---------------------------------------
    if border_counter <= 1 {
        if record.contains_key(&old_v) {
            // Not the first umbrella of this vertex: move all of it to a copy.
            let last_h = mesh.next_halfedge(h).opposite();
            let new_v = move_sector(mesh, h, last_h, copy);
            record.entry(old_v).or_default().push(new_v);
            touched.push(new_v);
            return 1;
        }

        // The first umbrella stays with the vertex.
        mesh.set_halfedge(old_v, h.opposite());
        record.entry(old_v).or_default();
        touched.push(old_v);
        return 0;
    }

    // ----- Several sectors in one umbrella ----------------------------------
    // Each sector starts with an incoming boundary half edge and ends right
    // before the next one.
    let mut new_vertices = 0;
    let mut is_main_sector = true;
    let mut sector_start = border_h;
    loop {
        let mut sector_last = sector_start;
        for _ in 0..mesh.num_halfedges() {
            let next = mesh.prev_halfedge(sector_last.opposite());
            if mesh.is_boundary(next) {
                break;
            }
            sector_last = next;
        }

        // Has to be read before the sector is closed below.
        let next_start = mesh.prev_halfedge(sector_last.opposite());

        // Close the gap so the sector forms a cycle on its own.
        mesh.set_next_halfedge(sector_start, sector_last.opposite());

        let must_copy = !is_main_sector || record.contains_key(&old_v);
        if must_copy {
            let new_v = move_sector(mesh, sector_start, sector_last, copy);
            record.entry(old_v).or_default().push(new_v);
            touched.push(new_v);
            new_vertices += 1;
        } else {
            mesh.set_halfedge(old_v, sector_start.opposite());
            record.entry(old_v).or_default();
            touched.push(old_v);
        }

        is_main_sector = false;
        sector_start = next_start;
        if sector_start == border_h {
            break;
        }
    }

    new_vertices
}

/// Creates a copy of `to_vertex(first)` and makes all incoming half edges
/// from `first` to `last` (walking around the vertex) point to it.
fn move_sector<F>(
    mesh: &mut SurfaceMesh,
    first: HalfedgeHandle,
    last: HalfedgeHandle,
    copy: &mut F,
) -> VertexHandle
where
    F: FnMut(&mut SurfaceMesh, VertexHandle) -> VertexHandle,
{
    let old_v = mesh.to_vertex(first);
    let new_v = copy(mesh, old_v);
    mesh.set_halfedge(new_v, first.opposite());

    let mut h = first;
    for _ in 0..mesh.num_halfedges() {
        mesh.set_vertex(h, new_v);
        if h == last {
            break;
        }
        h = mesh.prev_halfedge(h.opposite());
    }

    new_v
}

/// The incoming half edges of `to_vertex(start)` reachable from `start`,
/// starting with `start` itself.
fn umbrella(mesh: &SurfaceMesh, start: HalfedgeHandle) -> impl Iterator<Item = HalfedgeHandle> + '_ {
    let mut current = Some(start);
    std::iter::from_fn(move || {
        let out = current?;
        let next = mesh.prev_halfedge(out.opposite());
        current = if next == start { None } else { Some(next) };
        Some(out)
    })
    .take(mesh.num_halfedges())
}
