//! Everything related to the [`SurfaceMesh`], a halfedge based polygon mesh.

// # Some notes for developers about this implementation
//
// - The twin half edges are stored implicitly: twins are always stored next to
//   one another in the underlying vector and thus always have handle indices
//   only one apart (2k and 2k + 1). See `HalfedgeHandle::opposite`.
// - Halfedges, edges and faces are never removed. Only isolated vertices can
//   be deleted, which is all the manifold builder needs. `garbage_collection`
//   therefore only has to compact the vertex storage.
// - Connectivity is stored in plain vectors. Everything else about an element
//   (including the vertex positions) lives in the property registries.

use std::{fmt, mem};

use cgmath::Point3;
use failure::Fail;
use optional::Optioned as Opt;
use smallvec::SmallVec;

use crate::{
    handle::Handle,
    prop::{Prop, PropArray, PropError, PropRegistry},
    EdgeHandle, FaceHandle, HalfedgeHandle, VertexHandle,
};


mod adj;
mod check;

pub use self::{
    adj::{HalfedgesAroundFace, HalfedgesAroundVertex, VerticesAroundFace},
    check::IntegrityError,
};


/// Name of the vertex property storing the vertex positions.
pub const POINT_PROP: &str = "v:point";


// ===============================================================================================
// ===== Errors
// ===============================================================================================

/// Reasons why [`SurfaceMesh::add_face`] can refuse to add a face.
///
/// When any of these is returned, the mesh was not modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Fail)]
pub enum TopologyError {
    #[fail(display = "a face needs at least 3 vertices, but {} were given", _0)]
    TooFewVertices(usize),

    #[fail(display = "vertex {:?} appears more than once in the face", _0)]
    DuplicatedVertex(VertexHandle),

    #[fail(display = "complex vertex: {:?} is not a boundary vertex", _0)]
    ComplexVertex(VertexHandle),

    #[fail(display = "complex edge: {:?} -> {:?} is already adjacent to a face", _0, _1)]
    ComplexEdge(VertexHandle, VertexHandle),

    #[fail(display = "patch re-linking failed: no free gap around {:?}", _0)]
    PatchRelinkingFailed(VertexHandle),
}


/// Outcome of [`SurfaceMesh::find_free_gap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeGap {
    /// Two consecutive boundary halfedges into which a new face corner can be
    /// inserted.
    Found {
        boundary_prev: HalfedgeHandle,
        boundary_next: HalfedgeHandle,
    },

    /// The only gap found is the one the new corner would occupy itself, so
    /// the patch between the two halfedges cannot be moved anywhere.
    Blocked,

    /// The search went around the whole vertex (or exceeded the number of
    /// halfedges in the mesh) without finding a second boundary halfedge.
    Exhausted,
}


// ===============================================================================================
// ===== Definition of types stored inside the data structure
// ===============================================================================================

/// Data stored per vertex.
#[derive(Clone, Copy)]
struct Vertex {
    /// Handle of one outgoing half edge.
    ///
    /// - If the vertex is isolated, this is `None`.
    /// - If the vertex is a boundary vertex, this is one of its boundary
    ///   half edges.
    /// - Otherwise, the half edge is completely arbitrary.
    outgoing: Opt<HalfedgeHandle>,
}

/// Data stored per half edge.
#[derive(Clone, Copy)]
struct Halfedge {
    /// The adjacent face. `None` for boundary half edges.
    face: Opt<FaceHandle>,

    /// The vertex this half edge points to.
    target: VertexHandle,

    /// The next half edge around the face or hole this half edge is adjacent
    /// to (going counter clock wise).
    next: HalfedgeHandle,

    /// The previous half edge around the face or hole.
    prev: HalfedgeHandle,
}

/// Data stored per face.
#[derive(Clone, Copy)]
struct Face {
    /// Handle of one (arbitrary) half edge adjacent to the face.
    halfedge: HalfedgeHandle,
}

/// Scratch memory for `add_face`, so that it doesn't have to allocate with
/// every call.
#[derive(Default)]
struct OpCache {
    found: Vec<Option<HalfedgeHandle>>,
    needs_adjust: Vec<bool>,
    next_cache: Vec<(HalfedgeHandle, HalfedgeHandle)>,
}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Vertex {{ outgoing: {:?} }}", self.outgoing)
    }
}

impl fmt::Debug for Halfedge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Halfedge {{ target: {:5} next: {:6} prev: {:6} face: {:?} }}",
            format!("{:?},", self.target),
            format!("{:?},", self.next),
            format!("{:?},", self.prev),
            self.face,
        )
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Face {{ halfedge: {:?} }}", self.halfedge)
    }
}


// ===============================================================================================
// ===== The mesh
// ===============================================================================================

/// A polygon mesh stored as halfedge data structure.
///
/// Each edge is split into two directed half edges pointing in opposite
/// directions. Every half edge knows the vertex it points to, the face it
/// borders (if any), and its `next` and `prev` half edge around that face (or
/// around the hole, for boundary half edges). Each vertex stores one outgoing
/// half edge and each face one of its half edges.
///
/// Faces can only be added if the result stays a valid halfedge structure;
/// see [`add_face`][SurfaceMesh::add_face]. Arbitrary per-element data can be
/// attached via the property registries. Vertex positions are stored in the
/// vertex property [`POINT_PROP`].
///
/// # References
///
/// Introduced in: Mäntylä, Martti. An introduction to solid modeling. Computer
/// science press, 1988.
pub struct SurfaceMesh {
    name: String,

    vertices: Vec<Vertex>,
    vertex_deleted: Vec<bool>,
    num_deleted_vertices: usize,
    halfedges: Vec<Halfedge>,
    faces: Vec<Face>,

    vprops: PropRegistry<VertexHandle>,
    hprops: PropRegistry<HalfedgeHandle>,
    eprops: PropRegistry<EdgeHandle>,
    fprops: PropRegistry<FaceHandle>,
    points: Prop<VertexHandle, Point3<f32>>,

    /// We box the cache to not increase the size of `Self` by too much.
    cache: Box<OpCache>,
}

impl SurfaceMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::with_name("")
    }

    /// Creates an empty mesh with the given name. The name is only used in
    /// diagnostic messages.
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut vprops = PropRegistry::new();
        let points = match vprops.add(POINT_PROP, Point3::new(0.0, 0.0, 0.0)) {
            Ok(p) => p,
            Err(e) => unreachable!("fresh registry refused point property: {}", e),
        };

        Self {
            name: name.into(),
            vertices: Vec::new(),
            vertex_deleted: Vec::new(),
            num_deleted_vertices: 0,
            halfedges: Vec::new(),
            faces: Vec::new(),
            vprops,
            hprops: PropRegistry::new(),
            eprops: PropRegistry::new(),
            fprops: PropRegistry::new(),
            points,
            cache: Box::new(OpCache::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }


    // ----- Element counts and iteration -------------------------------------

    /// Number of vertices, not counting deleted ones.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() - self.num_deleted_vertices
    }

    /// Number of vertex slots, including deleted vertices that were not yet
    /// garbage collected. Vertex handles are always below this value.
    pub fn vertices_size(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    pub fn num_edges(&self) -> usize {
        // There are always exactly twice as many half edges as edges
        self.halfedges.len() / 2
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Returns `true` if there are deleted vertices that
    /// [`garbage_collection`][Self::garbage_collection] would remove.
    pub fn has_garbage(&self) -> bool {
        self.num_deleted_vertices > 0
    }

    /// Iterates over all vertices that are not deleted.
    pub fn vertices(&self) -> impl Iterator<Item = VertexHandle> + '_ {
        self.vertex_deleted.iter()
            .enumerate()
            .filter(|&(_, &deleted)| !deleted)
            .map(|(i, _)| VertexHandle::from_usize(i))
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HalfedgeHandle> {
        (0..self.halfedges.len()).map(HalfedgeHandle::from_usize)
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeHandle> {
        (0..self.num_edges()).map(EdgeHandle::from_usize)
    }

    pub fn faces(&self) -> impl Iterator<Item = FaceHandle> {
        (0..self.faces.len()).map(FaceHandle::from_usize)
    }

    pub fn contains_vertex(&self, v: VertexHandle) -> bool {
        self.vertex_deleted.get(v.to_usize()).map_or(false, |&deleted| !deleted)
    }

    pub fn is_deleted(&self, v: VertexHandle) -> bool {
        self.vertex_deleted.get(v.to_usize()).copied().unwrap_or(false)
    }


    // ----- Adding elements --------------------------------------------------

    /// Adds a new isolated vertex at position `p`. All other vertex
    /// properties get their default value.
    pub fn add_vertex(&mut self, p: Point3<f32>) -> VertexHandle {
        let v = VertexHandle::from_usize(self.vertices.len());
        self.vertices.push(Vertex { outgoing: Opt::none() });
        self.vertex_deleted.push(false);
        self.vprops.push();
        self.vprops.array_mut(self.points)[v] = p;

        v
    }

    /// Adds a face defined by the given vertices in counter clockwise order.
    ///
    /// The face is rejected (and the mesh left unchanged) if adding it would
    /// create a non-manifold situation this data structure cannot
    /// represent:
    ///
    /// - one of the vertices is not on the boundary (all its outgoing half
    ///   edges are adjacent to faces),
    /// - one of the half edges of the new face already exists and is adjacent
    ///   to a face (the edge would get a third face or the orientation would
    ///   be inconsistent),
    /// - two existing boundary half edges meet at a vertex but the patch
    ///   between them can't be moved out of the way.
    ///
    /// Panics if one of the vertex handles is invalid.
    pub fn add_face(&mut self, vertices: &[VertexHandle]) -> Result<FaceHandle, TopologyError> {
        let mut cache = mem::take(&mut *self.cache);
        let out = self.add_face_impl(vertices, &mut cache);
        *self.cache = cache;
        out
    }

    /// Adds the triangle `a`, `b`, `c`. See [`add_face`][Self::add_face].
    pub fn add_triangle(
        &mut self,
        a: VertexHandle,
        b: VertexHandle,
        c: VertexHandle,
    ) -> Result<FaceHandle, TopologyError> {
        self.add_face(&[a, b, c])
    }

    /// Adds the quad `a`, `b`, `c`, `d`. See [`add_face`][Self::add_face].
    pub fn add_quad(
        &mut self,
        a: VertexHandle,
        b: VertexHandle,
        c: VertexHandle,
        d: VertexHandle,
    ) -> Result<FaceHandle, TopologyError> {
        self.add_face(&[a, b, c, d])
    }


    // ----- Removing elements ------------------------------------------------

    /// Marks the given isolated vertex as deleted. The vertex is only
    /// physically removed by [`garbage_collection`][Self::garbage_collection].
    ///
    /// Panics if the vertex is not isolated: this data structure does not
    /// support removing faces.
    pub fn delete_vertex(&mut self, v: VertexHandle) {
        self.check_vertex(v);
        assert!(
            self.is_isolated(v),
            "{:?} is not isolated and cannot be deleted",
            v,
        );

        if !self.vertex_deleted[v.to_usize()] {
            self.vertex_deleted[v.to_usize()] = true;
            self.num_deleted_vertices += 1;
        }
    }

    /// Removes all deleted vertices from memory. This invalidates vertex
    /// handles: the remaining vertices are moved to fill the holes.
    pub fn garbage_collection(&mut self) {
        let nv = self.vertices.len();
        if self.num_deleted_vertices == 0 || nv == 0 {
            return;
        }

        // `origin[i]` is the handle vertex `i` had before the collection.
        let mut origin: Vec<VertexHandle> = (0..nv).map(VertexHandle::from_usize).collect();

        // Swap undeleted vertices from the back into the holes at the front.
        let (mut i0, mut i1) = (0, nv - 1);
        loop {
            while !self.vertex_deleted[i0] && i0 < i1 {
                i0 += 1;
            }
            while self.vertex_deleted[i1] && i0 < i1 {
                i1 -= 1;
            }
            if i0 >= i1 {
                break;
            }

            self.vertices.swap(i0, i1);
            self.vertex_deleted.swap(i0, i1);
            origin.swap(i0, i1);
            self.vprops.swap(VertexHandle::from_usize(i0), VertexHandle::from_usize(i1));
        }
        let new_len = if self.vertex_deleted[i0] { i0 } else { i0 + 1 };

        let mut remap = vec![VertexHandle::from_usize(0); nv];
        for (new, old) in origin.iter().enumerate().take(new_len) {
            remap[old.to_usize()] = VertexHandle::from_usize(new);
        }
        for he in &mut self.halfedges {
            he.target = remap[he.target.to_usize()];
        }

        self.vertices.truncate(new_len);
        self.vertex_deleted.truncate(new_len);
        self.vprops.resize(new_len);

        self.vertices.shrink_to_fit();
        self.vertex_deleted.shrink_to_fit();
        self.vprops.shrink_to_fit();
        self.num_deleted_vertices = 0;
    }


    // ----- Positions and properties -----------------------------------------

    /// The handle of the vertex position property.
    pub fn points(&self) -> Prop<VertexHandle, Point3<f32>> {
        self.points
    }

    pub fn position(&self, v: VertexHandle) -> Point3<f32> {
        self.vprops.array(self.points)[v]
    }

    pub fn set_position(&mut self, v: VertexHandle, p: Point3<f32>) {
        self.vprops.array_mut(self.points)[v] = p;
    }

    pub fn vertex_props(&self) -> &PropRegistry<VertexHandle> {
        &self.vprops
    }

    /// Mutable access to the vertex properties.
    ///
    /// Don't resize or swap arrays here: the registry has to stay in sync
    /// with the vertex storage.
    pub fn vertex_props_mut(&mut self) -> &mut PropRegistry<VertexHandle> {
        &mut self.vprops
    }

    pub fn halfedge_props(&self) -> &PropRegistry<HalfedgeHandle> {
        &self.hprops
    }

    pub fn halfedge_props_mut(&mut self) -> &mut PropRegistry<HalfedgeHandle> {
        &mut self.hprops
    }

    pub fn edge_props(&self) -> &PropRegistry<EdgeHandle> {
        &self.eprops
    }

    pub fn edge_props_mut(&mut self) -> &mut PropRegistry<EdgeHandle> {
        &mut self.eprops
    }

    pub fn face_props(&self) -> &PropRegistry<FaceHandle> {
        &self.fprops
    }

    pub fn face_props_mut(&mut self) -> &mut PropRegistry<FaceHandle> {
        &mut self.fprops
    }

    pub fn add_vertex_property<T: Clone + 'static>(
        &mut self,
        name: &str,
        default: T,
    ) -> Result<Prop<VertexHandle, T>, PropError> {
        self.vprops.add(name, default)
    }

    pub fn vertex_property<T: Clone + 'static>(
        &self,
        name: &str,
    ) -> Option<Prop<VertexHandle, T>> {
        self.vprops.get(name)
    }

    /// Removes the given vertex property. The position property can't be
    /// removed; attempts are ignored and return `false`.
    pub fn remove_vertex_property<T>(&mut self, prop: Prop<VertexHandle, T>) -> bool {
        if prop.slot_eq(self.points) {
            return false;
        }
        self.vprops.remove(prop)
    }

    pub fn vertex_prop<T: 'static>(&self, prop: Prop<VertexHandle, T>) -> &PropArray<VertexHandle, T> {
        self.vprops.array(prop)
    }

    pub fn vertex_prop_mut<T: 'static>(
        &mut self,
        prop: Prop<VertexHandle, T>,
    ) -> &mut PropArray<VertexHandle, T> {
        self.vprops.array_mut(prop)
    }

    pub fn add_halfedge_property<T: Clone + 'static>(
        &mut self,
        name: &str,
        default: T,
    ) -> Result<Prop<HalfedgeHandle, T>, PropError> {
        self.hprops.add(name, default)
    }

    pub fn halfedge_property<T: Clone + 'static>(
        &self,
        name: &str,
    ) -> Option<Prop<HalfedgeHandle, T>> {
        self.hprops.get(name)
    }

    pub fn remove_halfedge_property<T>(&mut self, prop: Prop<HalfedgeHandle, T>) -> bool {
        self.hprops.remove(prop)
    }

    pub fn halfedge_prop<T: 'static>(
        &self,
        prop: Prop<HalfedgeHandle, T>,
    ) -> &PropArray<HalfedgeHandle, T> {
        self.hprops.array(prop)
    }

    pub fn halfedge_prop_mut<T: 'static>(
        &mut self,
        prop: Prop<HalfedgeHandle, T>,
    ) -> &mut PropArray<HalfedgeHandle, T> {
        self.hprops.array_mut(prop)
    }


    // ----- Low level connectivity -------------------------------------------

    /// Returns an outgoing half edge of `v`, or `None` if `v` is isolated. If
    /// `v` is a boundary vertex, this is a boundary half edge.
    pub fn halfedge(&self, v: VertexHandle) -> Option<HalfedgeHandle> {
        self.vertex(v).outgoing.into_option()
    }

    /// Sets the outgoing half edge of `v` to `h`.
    pub fn set_halfedge(&mut self, v: VertexHandle, h: HalfedgeHandle) {
        self.vertex_mut(v).outgoing = Opt::some(h);
    }

    /// Returns one of the half edges of `f`.
    pub fn face_halfedge(&self, f: FaceHandle) -> HalfedgeHandle {
        self.check_face(f);
        self.faces[f.to_usize()].halfedge
    }

    /// The vertex `h` points to.
    pub fn to_vertex(&self, h: HalfedgeHandle) -> VertexHandle {
        self.he(h).target
    }

    /// The vertex `h` emanates from.
    pub fn from_vertex(&self, h: HalfedgeHandle) -> VertexHandle {
        self.he(h.opposite()).target
    }

    /// Makes `h` point to `v`. Does not update any outgoing half edge.
    pub fn set_vertex(&mut self, h: HalfedgeHandle, v: VertexHandle) {
        self.check_vertex(v);
        self.he_mut(h).target = v;
    }

    pub fn next_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.he(h).next
    }

    pub fn prev_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.he(h).prev
    }

    /// Sets `next(h) = n` and `prev(n) = h`. These always have to be set
    /// together, so there is no way to set only one of them.
    pub fn set_next_halfedge(&mut self, h: HalfedgeHandle, n: HalfedgeHandle) {
        self.he_mut(h).next = n;
        self.he_mut(n).prev = h;
    }

    pub fn opposite_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.check_halfedge(h);
        h.opposite()
    }

    /// The next outgoing half edge around `from_vertex(h)` in clockwise
    /// order.
    pub fn cw_rotated_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.next_halfedge(h.opposite())
    }

    /// The next outgoing half edge around `from_vertex(h)` in counter
    /// clockwise order.
    pub fn ccw_rotated_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.prev_halfedge(h).opposite()
    }

    pub fn edge(&self, h: HalfedgeHandle) -> EdgeHandle {
        self.check_halfedge(h);
        h.edge()
    }

    /// The `i`th half edge of `e`. `i` has to be 0 or 1.
    pub fn edge_halfedge(&self, e: EdgeHandle, i: u8) -> HalfedgeHandle {
        assert!(i <= 1, "an edge only has two halves, but half {} was requested", i);
        let h = e.halfedge(i.into());
        self.check_halfedge(h);
        h
    }

    /// The face `h` is adjacent to, or `None` if `h` is a boundary half edge.
    pub fn face(&self, h: HalfedgeHandle) -> Option<FaceHandle> {
        self.he(h).face.into_option()
    }


    // ----- Queries ----------------------------------------------------------

    /// Returns `true` if `h` is not adjacent to a face.
    pub fn is_boundary(&self, h: HalfedgeHandle) -> bool {
        self.he(h).face.is_none()
    }

    /// Returns `true` if `v` is isolated or has a boundary outgoing half
    /// edge. Only the stored outgoing half edge is inspected.
    pub fn is_boundary_vertex(&self, v: VertexHandle) -> bool {
        match self.halfedge(v) {
            None => true,
            Some(h) => self.is_boundary(h),
        }
    }

    /// Returns `true` if `e` has a boundary half edge.
    pub fn is_boundary_edge(&self, e: EdgeHandle) -> bool {
        self.is_boundary(self.edge_halfedge(e, 0)) || self.is_boundary(self.edge_halfedge(e, 1))
    }

    /// Returns `true` if no half edge is attached to `v`.
    pub fn is_isolated(&self, v: VertexHandle) -> bool {
        self.halfedge(v).is_none()
    }

    /// Returns `true` if the faces around `v` form a single fan, i.e. there
    /// is at most one gap in the cycle of its outgoing half edges.
    pub fn is_manifold(&self, v: VertexHandle) -> bool {
        self.halfedges_around_vertex(v)
            .filter(|&h| self.is_boundary(h))
            .nth(1)
            .is_none()
    }

    /// Number of outgoing half edges of `v` in its cycle.
    pub fn valence(&self, v: VertexHandle) -> usize {
        self.halfedges_around_vertex(v).count()
    }

    /// Tries to find the half edge from `start` to `end`. Only the cycle of
    /// outgoing half edges reachable from `halfedge(start)` is searched.
    pub fn find_halfedge(&self, start: VertexHandle, end: VertexHandle) -> Option<HalfedgeHandle> {
        self.check_vertex(end);
        self.halfedges_around_vertex(start).find(|&h| self.to_vertex(h) == end)
    }

    pub fn find_edge(&self, a: VertexHandle, b: VertexHandle) -> Option<EdgeHandle> {
        self.find_halfedge(a, b).map(HalfedgeHandle::edge)
    }

    /// If `v` has a boundary outgoing half edge in its cycle, makes it the
    /// stored outgoing half edge of `v`.
    pub fn adjust_outgoing_halfedge(&mut self, v: VertexHandle) {
        let boundary = self.halfedges_around_vertex(v).find(|&h| self.is_boundary(h));
        if let Some(h) = boundary {
            self.set_halfedge(v, h);
        }
    }

    /// Searches a free gap around the vertex `to_vertex(inner_prev)` into
    /// which the corner `inner_prev -> inner_next` of a new face can be
    /// inserted. Both half edges have to be boundary half edges meeting at
    /// the same vertex.
    ///
    /// The search walks the incoming half edges of the vertex, starting
    /// after `opposite(inner_next)`, and stops at the first boundary half
    /// edge that is not `inner_prev`. It is bounded by the number of half
    /// edges in the mesh, so it terminates even if the cycle is broken.
    pub fn find_free_gap(&self, inner_prev: HalfedgeHandle, inner_next: HalfedgeHandle) -> FreeGap {
        let outer_prev = inner_next.opposite();
        let mut boundary_prev = outer_prev;

        for _ in 0..self.halfedges.len() {
            boundary_prev = self.next_halfedge(boundary_prev).opposite();

            if self.is_boundary(boundary_prev) && boundary_prev != inner_prev {
                let boundary_next = self.next_halfedge(boundary_prev);
                return if boundary_next == inner_next {
                    FreeGap::Blocked
                } else {
                    FreeGap::Found { boundary_prev, boundary_next }
                };
            }

            if boundary_prev == outer_prev {
                break;
            }
        }

        FreeGap::Exhausted
    }


    // ----- Internal helpers -------------------------------------------------

    /// Makes sure the given handle points to an existing vertex. If that's
    /// not the case, this method panics.
    fn check_vertex(&self, v: VertexHandle) {
        if !self.contains_vertex(v) {
            panic!(
                "{:?} was passed to a surface mesh, but this vertex does not exist in this mesh",
                v,
            );
        }
    }

    fn check_halfedge(&self, h: HalfedgeHandle) {
        if h.to_usize() >= self.halfedges.len() {
            panic!(
                "{:?} was passed to a surface mesh, but this halfedge does not exist in this mesh",
                h,
            );
        }
    }

    fn check_face(&self, f: FaceHandle) {
        if f.to_usize() >= self.faces.len() {
            panic!(
                "{:?} was passed to a surface mesh, but this face does not exist in this mesh",
                f,
            );
        }
    }

    #[inline(always)]
    fn vertex(&self, v: VertexHandle) -> &Vertex {
        self.check_vertex(v);
        &self.vertices[v.to_usize()]
    }

    #[inline(always)]
    fn vertex_mut(&mut self, v: VertexHandle) -> &mut Vertex {
        self.check_vertex(v);
        &mut self.vertices[v.to_usize()]
    }

    #[inline(always)]
    fn he(&self, h: HalfedgeHandle) -> &Halfedge {
        self.check_halfedge(h);
        &self.halfedges[h.to_usize()]
    }

    #[inline(always)]
    fn he_mut(&mut self, h: HalfedgeHandle) -> &mut Halfedge {
        self.check_halfedge(h);
        &mut self.halfedges[h.to_usize()]
    }

    /// Adds the two half edges between `from` and `to` and returns the one
    /// pointing to `to`. The `next` and `prev` handles are set to dummy
    /// values (the half edges themselves) and have to be overwritten.
    fn new_edge(&mut self, from: VertexHandle, to: VertexHandle) -> HalfedgeHandle {
        let h0 = HalfedgeHandle::from_usize(self.halfedges.len());
        let h1 = h0.opposite();
        let dummy = |h| Halfedge { face: Opt::none(), target: to, next: h, prev: h };

        self.halfedges.push(dummy(h0));
        self.halfedges.push(Halfedge { target: from, ..dummy(h1) });
        self.hprops.push();
        self.hprops.push();
        self.eprops.push();

        h0
    }

    fn new_face(&mut self, halfedge: HalfedgeHandle) -> FaceHandle {
        let f = FaceHandle::from_usize(self.faces.len());
        self.faces.push(Face { halfedge });
        self.fprops.push();
        f
    }

    fn add_face_impl(
        &mut self,
        vertices: &[VertexHandle],
        cache: &mut OpCache,
    ) -> Result<FaceHandle, TopologyError> {
        let n = vertices.len();
        if n < 3 {
            return Err(TopologyError::TooFewVertices(n));
        }
        for (i, &v) in vertices.iter().enumerate() {
            self.check_vertex(v);
            if vertices[..i].contains(&v) {
                return Err(TopologyError::DuplicatedVertex(v));
            }
        }

        let OpCache { found, needs_adjust, next_cache } = cache;
        found.clear();
        needs_adjust.clear();
        needs_adjust.resize(n, false);
        next_cache.clear();

        // ===================================================================
        // ===== Test for topological errors
        // ===================================================================
        // `found[i]` is the existing half edge from `vertices[i]` to
        // `vertices[i + 1]`, if any.
        for i in 0..n {
            let (from, to) = (vertices[i], vertices[(i + 1) % n]);
            if !self.is_boundary_vertex(from) {
                return Err(TopologyError::ComplexVertex(from));
            }

            let h = self.find_halfedge(from, to);
            if let Some(h) = h {
                if !self.is_boundary(h) {
                    return Err(TopologyError::ComplexEdge(from, to));
                }
            }
            found.push(h);
        }

        // ===================================================================
        // ===== Re-link patches if necessary
        // ===================================================================
        // If two consecutive inner half edges already exist but are not
        // linked to each other, the patch between them has to be moved to
        // another gap around the vertex. Like all other `next` changes, this
        // is only recorded in `next_cache` and applied at the very end. That
        // way, nothing is modified before we know the face can be added.
        for i in 0..n {
            let ii = (i + 1) % n;
            if let (Some(inner_prev), Some(inner_next)) = (found[i], found[ii]) {
                if self.next_halfedge(inner_prev) != inner_next {
                    let (boundary_prev, boundary_next) =
                        match self.find_free_gap(inner_prev, inner_next) {
                            FreeGap::Found { boundary_prev, boundary_next } => {
                                (boundary_prev, boundary_next)
                            }
                            _ => return Err(TopologyError::PatchRelinkingFailed(vertices[ii])),
                        };

                    let patch_start = self.next_halfedge(inner_prev);
                    let patch_end = self.prev_halfedge(inner_next);

                    next_cache.push((boundary_prev, patch_start));
                    next_cache.push((patch_end, boundary_next));
                    next_cache.push((inner_prev, inner_next));
                }
            }
        }

        // ===================================================================
        // ===== Create missing edges and the face
        // ===================================================================
        // From here on, the face is definitely added.
        let inner: SmallVec<[HalfedgeHandle; 8]> = (0..n)
            .map(|i| match found[i] {
                Some(h) => h,
                None => self.new_edge(vertices[i], vertices[(i + 1) % n]),
            })
            .collect();

        let face = self.new_face(inner[n - 1]);

        // ===================================================================
        // ===== Setup half edges
        // ===================================================================
        // For each corner `v` we look at the inner half edges entering and
        // leaving `v`. Depending on which of them are new, the outer half
        // edges have to be linked into the cycle around `v`.
        for i in 0..n {
            let ii = (i + 1) % n;
            let v = vertices[ii];
            let inner_prev = inner[i];
            let inner_next = inner[ii];
            let outer_prev = inner_next.opposite();
            let outer_next = inner_prev.opposite();

            match (found[i].is_none(), found[ii].is_none()) {
                // Both existed: they are already linked (or will be by the
                // re-linking above). We might have to fix `v`'s outgoing
                // half edge though, as `inner_next` won't be boundary anymore.
                (false, false) => {
                    needs_adjust[ii] = self.halfedge(v) == Some(inner_next);
                }

                // `inner_prev` is new, `inner_next` existed.
                (true, false) => {
                    let boundary_prev = self.prev_halfedge(inner_next);
                    next_cache.push((boundary_prev, outer_next));
                    self.set_halfedge(v, outer_next);
                    next_cache.push((inner_prev, inner_next));
                }

                // `inner_prev` existed, `inner_next` is new.
                (false, true) => {
                    let boundary_next = self.next_halfedge(inner_prev);
                    next_cache.push((outer_prev, boundary_next));
                    self.set_halfedge(v, boundary_next);
                    next_cache.push((inner_prev, inner_next));
                }

                // Both are new. If `v` already has edges, the new face
                // becomes another fan blade inserted in front of
                // `halfedge(v)`.
                (true, true) => {
                    match self.halfedge(v) {
                        None => {
                            self.set_halfedge(v, outer_next);
                            next_cache.push((outer_prev, outer_next));
                        }
                        Some(boundary_next) => {
                            let boundary_prev = self.prev_halfedge(boundary_next);
                            next_cache.push((boundary_prev, outer_next));
                            next_cache.push((outer_prev, boundary_next));
                        }
                    }
                    next_cache.push((inner_prev, inner_next));
                }
            }

            self.he_mut(inner_prev).face = Opt::some(face);
        }

        for &(h, next) in next_cache.iter() {
            self.set_next_halfedge(h, next);
        }

        for (i, &adjust) in needs_adjust.iter().enumerate() {
            if adjust {
                self.adjust_outgoing_halfedge(vertices[i]);
            }
        }

        Ok(face)
    }
}

impl Default for SurfaceMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SurfaceMesh {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            vertices: self.vertices.clone(),
            vertex_deleted: self.vertex_deleted.clone(),
            num_deleted_vertices: self.num_deleted_vertices,
            halfedges: self.halfedges.clone(),
            faces: self.faces.clone(),
            vprops: self.vprops.clone(),
            hprops: self.hprops.clone(),
            eprops: self.eprops.clone(),
            fprops: self.fprops.clone(),
            points: self.points,
            // As it's cache, we do not actually clone it, but create a new one
            cache: Box::new(OpCache::default()),
        }
    }
}

impl fmt::Debug for SurfaceMesh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SurfaceMesh")
            .field("name", &self.name)
            .field("vertices", &self.vertices)
            .field("vertex_deleted", &self.vertex_deleted)
            .field("halfedges", &self.halfedges)
            .field("faces", &self.faces)
            .field("vprops", &self.vprops)
            .finish()
    }
}
