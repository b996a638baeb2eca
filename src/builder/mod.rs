//! Building a manifold [`SurfaceMesh`] from a polygon soup.
//!
//! Faces from real world files are often not consistent: edges are shared by
//! more than two faces, faces are duplicated, or vertices are touched by
//! separate fans of faces. A halfedge mesh can't represent most of that.
//! The [`ManifoldBuilder`] adds such faces anyway by copying vertices where
//! necessary, so that the resulting mesh is always a valid manifold (possibly
//! with boundary).
//!
//! # Example
//!
//! ```
//! use cgmath::Point3;
//! use manifold_builder::{ManifoldBuilder, SurfaceMesh};
//!
//! let mut mesh = SurfaceMesh::new();
//! let mut builder = ManifoldBuilder::new(&mut mesh);
//!
//! builder.begin();
//! let v: Vec<_> = (0..3)
//!     .map(|i| builder.add_vertex(Point3::new(i as f32, (i % 2) as f32, 0.0)))
//!     .collect();
//! builder.add_triangle(v[0], v[1], v[2]);
//!
//! // The second triangle would be the third face on edge 0-1: it's added
//! // using copies of the vertices.
//! builder.add_triangle(v[0], v[1], v[2]);
//! let report = builder.end();
//! drop(builder);
//!
//! assert_eq!(report.num_faces, 2);
//! assert!(report.non_manifold_vertices > 0);
//! assert!(mesh.vertices().all(|v| mesh.is_manifold(v)));
//! ```

use std::mem;

use cgmath::Point3;
use log::{debug, error, warn};
use smallvec::SmallVec;

use crate::{
    mesh::SurfaceMesh,
    FaceHandle, VertexHandle,
};
use self::copies::Copies;


mod cleanup;
mod copies;
mod link;
mod non_manifold;
mod report;
mod validate;

pub use self::{
    cleanup::remove_isolated_vertices,
    non_manifold::{split_non_manifold_vertices, SplitOutcome},
    report::BuildReport,
    validate::FaceIssue,
};


/// Name of the boolean vertex property marking all vertices that were
/// copied while building.
pub const LOCK_PROP: &str = "v:lock";


/// Runtime options of a [`ManifoldBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Log the report at `warn` level at the end of a session if the input
    /// had any issues. Default: `true`.
    pub log_issues: bool,

    /// Verify the connectivity of the result at the end of a session.
    /// Default: `true`.
    pub check_result: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            log_issues: true,
            check_result: true,
        }
    }
}


/// Data only needed while building.
#[derive(Debug)]
struct Session {
    copies: Copies,

    /// `adjacency[s]` lists `t` for every directed edge `s -> t` of a
    /// successfully added face, in caller vertices.
    adjacency: Vec<SmallVec<[VertexHandle; 6]>>,

    /// Number of skipped faces, indexed by `FaceIssue::index`.
    skipped: [usize; 4],

    has_faces: bool,
}

impl Session {
    fn new(mesh: &SurfaceMesh) -> Self {
        Self {
            copies: Copies::new(mesh),
            adjacency: Vec::new(),
            skipped: [0; 4],
            has_faces: false,
        }
    }

    /// Counts a skipped face. Only the first face of each kind is logged as
    /// error, the remaining ones only at debug level.
    fn skip_face(&mut self, issue: FaceIssue, vertices: &[VertexHandle], mesh: &SurfaceMesh) {
        let count = &mut self.skipped[issue.index()];
        *count += 1;

        if *count == 1 {
            if issue == FaceIssue::OutOfRangeVertices {
                error!(
                    "{}: {:?} (number of vertices is {}) (this is the first record)",
                    issue,
                    vertices,
                    mesh.vertices_size(),
                );
            } else {
                error!("{}: {:?} (this is the first record)", issue, vertices);
            }
        } else {
            debug!("{}: {:?}", issue, vertices);
        }
    }
}

#[derive(Debug)]
enum State {
    NotStarted,
    Building(Box<Session>),
    Finalized,
}


/// Incrementally builds a manifold mesh from possibly inconsistent faces.
///
/// Usage follows a fixed protocol: call [`begin`][Self::begin], then add all
/// vertices with [`add_vertex`][Self::add_vertex], then all faces with
/// [`add_face`][Self::add_face] (or its shorthands), and finally call
/// [`end`][Self::end]. The builder borrows the mesh it writes into; the mesh
/// doesn't have to be empty.
///
/// Faces are never rejected because of their topology if it can be avoided:
/// when a face can't be linked to the existing mesh, some of its vertices are
/// replaced by copies. `end` then splits vertices that are touched by more
/// than one fan of faces and removes isolated vertices. Only faces with less
/// than three vertices, duplicated vertices or invalid vertex handles are
/// skipped.
///
/// Problems are never returned as errors. They are counted and returned in
/// the [`BuildReport`], and logged via the `log` crate.
#[derive(Debug)]
pub struct ManifoldBuilder<'a> {
    mesh: &'a mut SurfaceMesh,
    options: BuildOptions,
    state: State,

    /// The internal vertices of the last face passed to `add_face`.
    face_vertices: Vec<VertexHandle>,
}

impl<'a> ManifoldBuilder<'a> {
    /// Creates a builder writing into `mesh`, with default options.
    pub fn new(mesh: &'a mut SurfaceMesh) -> Self {
        Self::with_options(mesh, BuildOptions::default())
    }

    pub fn with_options(mesh: &'a mut SurfaceMesh, options: BuildOptions) -> Self {
        Self {
            mesh,
            options,
            state: State::NotStarted,
            face_vertices: Vec::new(),
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// The mesh this builder writes into.
    pub fn mesh(&self) -> &SurfaceMesh {
        self.mesh
    }

    /// Returns `true` between `begin` and `end`.
    pub fn is_building(&self) -> bool {
        match self.state {
            State::Building(_) => true,
            _ => false,
        }
    }

    /// Starts a new build session. Can be called again after `end` to add
    /// more faces to the same mesh.
    pub fn begin(&mut self) {
        if self.is_building() {
            error!(
                "begin() called twice for mesh \"{}\" without end(); \
                    the previous session is discarded",
                self.mesh.name(),
            );
        }

        self.face_vertices.clear();
        self.state = State::Building(Box::new(Session::new(self.mesh)));
    }

    /// Adds a vertex at `p`. All vertices should be added before the first
    /// face.
    pub fn add_vertex(&mut self, p: Point3<f32>) -> VertexHandle {
        let v = self.mesh.add_vertex(p);
        match &mut self.state {
            State::Building(session) => {
                if session.has_faces {
                    error!("vertices should be added before adding faces (added {:?})", v);
                }
                session.copies.add_original(v);
            }
            _ => error!("add_vertex() called outside of begin()/end() (added {:?})", v),
        }

        v
    }

    /// Adds a face with the given vertices in counter clockwise order.
    ///
    /// Returns `None` if the face was skipped (see [`BuildReport`]) or if no
    /// session is active. The internal vertices the face was actually built
    /// with are available via [`face_vertices`][Self::face_vertices].
    pub fn add_face(&mut self, vertices: &[VertexHandle]) -> Option<FaceHandle> {
        let session = match &mut self.state {
            State::Building(session) => session,
            _ => {
                error!(
                    "add_face({:?}) called outside of begin()/end(), face ignored",
                    vertices,
                );
                return None;
            }
        };

        if self.mesh.num_vertices() == 0 {
            debug!("add_face() called before adding any vertices");
        }

        match session.link_face(self.mesh, vertices, &mut self.face_vertices) {
            Ok(face) => {
                session.has_faces = true;
                Some(face)
            }
            Err(issue) => {
                session.skip_face(issue, vertices, self.mesh);
                None
            }
        }
    }

    pub fn add_triangle(
        &mut self,
        a: VertexHandle,
        b: VertexHandle,
        c: VertexHandle,
    ) -> Option<FaceHandle> {
        self.add_face(&[a, b, c])
    }

    pub fn add_quad(
        &mut self,
        a: VertexHandle,
        b: VertexHandle,
        c: VertexHandle,
        d: VertexHandle,
    ) -> Option<FaceHandle> {
        self.add_face(&[a, b, c, d])
    }

    /// The vertices used for the face passed to the last `add_face` call.
    ///
    /// These can differ from the vertices passed in if copies were needed.
    /// Empty if that face was skipped by validation. Note that `end` might
    /// remap vertex handles, so this is only meaningful during a session.
    pub fn face_vertices(&self) -> &[VertexHandle] {
        &self.face_vertices
    }

    /// Finishes the session: splits non-manifold vertices, removes isolated
    /// vertices, optionally verifies the result and returns the report.
    ///
    /// Vertex handles obtained during the session are invalidated if
    /// isolated vertices were removed.
    pub fn end(&mut self) -> BuildReport {
        let session = match mem::replace(&mut self.state, State::Finalized) {
            State::Building(session) => session,
            other => {
                error!("end() called without a matching begin()");
                self.state = other;
                return self.summarize(BuildReport::default());
            }
        };
        let Session { mut copies, adjacency, skipped, .. } = *session;

        let mut report = BuildReport {
            faces_too_few_vertices: skipped[FaceIssue::TooFewVertices.index()],
            faces_duplicated_vertices: skipped[FaceIssue::DuplicatedVertices.index()],
            faces_out_of_range_vertices: skipped[FaceIssue::OutOfRangeVertices.index()],
            faces_unknown_topology: skipped[FaceIssue::UnknownTopology.index()],
            non_manifold_edges: link::count_non_manifold_edges(&adjacency),
            ..BuildReport::default()
        };

        // ----- Split non-manifold vertices ----------------------------------
        non_manifold::split_with(self.mesh, |mesh, v| copies.copy_vertex(mesh, v));

        // All copies are known now.
        report.non_manifold_vertices = copies.record().len();
        report.copy_occurrences = copies.record().values().map(|c| c.len()).sum();
        report.linking_copied_vertices = copies.for_linking().len();
        report.linking_copy_occurrences = copies.for_linking().values().map(|c| c.len()).sum();

        match self.mesh.vertex_props_mut().get_or_add(LOCK_PROP, false) {
            Ok(lock) => {
                let lock = self.mesh.vertex_prop_mut(lock);
                for &v in copies.record().values().flatten() {
                    lock[v] = true;
                }
            }
            Err(e) => error!("cannot mark copied vertices: {}", e),
        }
        drop(copies);

        // ----- Remove isolated vertices -------------------------------------
        report.isolated_vertices = remove_isolated_vertices(self.mesh);
        self.face_vertices.clear();

        // ----- Verify -------------------------------------------------------
        report.unresolved_vertices = non_manifold::count_non_manifold_vertices(self.mesh);
        if report.unresolved_vertices > 0 {
            error!(
                "mesh \"{}\" still has {} non-manifold vertices",
                self.mesh.name(),
                report.unresolved_vertices,
            );
        }

        if self.options.check_result {
            if let Err(e) = self.mesh.check_integrity() {
                error!("mesh \"{}\" has invalid connectivity: {}", self.mesh.name(), e);
                report.integrity_error = Some(e);
            }
        }

        let report = self.summarize(report);
        if self.options.log_issues && report.has_issues() {
            warn!("{}", report);
        }

        report
    }

    /// Fills in the name and element counts of the mesh.
    fn summarize(&self, report: BuildReport) -> BuildReport {
        BuildReport {
            mesh_name: self.mesh.name().to_owned(),
            num_faces: self.mesh.num_faces(),
            num_vertices: self.mesh.num_vertices(),
            num_edges: self.mesh.num_edges(),
            ..report
        }
    }
}

impl Drop for ManifoldBuilder<'_> {
    fn drop(&mut self) {
        if self.is_building() {
            error!(
                "missing call to end() for mesh \"{}\", which must be paired with begin()",
                self.mesh.name(),
            );
        }
    }
}
