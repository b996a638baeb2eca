//! Building manifold halfedge meshes from polygon soups.
//!
//! This crate contains two things:
//!
//! - [`SurfaceMesh`], a halfedge based polygon mesh with named, dynamically
//!   typed per-element properties (see [`prop`]).
//! - [`ManifoldBuilder`], which adds arbitrary faces to a `SurfaceMesh`. Faces
//!   that would make the mesh non-manifold are added anyway by copying some
//!   of their vertices, so the result is always a valid manifold mesh
//!   (possibly with boundary).
//!
//! All mesh elements are referred to by handles (see [`handle`]), which are
//! simple indices. Diagnostics are emitted via the `log` crate; install any
//! logger to see them.

pub mod builder;
pub mod handle;
pub mod mesh;
pub mod prop;

pub use self::{
    builder::{BuildOptions, BuildReport, ManifoldBuilder},
    handle::{hsize, EdgeHandle, FaceHandle, HalfedgeHandle, VertexHandle},
    mesh::SurfaceMesh,
};
