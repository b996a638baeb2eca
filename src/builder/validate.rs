//! Cheap checks that reject degenerate faces before anything is modified.

use std::fmt;

use boolinator::Boolinator;

use crate::{mesh::SurfaceMesh, VertexHandle};


/// The reasons why the builder skips a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceIssue {
    /// The face has less than three vertices.
    TooFewVertices,

    /// A vertex appears more than once in the face.
    DuplicatedVertices,

    /// A vertex handle does not refer to a vertex of the mesh.
    OutOfRangeVertices,

    /// The face could not be linked into the mesh, even after copying
    /// vertices.
    UnknownTopology,
}

impl FaceIssue {
    pub(super) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FaceIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            FaceIssue::TooFewVertices => "face has less than 3 vertices",
            FaceIssue::DuplicatedVertices => "face has duplicated vertices",
            FaceIssue::OutOfRangeVertices => "face has out-of-range vertices",
            FaceIssue::UnknownTopology => "failed adding face with unknown topology",
        };
        f.write_str(s)
    }
}

/// Checks the vertex list of a face. Checks are done in the order of the
/// variants of [`FaceIssue`], so a face with too few vertices is reported as
/// such even if its vertices are also out of range.
pub(super) fn validate(mesh: &SurfaceMesh, vertices: &[VertexHandle]) -> Result<(), FaceIssue> {
    (vertices.len() >= 3).ok_or(FaceIssue::TooFewVertices)?;

    let duplicated = vertices.iter()
        .enumerate()
        .any(|(i, v)| vertices[..i].contains(v));
    (!duplicated).ok_or(FaceIssue::DuplicatedVertices)?;

    vertices.iter()
        .all(|&v| mesh.contains_vertex(v))
        .ok_or(FaceIssue::OutOfRangeVertices)?;

    Ok(())
}
