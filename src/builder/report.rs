use std::fmt;

use crate::mesh::IntegrityError;


/// Summary of a build session, returned by
/// [`ManifoldBuilder::end`][super::ManifoldBuilder::end].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Name of the mesh that was built.
    pub mesh_name: String,

    // ----- Skipped faces -----
    pub faces_too_few_vertices: usize,
    pub faces_duplicated_vertices: usize,
    pub faces_out_of_range_vertices: usize,
    pub faces_unknown_topology: usize,

    // ----- Fixed issues -----
    /// Number of caller vertices that were copied, during `add_face` or by
    /// splitting non-manifold vertices.
    pub non_manifold_vertices: usize,

    /// Number of copies made in total. Each copy is an additional vertex in
    /// the resulting mesh, unless it was left isolated.
    pub copy_occurrences: usize,

    /// Number of caller vertices copied to link a face through an occupied
    /// gap (a subset of `non_manifold_vertices`).
    pub linking_copied_vertices: usize,

    /// Number of copies made to link faces (a subset of `copy_occurrences`).
    pub linking_copy_occurrences: usize,

    /// Number of times a directed edge between caller vertices was used by
    /// more than one face.
    pub non_manifold_edges: usize,

    /// Vertices without any face that were removed.
    pub isolated_vertices: usize,

    // ----- Verification -----
    /// Vertices that are still non-manifold after splitting.
    pub unresolved_vertices: usize,

    /// The first structural problem found in the result, if any. Only
    /// checked if `BuildOptions::check_result` is set.
    pub integrity_error: Option<IntegrityError>,

    // ----- Result -----
    pub num_faces: usize,
    pub num_vertices: usize,
    pub num_edges: usize,
}

impl BuildReport {
    /// Number of faces that were skipped.
    pub fn skipped_faces(&self) -> usize {
        self.faces_too_few_vertices
            + self.faces_duplicated_vertices
            + self.faces_out_of_range_vertices
            + self.faces_unknown_topology
    }

    /// Returns `true` if the input had any issue, fixed or not.
    pub fn has_issues(&self) -> bool {
        self.skipped_faces() > 0
            || self.non_manifold_vertices > 0
            || self.non_manifold_edges > 0
            || self.isolated_vertices > 0
            || self.unresolved_vertices > 0
            || self.integrity_error.is_some()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.has_issues() {
            write!(f, "mesh \"{}\" has no topological issues", self.mesh_name)?;
        } else {
            write!(f, "mesh \"{}\" has topological issues:", self.mesh_name)?;

            let lines = [
                (self.faces_too_few_vertices, "faces with less than 3 vertices (ignored)"),
                (self.faces_duplicated_vertices, "faces with duplicated vertices (ignored)"),
                (self.faces_out_of_range_vertices, "faces with out-of-range vertices (ignored)"),
                (self.faces_unknown_topology, "complex faces with unknown topology (ignored)"),
                (self.non_manifold_vertices, "non-manifold vertices (fixed)"),
                (self.non_manifold_edges, "non-manifold edges (fixed)"),
                (self.isolated_vertices, "isolated vertices (removed)"),
                (self.unresolved_vertices, "non-manifold vertices (unresolved)"),
            ];
            for &(count, what) in lines.iter().filter(|(count, _)| *count > 0) {
                write!(f, "\n\t\t{} {}", count, what)?;
            }
            if let Some(e) = &self.integrity_error {
                write!(f, "\n\t\tinvalid connectivity: {}", e)?;
            }

            if self.copy_occurrences > 0 || self.isolated_vertices > 0 {
                write!(f, "\n\tSolution:")?;
                if self.copy_occurrences > 0 {
                    write!(
                        f,
                        "\n\t\t{} vertices copied ({} occurrences) to ensure manifoldness",
                        self.non_manifold_vertices,
                        self.copy_occurrences,
                    )?;
                    if self.linking_copied_vertices > 0 {
                        write!(
                            f,
                            " (among which {} vertices with {} occurrences are for linking new faces)",
                            self.linking_copied_vertices,
                            self.linking_copy_occurrences,
                        )?;
                    }
                }
                if self.isolated_vertices > 0 {
                    write!(f, "\n\t\t{} isolated vertices deleted", self.isolated_vertices)?;
                }
            }
        }

        write!(
            f,
            "\n\tResult:\n\t\t{} faces\n\t\t{} vertices\n\t\t{} edges",
            self.num_faces,
            self.num_vertices,
            self.num_edges,
        )
    }
}
