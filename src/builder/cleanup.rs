use log::trace;

use crate::mesh::SurfaceMesh;


/// Deletes all vertices without any half edge and compacts the vertex
/// storage. Returns the number of removed vertices.
///
/// This invalidates vertex handles if any vertex was removed.
pub fn remove_isolated_vertices(mesh: &mut SurfaceMesh) -> usize {
    let isolated: Vec<_> = mesh.vertices().filter(|&v| mesh.is_isolated(v)).collect();
    for &v in &isolated {
        mesh.delete_vertex(v);
    }

    if mesh.has_garbage() {
        trace!("removing {} isolated vertices from mesh \"{}\"", isolated.len(), mesh.name());
        mesh.garbage_collection();
    }

    isolated.len()
}
