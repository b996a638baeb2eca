//! Building meshes from well-formed and broken polygon soups.

use cgmath::Point3;

use manifold_builder::{
    builder::{remove_isolated_vertices, split_non_manifold_vertices, SplitOutcome},
    handle::Handle,
    BuildReport, ManifoldBuilder, SurfaceMesh, VertexHandle,
};


// ===============================================================================================
// ===== Helpers
// ===============================================================================================

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn v(i: usize) -> VertexHandle {
    VertexHandle::from_usize(i)
}

/// Builds a mesh from the given positions and faces (indices into
/// `positions`) with a single builder session.
fn build(positions: &[[f32; 3]], faces: &[&[usize]]) -> (SurfaceMesh, BuildReport) {
    init_logger();

    let mut mesh = SurfaceMesh::with_name("soup");
    let mut builder = ManifoldBuilder::new(&mut mesh);
    builder.begin();

    let vertices: Vec<_> = positions.iter()
        .map(|&[x, y, z]| builder.add_vertex(Point3::new(x, y, z)))
        .collect();
    for face in faces {
        let face: Vec<_> = face.iter().map(|&i| vertices.get(i).copied().unwrap_or(v(i))).collect();
        builder.add_face(&face);
    }

    let report = builder.end();
    drop(builder);
    (mesh, report)
}

/// Checks everything that has to hold for every mesh coming out of the
/// builder.
fn check_invariants(mesh: &SurfaceMesh) {
    if let Err(e) = mesh.check_integrity() {
        panic!("integrity check failed: {}\n{:#?}", e, mesh);
    }

    for h in mesh.halfedges() {
        let opp = mesh.opposite_halfedge(h);
        assert_ne!(opp, h);
        assert_eq!(mesh.opposite_halfedge(opp), h);
        assert_eq!(mesh.prev_halfedge(mesh.next_halfedge(h)), h);
        assert_eq!(mesh.next_halfedge(mesh.prev_halfedge(h)), h);
        assert_eq!(mesh.from_vertex(mesh.next_halfedge(h)), mesh.to_vertex(h));
        assert_eq!(mesh.face(mesh.next_halfedge(h)), mesh.face(h));
    }

    for v in mesh.vertices() {
        assert!(mesh.is_manifold(v), "{:?} is not manifold", v);
        assert!(!mesh.is_isolated(v), "{:?} is isolated", v);
    }
}

/// Running the finishing passes again must not change anything.
fn check_idempotent(mesh: &mut SurfaceMesh) {
    let num_vertices = mesh.num_vertices();
    assert_eq!(split_non_manifold_vertices(mesh), SplitOutcome::default());
    assert_eq!(remove_isolated_vertices(mesh), 0);
    assert_eq!(mesh.num_vertices(), num_vertices);
}


// ===============================================================================================
// ===== Tests
// ===============================================================================================

#[test]
fn two_triangles() {
    //
    //    (2) ----- (3)
    //     | \       |
    //     |   \     |
    //     |     \   |
    //    (0) ----- (1)
    //
    let (mut mesh, report) = build(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
        &[&[0, 1, 2], &[1, 3, 2]],
    );

    assert_eq!(mesh.num_vertices(), 4);
    assert_eq!(mesh.num_faces(), 2);
    assert_eq!(mesh.num_edges(), 5);
    assert_eq!(report.copy_occurrences, 0);
    assert_eq!(report.non_manifold_vertices, 0);
    assert!(!report.has_issues());
    check_invariants(&mesh);
    check_idempotent(&mut mesh);
}

#[test]
fn bowtie() {
    //
    //              (6) --- (5)
    //               |    /  |
    //               |  /    |
    //    (3) ----- (2) --- (4)
    //     |      /  |
    //     |    /    |
    //    (0) ----- (1)
    //
    let (mut mesh, report) = build(
        &[
            [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0],
            [2.0, 1.0, 0.0], [2.0, 2.0, 0.0], [1.0, 2.0, 0.0],
        ],
        &[&[0, 1, 2], &[0, 2, 3], &[2, 4, 5], &[2, 5, 6]],
    );

    assert_eq!(report.non_manifold_vertices, 1);
    assert_eq!(report.copy_occurrences, 1);
    assert_eq!(report.skipped_faces(), 0);
    assert_eq!(report.isolated_vertices, 0);
    assert!(report.has_issues());
    assert!(report.to_string().contains("1 non-manifold vertices (fixed)"));

    assert_eq!(mesh.num_vertices(), 8);
    assert_eq!(mesh.num_faces(), 4);
    assert_eq!(mesh.num_edges(), 10);

    // The two halves are only connected through the shared position.
    let copy = v(7);
    assert_eq!(mesh.position(copy), mesh.position(v(2)));
    assert_eq!(mesh.valence(v(2)) + mesh.valence(copy), 6);
    assert!(mesh.is_boundary_vertex(v(2)));
    assert!(mesh.is_boundary_vertex(copy));

    check_invariants(&mesh);
    check_idempotent(&mut mesh);
}

#[test]
fn duplicated_face() {
    let (mut mesh, report) = build(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[&[0, 1, 2], &[0, 1, 2]],
    );

    assert_eq!(mesh.num_faces(), 2);
    assert!(mesh.num_vertices() > 3);
    assert!(report.copy_occurrences >= 1);
    assert_eq!(report.non_manifold_edges, 3);
    assert_eq!(report.skipped_faces(), 0);

    // The faces don't share any half edge.
    let mut faces = mesh.faces();
    let (f0, f1) = (faces.next().unwrap(), faces.next().unwrap());
    for h in mesh.halfedges_around_face(f0) {
        assert!(mesh.halfedges_around_face(f1).all(|h1| h1 != h));
        assert_eq!(mesh.face(mesh.opposite_halfedge(h)), None);
    }

    check_invariants(&mesh);
    check_idempotent(&mut mesh);
}

#[test]
fn degenerate_face() {
    let (mesh, report) = build(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[&[0, 0, 1], &[0, 1, 2]],
    );

    assert_eq!(report.faces_duplicated_vertices, 1);
    assert_eq!(report.skipped_faces(), 1);
    assert_eq!(mesh.num_faces(), 1);
    assert_eq!(mesh.num_vertices(), 3);
    check_invariants(&mesh);
}

#[test]
fn out_of_range_vertex() {
    let (mesh, report) = build(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[&[0, 1, 3], &[0, 1, 2]],
    );

    assert_eq!(report.faces_out_of_range_vertices, 1);
    assert_eq!(report.skipped_faces(), 1);
    assert_eq!(mesh.num_faces(), 1);
    assert_eq!(mesh.num_vertices(), 3);
    check_invariants(&mesh);
}

#[test]
fn only_invalid_faces() {
    let (mesh, report) = build(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        &[&[0, 1], &[0, 1, 0], &[]],
    );

    assert_eq!(report.faces_too_few_vertices, 2);
    assert_eq!(report.faces_duplicated_vertices, 1);
    assert_eq!(report.isolated_vertices, 2);
    assert_eq!(mesh.num_vertices(), 0);
    assert_eq!(mesh.num_faces(), 0);
}

#[test]
fn closed_cube() {
    let (mut mesh, report) = build(
        &[
            [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0],
        ],
        &[
            &[0, 3, 2, 1],
            &[4, 5, 6, 7],
            &[0, 1, 5, 4],
            &[2, 3, 7, 6],
            &[0, 4, 7, 3],
            &[1, 2, 6, 5],
        ],
    );

    assert!(!report.has_issues());
    assert_eq!(mesh.num_vertices(), 8);
    assert_eq!(mesh.num_faces(), 6);
    assert_eq!(mesh.num_edges(), 12);
    assert!(mesh.halfedges().all(|h| !mesh.is_boundary(h)));
    assert!(mesh.vertices().all(|v| mesh.valence(v) == 3));
    check_invariants(&mesh);
    check_idempotent(&mut mesh);
}

#[test]
fn messy_soup() {
    // A triangulated 4x4 grid of quads, with every face added twice (once
    // flipped), plus a fan of three extra triangles at the center vertex.
    let n = 5;
    let mut positions = Vec::new();
    for y in 0..n {
        for x in 0..n {
            positions.push([x as f32, y as f32, 0.0]);
        }
    }
    let top = positions.len();
    positions.push([2.0, 2.0, 1.0]);
    positions.push([3.0, 2.0, 1.0]);
    positions.push([2.0, 3.0, 1.0]);

    let idx = |x: usize, y: usize| y * n + x;
    let mut faces: Vec<Vec<usize>> = Vec::new();
    for y in 0..n - 1 {
        for x in 0..n - 1 {
            let (a, b, c, d) = (idx(x, y), idx(x + 1, y), idx(x + 1, y + 1), idx(x, y + 1));
            faces.push(vec![a, b, c]);
            faces.push(vec![a, c, d]);
        }
    }
    let flipped: Vec<_> = faces.iter().map(|f| vec![f[0], f[2], f[1]]).collect();
    faces.extend(flipped);

    let center = idx(2, 2);
    faces.push(vec![center, top, top + 1]);
    faces.push(vec![center, top + 1, top + 2]);
    faces.push(vec![center, top + 2, top]);

    let face_refs: Vec<&[usize]> = faces.iter().map(|f| f.as_slice()).collect();
    let (mut mesh, report) = build(&positions, &face_refs);

    assert_eq!(report.skipped_faces() + report.num_faces, faces.len());
    assert_eq!(report.num_vertices, mesh.num_vertices());
    assert!(report.non_manifold_vertices > 0);
    assert_eq!(report.unresolved_vertices, 0);
    assert_eq!(report.integrity_error, None);
    check_invariants(&mesh);
    check_idempotent(&mut mesh);
}

#[test]
fn properties_are_copied() {
    init_logger();

    let mut mesh = SurfaceMesh::with_name("colored");
    let color = mesh.add_vertex_property("v:color", [0u8; 3]).unwrap();
    for i in 0..5 {
        let v = mesh.add_vertex(Point3::new(i as f32, 0.0, 0.0));
        mesh.vertex_prop_mut(color)[v] = [10 + i as u8, 0, 0];
    }

    let mut builder = ManifoldBuilder::new(&mut mesh);
    builder.begin();
    builder.add_triangle(v(0), v(1), v(2));
    builder.add_triangle(v(0), v(3), v(4));
    let report = builder.end();
    drop(builder);

    assert_eq!(report.copy_occurrences, 1);
    assert_eq!(mesh.num_vertices(), 6);
    assert_eq!(mesh.vertex_prop(color)[v(5)], [10, 0, 0]);
    assert_eq!(mesh.position(v(5)), mesh.position(v(0)));
    assert_eq!(mesh.vertex_prop(color)[v(4)], [14, 0, 0]);
    check_invariants(&mesh);
}
