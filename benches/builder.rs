use cgmath::Point3;
use criterion::{
    criterion_group, criterion_main, black_box, Criterion,
};

use manifold_builder::{ManifoldBuilder, SurfaceMesh};



// ===============================================================================================
// ===== Input data
// ===============================================================================================

/// A triangulated `n x n` grid of quads.
struct Soup {
    positions: Vec<Point3<f32>>,
    faces: Vec<[usize; 3]>,
}

fn grid(n: usize) -> Soup {
    let positions = (0..=n)
        .flat_map(|y| (0..=n).map(move |x| Point3::new(x as f32, y as f32, 0.0)))
        .collect();

    let idx = |x: usize, y: usize| y * (n + 1) + x;
    let mut faces = Vec::with_capacity(2 * n * n);
    for y in 0..n {
        for x in 0..n {
            faces.push([idx(x, y), idx(x + 1, y), idx(x + 1, y + 1)]);
            faces.push([idx(x, y), idx(x + 1, y + 1), idx(x, y + 1)]);
        }
    }

    Soup { positions, faces }
}

/// The grid with every face added a second time, flipped.
fn messy_grid(n: usize) -> Soup {
    let mut soup = grid(n);
    let flipped: Vec<_> = soup.faces.iter().map(|&[a, b, c]| [a, c, b]).collect();
    soup.faces.extend(flipped);
    soup
}

fn build(soup: &Soup) -> SurfaceMesh {
    let mut mesh = SurfaceMesh::new();
    let mut builder = ManifoldBuilder::new(&mut mesh);

    builder.begin();
    let vertices: Vec<_> = soup.positions.iter().map(|&p| builder.add_vertex(p)).collect();
    for &[a, b, c] in &soup.faces {
        builder.add_triangle(vertices[a], vertices[b], vertices[c]);
    }
    black_box(builder.end());
    drop(builder);

    mesh
}


// ===============================================================================================
// ===== Benchmarks
// ===============================================================================================

fn build_clean_grid(c: &mut Criterion) {
    c.bench_function(
        "build_clean_grid",
        |b| {
            let soup = grid(128);
            b.iter(|| build(black_box(&soup)))
        },
    );
}

fn build_messy_grid(c: &mut Criterion) {
    c.bench_function(
        "build_messy_grid",
        |b| {
            let soup = messy_grid(64);
            b.iter(|| build(black_box(&soup)))
        },
    );
}

fn split_after_build(c: &mut Criterion) {
    c.bench_function(
        "split_after_build",
        |b| {
            let mesh = build(&messy_grid(64));
            b.iter(|| {
                let mut mesh = mesh.clone();
                black_box(manifold_builder::builder::split_non_manifold_vertices(&mut mesh))
            })
        },
    );
}


criterion_group!(benches,
    build_clean_grid,
    build_messy_grid,
    split_after_build,
);
criterion_main!(benches);
