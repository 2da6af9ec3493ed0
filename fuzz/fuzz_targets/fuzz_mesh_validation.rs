#![no_main]

use libfuzzer_sys::arbitrary::{Arbitrary, Result, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct FuzzMesh {
    vertices: Vec<(f64, f64, f64)>,
    triangles: Vec<(usize, usize, usize)>,
}

impl<'a> Arbitrary<'a> for FuzzMesh {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let vertex_count = u.int_in_range(0..=100)?;
        let mut vertices = Vec::new();
        for _ in 0..vertex_count {
            vertices.push((u.arbitrary()?, u.arbitrary()?, u.arbitrary()?));
        }

        // Indices stay inside the vertex range
        let triangle_count = u.int_in_range(0..=50)?;
        let mut triangles = Vec::new();
        if vertex_count > 0 {
            for _ in 0..triangle_count {
                let v1 = u.int_in_range(0..=(vertex_count - 1))?;
                let v2 = u.int_in_range(0..=(vertex_count - 1))?;
                let v3 = u.int_in_range(0..=(vertex_count - 1))?;
                triangles.push((v1, v2, v3));
            }
        }

        Ok(FuzzMesh { vertices, triangles })
    }
}

fuzz_target!(|mesh_data: FuzzMesh| {
    let mut mesh = relief_mesh::Mesh::new();
    for &(x, y, z) in &mesh_data.vertices {
        mesh.add_vertex(relief_mesh::Vertex::new(x, y, z));
    }
    for &(v1, v2, v3) in &mesh_data.triangles {
        mesh.add_triangle(v1, v2, v3);
    }

    let invalid = mesh.invalid_edges();
    assert_eq!(invalid.is_empty(), mesh.is_manifold());
    assert!(invalid.iter().all(|&(a, b)| a <= b));

    let _ = mesh.signed_volume();
    let _ = relief_mesh::mesh_ops::calculate_vertex_normals(&mesh);
    let _ = relief_mesh::mesh_ops::surface_area(&mesh);
    let _ = relief_mesh::mesh_ops::compute_mesh_volume(&mesh);
    let _ = relief_mesh::mesh_ops::compute_mesh_aabb(&mesh);
});
