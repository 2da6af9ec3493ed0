//! Triangle mesh metrics
//!
//! This module provides measurements over the extruded mesh:
//! - Unsigned volume and bounding box through parry3d (feature `mesh-ops`)
//! - Face and vertex normals, used by the STL writers
//! - Surface area
//!
//! The signed volume lives on [`Mesh::signed_volume`]; a negative value there
//! means the mesh is inside out.

use crate::mesh::{Mesh, Vertex};
use nalgebra::Vector3;
#[cfg(feature = "mesh-ops")]
use parry3d::math::Vector as ParryVector;
#[cfg(feature = "mesh-ops")]
use parry3d::shape::{Shape as _, TriMesh as ParryTriMesh};

/// Axis-aligned bounding box of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner
    pub min: Vertex,
    /// Maximum corner
    pub max: Vertex,
}

impl Aabb3 {
    /// Extent along each axis
    pub fn size(&self) -> Vector3<f64> {
        Vector3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }
}

#[cfg(feature = "mesh-ops")]
fn to_parry(mesh: &Mesh) -> ParryTriMesh {
    let vertices: Vec<ParryVector> = mesh
        .vertices
        .iter()
        .map(|v| ParryVector::new(v.x as f32, v.y as f32, v.z as f32))
        .collect();

    let indices: Vec<[u32; 3]> = mesh
        .triangles
        .iter()
        .map(|t| [t.v1 as u32, t.v2 as u32, t.v3 as u32])
        .collect();

    // Callers reject meshes without triangles, the only failure case without flags
    ParryTriMesh::new(vertices, indices).expect("non-empty index buffer")
}

/// Compute the unsigned volume of a mesh using parry3d
///
/// Returns 0 for a mesh without triangles.
#[cfg(feature = "mesh-ops")]
pub fn compute_mesh_volume(mesh: &Mesh) -> f64 {
    if mesh.vertices.is_empty() || mesh.triangles.is_empty() {
        return 0.0;
    }

    // Volume is the mass when density is 1.0
    let mass_props = to_parry(mesh).mass_properties(1.0);
    mass_props.mass() as f64
}

/// Compute the axis-aligned bounding box of a mesh using parry3d
///
/// Returns `None` for a mesh without triangles.
#[cfg(feature = "mesh-ops")]
pub fn compute_mesh_aabb(mesh: &Mesh) -> Option<Aabb3> {
    if mesh.vertices.is_empty() || mesh.triangles.is_empty() {
        return None;
    }

    let aabb = to_parry(mesh).local_aabb();
    Some(Aabb3 {
        min: Vertex::new(aabb.mins.x as f64, aabb.mins.y as f64, aabb.mins.z as f64),
        max: Vertex::new(aabb.maxs.x as f64, aabb.maxs.y as f64, aabb.maxs.z as f64),
    })
}

fn edge_cross(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Vector3<f64> {
    let edge1 = Vector3::new(v1.x - v0.x, v1.y - v0.y, v1.z - v0.z);
    let edge2 = Vector3::new(v2.x - v0.x, v2.y - v0.y, v2.z - v0.z);
    edge1.cross(&edge2)
}

/// Unit normal of a counter-clockwise triangle
///
/// Degenerate triangles yield the zero vector.
///
/// # Example
/// ```
/// use relief_mesh::mesh::Vertex;
/// use relief_mesh::mesh_ops::calculate_face_normal;
///
/// let v0 = Vertex::new(0.0, 0.0, 0.0);
/// let v1 = Vertex::new(1.0, 0.0, 0.0);
/// let v2 = Vertex::new(0.0, 1.0, 0.0);
///
/// let normal = calculate_face_normal(&v0, &v1, &v2);
/// assert_eq!(normal.z, 1.0);
/// ```
pub fn calculate_face_normal(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Vector3<f64> {
    edge_cross(v0, v1, v2)
        .try_normalize(0.0)
        .unwrap_or_else(Vector3::zeros)
}

/// Area-weighted vertex normals, one per vertex
///
/// Unused vertices get the zero vector.
pub fn calculate_vertex_normals(mesh: &Mesh) -> Vec<Vector3<f64>> {
    let mut normals = vec![Vector3::zeros(); mesh.vertices.len()];

    for triangle in &mesh.triangles {
        // Magnitude is twice the triangle area
        let weighted = edge_cross(
            &mesh.vertices[triangle.v1],
            &mesh.vertices[triangle.v2],
            &mesh.vertices[triangle.v3],
        );
        for i in triangle.indices() {
            normals[i] += weighted;
        }
    }

    normals
        .into_iter()
        .map(|n| n.try_normalize(0.0).unwrap_or_else(Vector3::zeros))
        .collect()
}

/// Summed triangle area
pub fn surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|t| {
            edge_cross(
                &mesh.vertices[t.v1],
                &mesh.vertices[t.v2],
                &mesh.vertices[t.v3],
            )
            .norm()
                / 2.0
        })
        .sum()
}
