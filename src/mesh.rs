//! Triangle mesh types
//!
//! The extruder fills a [`Mesh`]: a vertex list and index triangles. Triangles
//! are counter-clockwise seen from outside the solid.

use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A 3D vertex with x, y, z coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self { v1, v2, v3 }
    }

    /// Vertex indices as an array
    pub fn indices(&self) -> [usize; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// The directed edges `v1→v2`, `v2→v3`, `v3→v1`
    pub fn edges(&self) -> [(usize, usize); 3] {
        [(self.v1, self.v2), (self.v2, self.v3), (self.v3, self.v1)]
    }

    /// Same triangle with the opposite winding
    pub fn flipped(&self) -> Self {
        Self::new(self.v1, self.v3, self.v2)
    }

    /// Two or more corners share an index
    pub fn is_degenerate(&self) -> bool {
        self.v1 == self.v2 || self.v2 == self.v3 || self.v3 == self.v1
    }
}

/// A 3D mesh containing vertices and triangles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// List of vertices
    pub vertices: Vec<Vertex>,
    /// List of triangles
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mesh with pre-allocated capacity
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
        }
    }

    /// Append a vertex, returning its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    /// Append a triangle
    pub fn add_triangle(&mut self, v1: usize, v2: usize, v3: usize) {
        self.triangles.push(Triangle::new(v1, v2, v3));
    }

    /// Undirected edges not shared by exactly two triangles
    ///
    /// Edges are `(min, max)` index pairs, sorted. A triangle repeating a
    /// vertex index contributes its zero-length edge as well.
    pub fn invalid_edges(&self) -> Vec<(usize, usize)> {
        let mut edge_count: HashMap<(usize, usize), usize> =
            HashMap::with_capacity(self.triangles.len() * 2);
        for triangle in &self.triangles {
            for (a, b) in triangle.edges() {
                *edge_count.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }

        let mut invalid: Vec<(usize, usize)> = edge_count
            .into_iter()
            .filter(|&((a, b), count)| a == b || count != 2)
            .map(|(edge, _)| edge)
            .collect();
        invalid.sort_unstable();
        invalid
    }

    /// Every edge is shared by exactly two triangles
    pub fn is_manifold(&self) -> bool {
        self.invalid_edges().is_empty()
    }

    /// Apply a homogeneous transform to every vertex
    ///
    /// Triangle winding is reversed when the transform mirrors, so faces keep
    /// pointing outwards.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for v in &mut self.vertices {
            let p = matrix.transform_point(&Point3::new(v.x, v.y, v.z));
            *v = Vertex::new(p.x, p.y, p.z);
        }
        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            for t in &mut self.triangles {
                *t = t.flipped();
            }
        }
    }

    /// Signed volume enclosed by the mesh (divergence theorem)
    ///
    /// Positive for a closed mesh with outward-facing triangles.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let a = &self.vertices[t.v1];
                let b = &self.vertices[t.v2];
                let c = &self.vertices[t.v3];
                (a.x * (b.y * c.z - b.z * c.y) - a.y * (b.x * c.z - b.z * c.x)
                    + a.z * (b.x * c.y - b.y * c.x))
                    / 6.0
            })
            .sum()
    }
}
