//! Extrusion into a closed solid
//!
//! Every layer's triangles are placed at the layer depth facing up, and the
//! silhouette's triangles at the floor facing down. What is left open is the
//! set of boundary half-edges; walls close it. Boundary edges are grouped by
//! the pair of 2D locations they join, and for each group a strip of
//! triangles is fanned between the vertical chains of vertices stacked at the
//! two locations, from the floor up to the highest surface meeting there.

use crate::mesh::{Mesh, Triangle, Vertex};
use crate::polygon_triangulation::Triangulation;
use nalgebra::{Matrix4, Vector3};
use std::collections::{HashMap, HashSet};

type LocationKey = (u64, u64);

fn location_key(v: &Vertex) -> LocationKey {
    crate::geometry::Point2::new(v.x, v.y).location_key()
}

/// Triangulated surfaces at one depth
#[derive(Debug, Clone)]
pub struct Surface {
    /// Height of the surface
    pub depth: f64,
    /// Triangulated shapes
    pub triangulations: Vec<Triangulation>,
}

/// What wall construction did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallReport {
    /// Location pairs that received a wall
    pub walls: usize,
    /// Location pairs whose chains were too short to build a wall
    pub unmatched: usize,
}

fn add_surface(mesh: &mut Mesh, triangulation: &Triangulation, z: f64, facing_down: bool) {
    let base = mesh.vertices.len();
    for p in &triangulation.points {
        mesh.add_vertex(Vertex::new(p.x, p.y, z));
    }
    for t in &triangulation.triangles {
        if facing_down {
            mesh.add_triangle(base + t[0], base + t[2], base + t[1]);
        } else {
            mesh.add_triangle(base + t[0], base + t[1], base + t[2]);
        }
    }
}

/// Half-edges with no opposite partner, in order of first appearance
pub fn boundary_edges(mesh: &Mesh) -> Vec<(usize, usize)> {
    let mut open: HashMap<(usize, usize), usize> = HashMap::new();
    let mut order: Vec<(usize, usize)> = Vec::new();

    for triangle in &mesh.triangles {
        for (a, b) in triangle.edges() {
            match open.get_mut(&(b, a)) {
                Some(count) if *count > 0 => *count -= 1,
                _ => {
                    let count = open.entry((a, b)).or_insert(0);
                    if *count == 0 {
                        order.push((a, b));
                    }
                    *count += 1;
                }
            }
        }
    }

    let mut edges = Vec::new();
    for edge in order {
        if let Some(count) = open.get_mut(&edge) {
            for _ in 0..*count {
                edges.push(edge);
            }
            *count = 0;
        }
    }
    edges
}

/// Vertices at one location, bottom-up, trimmed so both ends belong to `keep`
fn chain(
    at_location: &[usize],
    vertices: &[Vertex],
    keep: &HashSet<usize>,
) -> Vec<usize> {
    let mut chain = at_location.to_vec();
    chain.sort_by(|&a, &b| vertices[a].z.total_cmp(&vertices[b].z).then(a.cmp(&b)));
    let start = chain.iter().position(|v| keep.contains(v));
    let end = chain.iter().rposition(|v| keep.contains(v));
    match (start, end) {
        (Some(s), Some(e)) => chain[s..=e].to_vec(),
        _ => Vec::new(),
    }
}

/// Build side-wall triangles for every open boundary of `mesh`
pub fn build_side_walls(mesh: &Mesh) -> (Vec<Triangle>, WallReport) {
    let mut by_location: HashMap<LocationKey, Vec<usize>> = HashMap::new();
    for (i, v) in mesh.vertices.iter().enumerate() {
        by_location.entry(location_key(v)).or_default().push(i);
    }

    let mut groups: HashMap<(LocationKey, LocationKey), Vec<(usize, usize)>> = HashMap::new();
    let mut group_order: Vec<(LocationKey, LocationKey)> = Vec::new();
    for (a, b) in boundary_edges(mesh) {
        let (ka, kb) = (
            location_key(&mesh.vertices[a]),
            location_key(&mesh.vertices[b]),
        );
        if ka == kb {
            continue;
        }
        let key = (ka.min(kb), ka.max(kb));
        let group = groups.entry(key).or_default();
        if group.is_empty() {
            group_order.push(key);
        }
        group.push((a, b));
    }

    let mut walls = Vec::new();
    let mut report = WallReport::default();
    for key in group_order {
        let Some(edges) = groups.get(&key) else {
            continue;
        };
        let Some(&(a, b)) = edges
            .iter()
            .reduce(|best, e| if mesh.vertices[e.0].z > mesh.vertices[best.0].z { e } else { best })
        else {
            continue;
        };
        let keep: HashSet<usize> = edges.iter().flat_map(|&(x, y)| [x, y]).collect();
        let empty = Vec::new();
        let s0 = chain(
            by_location.get(&location_key(&mesh.vertices[a])).unwrap_or(&empty),
            &mesh.vertices,
            &keep,
        );
        let s1 = chain(
            by_location.get(&location_key(&mesh.vertices[b])).unwrap_or(&empty),
            &mesh.vertices,
            &keep,
        );

        if s0.is_empty() || s1.is_empty() || (s0.len() < 2 && s1.len() < 2) {
            let p = &mesh.vertices[a];
            let q = &mesh.vertices[b];
            log::warn!(
                "No wall for boundary edge ({}, {})-({}, {}): empty side",
                p.x,
                p.y,
                q.x,
                q.y
            );
            report.unmatched += 1;
            continue;
        }

        let top0 = s0[s0.len() - 1];
        for i in 1..s0.len() {
            walls.push(Triangle::new(s0[i], s0[i - 1], s1[0]));
        }
        for i in 1..s1.len() {
            walls.push(Triangle::new(s1[i], top0, s1[i - 1]));
        }
        report.walls += 1;
    }

    (walls, report)
}

/// Place surfaces and the floor, then close the solid with walls
///
/// `layers` face up at their depth; `silhouette` faces down at `floor`.
pub fn extrude(layers: &[Surface], silhouette: &[Triangulation], floor: f64) -> (Mesh, WallReport) {
    let vertex_count: usize = layers
        .iter()
        .flat_map(|l| l.triangulations.iter())
        .chain(silhouette.iter())
        .map(|t| t.points.len())
        .sum();
    let mut mesh = Mesh::with_capacity(vertex_count, vertex_count * 3);

    for layer in layers {
        for t in &layer.triangulations {
            add_surface(&mut mesh, t, layer.depth, false);
        }
    }
    for t in silhouette {
        add_surface(&mut mesh, t, floor, true);
    }

    let (walls, report) = build_side_walls(&mesh);
    mesh.triangles.extend(walls);
    (mesh, report)
}

/// Transform applied before export
///
/// A half turn about z, preceded by a mirror in x unless `inverted` is set.
pub fn orientation_matrix(inverted: bool) -> Matrix4<f64> {
    let half_turn = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, -1.0, 1.0));
    if inverted {
        half_turn
    } else {
        half_turn * Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::polygon_triangulation::triangulate_shape;

    fn tri_rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Triangulation {
        let shape = Shape::rectangle(min_x, min_y, max_x, max_y).expect("Failed to build shape");
        triangulate_shape(&shape, 1e-6).expect("Failed to triangulate")
    }

    #[test]
    fn test_single_square_block() {
        let layers = vec![Surface {
            depth: 2.0,
            triangulations: vec![tri_rect(0.0, 0.0, 10.0, 10.0)],
        }];
        let (mesh, report) = extrude(&layers, &[tri_rect(0.0, 0.0, 10.0, 10.0)], 1.0);

        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangles.len(), 12);
        assert_eq!(report, WallReport { walls: 4, unmatched: 0 });
        assert!(mesh.is_manifold(), "Invalid edges: {:?}", mesh.invalid_edges());
        assert!((mesh.signed_volume() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_stepped_blocks_share_a_wall() {
        let layers = vec![
            Surface {
                depth: 2.0,
                triangulations: vec![tri_rect(0.0, 0.0, 10.0, 10.0)],
            },
            Surface {
                depth: 1.0,
                triangulations: vec![tri_rect(10.0, 0.0, 20.0, 10.0)],
            },
        ];
        // Silhouette carries the shared corners on its long edges
        let silhouette = Shape::new(
            crate::geometry::Ring::new(vec![
                crate::geometry::Point2::new(0.0, 0.0),
                crate::geometry::Point2::new(10.0, 0.0),
                crate::geometry::Point2::new(20.0, 0.0),
                crate::geometry::Point2::new(20.0, 10.0),
                crate::geometry::Point2::new(10.0, 10.0),
                crate::geometry::Point2::new(0.0, 10.0),
            ])
            .expect("Failed to build ring"),
            Vec::new(),
        );
        let silhouette = triangulate_shape(&silhouette, 1e-6).expect("Failed to triangulate");
        let (mesh, _) = extrude(&layers, &[silhouette], 0.0);

        assert!(mesh.is_manifold(), "Invalid edges: {:?}", mesh.invalid_edges());
        assert!((mesh.signed_volume() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_edges_cancel_pairs() {
        let mut mesh = Mesh::new();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            mesh.add_vertex(Vertex::new(x, y, 0.0));
        }
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        assert_eq!(boundary_edges(&mesh), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
    }

    #[test]
    fn test_orientation_matrix() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::new(1.0, 2.0, 3.0));
        let mut mirrored = mesh.clone();
        mirrored.transform(&orientation_matrix(false));
        assert_eq!(mirrored.vertices[0], Vertex::new(1.0, -2.0, 3.0));

        mesh.transform(&orientation_matrix(true));
        assert_eq!(mesh.vertices[0], Vertex::new(-1.0, -2.0, 3.0));
    }
}
