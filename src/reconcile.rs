//! Vertex reconciliation between shapes
//!
//! Side walls are only generated where two surfaces share an edge at exactly
//! the same 2D locations. This module makes that true:
//!
//! - [`snap_vertices`] pulls near-coincident vertices of different shapes
//!   onto their common mean. It runs on paint items, before the booleans, so
//!   the booleans see the snapped edges as coincident.
//! - [`truncate_shapes`] rounds coordinates so equal points are bit-equal.
//! - [`insert_edge_vertices`] splits every edge that has a vertex of another
//!   shape lying on it, repeating until nothing changes. It runs on the
//!   boolean output.

use crate::geometry::{BoundingBox, Point2, Ring, RingError, Shape, relative_position_on_edge};
use crate::spatial_index::SpatialIndex;
use std::collections::HashSet;

/// Upper bound on edge-insertion passes
pub const MAX_INSERTION_PASSES: usize = 16;

/// A ring that collapsed during reconciliation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("shape {shape}: {source}")]
pub struct ReconcileError {
    /// Index of the shape whose ring collapsed
    pub shape: usize,
    /// What happened to the ring
    #[source]
    pub source: RingError,
}

#[derive(Debug, Clone, Copy)]
struct VertexRef {
    shape: usize,
    ring: usize,
    point: Point2,
}

fn collect_vertices(shapes: &[Shape]) -> Vec<VertexRef> {
    let mut out = Vec::new();
    for (s, shape) in shapes.iter().enumerate() {
        for (r, ring) in shape.rings().enumerate() {
            for p in ring.points() {
                out.push(VertexRef {
                    shape: s,
                    ring: r,
                    point: *p,
                });
            }
        }
    }
    out
}

fn vertex_index(vertices: &[VertexRef]) -> SpatialIndex<usize> {
    let extent = BoundingBox::from_points(vertices.iter().map(|v| &v.point));
    let mut index = SpatialIndex::for_extent(&extent, vertices.len());
    for (i, v) in vertices.iter().enumerate() {
        index.insert_point(v.point, i);
    }
    index
}

fn rebuild_shapes(
    shapes: &[Shape],
    mut point_at: impl FnMut(usize, usize, usize, Point2) -> Point2,
) -> Result<Vec<Shape>, ReconcileError> {
    shapes
        .iter()
        .enumerate()
        .map(|(s, shape)| {
            let mut r = 0;
            shape
                .map_rings(|ring| {
                    let ring_index = r;
                    r += 1;
                    let points = ring
                        .points()
                        .iter()
                        .enumerate()
                        .map(|(v, p)| point_at(s, ring_index, v, *p))
                        .collect();
                    Ring::new(points)
                })
                .map_err(|source| ReconcileError { shape: s, source })
        })
        .collect()
}

/// Merge vertices of different shapes that lie within `merge_distance`
///
/// Vertices are visited in order. Each unvisited vertex gathers, from every
/// ring of a *later* shape, the nearest unvisited vertex closer than
/// `merge_distance`; the cluster then moves to its mean. A distance of zero
/// disables snapping.
pub fn snap_vertices(shapes: &[Shape], merge_distance: f64) -> Result<Vec<Shape>, ReconcileError> {
    if merge_distance <= 0.0 || shapes.len() < 2 {
        return Ok(shapes.to_vec());
    }

    let vertices = collect_vertices(shapes);
    let index = vertex_index(&vertices);
    let limit = merge_distance * merge_distance;
    let mut seen = vec![false; vertices.len()];
    let mut moved: Vec<Option<Point2>> = vec![None; vertices.len()];
    let mut clusters = 0usize;

    for i in 0..vertices.len() {
        if seen[i] {
            continue;
        }
        seen[i] = true;
        let origin = vertices[i];

        // Nearest candidate per (shape, ring); first found wins ties
        let mut best: Vec<((usize, usize), usize, f64)> = Vec::new();
        let query = BoundingBox::from_points([&origin.point]).expanded(merge_distance);
        for entry in index.query(&query) {
            let Some(&j) = index.get(entry) else { continue };
            let v = vertices[j];
            if seen[j] || v.shape <= origin.shape {
                continue;
            }
            let d = origin.point.distance_squared(&v.point);
            if d >= limit {
                continue;
            }
            let key = (v.shape, v.ring);
            match best.iter_mut().find(|(k, _, _)| *k == key) {
                Some(slot) if d < slot.2 || (d == slot.2 && j < slot.1) => *slot = (key, j, d),
                Some(_) => {}
                None => best.push((key, j, d)),
            }
        }
        if best.is_empty() {
            continue;
        }

        let mut members = vec![i];
        members.extend(best.iter().map(|(_, j, _)| *j));
        let n = members.len() as f64;
        let (sx, sy) = members.iter().fold((0.0, 0.0), |(sx, sy), &m| {
            (sx + vertices[m].point.x, sy + vertices[m].point.y)
        });
        let mean = Point2::new(sx / n, sy / n);
        for &m in &members {
            seen[m] = true;
            moved[m] = Some(mean);
        }
        clusters += 1;
    }

    if clusters == 0 {
        return Ok(shapes.to_vec());
    }
    log::debug!("Snapped {} vertex clusters", clusters);

    // Map (shape, ring, vertex) back to the flat vertex list
    let mut offsets = Vec::with_capacity(shapes.len());
    let mut flat = 0usize;
    for shape in shapes {
        let mut ring_offsets = Vec::new();
        for ring in shape.rings() {
            ring_offsets.push(flat);
            flat += ring.len();
        }
        offsets.push(ring_offsets);
    }

    rebuild_shapes(shapes, |s, r, v, p| moved[offsets[s][r] + v].unwrap_or(p))
}

/// Insert vertices of other shapes that lie on this shape's edges
///
/// A vertex is inserted into an edge when it belongs to a different shape,
/// lies within squared distance `epsilon` of the edge, and is not within
/// `epsilon` of either endpoint. Inserted vertices keep their order along the
/// edge. Passes repeat until no insertion happens or
/// [`MAX_INSERTION_PASSES`] is reached. Returns the new shapes and the number
/// of vertices inserted.
pub fn insert_edge_vertices(
    shapes: &[Shape],
    epsilon: f64,
) -> Result<(Vec<Shape>, usize), ReconcileError> {
    let mut current = shapes.to_vec();
    let mut total = 0usize;

    for pass in 0..MAX_INSERTION_PASSES {
        let vertices = collect_vertices(&current);
        let index = vertex_index(&vertices);
        let margin = epsilon.sqrt();
        let mut inserted = 0usize;

        let mut next = Vec::with_capacity(current.len());
        for (s, shape) in current.iter().enumerate() {
            let rebuilt = shape
                .map_rings(|ring| {
                    let mut points = Vec::with_capacity(ring.len());
                    for (a, b) in ring.edges() {
                        points.push(a);
                        let query = BoundingBox::from_points([&a, &b]).expanded(margin);
                        let mut on_edge: Vec<(f64, Point2)> = Vec::new();
                        let mut keys = HashSet::new();
                        for entry in index.query(&query) {
                            let Some(&j) = index.get(entry) else { continue };
                            let v = vertices[j];
                            if v.shape == s || !keys.insert(v.point.location_key()) {
                                continue;
                            }
                            if let Some(r) = relative_position_on_edge(&v.point, &a, &b, epsilon) {
                                on_edge.push((r, v.point));
                            }
                        }
                        on_edge.sort_by(|x, y| x.0.total_cmp(&y.0));
                        inserted += on_edge.len();
                        points.extend(on_edge.into_iter().map(|(_, p)| p));
                    }
                    Ring::new(points)
                })
                .map_err(|source| ReconcileError { shape: s, source })?;
            next.push(rebuilt);
        }

        current = next;
        total += inserted;
        if inserted == 0 {
            return Ok((current, total));
        }
        log::debug!("Edge insertion pass {}: {} vertices", pass + 1, inserted);
    }

    log::warn!(
        "Edge insertion did not settle after {} passes",
        MAX_INSERTION_PASSES
    );
    Ok((current, total))
}

/// Round every coordinate to `precision` decimals
pub fn truncate_shapes(shapes: &[Shape], precision: u32) -> Result<Vec<Shape>, ReconcileError> {
    rebuild_shapes(shapes, |_, _, _, p| p.truncated(precision))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Shape {
        Shape::rectangle(min_x, min_y, max_x, max_y).expect("Failed to build rectangle")
    }

    fn has_point(shape: &Shape, p: Point2) -> bool {
        shape.contour().points().contains(&p)
    }

    #[test]
    fn test_snap_disabled_at_zero() {
        let shapes = vec![rect(0.0, 0.0, 1.0, 1.0), rect(1.05, 0.0, 2.0, 1.0)];
        assert_eq!(snap_vertices(&shapes, 0.0).expect("Failed to snap"), shapes);
    }

    #[test]
    fn test_snap_moves_cluster_to_mean() {
        let shapes = vec![rect(0.0, 0.0, 1.0, 1.0), rect(1.25, 0.0, 2.0, 1.0)];
        let snapped = snap_vertices(&shapes, 0.3).expect("Failed to snap");
        let mid = Point2::new(1.125, 0.0);
        assert!(has_point(&snapped[0], mid), "{:?}", snapped[0]);
        assert!(has_point(&snapped[1], mid), "{:?}", snapped[1]);
        // Far corners stay put
        assert!(has_point(&snapped[0], Point2::new(0.0, 0.0)));
        assert!(has_point(&snapped[1], Point2::new(2.0, 1.0)));
    }

    #[test]
    fn test_snap_ignores_same_shape() {
        let tiny = Shape::new(
            Ring::new(vec![
                Point2::new(0.0, 0.0),
                Point2::new(0.05, 0.0),
                Point2::new(0.05, 5.0),
            ])
            .expect("Failed to build ring"),
            Vec::new(),
        );
        let snapped = snap_vertices(&[tiny.clone(), rect(10.0, 10.0, 11.0, 11.0)], 0.2)
            .expect("Failed to snap");
        assert_eq!(snapped[0], tiny);
    }

    #[test]
    fn test_snap_collapse_is_an_error() {
        let sliver = Shape::new(
            Ring::new(vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.5, 0.1),
            ])
            .expect("Failed to build ring"),
            Vec::new(),
        );
        let below = Shape::new(
            Ring::new(vec![
                Point2::new(0.0, -5.0),
                Point2::new(1.0, -5.0),
                Point2::new(0.5, -0.1),
            ])
            .expect("Failed to build ring"),
            Vec::new(),
        );
        // The apex meets (0.5, -0.1) at (0.5, 0.0), flattening the sliver
        let err = snap_vertices(&[sliver, below], 0.5).expect_err("Sliver should collapse");
        assert_eq!(err.shape, 0);
        assert_eq!(err.source, RingError::ZeroArea);
    }

    #[test]
    fn test_insert_shared_edge_vertices() {
        // Tall rectangle beside two short ones: its right edge needs (10, 5)
        let shapes = vec![
            rect(0.0, 0.0, 10.0, 10.0),
            rect(10.0, 0.0, 20.0, 5.0),
            rect(10.0, 5.0, 20.0, 10.0),
        ];
        let (out, inserted) = insert_edge_vertices(&shapes, 1e-6).expect("Failed to insert");
        assert_eq!(inserted, 1);
        assert_eq!(out[0].contour().len(), 5);
        let pts = out[0].contour().points();
        let pos = pts
            .iter()
            .position(|p| *p == Point2::new(10.0, 5.0))
            .expect("Missing inserted vertex");
        assert_eq!(pts[pos - 1], Point2::new(10.0, 0.0));
        assert_eq!(pts[pos + 1], Point2::new(10.0, 10.0));
        assert_eq!(out[1], shapes[1]);
    }

    #[test]
    fn test_inserted_vertices_ordered_along_edge() {
        let shapes = vec![
            rect(0.0, 0.0, 10.0, 10.0),
            rect(2.0, -3.0, 4.0, 0.0),
            rect(6.0, -3.0, 8.0, 0.0),
        ];
        let (out, inserted) = insert_edge_vertices(&shapes, 1e-6).expect("Failed to insert");
        assert_eq!(inserted, 4);
        let xs: Vec<f64> = out[0].contour().points()[..6].iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_insertion_reaches_fixed_point() {
        let shapes = vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 2.0, 12.0, 4.0)];
        let (once, _) = insert_edge_vertices(&shapes, 1e-6).expect("Failed to insert");
        let (twice, again) = insert_edge_vertices(&once, 1e-6).expect("Failed to insert");
        assert_eq!(again, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_truncate_shapes() {
        let shapes = vec![rect(0.001, 0.0, 10.0049, 10.0)];
        let out = truncate_shapes(&shapes, 2).expect("Failed to truncate");
        assert!(has_point(&out[0], Point2::new(0.0, 0.0)));
        assert!(has_point(&out[0], Point2::new(10.0, 10.0)));
        assert_eq!(truncate_shapes(&out, 2).expect("Failed to truncate"), out);
    }
}
