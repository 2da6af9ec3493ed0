//! Shape triangulation and repair
//!
//! Shapes are triangulated with `earcutr`, a Rust port of MapBox's earcut.
//! Earcut is free to drop collinear vertices and to leave ring edges out of
//! the result, which would leave cracks once surfaces at different depths are
//! stitched together by side walls. Two repair passes run after it:
//!
//! 1. **Orphan vertices**: a ring vertex used by no triangle is spliced into
//!    the triangle spanning its nearest used ring neighbours.
//! 2. **Missing edges**: a ring edge absent from the triangulation is forced
//!    in by splitting the boundary edge it lies along.
//!
//! Failures of either pass are logged and counted in [`RepairReport`]; the
//! mesh-level manifold check reports whatever is left.

use crate::geometry::{Point2, Shape, cross, distance_squared_point_segment};
use std::collections::HashMap;
use std::ops::Range;

/// Error type for polygon triangulation operations
#[derive(Debug, thiserror::Error)]
pub enum TriangulationError {
    /// Polygon has too few vertices to triangulate
    #[error("Polygon has too few vertices: {0} (minimum 3 required)")]
    TooFewVertices(usize),

    /// Invalid hole specification
    #[error("Invalid hole: {0}")]
    InvalidHole(String),

    /// Triangulation failed
    #[error("Triangulation failed: {0}")]
    TriangulationFailed(String),
}

/// Triangulate a simple polygon without holes
///
/// Returns a flat list of indices into `polygon`, three per triangle.
///
/// # Example
///
/// ```
/// use relief_mesh::geometry::Point2;
/// use relief_mesh::polygon_triangulation::triangulate_simple;
///
/// let square = vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(10.0, 0.0),
///     Point2::new(10.0, 10.0),
///     Point2::new(0.0, 10.0),
/// ];
/// let indices = triangulate_simple(&square).expect("Failed to triangulate");
/// assert_eq!(indices.len(), 6);
/// ```
pub fn triangulate_simple(polygon: &[Point2]) -> Result<Vec<usize>, TriangulationError> {
    triangulate_with_holes::<&[Point2]>(polygon, &[])
}

/// Triangulate a polygon with holes
///
/// Indices refer to the concatenation of `outer` followed by every hole in
/// order.
///
/// # Errors
///
/// Returns an error if the outer ring or any hole has fewer than 3 vertices,
/// or if earcut fails or produces nothing.
pub fn triangulate_with_holes<H: AsRef<[Point2]>>(
    outer: &[Point2],
    holes: &[H],
) -> Result<Vec<usize>, TriangulationError> {
    if outer.len() < 3 {
        return Err(TriangulationError::TooFewVertices(outer.len()));
    }

    for (i, hole) in holes.iter().enumerate() {
        let len = hole.as_ref().len();
        if len < 3 {
            return Err(TriangulationError::InvalidHole(format!(
                "Hole {} has only {} vertices (minimum 3 required)",
                i, len
            )));
        }
    }

    // Format: [outer_x0, outer_y0, ..., hole1_x0, hole1_y0, ...]
    let total = outer.len() + holes.iter().map(|h| h.as_ref().len()).sum::<usize>();
    let mut coords = Vec::with_capacity(total * 2);
    for p in outer {
        coords.push(p.x);
        coords.push(p.y);
    }

    let mut hole_indices = Vec::with_capacity(holes.len());
    let mut current_index = outer.len();
    for hole in holes {
        hole_indices.push(current_index);
        for p in hole.as_ref() {
            coords.push(p.x);
            coords.push(p.y);
        }
        current_index += hole.as_ref().len();
    }

    let result = earcutr::earcut(&coords, &hole_indices, 2)
        .map_err(|e| TriangulationError::TriangulationFailed(format!("Earcut error: {}", e)))?;

    if result.is_empty() {
        return Err(TriangulationError::TriangulationFailed(
            "Earcut returned no triangles".to_string(),
        ));
    }

    Ok(result)
}

/// Counters of the repair passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Orphan vertices spliced back in
    pub orphans_fixed: usize,
    /// Orphan vertices left unused
    pub orphans_unresolved: usize,
    /// Missing ring edges forced in
    pub edges_fixed: usize,
    /// Ring edges still missing
    pub edges_unresolved: usize,
}

impl RepairReport {
    /// Add another report's counters to this one
    pub fn merge(&mut self, other: &RepairReport) {
        self.orphans_fixed += other.orphans_fixed;
        self.orphans_unresolved += other.orphans_unresolved;
        self.edges_fixed += other.edges_fixed;
        self.edges_unresolved += other.edges_unresolved;
    }

    /// No repair failed
    pub fn is_clean(&self) -> bool {
        self.orphans_unresolved == 0 && self.edges_unresolved == 0
    }
}

/// Triangulated shape
#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    /// Contour vertices followed by each hole's vertices
    pub points: Vec<Point2>,
    /// Index range of each ring in `points`, contour first
    pub rings: Vec<Range<usize>>,
    /// Counter-clockwise triangles
    pub triangles: Vec<[usize; 3]>,
    /// What the repair passes did
    pub report: RepairReport,
}

impl Triangulation {
    /// Ring edges as index pairs in ring order
    pub fn ring_edges(&self) -> Vec<(usize, usize)> {
        ring_edges(&self.rings)
    }

    /// Summed triangle area
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| cross(&self.points[t[0]], &self.points[t[1]], &self.points[t[2]]) / 2.0)
            .sum()
    }
}

fn ring_edges(rings: &[Range<usize>]) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for ring in rings {
        let n = ring.len();
        for j in 0..n {
            edges.push((ring.start + j, ring.start + (j + 1) % n));
        }
    }
    edges
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Undirected edge use counts of a triangle list
#[derive(Debug, Default)]
struct EdgeCounts {
    counts: HashMap<(usize, usize), usize>,
}

impl EdgeCounts {
    fn new(triangles: &[[usize; 3]]) -> Self {
        let mut counts = Self::default();
        for t in triangles {
            counts.add(t);
        }
        counts
    }

    fn add(&mut self, t: &[usize; 3]) {
        for k in 0..3 {
            *self.counts.entry(edge_key(t[k], t[(k + 1) % 3])).or_insert(0) += 1;
        }
    }

    fn remove(&mut self, t: &[usize; 3]) {
        for k in 0..3 {
            let key = edge_key(t[k], t[(k + 1) % 3]);
            if let Some(c) = self.counts.get_mut(&key) {
                *c -= 1;
                if *c == 0 {
                    self.counts.remove(&key);
                }
            }
        }
    }

    fn get(&self, a: usize, b: usize) -> usize {
        self.counts.get(&edge_key(a, b)).copied().unwrap_or(0)
    }
}

fn orient_ccw(points: &[Point2], mut t: [usize; 3]) -> [usize; 3] {
    if cross(&points[t[0]], &points[t[1]], &points[t[2]]) < 0.0 {
        t.swap(1, 2);
    }
    t
}

fn is_not_clockwise(points: &[Point2], t: &[usize; 3]) -> bool {
    cross(&points[t[0]], &points[t[1]], &points[t[2]]) >= 0.0
}

/// Nearest used ring neighbour of `ring.start + j`, walking `step` (+1 or -1)
fn used_neighbor(counts: &[usize], ring: &Range<usize>, j: usize, forward: bool) -> Option<usize> {
    let n = ring.len();
    (1..n)
        .map(|k| if forward { (j + k) % n } else { (j + n - k) % n })
        .map(|i| ring.start + i)
        .find(|&v| counts[v] > 0)
}

/// Splice ring vertices no triangle uses into the triangulation
///
/// Returns `(fixed, unresolved)`.
pub fn repair_orphan_vertices(
    triangles: &mut Vec<[usize; 3]>,
    points: &[Point2],
    rings: &[Range<usize>],
) -> (usize, usize) {
    let mut counts = vec![0usize; points.len()];
    for t in triangles.iter() {
        for &v in t {
            counts[v] += 1;
        }
    }

    let (mut fixed, mut unresolved) = (0, 0);
    for ring in rings {
        for j in 0..ring.len() {
            let v = ring.start + j;
            if counts[v] != 0 {
                continue;
            }
            let prev = used_neighbor(&counts, ring, j, false);
            let next = used_neighbor(&counts, ring, j, true);

            let split = match (prev, next) {
                (Some(a), Some(b)) if a != b => triangles.iter().enumerate().find_map(|(ti, t)| {
                    let pa = t.iter().position(|&x| x == a)?;
                    let pb = t.iter().position(|&x| x == b)?;
                    let mut t1 = *t;
                    t1[pa] = v;
                    let mut t2 = *t;
                    t2[pb] = v;
                    (is_not_clockwise(points, &t1) && is_not_clockwise(points, &t2))
                        .then_some((ti, t1, t2, t[3 - pa - pb]))
                }),
                _ => None,
            };

            match split {
                Some((ti, t1, t2, third)) => {
                    triangles[ti] = t1;
                    triangles.push(t2);
                    counts[v] += 2;
                    counts[third] += 1;
                    fixed += 1;
                }
                None => {
                    log::warn!(
                        "Orphan vertex {} at ({}, {}) could not be spliced in",
                        v,
                        points[v].x,
                        points[v].y
                    );
                    unresolved += 1;
                }
            }
        }
    }
    (fixed, unresolved)
}

/// Force the edge `p`-`q` into the triangulation
///
/// The boundary edge (an edge used by exactly one triangle) that best fits
/// both points is split: into two triangles when one of the points is an
/// endpoint of it, into three when both lie inside it. Best means smallest
/// summed squared distance, each point within `tolerance`; the first
/// candidate wins ties, by triangle then edge slot.
fn split_along_edge(
    triangles: &mut Vec<[usize; 3]>,
    counts: &mut EdgeCounts,
    points: &[Point2],
    p: usize,
    q: usize,
    tolerance: f64,
) -> bool {
    let fit = |v: usize, a: usize, b: usize| -> Option<f64> {
        if v == a || v == b {
            return Some(0.0);
        }
        distance_squared_point_segment(&points[v], &points[a], &points[b], 0.0)
            .filter(|&d| d <= tolerance)
    };

    let mut best: Option<(usize, usize, f64)> = None;
    for (ti, t) in triangles.iter().enumerate() {
        for k in 0..3 {
            let (a, b) = (t[k], t[(k + 1) % 3]);
            if counts.get(a, b) != 1 {
                continue;
            }
            if (p == a || p == b) && (q == a || q == b) {
                continue;
            }
            let (Some(d1), Some(d2)) = (fit(p, a, b), fit(q, a, b)) else {
                continue;
            };
            let dist = d1 + d2;
            if best.is_none_or(|(_, _, d)| dist < d) {
                best = Some((ti, k, dist));
            }
        }
    }

    let Some((ti, k, _)) = best else {
        return false;
    };
    let tri = triangles[ti];
    let (pa, pb) = (k, (k + 1) % 3);
    let (a, b) = (tri[pa], tri[pb]);

    let replacement: Vec<[usize; 3]> = if p == a || p == b || q == a || q == b {
        let inner = if p == a || p == b { q } else { p };
        let mut t1 = tri;
        t1[pa] = inner;
        let mut t2 = tri;
        t2[pb] = inner;
        vec![t1, t2]
    } else {
        let (n1, n2) = if points[a].distance_squared(&points[p]) < points[a].distance_squared(&points[q]) {
            (p, q)
        } else {
            (q, p)
        };
        let mut t1 = tri;
        t1[pb] = n1;
        let mut t2 = tri;
        t2[pa] = n1;
        t2[pb] = n2;
        let mut t3 = tri;
        t3[pa] = n2;
        vec![t1, t2, t3]
    };

    counts.remove(&tri);
    for t in &replacement {
        counts.add(t);
    }
    let mut replacement = replacement.into_iter();
    if let Some(first) = replacement.next() {
        triangles[ti] = first;
    }
    triangles.extend(replacement);
    true
}

/// Force ring edges missing from the triangulation back in
///
/// Returns `(fixed, unresolved)`.
pub fn repair_missing_edges(
    triangles: &mut Vec<[usize; 3]>,
    points: &[Point2],
    rings: &[Range<usize>],
    tolerance: f64,
) -> (usize, usize) {
    let mut counts = EdgeCounts::new(triangles);
    let (mut fixed, mut unresolved) = (0, 0);

    for (p, q) in ring_edges(rings) {
        if counts.get(p, q) > 0 {
            continue;
        }
        if split_along_edge(triangles, &mut counts, points, p, q, tolerance) && counts.get(p, q) > 0
        {
            fixed += 1;
        } else {
            log::warn!(
                "Ring edge ({}, {})-({}, {}) is missing from the triangulation",
                points[p].x,
                points[p].y,
                points[q].x,
                points[q].y
            );
            unresolved += 1;
        }
    }
    (fixed, unresolved)
}

/// Triangulate a shape and repair the result
///
/// `tolerance` is the squared distance within which a vertex counts as lying
/// on a boundary edge during missing-edge repair.
pub fn triangulate_shape(shape: &Shape, tolerance: f64) -> Result<Triangulation, TriangulationError> {
    let contour = shape.contour().points();
    let holes: Vec<&[Point2]> = shape.holes().iter().map(|h| h.points()).collect();
    let flat = triangulate_with_holes(contour, &holes)?;

    let mut points = Vec::with_capacity(shape.vertex_count());
    let mut rings = Vec::with_capacity(holes.len() + 1);
    for ring in shape.rings() {
        let start = points.len();
        points.extend_from_slice(ring.points());
        rings.push(start..points.len());
    }

    let mut triangles: Vec<[usize; 3]> = flat
        .chunks_exact(3)
        .map(|c| orient_ccw(&points, [c[0], c[1], c[2]]))
        .collect();

    let (orphans_fixed, orphans_unresolved) = repair_orphan_vertices(&mut triangles, &points, &rings);
    let (edges_fixed, edges_unresolved) =
        repair_missing_edges(&mut triangles, &points, &rings, tolerance);

    Ok(Triangulation {
        points,
        rings,
        triangles,
        report: RepairReport {
            orphans_fixed,
            orphans_unresolved,
            edges_fixed,
            edges_unresolved,
        },
    })
}

/// Triangulate many shapes, preserving their order
///
/// Runs on the rayon pool when the `parallel` feature is enabled. On failure
/// returns the index of the first failing shape.
pub fn triangulate_shapes(
    shapes: &[Shape],
    tolerance: f64,
) -> Result<Vec<Triangulation>, (usize, TriangulationError)> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        shapes
            .par_iter()
            .enumerate()
            .map(|(i, s)| triangulate_shape(s, tolerance).map_err(|e| (i, e)))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        shapes
            .iter()
            .enumerate()
            .map(|(i, s)| triangulate_shape(s, tolerance).map_err(|e| (i, e)))
            .collect()
    }
}
