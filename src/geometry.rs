//! Planar geometry primitives
//!
//! [`Point2`], [`BoundingBox`], [`Ring`] and [`Shape`] are the value types
//! every pipeline stage passes around. A [`Ring`] is always stored without a
//! repeated closing point; the closing edge from the last point back to the
//! first is implicit. A [`Shape`] keeps its contour counter-clockwise and its
//! holes clockwise (positive signed area means counter-clockwise, y up).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance below which a point counts as lying on a ring edge
pub const ON_BOUNDARY_TOLERANCE: f64 = 1e-9;

/// A point in the drawing plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point2 {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to another point
    pub fn distance_squared(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Bit-exact key identifying this location
    ///
    /// `-0.0` and `0.0` map to the same key, so two points compare equal as
    /// keys exactly when they compare equal as numbers.
    pub fn location_key(&self) -> (u64, u64) {
        (canonical_bits(self.x), canonical_bits(self.y))
    }

    /// Point with both coordinates truncated to `precision` decimals
    pub fn truncated(&self, precision: u32) -> Point2 {
        Point2::new(truncate(self.x, precision), truncate(self.y, precision))
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Point2::new(x, y)
    }
}

impl From<Point2> for (f64, f64) {
    fn from(p: Point2) -> Self {
        (p.x, p.y)
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Round `value` to `precision` decimal places
///
/// Truncating an already truncated value returns it unchanged.
pub fn truncate(value: f64, precision: u32) -> f64 {
    let npow = 10f64.powi(precision as i32);
    (value * npow).round() / npow
}

/// Twice the signed area of the z component of `(a - o) x (b - o)`
pub fn cross(o: &Point2, a: &Point2, b: &Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Signed area of an implicitly closed polygon (shoelace formula)
///
/// Positive for counter-clockwise vertex order.
pub fn signed_area(points: &[Point2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut prev = points[points.len() - 1];
    for p in points {
        sum += prev.x * p.y - p.x * prev.y;
        prev = *p;
    }
    sum / 2.0
}

/// Squared distance from `p` to its projection on segment `a`-`b`
///
/// Returns `None` when the segment is shorter than `epsilon` (squared) or
/// when the projection falls outside the segment.
pub fn distance_squared_point_segment(
    p: &Point2,
    a: &Point2,
    b: &Point2,
    epsilon: f64,
) -> Option<f64> {
    let l2 = a.distance_squared(b);
    if l2 <= epsilon {
        return None;
    }
    let r = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / l2;
    if !(0.0..=1.0).contains(&r) {
        return None;
    }
    let projection = Point2::new(a.x + r * (b.x - a.x), a.y + r * (b.y - a.y));
    Some(p.distance_squared(&projection))
}

/// Parameter of `p` along the interior of edge `a`-`b`
///
/// Returns `Some(r)` with `0 < r < 1` when `p` lies within squared distance
/// `epsilon` of the edge and is not within `epsilon` of either endpoint.
pub fn relative_position_on_edge(p: &Point2, a: &Point2, b: &Point2, epsilon: f64) -> Option<f64> {
    if p.distance_squared(a) <= epsilon || p.distance_squared(b) <= epsilon {
        return None;
    }
    let l2 = a.distance_squared(b);
    if l2 <= epsilon {
        return None;
    }
    let r = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / l2;
    if r <= 0.0 || r >= 1.0 {
        return None;
    }
    let projection = Point2::new(a.x + r * (b.x - a.x), a.y + r * (b.y - a.y));
    (p.distance_squared(&projection) <= epsilon).then_some(r)
}

fn point_on_segment(p: &Point2, a: &Point2, b: &Point2) -> bool {
    if p == a || p == b {
        return true;
    }
    let tol2 = ON_BOUNDARY_TOLERANCE * ON_BOUNDARY_TOLERANCE;
    match distance_squared_point_segment(p, a, b, 0.0) {
        Some(d) => d <= tol2,
        None => false,
    }
}

fn collinear_overlap(p: &Point2, a: &Point2, b: &Point2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Segments `p1`-`p2` and `q1`-`q2` share at least one point
pub fn segments_touch(p1: &Point2, p2: &Point2, q1: &Point2, q2: &Point2) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && collinear_overlap(p1, q1, q2))
        || (d2 == 0.0 && collinear_overlap(p2, q1, q2))
        || (d3 == 0.0 && collinear_overlap(q1, p1, p2))
        || (d4 == 0.0 && collinear_overlap(q2, p1, p2))
}

/// Axis-aligned bounding box in the drawing plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X
    pub min_x: f64,
    /// Minimum Y
    pub min_y: f64,
    /// Maximum X
    pub max_x: f64,
    /// Maximum Y
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a box from its extremes
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// A box containing nothing; including any point makes it non-empty
    pub const fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    /// Smallest box around the given points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.include_point(p);
        }
        bbox
    }

    /// True if no point has been included
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Grow to include a point
    pub fn include_point(&mut self, p: &Point2) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Boxes overlap or touch
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// `other` lies entirely inside this box (boundaries included)
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Point lies inside this box (boundaries included)
    pub fn contains_point(&self, p: &Point2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Box grown by `margin` on every side
    pub fn expanded(&self, margin: f64) -> BoundingBox {
        BoundingBox::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    /// Width of the box
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the box
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point
    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Vertex order of a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Positive signed area
    CounterClockwise,
    /// Negative signed area
    Clockwise,
}

/// Where a point lies relative to a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    /// Strictly inside
    Inside,
    /// Strictly outside
    Outside,
    /// On an edge or vertex
    OnBoundary,
}

/// Reasons a point sequence is not a usable ring
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RingError {
    /// Fewer than three distinct points
    #[error("ring has {0} distinct points (minimum 3 required)")]
    TooFewPoints(usize),

    /// All points are collinear
    #[error("ring encloses no area")]
    ZeroArea,

    /// A coordinate is NaN or infinite
    #[error("ring contains a non-finite coordinate")]
    NonFinite,

    /// The ring passes through the same location twice
    #[error("ring revisits vertex ({x}, {y})")]
    RepeatedVertex {
        /// X of the repeated vertex
        x: f64,
        /// Y of the repeated vertex
        y: f64,
    },

    /// Two edges of the ring cross or overlap
    #[error("ring edges {first} and {second} intersect")]
    SelfIntersection {
        /// Index of the first edge
        first: usize,
        /// Index of the second edge
        second: usize,
    },
}

/// A closed polygonal boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    points: Vec<Point2>,
}

impl Ring {
    /// Build a ring from a point sequence
    ///
    /// A trailing point equal to the first one is dropped, as are consecutive
    /// duplicates. At least three distinct points enclosing a non-zero area
    /// must remain.
    pub fn new(points: Vec<Point2>) -> Result<Self, RingError> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(RingError::NonFinite);
        }

        let mut cleaned: Vec<Point2> = Vec::with_capacity(points.len());
        for p in points {
            if cleaned.last() != Some(&p) {
                cleaned.push(p);
            }
        }
        while cleaned.len() > 1 && cleaned.first() == cleaned.last() {
            cleaned.pop();
        }

        if cleaned.len() < 3 {
            return Err(RingError::TooFewPoints(cleaned.len()));
        }
        if signed_area(&cleaned) == 0.0 {
            return Err(RingError::ZeroArea);
        }

        Ok(Self { points: cleaned })
    }

    /// Axis-aligned rectangle, counter-clockwise
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, RingError> {
        Self::new(vec![
            Point2::new(min_x, min_y),
            Point2::new(max_x, min_y),
            Point2::new(max_x, max_y),
            Point2::new(min_x, max_y),
        ])
    }

    /// Vertices, without the closing duplicate
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed ring
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertices followed by a copy of the first one
    pub fn closed_points(&self) -> Vec<Point2> {
        let mut closed = self.points.clone();
        closed.push(self.points[0]);
        closed
    }

    /// Signed area, positive when counter-clockwise
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    /// Absolute area
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Vertex order of this ring
    pub fn winding(&self) -> Winding {
        if self.signed_area() > 0.0 {
            Winding::CounterClockwise
        } else {
            Winding::Clockwise
        }
    }

    /// Same ring traversed the other way
    pub fn reversed(&self) -> Ring {
        let mut points = self.points.clone();
        points.reverse();
        Ring { points }
    }

    /// This ring with the requested vertex order
    pub fn with_winding(self, winding: Winding) -> Ring {
        if self.winding() == winding {
            self
        } else {
            self.reversed()
        }
    }

    /// Bounding box of the vertices
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Edges as point pairs, including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Classify a point against this ring (ray casting)
    pub fn locate(&self, p: &Point2) -> PointLocation {
        if self.edges().any(|(a, b)| point_on_segment(p, &a, &b)) {
            return PointLocation::OnBoundary;
        }

        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        if inside {
            PointLocation::Inside
        } else {
            PointLocation::Outside
        }
    }

    /// Check that the ring is a simple polygon
    ///
    /// Rejects rings that revisit a location (figure-eights) and rings whose
    /// edges cross, overlap, or fold back onto the previous edge.
    pub fn validate_simple(&self) -> Result<(), RingError> {
        let n = self.points.len();

        let mut seen: HashMap<(u64, u64), usize> = HashMap::with_capacity(n);
        for p in &self.points {
            if seen.insert(p.location_key(), 0).is_some() {
                return Err(RingError::RepeatedVertex { x: p.x, y: p.y });
            }
        }

        // Adjacent edges only share their common vertex unless the ring
        // doubles back on itself.
        for i in 0..n {
            let a = &self.points[(i + n - 1) % n];
            let b = &self.points[i];
            let c = &self.points[(i + 1) % n];
            if cross(a, b, c) == 0.0 && (collinear_overlap(c, a, b) || collinear_overlap(a, b, c))
            {
                return Err(RingError::SelfIntersection {
                    first: (i + n - 1) % n,
                    second: i,
                });
            }
        }

        // Sweep edges by their minimum x and test overlapping candidates
        let mut order: Vec<usize> = (0..n).collect();
        let min_x = |i: usize| self.points[i].x.min(self.points[(i + 1) % n].x);
        let max_x = |i: usize| self.points[i].x.max(self.points[(i + 1) % n].x);
        order.sort_by(|&i, &j| min_x(i).total_cmp(&min_x(j)));

        for (pos, &i) in order.iter().enumerate() {
            let (a1, a2) = (self.points[i], self.points[(i + 1) % n]);
            let reach = max_x(i);
            for &j in &order[pos + 1..] {
                if min_x(j) > reach {
                    break;
                }
                if j == (i + 1) % n || i == (j + 1) % n {
                    continue;
                }
                let (b1, b2) = (self.points[j], self.points[(j + 1) % n]);
                if segments_touch(&a1, &a2, &b1, &b2) {
                    return Err(RingError::SelfIntersection {
                        first: i.min(j),
                        second: i.max(j),
                    });
                }
            }
        }

        Ok(())
    }

    /// Apply `f` to every vertex and rebuild the ring
    pub fn map_points(&self, mut f: impl FnMut(Point2) -> Point2) -> Result<Ring, RingError> {
        Ring::new(self.points.iter().map(|p| f(*p)).collect())
    }

    /// Coordinates as tuples for the polygon backend
    pub fn to_path(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.x, p.y)).collect()
    }
}

/// A filled region: one contour with zero or more holes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    contour: Ring,
    holes: Vec<Ring>,
}

impl Shape {
    /// Create a shape, orienting the contour counter-clockwise and holes clockwise
    pub fn new(contour: Ring, holes: Vec<Ring>) -> Self {
        Self {
            contour: contour.with_winding(Winding::CounterClockwise),
            holes: holes
                .into_iter()
                .map(|h| h.with_winding(Winding::Clockwise))
                .collect(),
        }
    }

    /// Axis-aligned rectangle without holes
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, RingError> {
        Ok(Self::new(Ring::rectangle(min_x, min_y, max_x, max_y)?, Vec::new()))
    }

    /// Outer boundary
    pub fn contour(&self) -> &Ring {
        &self.contour
    }

    /// Holes
    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// Contour followed by holes
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.contour).chain(self.holes.iter())
    }

    /// Contour area minus hole areas
    pub fn area(&self) -> f64 {
        self.contour.area() - self.holes.iter().map(Ring::area).sum::<f64>()
    }

    /// Bounding box of the contour
    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Number of vertices over all rings
    pub fn vertex_count(&self) -> usize {
        self.rings().map(Ring::len).sum()
    }

    /// Rebuild every ring through `f`
    pub fn map_rings(
        &self,
        mut f: impl FnMut(&Ring) -> Result<Ring, RingError>,
    ) -> Result<Shape, RingError> {
        let contour = f(&self.contour)?;
        let holes = self.holes.iter().map(&mut f).collect::<Result<Vec<_>, _>>()?;
        Ok(Shape::new(contour, holes))
    }

    /// Rings as tuple paths for the polygon backend
    pub fn to_paths(&self) -> Vec<Vec<(f64, f64)>> {
        self.rings().map(Ring::to_path).collect()
    }
}

/// Summed area of a set of shapes
pub fn total_area(shapes: &[Shape]) -> f64 {
    shapes.iter().map(Shape::area).sum()
}

/// Bounding box of a set of shapes
pub fn shapes_bounding_box(shapes: &[Shape]) -> BoundingBox {
    shapes
        .iter()
        .fold(BoundingBox::empty(), |acc, s| acc.union(&s.bounding_box()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2> {
        coords.iter().map(|&c| c.into()).collect()
    }

    #[test]
    fn test_truncate_is_idempotent() {
        let once = truncate(1.23456, 3);
        assert_eq!(once, 1.235);
        assert_eq!(truncate(once, 3), once);
        assert_eq!(truncate(-2.5, 0), -3.0);
    }

    #[test]
    fn test_location_key_folds_negative_zero() {
        assert_eq!(
            Point2::new(-0.0, 1.0).location_key(),
            Point2::new(0.0, 1.0).location_key()
        );
        assert_ne!(
            Point2::new(0.1, 1.0).location_key(),
            Point2::new(0.0, 1.0).location_key()
        );
    }

    #[test]
    fn test_ring_strips_closing_and_duplicate_points() {
        let ring = Ring::new(pts(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 0.0),
        ]))
        .expect("Failed to build ring");
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.closed_points().len(), 4);
    }

    #[test]
    fn test_ring_rejects_degenerate_input() {
        assert_eq!(
            Ring::new(pts(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)])),
            Err(RingError::TooFewPoints(2))
        );
        assert_eq!(
            Ring::new(pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])),
            Err(RingError::ZeroArea)
        );
        assert_eq!(
            Ring::new(pts(&[(0.0, 0.0), (f64::NAN, 1.0), (2.0, 0.0)])),
            Err(RingError::NonFinite)
        );
    }

    #[test]
    fn test_winding_and_area() {
        let ring = Ring::rectangle(0.0, 0.0, 10.0, 5.0).expect("Failed to build rectangle");
        assert_eq!(ring.winding(), Winding::CounterClockwise);
        assert_eq!(ring.signed_area(), 50.0);
        let cw = ring.clone().with_winding(Winding::Clockwise);
        assert_eq!(cw.signed_area(), -50.0);
        assert_eq!(cw.area(), 50.0);
    }

    #[test]
    fn test_locate_point() {
        let ring = Ring::rectangle(0.0, 0.0, 10.0, 10.0).expect("Failed to build rectangle");
        assert_eq!(ring.locate(&Point2::new(5.0, 5.0)), PointLocation::Inside);
        assert_eq!(ring.locate(&Point2::new(15.0, 5.0)), PointLocation::Outside);
        assert_eq!(ring.locate(&Point2::new(10.0, 5.0)), PointLocation::OnBoundary);
        assert_eq!(ring.locate(&Point2::new(0.0, 0.0)), PointLocation::OnBoundary);
    }

    #[test]
    fn test_validate_simple_accepts_convex_and_concave() {
        let square = Ring::rectangle(0.0, 0.0, 10.0, 10.0).expect("Failed to build rectangle");
        assert!(square.validate_simple().is_ok());

        let l_shape = Ring::new(pts(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (5.0, 5.0),
            (5.0, 10.0),
            (0.0, 10.0),
        ]))
        .expect("Failed to build ring");
        assert!(l_shape.validate_simple().is_ok());
    }

    #[test]
    fn test_validate_simple_rejects_figure_eight() {
        let eight = Ring::new(pts(&[
            (0.0, 0.0),
            (5.0, 5.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (5.0, 5.0),
            (0.0, 10.0),
        ]))
        .expect("Failed to build ring");
        assert!(matches!(
            eight.validate_simple(),
            Err(RingError::RepeatedVertex { .. })
        ));

        let bowtie = Ring::new(pts(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 6.0)]))
            .expect("Failed to build ring");
        assert!(matches!(
            bowtie.validate_simple(),
            Err(RingError::SelfIntersection { .. })
        ));
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert_eq!(
            distance_squared_point_segment(&Point2::new(5.0, 2.0), &a, &b, 1e-9),
            Some(4.0)
        );
        assert_eq!(
            distance_squared_point_segment(&Point2::new(-1.0, 0.0), &a, &b, 1e-9),
            None
        );
        assert_eq!(distance_squared_point_segment(&a, &a, &a, 1e-9), None);
    }

    #[test]
    fn test_relative_position_on_edge() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert_eq!(
            relative_position_on_edge(&Point2::new(2.5, 0.0), &a, &b, 1e-6),
            Some(0.25)
        );
        assert_eq!(relative_position_on_edge(&b, &a, &b, 1e-6), None);
        assert_eq!(
            relative_position_on_edge(&Point2::new(2.5, 1.0), &a, &b, 1e-6),
            None
        );
    }

    #[test]
    fn test_shape_orients_rings() {
        let outer = Ring::rectangle(0.0, 0.0, 10.0, 10.0)
            .expect("Failed to build rectangle")
            .reversed();
        let hole = Ring::rectangle(2.0, 2.0, 4.0, 4.0).expect("Failed to build rectangle");
        let shape = Shape::new(outer, vec![hole]);
        assert_eq!(shape.contour().winding(), Winding::CounterClockwise);
        assert_eq!(shape.holes()[0].winding(), Winding::Clockwise);
        assert_eq!(shape.area(), 96.0);
        assert_eq!(shape.vertex_count(), 8);
    }

    #[test]
    fn test_bounding_box_operations() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 5.0, 20.0, 6.0);
        assert!(a.intersects(&b), "Touching boxes should intersect");
        assert!(!a.intersects(&BoundingBox::empty()));
        assert_eq!(a.union(&b), BoundingBox::new(0.0, 0.0, 20.0, 10.0));
        assert!(a.contains_box(&BoundingBox::new(1.0, 1.0, 2.0, 2.0)));
        assert_eq!(a.center(), Point2::new(5.0, 5.0));
    }
}
