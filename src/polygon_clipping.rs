//! Polygon boolean operations and offsetting
//!
//! Thin wrappers over the Clipper2 library that speak [`Shape`] instead of raw
//! paths. Every operation runs on a decimal [`ClipGrid`] with the non-zero
//! fill rule, and results are re-nested into shapes through the containment
//! forest. Coordinates leave Clipper2 exactly as
//! [`truncate`](crate::geometry::truncate) would round
//! them, so shapes truncated to the same number of decimals share vertices
//! bit for bit with boolean output.
//!
//! Also provides stroke outlining (offsetting polylines by half the stroke
//! width) and self-intersection resolution for rings the discretizer rejects.

use crate::forest::split_into_shapes;
use crate::geometry::{Point2, Ring, Shape, signed_area};
use clipper2::*;

/// Decimal grid Clipper2 works on
///
/// Coordinates are multiplied by `10^decimals` and rounded to integers on the
/// way in, and divided back on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipGrid {
    decimals: u32,
}

impl ClipGrid {
    /// Finest grid accepted
    pub const MAX_DECIMALS: u32 = 12;

    /// Grid for work that is not bound to an output precision
    pub const FINE: ClipGrid = ClipGrid { decimals: 9 };

    /// Grid of `decimals` places, clamped to [`ClipGrid::MAX_DECIMALS`]
    pub fn new(decimals: u32) -> Self {
        Self {
            decimals: decimals.min(Self::MAX_DECIMALS),
        }
    }

    /// Decimal places of the grid
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    fn factor(&self) -> f64 {
        10f64.powi(self.decimals as i32)
    }

    /// A point as it comes out of Clipper2
    pub fn snap(&self, p: Point2) -> Point2 {
        p.truncated(self.decimals)
    }

    fn to_clipper(&self, paths: Paths2) -> Paths<One> {
        let factor = self.factor();
        paths
            .into_iter()
            .map(|path| {
                path.into_iter()
                    .map(|(x, y)| (x * factor, y * factor))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn from_clipper(&self, paths: Paths<One>) -> Paths2 {
        let factor = self.factor();
        let raw: Paths2 = paths.into();
        raw.into_iter()
            .map(|path| path.into_iter().map(|(x, y)| (x / factor, y / factor)).collect())
            .collect()
    }
}

impl Default for ClipGrid {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Error type for polygon clipping operations
#[derive(Debug, thiserror::Error)]
pub enum ClippingError {
    /// Invalid polygon data
    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    /// Clipper operation failed
    #[error("Clipper operation failed: {0}")]
    ClipperError(String),
}

type Paths2 = Vec<Vec<(f64, f64)>>;

fn shapes_to_paths(shapes: &[Shape]) -> Paths2 {
    shapes.iter().flat_map(Shape::to_paths).collect()
}

/// Convert Clipper2 output back into shapes
///
/// Degenerate output rings (fewer than three points, zero area) are dropped.
fn paths_to_shapes(paths: Paths2) -> Vec<Shape> {
    let rings: Vec<Ring> = paths
        .into_iter()
        .filter_map(|path| {
            let points = path.into_iter().map(Point2::from).collect();
            match Ring::new(points) {
                Ok(ring) => Some(ring),
                Err(e) => {
                    log::debug!("Dropping degenerate clipper output ring: {}", e);
                    None
                }
            }
        })
        .collect();
    split_into_shapes(rings)
}

fn clipper_failed(e: ClipperError) -> ClippingError {
    ClippingError::ClipperError(format!("{:?}", e))
}

/// Union of all shapes
///
/// A single shape is returned unchanged.
pub fn union_shapes(shapes: &[Shape], grid: ClipGrid) -> Result<Vec<Shape>, ClippingError> {
    if shapes.len() <= 1 {
        return Ok(shapes.to_vec());
    }

    let mut all_paths = shapes_to_paths(shapes);
    let first_path = all_paths.remove(0);
    let result = union::<One>(
        grid.to_clipper(vec![first_path]),
        grid.to_clipper(all_paths),
        FillRule::NonZero,
    )
    .map_err(clipper_failed)?;
    Ok(paths_to_shapes(grid.from_clipper(result)))
}

/// Subtract `clip` from `subject`
pub fn difference_shapes(
    subject: &[Shape],
    clip: &[Shape],
    grid: ClipGrid,
) -> Result<Vec<Shape>, ClippingError> {
    if subject.is_empty() {
        return Ok(Vec::new());
    }
    if clip.is_empty() {
        return Ok(subject.to_vec());
    }

    let result = difference::<One>(
        grid.to_clipper(shapes_to_paths(subject)),
        grid.to_clipper(shapes_to_paths(clip)),
        FillRule::NonZero,
    )
    .map_err(clipper_failed)?;
    Ok(paths_to_shapes(grid.from_clipper(result)))
}

/// Overlap of `subject` and `clip`
pub fn intersect_shapes(
    subject: &[Shape],
    clip: &[Shape],
    grid: ClipGrid,
) -> Result<Vec<Shape>, ClippingError> {
    if subject.is_empty() || clip.is_empty() {
        return Ok(Vec::new());
    }

    let result = intersect::<One>(
        grid.to_clipper(shapes_to_paths(subject)),
        grid.to_clipper(shapes_to_paths(clip)),
        FillRule::NonZero,
    )
    .map_err(clipper_failed)?;
    Ok(paths_to_shapes(grid.from_clipper(result)))
}

/// Split a self-intersecting ring into simple rings
///
/// The ring is unioned with itself under the non-zero rule, which removes
/// crossings and splits figure-eights at their pinch points. The returned
/// rings are flat (contours and holes mixed); nest them with the forest.
pub fn resolve_self_intersections(ring: &Ring, grid: ClipGrid) -> Result<Vec<Ring>, ClippingError> {
    let result = union::<One>(
        grid.to_clipper(vec![ring.to_path()]),
        Paths::<One>::default(),
        FillRule::NonZero,
    )
    .map_err(clipper_failed)?;

    let rings: Vec<Ring> = grid
        .from_clipper(result)
        .into_iter()
        .filter_map(|path| Ring::new(path.into_iter().map(Point2::from).collect()).ok())
        .collect();

    if rings.is_empty() {
        return Err(ClippingError::InvalidPolygon(
            "ring encloses no area once crossings are removed".to_string(),
        ));
    }
    Ok(rings)
}

/// Corner treatment of an offset outline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetJoin {
    /// Pointed corners, squared off beyond the miter limit
    Miter(f64),
    /// Rounded corners
    Round,
    /// Cut corners
    Square,
}

/// End treatment of open polylines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetCap {
    /// Flat, flush with the end point
    Butt,
    /// Flat, extended by half the width
    Square,
    /// Semicircle
    Round,
}

/// Outline polylines at `half_width` on both sides
///
/// A closed polyline becomes a band: its outward offset minus its inward
/// offset, so the area it encloses stays open. A closed polyline enclosing no
/// area is outlined like a loop of line segments. Open polylines get end
/// caps. The outlines of all polylines are unioned into one set of shapes.
pub fn offset_polylines(
    closed: &[Vec<Point2>],
    open: &[Vec<Point2>],
    half_width: f64,
    join: OffsetJoin,
    cap: OffsetCap,
    grid: ClipGrid,
) -> Result<Vec<Shape>, ClippingError> {
    if !(half_width.is_finite() && half_width > 0.0) {
        return Err(ClippingError::InvalidPolygon(format!(
            "offset distance {} must be positive",
            half_width
        )));
    }

    // Clipper2 scales the miter limit along with coordinates; on the unit
    // scaler it stays a ratio
    let (join_type, miter_limit) = match join {
        OffsetJoin::Miter(limit) => (JoinType::Miter, limit.max(1.0)),
        OffsetJoin::Round => (JoinType::Round, 2.0),
        OffsetJoin::Square => (JoinType::Square, 2.0),
    };
    let open_end = match cap {
        OffsetCap::Butt => EndType::Butt,
        OffsetCap::Square => EndType::Square,
        OffsetCap::Round => EndType::Round,
    };
    let delta = half_width * grid.factor();
    let offset = |paths: Paths2, delta: f64, end: EndType| -> Paths<One> {
        inflate::<One>(grid.to_clipper(paths), delta, join_type, end, miter_limit)
    };

    let mut outlines: Paths<One> = Paths::default();
    for line in closed {
        let mut path: Vec<(f64, f64)> = line.iter().map(|p| (p.x, p.y)).collect();
        if path.len() > 1 && path.first() == path.last() {
            path.pop();
        }
        if path.len() < 2 {
            continue;
        }
        let area = signed_area(line);
        if path.len() < 3 || area == 0.0 {
            outlines.push(offset(vec![path], delta, EndType::Joined));
            continue;
        }
        if area < 0.0 {
            path.reverse();
        }
        let outer = offset(vec![path.clone()], delta, EndType::Polygon);
        let inner = offset(vec![path], -delta, EndType::Polygon);
        let band = difference::<One>(outer, inner, FillRule::NonZero).map_err(clipper_failed)?;
        outlines.push(band);
    }
    let open_paths: Paths2 = open
        .iter()
        .filter(|l| l.len() >= 2)
        .map(|l| l.iter().map(|p| (p.x, p.y)).collect())
        .collect();
    if !open_paths.is_empty() {
        outlines.push(offset(open_paths, delta, open_end));
    }

    if outlines.is_empty() {
        return Ok(Vec::new());
    }

    // Bands of different polylines may overlap
    let result = union::<One>(outlines, Paths::<One>::default(), FillRule::NonZero)
        .map_err(clipper_failed)?;
    Ok(paths_to_shapes(grid.from_clipper(result)))
}
