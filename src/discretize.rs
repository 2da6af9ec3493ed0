//! Path discretization
//!
//! Turns path outlines into polylines and closed rings. Path data (`d`
//! attribute syntax) is parsed with kurbo, which already converts arcs to
//! cubic curves; lines keep their end points and curve segments are sampled
//! at a fixed or adaptively chosen number of steps.
//!
//! Closed sub-paths become fill rings. Open sub-paths cannot be filled: they
//! are dropped from the fill with a warning but still take part in stroking.

use crate::config::{Fidelity, SelfIntersectionPolicy};
use crate::error::{Error, Result};
use crate::geometry::{Point2, Ring};
use crate::polygon_clipping::{
    ClipGrid, OffsetCap, OffsetJoin, offset_polylines, resolve_self_intersections,
};
use crate::progress::Stage;
use kurbo::{BezPath, CubicBez, Line, ParamCurve, PathEl, PathSeg, Point, QuadBez};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Outline of a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outline {
    /// SVG path data (`M`, `L`, `H`, `V`, `C`, `S`, `Q`, `T`, `A`, `Z`)
    Commands(String),
    /// Explicit polylines; one is closed when its first and last points match
    Polylines(Vec<Vec<Point2>>),
}

/// Corner style of a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Pointed corners up to the miter limit
    #[default]
    Miter,
    /// Rounded corners
    Round,
    /// Cut corners
    Bevel,
}

impl FromStr for LineJoin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "miter" | "miter-clip" | "arcs" => Ok(LineJoin::Miter),
            "round" => Ok(LineJoin::Round),
            "bevel" => Ok(LineJoin::Bevel),
            other => Err(Error::invalid_option(format!("unknown line join: {}", other))),
        }
    }
}

/// End style of an open stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    /// Flush with the end point
    #[default]
    Butt,
    /// Rounded end
    Round,
    /// Squared end extending half the width
    Square,
}

impl FromStr for LineCap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "butt" => Ok(LineCap::Butt),
            "round" => Ok(LineCap::Round),
            "square" => Ok(LineCap::Square),
            other => Err(Error::invalid_option(format!("unknown line cap: {}", other))),
        }
    }
}

/// Stroke paint of a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyle {
    /// Stroke color
    pub color: String,
    /// Full stroke width
    pub width: f64,
    /// Corner style
    pub join: LineJoin,
    /// End style
    pub cap: LineCap,
    /// Miter length limit as a multiple of the width
    pub miter_limit: f64,
}

impl StrokeStyle {
    /// Stroke with miter joins, butt caps and a miter limit of 4
    pub fn new(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
            miter_limit: 4.0,
        }
    }

    /// Set the corner style
    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    /// Set the end style
    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    /// Set the miter limit
    pub fn with_miter_limit(mut self, limit: f64) -> Self {
        self.miter_limit = limit;
        self
    }
}

/// One painted path of the drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorPath {
    /// Geometry
    pub outline: Outline,
    /// Fill color, if the path is filled
    pub fill: Option<String>,
    /// Stroke, if the path is stroked
    pub stroke: Option<StrokeStyle>,
}

impl VectorPath {
    /// Unpainted path from SVG path data
    pub fn from_path_data(d: impl Into<String>) -> Self {
        Self {
            outline: Outline::Commands(d.into()),
            fill: None,
            stroke: None,
        }
    }

    /// Unpainted path from explicit polylines
    pub fn from_polylines(polylines: Vec<Vec<Point2>>) -> Self {
        Self {
            outline: Outline::Polylines(polylines),
            fill: None,
            stroke: None,
        }
    }

    /// Fill with a color
    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill = Some(color.into());
        self
    }

    /// Stroke with a style
    pub fn with_stroke(mut self, stroke: StrokeStyle) -> Self {
        self.stroke = Some(stroke);
        self
    }
}

/// A discretized sub-path
#[derive(Debug, Clone, PartialEq)]
pub struct SubPath {
    /// Points in drawing order; a closed sub-path does not repeat its start
    pub points: Vec<Point2>,
    /// Ends where it started
    pub closed: bool,
}

/// Rings produced from one path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscretizedPath {
    /// Rings of the filled area
    pub fill: Vec<Ring>,
    /// Rings of the stroke outline
    pub stroke: Vec<Ring>,
}

struct RawSubPath {
    start: Point,
    segments: Vec<PathSeg>,
    closed: bool,
}

fn split_subpaths(path: &BezPath) -> Vec<RawSubPath> {
    let mut subpaths: Vec<RawSubPath> = Vec::new();
    let mut current: Option<RawSubPath> = None;
    let mut cursor = Point::ORIGIN;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                subpaths.extend(current.take());
                current = Some(RawSubPath {
                    start: p,
                    segments: Vec::new(),
                    closed: false,
                });
                cursor = p;
            }
            PathEl::ClosePath => {
                if let Some(mut sub) = current.take() {
                    if cursor != sub.start {
                        sub.segments.push(PathSeg::Line(Line::new(cursor, sub.start)));
                    }
                    sub.closed = true;
                    cursor = sub.start;
                    subpaths.push(sub);
                }
            }
            el => {
                let sub = current.get_or_insert_with(|| RawSubPath {
                    start: cursor,
                    segments: Vec::new(),
                    closed: false,
                });
                let seg = match el {
                    PathEl::LineTo(p) => PathSeg::Line(Line::new(cursor, p)),
                    PathEl::QuadTo(p1, p2) => PathSeg::Quad(QuadBez::new(cursor, p1, p2)),
                    PathEl::CurveTo(p1, p2, p3) => {
                        PathSeg::Cubic(CubicBez::new(cursor, p1, p2, p3))
                    }
                    PathEl::MoveTo(_) | PathEl::ClosePath => continue,
                };
                cursor = seg.end();
                sub.segments.push(seg);
            }
        }
    }
    subpaths.extend(current);
    subpaths.retain(|s| !s.segments.is_empty());
    subpaths
}

fn curve_piece_lengths(subpaths: &[RawSubPath], steps: u32) -> Vec<f64> {
    let mut lengths = Vec::new();
    for seg in subpaths.iter().flat_map(|s| s.segments.iter()) {
        if matches!(seg, PathSeg::Line(_)) {
            continue;
        }
        let mut prev = seg.start();
        for i in 1..=steps {
            let p = seg.eval(f64::from(i) / f64::from(steps));
            lengths.push(prev.distance(p));
            prev = p;
        }
    }
    lengths
}

/// Number of samples per curve segment for this path
fn curve_steps(subpaths: &[RawSubPath], fidelity: Fidelity) -> u32 {
    match fidelity {
        Fidelity::Fixed(steps) => steps.max(1),
        Fidelity::Adaptive {
            initial_steps,
            min_segment_length,
        } => {
            let mut steps = initial_steps.max(1);
            while steps > 1 {
                let mut lengths = curve_piece_lengths(subpaths, steps);
                if lengths.is_empty() {
                    break;
                }
                lengths.sort_by(f64::total_cmp);
                let median = lengths[lengths.len() / 2];
                if median >= min_segment_length {
                    break;
                }
                steps /= 2;
            }
            steps
        }
    }
}

fn sample_subpath(sub: &RawSubPath, steps: u32) -> SubPath {
    let mut points = vec![Point2::new(sub.start.x, sub.start.y)];
    for seg in &sub.segments {
        match seg {
            PathSeg::Line(line) => points.push(Point2::new(line.p1.x, line.p1.y)),
            _ => {
                for i in 1..steps {
                    let p = seg.eval(f64::from(i) / f64::from(steps));
                    points.push(Point2::new(p.x, p.y));
                }
                let end = seg.end();
                points.push(Point2::new(end.x, end.y));
            }
        }
    }

    let closed = sub.closed || (points.len() > 3 && points.first() == points.last());
    if closed && points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    SubPath { points, closed }
}

/// Flatten an outline into sub-paths
///
/// Returns a parser message on malformed path data.
pub fn flatten_outline(
    outline: &Outline,
    fidelity: Fidelity,
) -> std::result::Result<Vec<SubPath>, String> {
    match outline {
        Outline::Commands(d) => {
            let path = BezPath::from_svg(d).map_err(|e| e.to_string())?;
            let raw = split_subpaths(&path);
            let steps = curve_steps(&raw, fidelity);
            Ok(raw.iter().map(|sub| sample_subpath(sub, steps)).collect())
        }
        Outline::Polylines(lines) => {
            let mut subpaths = Vec::with_capacity(lines.len());
            for line in lines {
                if line.iter().any(|p| !p.is_finite()) {
                    return Err("polyline contains a non-finite coordinate".to_string());
                }
                if line.len() < 2 {
                    continue;
                }
                let mut points = line.clone();
                let closed = points.first() == points.last();
                if closed {
                    points.pop();
                }
                subpaths.push(SubPath { points, closed });
            }
            Ok(subpaths)
        }
    }
}

fn offset_style(stroke: &StrokeStyle) -> (OffsetJoin, OffsetCap) {
    let join = match stroke.join {
        LineJoin::Miter => OffsetJoin::Miter(stroke.miter_limit),
        LineJoin::Round => OffsetJoin::Round,
        LineJoin::Bevel => OffsetJoin::Square,
    };
    let cap = match stroke.cap {
        LineCap::Butt => OffsetCap::Butt,
        LineCap::Round => OffsetCap::Round,
        LineCap::Square => OffsetCap::Square,
    };
    (join, cap)
}

/// Discretize one path into fill and stroke rings
///
/// `index` is the path's position in paint order and is only used to label
/// errors and log records.
pub fn discretize_path(
    index: usize,
    path: &VectorPath,
    fidelity: Fidelity,
    policy: SelfIntersectionPolicy,
) -> Result<DiscretizedPath> {
    let subpaths = flatten_outline(&path.outline, fidelity)
        .map_err(|message| Error::InvalidPathData { path: index, message })?;

    let mut fill = Vec::new();
    if path.fill.is_some() {
        for sub in &subpaths {
            if !sub.closed {
                log::warn!(
                    "Path {}: open sub-path with {} points dropped from fill",
                    index,
                    sub.points.len()
                );
                continue;
            }
            let ring = Ring::new(sub.points.clone())
                .map_err(|source| Error::InvalidRing { path: index, source })?;
            match ring.validate_simple() {
                Ok(()) => fill.push(ring),
                Err(source) => match policy {
                    SelfIntersectionPolicy::Reject => {
                        return Err(Error::InvalidRing { path: index, source });
                    }
                    SelfIntersectionPolicy::Resolve => {
                        log::debug!("Path {}: resolving self-intersecting ring ({})", index, source);
                        let pieces = resolve_self_intersections(&ring, ClipGrid::FINE)
                            .map_err(|e| Error::from_clipping(Stage::Discretize, index, e))?;
                        fill.extend(pieces);
                    }
                },
            }
        }
    }

    let mut stroke = Vec::new();
    if let Some(style) = &path.stroke {
        if !(style.width.is_finite() && style.width > 0.0) {
            return Err(Error::InvalidStroke {
                path: index,
                width: style.width,
            });
        }
        let (closed, open): (Vec<&SubPath>, Vec<&SubPath>) =
            subpaths.iter().partition(|s| s.closed);
        let closed: Vec<Vec<Point2>> = closed.into_iter().map(|s| s.points.clone()).collect();
        let open: Vec<Vec<Point2>> = open.into_iter().map(|s| s.points.clone()).collect();
        let (join, cap) = offset_style(style);
        let shapes = offset_polylines(
            &closed,
            &open,
            style.width / 2.0,
            join,
            cap,
            ClipGrid::FINE,
        )
            .map_err(|e| Error::from_clipping(Stage::Discretize, index, e))?;
        for shape in shapes {
            let (contour, holes) = (shape.contour().clone(), shape.holes().to_vec());
            stroke.push(contour);
            stroke.extend(holes);
        }
    }

    Ok(DiscretizedPath { fill, stroke })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Winding;

    fn fixed(steps: u32) -> Fidelity {
        Fidelity::Fixed(steps)
    }

    #[test]
    fn test_flatten_square_path() {
        let subpaths = flatten_outline(
            &Outline::Commands("M0 0 L10 0 L10 10 L0 10 Z".to_string()),
            fixed(10),
        )
        .expect("Failed to flatten");
        assert_eq!(subpaths.len(), 1);
        assert!(subpaths[0].closed);
        assert_eq!(subpaths[0].points.len(), 4);
    }

    #[test]
    fn test_curves_are_sampled_at_fixed_steps() {
        let subpaths = flatten_outline(
            &Outline::Commands("M0 0 C0 10 10 10 10 0 Z".to_string()),
            fixed(8),
        )
        .expect("Failed to flatten");
        // start + 8 curve samples; the closing line ends on the start
        assert_eq!(subpaths[0].points.len(), 9);
        assert_eq!(subpaths[0].points[8], Point2::new(10.0, 0.0));
    }

    #[test]
    fn test_adaptive_fidelity_halves_steps() {
        let outline = Outline::Commands("M0 0 Q1 1 2 0 Z".to_string());
        let adaptive = Fidelity::Adaptive {
            initial_steps: 64,
            min_segment_length: 0.5,
        };
        let subpaths = flatten_outline(&outline, adaptive).expect("Failed to flatten");
        let curve_points = subpaths[0].points.len() - 1;
        assert!(curve_points < 64, "Expected fewer samples, got {}", curve_points);
        assert!(curve_points >= 2);
    }

    #[test]
    fn test_open_and_multiple_subpaths() {
        let subpaths = flatten_outline(
            &Outline::Commands("M0 0 L10 0 L10 10 M20 20 L30 20 L30 30 Z".to_string()),
            fixed(4),
        )
        .expect("Failed to flatten");
        assert_eq!(subpaths.len(), 2);
        assert!(!subpaths[0].closed);
        assert!(subpaths[1].closed);
    }

    #[test]
    fn test_invalid_path_data() {
        let path = VectorPath::from_path_data("M0 0 L10 banana").with_fill("#000000");
        let err = discretize_path(3, &path, fixed(4), SelfIntersectionPolicy::Reject)
            .expect_err("Malformed data should fail");
        match err {
            Error::InvalidPathData { path, .. } => assert_eq!(path, 3),
            other => panic!("Unexpected error: {}", other),
        }
    }

    #[test]
    fn test_polyline_closure_rule() {
        let closed = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 0.0),
        ];
        let open = vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(4.0, 4.0)];
        let subpaths = flatten_outline(&Outline::Polylines(vec![closed, open]), fixed(1))
            .expect("Failed to flatten");
        assert!(subpaths[0].closed);
        assert_eq!(subpaths[0].points.len(), 3);
        assert!(!subpaths[1].closed);
    }

    #[test]
    fn test_open_subpath_dropped_from_fill() {
        let path = VectorPath::from_path_data("M0 0 L10 0 L10 10").with_fill("#000000");
        let out = discretize_path(0, &path, fixed(4), SelfIntersectionPolicy::Reject)
            .expect("Failed to discretize");
        assert!(out.fill.is_empty());
        assert!(out.stroke.is_empty());
    }

    #[test]
    fn test_figure_eight_rejected_and_resolved() {
        let path = VectorPath::from_path_data("M0 0 L10 10 L10 0 L0 6 Z").with_fill("#000000");
        let err = discretize_path(0, &path, fixed(4), SelfIntersectionPolicy::Reject)
            .expect_err("Crossing ring should fail");
        assert_eq!(err.code(), "E1004");

        let out = discretize_path(0, &path, fixed(4), SelfIntersectionPolicy::Resolve)
            .expect("Failed to resolve");
        assert_eq!(out.fill.len(), 2);
    }

    #[test]
    fn test_stroke_of_open_line() {
        let path = VectorPath::from_path_data("M0 0 L10 0")
            .with_stroke(StrokeStyle::new("#000000", 2.0).with_cap(LineCap::Square));
        let out = discretize_path(0, &path, fixed(4), SelfIntersectionPolicy::Reject)
            .expect("Failed to discretize");
        assert!(out.fill.is_empty());
        assert_eq!(out.stroke.len(), 1);
        // 12 long with square caps, 2 wide
        assert!((out.stroke[0].area() - 24.0).abs() < 0.1);
        assert_eq!(out.stroke[0].winding(), Winding::CounterClockwise);
    }

    #[test]
    fn test_stroke_of_closed_square_is_band() {
        let path = VectorPath::from_path_data("M0 0 H20 V20 H0 Z")
            .with_fill("#ff0000")
            .with_stroke(StrokeStyle::new("#0000ff", 2.0));
        let out = discretize_path(0, &path, fixed(4), SelfIntersectionPolicy::Reject)
            .expect("Failed to discretize");
        assert_eq!(out.fill.len(), 1);
        assert_eq!(out.stroke.len(), 2);
        // 22x22 outside, 18x18 hole
        assert!((out.stroke[0].area() - 484.0).abs() < 1e-6);
        assert_eq!(out.stroke[0].winding(), Winding::CounterClockwise);
        assert!((out.stroke[1].area() - 324.0).abs() < 1e-6);
        assert_eq!(out.stroke[1].winding(), Winding::Clockwise);
    }

    #[test]
    fn test_invalid_stroke_width() {
        let path = VectorPath::from_path_data("M0 0 L10 0")
            .with_stroke(StrokeStyle::new("#000000", f64::NAN));
        let err = discretize_path(1, &path, fixed(4), SelfIntersectionPolicy::Reject)
            .expect_err("NaN width should fail");
        assert_eq!(err.code(), "E1002");
    }

    #[test]
    fn test_join_and_cap_parsing() {
        assert_eq!("Round".parse::<LineJoin>().expect("parse"), LineJoin::Round);
        assert_eq!("miter-clip".parse::<LineJoin>().expect("parse"), LineJoin::Miter);
        assert_eq!("square".parse::<LineCap>().expect("parse"), LineCap::Square);
        assert!("zigzag".parse::<LineCap>().is_err());
    }
}
