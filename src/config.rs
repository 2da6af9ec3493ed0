//! Build options
//!
//! [`MeshOptions`] carries every knob of the pipeline. It deserializes from
//! camelCase keys (`objectWidth`, `typeDepths`, ...) with every field
//! optional, and offers `with_*` builders for programmatic use. Options are
//! checked up front by [`MeshOptions::validate`] so that configuration errors
//! never surface halfway through a build.

use crate::discretize::VectorPath;
use crate::error::{Error, Result};
use crate::polygon_clipping::ClipGrid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Reserved `type_depths` key holding the floor thickness
pub const BASE_KEY: &str = "base";

/// Shape of the optional plate drawn beneath the whole drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasePlateShape {
    /// No plate
    #[default]
    None,
    /// Bounding rectangle grown by the buffer
    Rectangular,
    /// Square centred on the bounding rectangle, side = larger dimension
    Squared,
    /// Circle through the corners of the bounding rectangle
    Circular,
}

impl FromStr for BasePlateShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(BasePlateShape::None),
            "rectangular" => Ok(BasePlateShape::Rectangular),
            "squared" => Ok(BasePlateShape::Squared),
            "circular" => Ok(BasePlateShape::Circular),
            _ => Err(Error::UnknownBasePlateShape(s.to_string())),
        }
    }
}

/// How curved path segments are subdivided
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Fidelity {
    /// Every curve segment is sampled at this many steps
    Fixed(u32),
    /// Start at `initial_steps` and halve while the median sampled piece is
    /// shorter than `min_segment_length`
    #[serde(rename_all = "camelCase")]
    Adaptive {
        /// Starting step count
        initial_steps: u32,
        /// Shortest acceptable median piece length, in drawing units
        min_segment_length: f64,
    },
}

impl Default for Fidelity {
    fn default() -> Self {
        Fidelity::Fixed(50)
    }
}

/// What to do with a filled ring that is not a simple polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelfIntersectionPolicy {
    /// Fail the build with an invalid-ring error
    #[default]
    Reject,
    /// Split the ring into simple polygons with the polygon backend
    Resolve,
}

/// Where stroke outlines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrokePolicy {
    /// A separate paint item of the stroke color, painted above the fill
    #[default]
    SeparateLayer,
    /// Unioned into the fill, taking the fill color
    MergeWithFill,
}

/// Options for a mesh build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeshOptions {
    /// Final width of the model, base buffer included
    pub object_width: f64,
    /// Margin between the drawing and the base plate edge
    pub base_buffer: f64,
    /// Base plate shape
    pub base_plate_shape: BasePlateShape,
    /// Extrusion depth per lowercase color; `base` is the floor thickness
    pub type_depths: BTreeMap<String, f64>,
    /// Vertices of different shapes closer than this are merged; 0 disables
    pub merge_distance: f64,
    /// Decimal places kept on coordinates; negative selects the finest grid
    pub precision: i32,
    /// Skip the mirror applied before export
    pub inverted_type: bool,
    /// Size the base plate from the drawing bounds instead of the canvas
    pub ignore_document_margins: bool,
    /// Curve subdivision
    pub fidelity: Fidelity,
    /// Stroke placement
    pub stroke_policy: StrokePolicy,
    /// Handling of self-intersecting filled rings
    pub self_intersection_policy: SelfIntersectionPolicy,
    /// Squared distance under which a vertex counts as lying on an edge
    pub edge_epsilon: f64,
}

impl Default for MeshOptions {
    fn default() -> Self {
        let mut type_depths = BTreeMap::new();
        type_depths.insert(BASE_KEY.to_string(), 1.0);
        Self {
            object_width: 100.0,
            base_buffer: 0.0,
            base_plate_shape: BasePlateShape::None,
            type_depths,
            merge_distance: 0.0,
            precision: 2,
            inverted_type: false,
            ignore_document_margins: false,
            fidelity: Fidelity::default(),
            stroke_policy: StrokePolicy::default(),
            self_intersection_policy: SelfIntersectionPolicy::default(),
            edge_epsilon: 1e-4,
        }
    }
}

impl MeshOptions {
    /// Default options: 100 units wide, 1 unit floor, no base plate
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the final model width
    pub fn with_object_width(mut self, width: f64) -> Self {
        self.object_width = width;
        self
    }

    /// Set the base plate margin
    pub fn with_base_buffer(mut self, buffer: f64) -> Self {
        self.base_buffer = buffer;
        self
    }

    /// Set the base plate shape
    pub fn with_base_plate(mut self, shape: BasePlateShape) -> Self {
        self.base_plate_shape = shape;
        self
    }

    /// Set the floor thickness
    pub fn with_base_depth(self, depth: f64) -> Self {
        self.with_type_depth(BASE_KEY, depth)
    }

    /// Set the depth of a color (key is lowercased)
    pub fn with_type_depth(mut self, color: impl AsRef<str>, depth: f64) -> Self {
        self.type_depths
            .insert(color.as_ref().to_ascii_lowercase(), depth);
        self
    }

    /// Set the snapping distance
    pub fn with_merge_distance(mut self, distance: f64) -> Self {
        self.merge_distance = distance;
        self
    }

    /// Set the number of decimals kept; negative selects the finest grid
    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    /// Skip the export mirror
    pub fn with_inverted_type(mut self, inverted: bool) -> Self {
        self.inverted_type = inverted;
        self
    }

    /// Size the base plate from the drawing instead of the canvas
    pub fn with_ignore_document_margins(mut self, ignore: bool) -> Self {
        self.ignore_document_margins = ignore;
        self
    }

    /// Set curve subdivision
    pub fn with_fidelity(mut self, fidelity: Fidelity) -> Self {
        self.fidelity = fidelity;
        self
    }

    /// Set stroke placement
    pub fn with_stroke_policy(mut self, policy: StrokePolicy) -> Self {
        self.stroke_policy = policy;
        self
    }

    /// Set handling of self-intersecting rings
    pub fn with_self_intersection_policy(mut self, policy: SelfIntersectionPolicy) -> Self {
        self.self_intersection_policy = policy;
        self
    }

    /// Set the on-edge tolerance (squared distance)
    pub fn with_edge_epsilon(mut self, epsilon: f64) -> Self {
        self.edge_epsilon = epsilon;
        self
    }

    /// Depth configured for a color, compared case-insensitively
    pub fn depth_for(&self, color: &str) -> Option<f64> {
        let key = color.trim().to_ascii_lowercase();
        self.type_depths.get(&key).copied().or_else(|| {
            self.type_depths
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&key))
                .map(|(_, v)| *v)
        })
    }

    /// Floor thickness
    pub fn base_thickness(&self) -> Result<f64> {
        self.depth_for(BASE_KEY).ok_or_else(|| Error::MissingDepth {
            color: BASE_KEY.to_string(),
        })
    }

    /// Grid every coordinate is truncated to and every boolean runs on
    ///
    /// A negative precision does not skip truncation: the booleans always
    /// round to some grid, so it selects [`ClipGrid::FINE`] instead.
    pub fn clip_grid(&self) -> ClipGrid {
        u32::try_from(self.precision)
            .map(ClipGrid::new)
            .unwrap_or(ClipGrid::FINE)
    }

    /// Check the options against the paths about to be built
    pub fn validate(&self, paths: &[VectorPath]) -> Result<()> {
        if !(self.object_width.is_finite() && self.object_width > 0.0) {
            return Err(Error::invalid_option(format!(
                "objectWidth must be positive, got {}",
                self.object_width
            )));
        }
        if !(self.base_buffer.is_finite() && self.base_buffer >= 0.0) {
            return Err(Error::invalid_option(format!(
                "baseBuffer must be non-negative, got {}",
                self.base_buffer
            )));
        }
        if self.base_plate_shape != BasePlateShape::None
            && 2.0 * self.base_buffer >= self.object_width
        {
            return Err(Error::invalid_option(format!(
                "baseBuffer {} leaves no room inside objectWidth {}",
                self.base_buffer, self.object_width
            )));
        }
        if !(self.merge_distance.is_finite() && self.merge_distance >= 0.0) {
            return Err(Error::invalid_option(format!(
                "mergeDistance must be non-negative, got {}",
                self.merge_distance
            )));
        }
        if !(self.edge_epsilon.is_finite() && self.edge_epsilon > 0.0) {
            return Err(Error::invalid_option(format!(
                "edgeEpsilon must be positive, got {}",
                self.edge_epsilon
            )));
        }
        if self.precision > ClipGrid::MAX_DECIMALS as i32 {
            return Err(Error::invalid_option(format!(
                "precision {} exceeds 12 decimals",
                self.precision
            )));
        }
        match self.fidelity {
            Fidelity::Fixed(0) => {
                return Err(Error::invalid_option("fidelity steps must be at least 1"));
            }
            Fidelity::Adaptive {
                initial_steps,
                min_segment_length,
            } => {
                if initial_steps == 0 {
                    return Err(Error::invalid_option("fidelity steps must be at least 1"));
                }
                if !(min_segment_length.is_finite() && min_segment_length > 0.0) {
                    return Err(Error::invalid_option(format!(
                        "minSegmentLength must be positive, got {}",
                        min_segment_length
                    )));
                }
            }
            Fidelity::Fixed(_) => {}
        }

        for (color, depth) in &self.type_depths {
            if !depth.is_finite() {
                return Err(Error::invalid_option(format!(
                    "depth for {} is not finite",
                    color
                )));
            }
        }
        let base = self.base_thickness()?;
        if base <= 0.0 {
            return Err(Error::invalid_option(format!(
                "base thickness must be positive, got {}",
                base
            )));
        }

        for (index, path) in paths.iter().enumerate() {
            if let Some(fill) = &path.fill
                && self.depth_for(fill).is_none()
            {
                return Err(Error::MissingDepth {
                    color: fill.to_ascii_lowercase(),
                });
            }
            if let Some(stroke) = &path.stroke {
                if !(stroke.width.is_finite() && stroke.width > 0.0) {
                    return Err(Error::InvalidStroke {
                        path: index,
                        width: stroke.width,
                    });
                }
                let layer_color = match (self.stroke_policy, &path.fill) {
                    (StrokePolicy::MergeWithFill, Some(fill)) => fill,
                    _ => &stroke.color,
                };
                if self.depth_for(layer_color).is_none() {
                    return Err(Error::MissingDepth {
                        color: layer_color.to_ascii_lowercase(),
                    });
                }
            }
        }

        Ok(())
    }
}
