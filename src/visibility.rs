//! Visibility clipping and depth merging
//!
//! Paint items arrive bottom-first, the way a drawing paints them. Walking
//! them top-down, each item keeps only what no item of a *different* color
//! already covers; same-colored items never occlude each other. The visible
//! remainders accumulate per color and into one silhouette of everything
//! painted.
//!
//! Accumulation goes through [`SpatialClipping`]: shapes are bucketed so that
//! only buckets whose bounding boxes overlap a new shape are unioned with it,
//! and crops only touch the buckets a subject overlaps. All booleans share
//! one [`ClipGrid`], so inputs already truncated to its decimals come out
//! with bit-identical shared vertices.

use crate::geometry::{BoundingBox, Shape, shapes_bounding_box};
use crate::polygon_clipping::{ClipGrid, ClippingError, difference_shapes, union_shapes};
use serde::{Deserialize, Serialize};

/// A run of shapes painted in one color at one depth
#[derive(Debug, Clone, PartialEq)]
pub struct PaintItem {
    /// Lowercase color
    pub color: String,
    /// Extrusion depth of the color
    pub depth: f64,
    /// Shapes of the item
    pub shapes: Vec<Shape>,
}

impl PaintItem {
    /// Create a paint item
    pub fn new(color: impl Into<String>, depth: f64, shapes: Vec<Shape>) -> Self {
        Self {
            color: color.into(),
            depth,
            shapes,
        }
    }
}

/// Visible, non-overlapping shapes at one depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Extrusion depth
    pub depth: f64,
    /// Colors merged into this layer, in order of first appearance
    pub colors: Vec<String>,
    /// Pairwise non-overlapping shapes
    pub shapes: Vec<Shape>,
}

/// Result of the boolean stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSet {
    /// One layer per distinct depth
    pub layers: Vec<Layer>,
    /// Union of every visible region
    pub silhouette: Vec<Shape>,
}

#[derive(Debug, Clone)]
struct Bucket {
    bbox: BoundingBox,
    shapes: Vec<Shape>,
}

/// Union accumulator bucketed by bounding box
///
/// Buckets never overlap each other: adding a shape merges it with every
/// bucket its box touches.
#[derive(Debug, Clone)]
pub struct SpatialClipping {
    buckets: Vec<Bucket>,
    grid: ClipGrid,
}

impl SpatialClipping {
    /// Create an empty accumulator working on `grid`
    pub fn new(grid: ClipGrid) -> Self {
        Self {
            buckets: Vec::new(),
            grid,
        }
    }

    /// True if nothing has been added
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Union shapes into the accumulated region
    pub fn add(&mut self, shapes: &[Shape]) -> Result<(), ClippingError> {
        for shape in shapes {
            let bbox = shape.bounding_box();
            let (touching, rest): (Vec<Bucket>, Vec<Bucket>) = std::mem::take(&mut self.buckets)
                .into_iter()
                .partition(|b| b.bbox.intersects(&bbox));
            self.buckets = rest;

            if touching.is_empty() {
                self.buckets.push(Bucket {
                    bbox,
                    shapes: vec![shape.clone()],
                });
                continue;
            }

            let mut merged: Vec<Shape> = touching.into_iter().flat_map(|b| b.shapes).collect();
            merged.push(shape.clone());
            let shapes = union_shapes(&merged, self.grid)?;
            self.buckets.push(Bucket {
                bbox: shapes_bounding_box(&shapes),
                shapes,
            });
        }
        Ok(())
    }

    /// Parts of `subject` outside the accumulated region
    pub fn crop(&self, subject: &[Shape]) -> Result<Vec<Shape>, ClippingError> {
        let mut result = subject.to_vec();
        for bucket in &self.buckets {
            if result.is_empty() {
                break;
            }
            let (hit, miss): (Vec<Shape>, Vec<Shape>) = result
                .into_iter()
                .partition(|s| s.bounding_box().intersects(&bucket.bbox));
            result = miss;
            if !hit.is_empty() {
                result.extend(difference_shapes(&hit, &bucket.shapes, self.grid)?);
            }
        }
        Ok(result)
    }

    /// Accumulated shapes
    pub fn shapes(&self) -> Vec<Shape> {
        self.buckets
            .iter()
            .flat_map(|b| b.shapes.iter().cloned())
            .collect()
    }

    /// Consume the accumulator, returning its shapes
    pub fn into_shapes(self) -> Vec<Shape> {
        self.buckets.into_iter().flat_map(|b| b.shapes).collect()
    }
}

/// Visible region of one color
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLayer {
    /// Lowercase color
    pub color: String,
    /// Depth of the color
    pub depth: f64,
    /// Visible shapes
    pub shapes: Vec<Shape>,
}

/// Per-color visible regions plus the silhouette
#[derive(Debug, Clone, PartialEq)]
pub struct Visibility {
    /// One entry per color, ordered by the color's first (lowest) paint item
    pub colors: Vec<ColorLayer>,
    /// Union of all visible regions
    pub silhouette: Vec<Shape>,
}

/// Clip paint items by what lies above them
///
/// On failure returns the paint index being processed with the backend error.
pub fn clip_by_visibility(
    items: &[PaintItem],
    grid: ClipGrid,
) -> Result<Visibility, (usize, ClippingError)> {
    // (color, depth, covered), in order of first appearance from the bottom
    let mut covered: Vec<(String, f64, SpatialClipping)> = Vec::new();
    for item in items {
        if !covered.iter().any(|(c, _, _)| *c == item.color) {
            covered.push((item.color.clone(), item.depth, SpatialClipping::new(grid)));
        }
    }

    let mut silhouette = SpatialClipping::new(grid);
    for (index, item) in items.iter().enumerate().rev() {
        let mut visible = item.shapes.clone();
        for (color, _, region) in &covered {
            if *color == item.color || visible.is_empty() {
                continue;
            }
            visible = region.crop(&visible).map_err(|e| (index, e))?;
        }
        if visible.is_empty() {
            log::debug!("Paint item {} ({}) is fully hidden", index, item.color);
            continue;
        }
        if let Some((_, _, region)) = covered.iter_mut().find(|(c, _, _)| *c == item.color) {
            region.add(&visible).map_err(|e| (index, e))?;
        }
        silhouette.add(&visible).map_err(|e| (index, e))?;
    }

    let colors = covered
        .into_iter()
        .filter(|(_, _, region)| !region.is_empty())
        .map(|(color, depth, region)| ColorLayer {
            color,
            depth,
            shapes: region.into_shapes(),
        })
        .collect();

    Ok(Visibility {
        colors,
        silhouette: silhouette.into_shapes(),
    })
}

/// Merge color layers that share a depth
///
/// Layers come out in order of their first color. On failure returns the
/// index of the layer being merged.
pub fn merge_same_depth(
    colors: Vec<ColorLayer>,
    grid: ClipGrid,
) -> Result<Vec<Layer>, (usize, ClippingError)> {
    let mut layers: Vec<Layer> = Vec::new();
    for color in colors {
        match layers
            .iter_mut()
            .position(|l| l.depth.to_bits() == color.depth.to_bits())
        {
            Some(i) => {
                let layer = &mut layers[i];
                layer.colors.push(color.color);
                layer.shapes.extend(color.shapes);
            }
            None => layers.push(Layer {
                depth: color.depth,
                colors: vec![color.color],
                shapes: color.shapes,
            }),
        }
    }

    for (i, layer) in layers.iter_mut().enumerate() {
        if layer.colors.len() > 1 {
            layer.shapes = union_shapes(&layer.shapes, grid).map_err(|e| (i, e))?;
        }
    }
    Ok(layers)
}

/// Clip by visibility, then merge by depth
pub fn build_layer_set(
    items: &[PaintItem],
    grid: ClipGrid,
) -> Result<LayerSet, (usize, ClippingError)> {
    let visibility = clip_by_visibility(items, grid)?;
    let layers = merge_same_depth(visibility.colors, grid)?;
    Ok(LayerSet {
        layers,
        silhouette: visibility.silhouette,
    })
}
