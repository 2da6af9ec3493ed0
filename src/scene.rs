//! Scene normalisation
//!
//! Between nesting and the boolean stage the paint items are brought into
//! model space: an optional base plate is slid under the drawing, the whole
//! scene is centred on the origin and scaled to the requested width, nearby
//! vertices are snapped together, and coordinates are truncated to the grid
//! the booleans run on.

use crate::config::{BASE_KEY, BasePlateShape, MeshOptions};
use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Point2, Ring, Shape, shapes_bounding_box};
use crate::progress::Stage;
use crate::reconcile::{snap_vertices, truncate_shapes};
use crate::visibility::PaintItem;
use std::f64::consts::TAU;

/// Corner count of the circular base plate
pub const CIRCLE_SEGMENTS: usize = 128;

/// Bounding box of every shape of every item
pub fn scene_bounds(items: &[PaintItem]) -> BoundingBox {
    items
        .iter()
        .map(|item| shapes_bounding_box(&item.shapes))
        .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
}

fn plate_outline(shape: BasePlateShape, frame: &BoundingBox, buffer: f64) -> Result<Option<Ring>> {
    let ring = match shape {
        BasePlateShape::None => return Ok(None),
        BasePlateShape::Rectangular => {
            let b = frame.expanded(buffer);
            Ring::rectangle(b.min_x, b.min_y, b.max_x, b.max_y)
        }
        BasePlateShape::Squared => {
            let c = frame.center();
            let half = frame.width().max(frame.height()) / 2.0 + buffer;
            Ring::rectangle(c.x - half, c.y - half, c.x + half, c.y + half)
        }
        BasePlateShape::Circular => {
            let c = frame.center();
            let radius = (frame.width() / 2.0 + buffer).hypot(frame.height() / 2.0 + buffer);
            Ring::new(
                (0..CIRCLE_SEGMENTS)
                    .map(|i| {
                        let angle = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                        Point2::new(c.x + radius * angle.cos(), c.y + radius * angle.sin())
                    })
                    .collect(),
            )
        }
    };
    ring.map(Some)
        .map_err(|e| Error::geometry(Stage::Forest, 0, format!("base plate: {}", e)))
}

/// Put a base plate at the bottom of the paint order
///
/// The plate frames `canvas` unless it is absent or
/// `ignore_document_margins` is set, in which case it frames the drawing.
/// It is grown by `base_buffer / object_width` of the frame width and painted
/// at depth 0 under the color `base`.
pub fn add_base_plate(
    items: &mut Vec<PaintItem>,
    canvas: Option<BoundingBox>,
    options: &MeshOptions,
) -> Result<()> {
    if options.base_plate_shape == BasePlateShape::None {
        return Ok(());
    }

    let frame = match canvas {
        Some(c) if !options.ignore_document_margins && !c.is_empty() => c,
        _ => scene_bounds(items),
    };
    if frame.is_empty() {
        return Err(Error::EmptyInput("no geometry to size the base plate".to_string()));
    }

    let buffer = options.base_buffer / options.object_width * frame.width();
    if let Some(ring) = plate_outline(options.base_plate_shape, &frame, buffer)? {
        log::debug!(
            "Adding {:?} base plate with {} corners",
            options.base_plate_shape,
            ring.len()
        );
        items.insert(
            0,
            PaintItem::new(BASE_KEY, 0.0, vec![Shape::new(ring, Vec::new())]),
        );
    }
    Ok(())
}

/// Centre the scene on the origin and scale it to `target_width`
pub fn rescale_and_center(items: &mut [PaintItem], target_width: f64) -> Result<()> {
    let bounds = scene_bounds(items);
    if bounds.is_empty() || bounds.width() <= 0.0 {
        return Err(Error::geometry(
            Stage::Forest,
            0,
            "drawing has zero width and cannot be scaled",
        ));
    }

    let center = bounds.center();
    let scale = target_width / bounds.width();
    let mut index = 0;
    for item in items.iter_mut() {
        for shape in item.shapes.iter_mut() {
            *shape = shape
                .map_rings(|ring| {
                    ring.map_points(|p| {
                        Point2::new((p.x - center.x) * scale, (p.y - center.y) * scale)
                    })
                })
                .map_err(|e| Error::geometry(Stage::Forest, index, e.to_string()))?;
            index += 1;
        }
    }
    Ok(())
}

/// Snap vertices of different shapes closer than `merge_distance`
///
/// Runs over every shape of every item in paint order, so edges of
/// neighbouring items that end up coincident are merged by the booleans.
pub fn snap_items(items: &mut [PaintItem], merge_distance: f64) -> Result<()> {
    if merge_distance <= 0.0 {
        return Ok(());
    }
    let shapes: Vec<Shape> = items.iter().flat_map(|i| i.shapes.iter().cloned()).collect();
    let snapped = snap_vertices(&shapes, merge_distance)
        .map_err(|e| Error::geometry(Stage::Forest, e.shape, e.source.to_string()))?;

    let mut rest = snapped.into_iter();
    for item in items.iter_mut() {
        let count = item.shapes.len();
        item.shapes = rest.by_ref().take(count).collect();
    }
    Ok(())
}

/// Truncate every coordinate to `precision` decimals
///
/// A ring that collapses is fatal and reported with its scene-wide shape
/// index.
pub fn apply_precision(items: &mut [PaintItem], precision: u32) -> Result<()> {
    let mut offset = 0;
    for item in items.iter_mut() {
        item.shapes = truncate_shapes(&item.shapes, precision).map_err(|e| {
            Error::geometry(Stage::Forest, offset + e.shape, e.source.to_string())
        })?;
        offset += item.shapes.len();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::total_area;

    fn square_item(color: &str, size: f64) -> PaintItem {
        PaintItem::new(
            color,
            2.0,
            vec![Shape::rectangle(0.0, 0.0, size, size).expect("Failed to build shape")],
        )
    }

    #[test]
    fn test_no_plate_by_default() {
        let mut items = vec![square_item("#000000", 10.0)];
        add_base_plate(&mut items, None, &MeshOptions::default()).expect("Failed to add plate");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_rectangular_plate_from_canvas() {
        let mut items = vec![square_item("#000000", 10.0)];
        let options = MeshOptions::default()
            .with_base_plate(BasePlateShape::Rectangular)
            .with_base_buffer(10.0);
        let canvas = BoundingBox::new(0.0, 0.0, 20.0, 10.0);
        add_base_plate(&mut items, Some(canvas), &options).expect("Failed to add plate");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].color, BASE_KEY);
        assert_eq!(items[0].depth, 0.0);
        // buffer = 10 / 100 * 20 = 2 on every side
        let b = shapes_bounding_box(&items[0].shapes);
        assert_eq!(b, BoundingBox::new(-2.0, -2.0, 22.0, 12.0));
    }

    #[test]
    fn test_ignore_document_margins_uses_drawing() {
        let mut items = vec![square_item("#000000", 10.0)];
        let options = MeshOptions::default()
            .with_base_plate(BasePlateShape::Squared)
            .with_ignore_document_margins(true);
        let canvas = BoundingBox::new(-50.0, -50.0, 50.0, 50.0);
        add_base_plate(&mut items, Some(canvas), &options).expect("Failed to add plate");
        let b = shapes_bounding_box(&items[0].shapes);
        assert_eq!(b, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_circular_plate_passes_through_corners() {
        let mut items = vec![square_item("#000000", 10.0)];
        let options = MeshOptions::default().with_base_plate(BasePlateShape::Circular);
        add_base_plate(&mut items, None, &options).expect("Failed to add plate");

        let ring = items[0].shapes[0].contour();
        assert_eq!(ring.len(), CIRCLE_SEGMENTS);
        let radius = 50.0_f64.sqrt();
        for p in ring.points() {
            assert!((p.distance(&Point2::new(5.0, 5.0)) - radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_circular_plate_passes_through_buffered_corners() {
        let mut items = vec![PaintItem::new(
            "#000000",
            2.0,
            vec![Shape::rectangle(0.0, 0.0, 20.0, 10.0).expect("Failed to build shape")],
        )];
        // buffer = 10 / 100 * 20 = 2
        let options = MeshOptions::default()
            .with_base_plate(BasePlateShape::Circular)
            .with_base_buffer(10.0);
        add_base_plate(&mut items, None, &options).expect("Failed to add plate");

        // Through the corners of the box grown to [-2, 22] x [-2, 12]
        let radius = 12.0_f64.hypot(7.0);
        for p in items[0].shapes[0].contour().points() {
            assert!((p.distance(&Point2::new(10.0, 5.0)) - radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rescale_and_center() {
        let mut items = vec![square_item("#000000", 10.0)];
        rescale_and_center(&mut items, 50.0).expect("Failed to rescale");
        let b = scene_bounds(&items);
        assert_eq!(b, BoundingBox::new(-25.0, -25.0, 25.0, 25.0));
        assert!((total_area(&items[0].shapes) - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_empty_scene_fails() {
        let mut items: Vec<PaintItem> = Vec::new();
        let err = rescale_and_center(&mut items, 50.0).unwrap_err();
        assert_eq!(err.code(), "E2001");
    }

    #[test]
    fn test_apply_precision() {
        let mut items = vec![PaintItem::new(
            "#000000",
            1.0,
            vec![Shape::rectangle(0.0, 0.0, 1.23456, 1.0).expect("Failed to build shape")],
        )];
        apply_precision(&mut items, 2).expect("Failed to truncate");
        let b = scene_bounds(&items);
        assert_eq!(b.max_x, 1.23);
    }

    #[test]
    fn test_precision_collapse_reports_shape() {
        let mut items = vec![
            square_item("#000000", 10.0),
            PaintItem::new(
                "#ffffff",
                1.0,
                vec![Shape::rectangle(0.0, 0.0, 0.001, 0.001).expect("Failed to build shape")],
            ),
        ];
        let err = apply_precision(&mut items, 2).unwrap_err();
        match err {
            Error::Geometry { stage, shape, .. } => {
                assert_eq!(stage, Stage::Forest);
                assert_eq!(shape, 1);
            }
            other => panic!("Unexpected error: {}", other),
        }
    }

    #[test]
    fn test_snap_items_joins_near_edges() {
        let mut items = vec![
            PaintItem::new(
                "#ff0000",
                2.0,
                vec![Shape::rectangle(0.0, 0.0, 10.0, 10.0).expect("Failed to build shape")],
            ),
            PaintItem::new(
                "#0000ff",
                3.0,
                vec![Shape::rectangle(10.05, 0.0, 20.0, 10.0).expect("Failed to build shape")],
            ),
        ];
        snap_items(&mut items, 0.5).expect("Failed to snap");
        assert_eq!(items[0].shapes.len(), 1);
        assert_eq!(items[1].shapes.len(), 1);
        let left = shapes_bounding_box(&items[0].shapes);
        let right = shapes_bounding_box(&items[1].shapes);
        assert_eq!(left.max_x, right.min_x);
        assert!((left.max_x - 10.025).abs() < 1e-9);
    }

    #[test]
    fn test_snap_items_disabled_at_zero() {
        let mut items = vec![square_item("#000000", 10.0), square_item("#ffffff", 10.0)];
        let before = items.clone();
        snap_items(&mut items, 0.0).expect("Failed to snap");
        assert_eq!(items, before);
    }
}
