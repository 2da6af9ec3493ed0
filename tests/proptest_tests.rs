//! Property-based tests for relief-mesh
//!
//! These tests use proptest to generate random drawings and verify the
//! geometric invariants of each stage hold across a wide range of inputs.

use proptest::prelude::*;
use relief_mesh::forest::split_into_shapes;
use relief_mesh::geometry::{Ring, Shape, Winding, total_area, truncate};
use relief_mesh::mesh::{Mesh, Triangle, Vertex};
use relief_mesh::polygon_clipping::{ClipGrid, intersect_shapes};
use relief_mesh::visibility::{PaintItem, build_layer_set};

// ============================================================================
// Generators
// ============================================================================

/// Nested concentric squares: one group per entry, `levels` rings deep
fn nested_groups_strategy() -> impl Strategy<Value = Vec<(usize, bool)>> {
    // (levels, clockwise input)
    prop::collection::vec((1usize..6, any::<bool>()), 1..6)
}

fn nested_rings(groups: &[(usize, bool)]) -> Vec<Ring> {
    let mut rings = Vec::new();
    for (g, &(levels, clockwise)) in groups.iter().enumerate() {
        // Groups sit 1000 apart so they never nest into each other
        let cx = g as f64 * 1000.0;
        for level in 0..levels {
            let half = 100.0 - level as f64 * 15.0;
            let ring = Ring::rectangle(cx - half, -half, cx + half, half)
                .expect("Failed to build rectangle");
            rings.push(if clockwise { ring.reversed() } else { ring });
        }
    }
    rings
}

/// Integer rectangle with positive extent
fn rect_strategy() -> impl Strategy<Value = (i32, i32, i32, i32)> {
    (0i32..40, 0i32..40, 1i32..20, 1i32..20).prop_map(|(x, y, w, h)| (x, y, x + w, y + h))
}

/// Paint items over three colors with distinct depths
fn paint_items_strategy() -> impl Strategy<Value = Vec<PaintItem>> {
    prop::collection::vec((0usize..3, rect_strategy()), 1..8).prop_map(|items| {
        items
            .into_iter()
            .map(|(color, (x0, y0, x1, y1))| {
                let shape = Shape::rectangle(x0 as f64, y0 as f64, x1 as f64, y1 as f64)
                    .expect("Failed to build rectangle");
                PaintItem::new(
                    ["#ff0000", "#00ff00", "#0000ff"][color],
                    1.0 + color as f64,
                    vec![shape],
                )
            })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn test_flattened_shapes_are_wound(groups in nested_groups_strategy()) {
        let shapes = split_into_shapes(nested_rings(&groups));

        // Even levels are contours, odd levels their holes
        let expected: usize = groups.iter().map(|(levels, _)| levels.div_ceil(2)).sum();
        prop_assert_eq!(shapes.len(), expected);
        for shape in &shapes {
            prop_assert_eq!(shape.contour().winding(), Winding::CounterClockwise);
            prop_assert!(shape.holes().len() <= 1);
            for hole in shape.holes() {
                prop_assert_eq!(hole.winding(), Winding::Clockwise);
            }
        }
    }

    #[test]
    fn test_nesting_is_idempotent(groups in nested_groups_strategy()) {
        let shapes = split_into_shapes(nested_rings(&groups));
        let rings: Vec<Ring> = shapes.iter().flat_map(|s| s.rings().cloned()).collect();
        let again = split_into_shapes(rings);

        prop_assert_eq!(again.len(), shapes.len());
        prop_assert!((total_area(&again) - total_area(&shapes)).abs() < 1e-9);
    }

    #[test]
    fn test_truncation_is_idempotent(value in -1.0e6f64..1.0e6, precision in 0u32..=6) {
        let once = truncate(value, precision);
        prop_assert_eq!(truncate(once, precision), once);
        prop_assert!((once - value).abs() <= 0.5 * 10f64.powi(-(precision as i32)) + 1e-9);
    }

    #[test]
    fn test_invalid_edges_of_closed_fans(n in 3usize..12) {
        // A double-sided fan is closed; removing one face opens three edges
        let mut mesh = Mesh::new();
        let apex = mesh.add_vertex(Vertex::new(0.0, 0.0, 1.0));
        let base = mesh.add_vertex(Vertex::new(0.0, 0.0, -1.0));
        let ring: Vec<usize> = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                mesh.add_vertex(Vertex::new(a.cos(), a.sin(), 0.0))
            })
            .collect();
        for i in 0..n {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            mesh.add_triangle(a, b, apex);
            mesh.add_triangle(b, a, base);
        }
        prop_assert!(mesh.is_manifold());

        let removed: Triangle = mesh.triangles.remove(0);
        let invalid = mesh.invalid_edges();
        prop_assert_eq!(invalid.len(), 3);
        for (a, b) in removed.edges() {
            prop_assert!(invalid.contains(&(a.min(b), a.max(b))));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_visibility_conserves_area(items in paint_items_strategy()) {
        let layer_set = build_layer_set(&items, ClipGrid::default()).expect("Failed to clip");

        let silhouette = total_area(&layer_set.silhouette);
        let layered: f64 = layer_set.layers.iter().map(|l| total_area(&l.shapes)).sum();
        prop_assert!(
            (silhouette - layered).abs() < 1e-6,
            "silhouette {} != layers {}", silhouette, layered
        );

        for (i, a) in layer_set.layers.iter().enumerate() {
            for b in &layer_set.layers[i + 1..] {
                let overlap = intersect_shapes(&a.shapes, &b.shapes, ClipGrid::default())
                    .expect("Failed to intersect");
                prop_assert!(total_area(&overlap) < 1e-6);
            }
        }
    }
}
