//! Mesh build pipeline
//!
//! [`build_mesh`] runs the stages in order, each on its own snapshot of the
//! previous stage's output:
//!
//! 1. discretize every path into fill and stroke rings
//! 2. nest rings into shapes, build paint items, add the base plate,
//!    centre, scale, snap near vertices and truncate to the clipping grid
//! 3. clip by visibility and merge layers of equal depth
//! 4. insert shared-edge vertices
//! 5. triangulate and repair
//! 6. extrude, build walls, orient and check the mesh is manifold
//!
//! [`spawn`] runs the same pipeline on a worker thread and streams stage
//! notifications over a channel.

use crate::config::{MeshOptions, StrokePolicy};
use crate::discretize::{DiscretizedPath, VectorPath, discretize_path};
use crate::error::{Error, Result};
use crate::extrude::{Surface, WallReport, extrude, orientation_matrix};
use crate::forest::split_into_shapes;
use crate::geometry::{BoundingBox, Shape};
use crate::mesh::Mesh;
use crate::polygon_clipping::{ClipGrid, union_shapes};
use crate::polygon_triangulation::{RepairReport, Triangulation, triangulate_shapes};
use crate::progress::{ProgressSink, Stage};
use crate::reconcile::insert_edge_vertices;
use crate::scene::{add_base_plate, apply_precision, rescale_and_center, snap_items};
use crate::visibility::{LayerSet, PaintItem, build_layer_set};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// One extruded layer of the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    /// Top height of the layer
    pub depth: f64,
    /// Colors merged into the layer
    pub colors: Vec<String>,
    /// Number of shapes in the layer
    pub shapes: usize,
}

/// Result of a mesh build
#[derive(Debug, Clone)]
pub struct MeshBuild {
    /// The oriented mesh
    pub mesh: Mesh,
    /// Undirected edges not shared by exactly two triangles
    pub invalid_edges: Vec<(usize, usize)>,
    /// What the triangulation repairs did
    pub repairs: RepairReport,
    /// What wall construction did
    pub walls: WallReport,
    /// Layers, in order of first color
    pub layers: Vec<LayerSummary>,
    /// Height of the bottom face
    pub floor: f64,
}

impl MeshBuild {
    /// Every edge is shared by exactly two triangles
    pub fn is_manifold(&self) -> bool {
        self.invalid_edges.is_empty()
    }
}

/// Build a mesh from painted paths
///
/// `paths` are in paint order, bottom first. `canvas` is the declared drawing
/// box, used to size the base plate.
pub fn build_mesh(
    paths: &[VectorPath],
    canvas: Option<BoundingBox>,
    options: &MeshOptions,
) -> Result<MeshBuild> {
    build_mesh_with_progress(paths, canvas, options, &crate::progress::NoProgress)
}

/// Build a mesh, reporting each completed stage to `progress`
pub fn build_mesh_with_progress(
    paths: &[VectorPath],
    canvas: Option<BoundingBox>,
    options: &MeshOptions,
    progress: &dyn ProgressSink,
) -> Result<MeshBuild> {
    if paths.is_empty() {
        return Err(Error::EmptyInput("no paths to build".to_string()));
    }
    options.validate(paths)?;
    let base = options.base_thickness()?;

    log::debug!("Discretizing {} paths", paths.len());
    let discretized = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            discretize_path(
                i,
                path,
                options.fidelity,
                options.self_intersection_policy,
            )
        })
        .collect::<Result<Vec<_>>>()?;
    if discretized
        .iter()
        .all(|d| d.fill.is_empty() && d.stroke.is_empty())
    {
        return Err(Error::EmptyInput(
            "no fillable or strokable geometry".to_string(),
        ));
    }
    progress.stage_completed(Stage::Discretize);

    let mut items = paint_items(paths, discretized, options)?;
    log::debug!("Built {} paint items", items.len());
    add_base_plate(&mut items, canvas, options)?;
    rescale_and_center(&mut items, options.object_width - 2.0 * options.base_buffer)?;
    snap_items(&mut items, options.merge_distance)?;
    let grid = options.clip_grid();
    apply_precision(&mut items, grid.decimals())?;
    progress.stage_completed(Stage::Forest);

    let layer_set = build_layer_set(&items, grid)
        .map_err(|(i, e)| Error::from_clipping(Stage::Boolean, i, e))?;
    log::debug!(
        "Visibility: {} layers, {} silhouette shapes",
        layer_set.layers.len(),
        layer_set.silhouette.len()
    );
    progress.stage_completed(Stage::Boolean);

    let layer_set = reconcile_layers(layer_set, options.edge_epsilon)?;
    progress.stage_completed(Stage::Reconcile);

    let mut repairs = RepairReport::default();
    let mut offset = 0;
    let mut surfaces = Vec::with_capacity(layer_set.layers.len());
    for layer in &layer_set.layers {
        let triangulations = triangulate(&layer.shapes, offset, options.edge_epsilon)?;
        offset += layer.shapes.len();
        for t in &triangulations {
            repairs.merge(&t.report);
        }
        surfaces.push(Surface {
            depth: layer.depth,
            triangulations,
        });
    }
    let floor_triangulations = triangulate(&layer_set.silhouette, offset, options.edge_epsilon)?;
    for t in &floor_triangulations {
        repairs.merge(&t.report);
    }
    if !repairs.is_clean() {
        log::warn!(
            "Triangulation repair left {} orphan vertices and {} missing edges",
            repairs.orphans_unresolved,
            repairs.edges_unresolved
        );
    }
    progress.stage_completed(Stage::Triangulate);

    let floor = layer_set
        .layers
        .iter()
        .map(|l| l.depth)
        .fold(f64::INFINITY, f64::min)
        - base;
    let (mut mesh, walls) = extrude(&surfaces, &floor_triangulations, floor);
    mesh.transform(&orientation_matrix(options.inverted_type));
    let invalid_edges = mesh.invalid_edges();
    if !invalid_edges.is_empty() {
        log::warn!("Mesh has {} non-manifold edges", invalid_edges.len());
    }
    log_summary(&mesh);
    progress.stage_completed(Stage::Extrude);

    Ok(MeshBuild {
        mesh,
        invalid_edges,
        repairs,
        walls,
        layers: layer_set
            .layers
            .iter()
            .map(|l| LayerSummary {
                depth: l.depth,
                colors: l.colors.clone(),
                shapes: l.shapes.len(),
            })
            .collect(),
        floor,
    })
}

/// Turn discretized paths into paint items, bottom first
fn paint_items(
    paths: &[VectorPath],
    discretized: Vec<DiscretizedPath>,
    options: &MeshOptions,
) -> Result<Vec<PaintItem>> {
    let depth_of = |color: &str| {
        options.depth_for(color).ok_or_else(|| Error::MissingDepth {
            color: color.to_ascii_lowercase(),
        })
    };

    let mut items = Vec::new();
    for (index, (path, rings)) in paths.iter().zip(discretized).enumerate() {
        let fill = split_into_shapes(rings.fill);
        let stroke = split_into_shapes(rings.stroke);
        let stroke_color = path.stroke.as_ref().map(|s| s.color.to_ascii_lowercase());

        match options.stroke_policy {
            StrokePolicy::SeparateLayer => {
                if let Some(color) = &path.fill
                    && !fill.is_empty()
                {
                    items.push(PaintItem::new(
                        color.to_ascii_lowercase(),
                        depth_of(color.as_str())?,
                        fill,
                    ));
                }
                if let Some(color) = stroke_color
                    && !stroke.is_empty()
                {
                    let depth = depth_of(color.as_str())?;
                    items.push(PaintItem::new(color, depth, stroke));
                }
            }
            StrokePolicy::MergeWithFill => {
                let Some(color) = path.fill.as_ref().map(|c| c.to_ascii_lowercase()).or(stroke_color)
                else {
                    continue;
                };
                let mut shapes = fill;
                shapes.extend(stroke);
                if shapes.is_empty() {
                    continue;
                }
                let shapes = union_shapes(&shapes, ClipGrid::FINE)
                    .map_err(|e| Error::from_clipping(Stage::Forest, index, e))?;
                let depth = depth_of(color.as_str())?;
                items.push(PaintItem::new(color, depth, shapes));
            }
        }
    }
    Ok(items)
}

/// Insert shared vertices over layers and silhouette
///
/// Vertices are already on the clipping grid, so every edge that touches a
/// vertex of another shape gets split at that exact location.
fn reconcile_layers(layer_set: LayerSet, edge_epsilon: f64) -> Result<LayerSet> {
    let LayerSet { layers, silhouette } = layer_set;
    let counts: Vec<usize> = layers.iter().map(|l| l.shapes.len()).collect();
    let mut shapes: Vec<Shape> = layers.iter().flat_map(|l| l.shapes.iter().cloned()).collect();
    shapes.extend(silhouette);

    let (shapes, inserted) = insert_edge_vertices(&shapes, edge_epsilon)
        .map_err(|e| Error::geometry(Stage::Reconcile, e.shape, e.source.to_string()))?;
    log::debug!("Reconciled {} shapes, {} vertices inserted", shapes.len(), inserted);

    let mut rest = shapes.into_iter();
    let layers = layers
        .into_iter()
        .zip(counts)
        .map(|(mut layer, count)| {
            layer.shapes = rest.by_ref().take(count).collect();
            layer
        })
        .collect();
    Ok(LayerSet {
        layers,
        silhouette: rest.collect(),
    })
}

fn triangulate(shapes: &[Shape], offset: usize, tolerance: f64) -> Result<Vec<Triangulation>> {
    triangulate_shapes(shapes, tolerance).map_err(|(i, e)| Error::from_triangulation(offset + i, e))
}

fn log_summary(mesh: &Mesh) {
    log::info!(
        "Mesh: {} vertices, {} triangles, signed volume {:.3}",
        mesh.vertices.len(),
        mesh.triangles.len(),
        mesh.signed_volume()
    );
    #[cfg(feature = "mesh-ops")]
    if let Some(aabb) = crate::mesh_ops::compute_mesh_aabb(mesh) {
        let size = aabb.size();
        log::info!(
            "Mesh bounds {:.3} x {:.3} x {:.3}, volume {:.3}",
            size.x,
            size.y,
            size.z,
            crate::mesh_ops::compute_mesh_volume(mesh)
        );
    }
}

/// Run [`build_mesh`] on a worker thread
///
/// Stages arrive on the receiver as they complete. There is no cancellation:
/// dropping both handles detaches the worker.
pub fn spawn(
    paths: Vec<VectorPath>,
    canvas: Option<BoundingBox>,
    options: MeshOptions,
) -> (Receiver<Stage>, JoinHandle<Result<MeshBuild>>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        // Nobody listening is fine
        let sink = move |stage: Stage| {
            let _ = tx.send(stage);
        };
        build_mesh_with_progress(&paths, canvas, &options, &sink)
    });
    (rx, handle)
}
