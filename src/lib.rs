//! # relief-mesh
//!
//! Turns a colored 2D vector drawing into a solid, 3D-printable triangle
//! mesh. Every color becomes a slab at its own height, regions hidden under
//! later paint are cropped away, and an optional base plate goes underneath.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - SVG path data with lines, quadratic and cubic curves and arcs
//! - Stroke outlines with miter, round and bevel joins
//! - Robust polygon booleans for visibility clipping
//! - Triangulation repair so neighbouring regions share exact edges
//! - Edge-manifold output, checked rather than assumed
//! - STL export
//!
//! ## Example
//!
//! ```
//! use relief_mesh::{MeshOptions, VectorPath, build_mesh};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = vec![VectorPath::from_path_data("M0 0 H10 V10 H0 Z").with_fill("#000000")];
//! let options = MeshOptions::default().with_type_depth("#000000", 2.0);
//!
//! let build = build_mesh(&paths, None, &options)?;
//! assert!(build.is_manifold());
//! assert_eq!(build.mesh.triangles.len(), 12);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod discretize;
pub mod error;
pub mod export;
pub mod extrude;
pub mod forest;
pub mod geometry;
pub mod mesh;
pub mod mesh_ops;
pub mod palette;
pub mod pipeline;
pub mod polygon_clipping;
pub mod polygon_triangulation;
pub mod progress;
pub mod reconcile;
pub mod scene;
pub mod spatial_index;
pub mod svg;
pub mod visibility;

pub use config::{BasePlateShape, Fidelity, MeshOptions, SelfIntersectionPolicy, StrokePolicy};
pub use discretize::{LineCap, LineJoin, Outline, StrokeStyle, VectorPath};
pub use error::{Error, Result};
pub use geometry::{BoundingBox, Point2, Ring, Shape};
pub use mesh::{Mesh, Triangle, Vertex};
pub use pipeline::{LayerSummary, MeshBuild, build_mesh, build_mesh_with_progress, spawn};
pub use progress::{NoProgress, ProgressSink, Stage};
pub use svg::{SvgDocument, parse_svg, parse_svg_str};

impl SvgDocument {
    /// Build a mesh from the document's paths and canvas
    ///
    /// # Example
    ///
    /// ```
    /// use relief_mesh::{MeshOptions, parse_svg_str};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let doc = parse_svg_str(
    ///     r##"<svg viewBox="0 0 10 10"><path d="M0 0 H10 V10 H0 Z" fill="#FF0000"/></svg>"##,
    /// )?;
    /// let options = MeshOptions::default().with_type_depth("#ff0000", 1.5);
    /// let build = doc.build_mesh(&options)?;
    /// assert!(build.is_manifold());
    /// # Ok(())
    /// # }
    /// ```
    pub fn build_mesh(&self, options: &MeshOptions) -> Result<MeshBuild> {
        pipeline::build_mesh(&self.paths, self.canvas, options)
    }

    /// Default depth table for the document's colors
    pub fn default_type_depths(&self) -> std::collections::BTreeMap<String, f64> {
        palette::default_type_depths(&self.paths)
    }
}
