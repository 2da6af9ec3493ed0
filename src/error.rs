//! Error types for the relief pipeline
//!
//! Every fatal condition the pipeline can hit maps onto one [`Error`] variant
//! carrying an error code, so hosts can categorize failures without matching
//! on message text. Repair passes that cannot fix a triangulation are *not*
//! errors: they are logged and counted, and the final manifold check reports
//! what is left.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: Input errors (path data, strokes, rings, SVG documents)
//! - **E2xxx**: Geometry errors raised by a pipeline stage
//! - **E3xxx**: Configuration errors
//! - **E4xxx**: Output errors
//!
//! ## Common Error Codes
//!
//! - `E1001`: Malformed path data
//! - `E1002`: Stroke with a non-positive width
//! - `E1003`: Nothing to build
//! - `E1004`: Self-intersecting or degenerate ring
//! - `E1005`: Unreadable SVG document
//! - `E2001`: Geometry degeneracy inside a stage
//! - `E3001`: Unknown base-plate shape
//! - `E3002`: Color without a configured depth
//! - `E3003`: Invalid option value
//! - `E4001`: I/O error while exporting

use std::io;
use thiserror::Error;

use crate::geometry::RingError;
use crate::polygon_clipping::ClippingError;
use crate::polygon_triangulation::TriangulationError;
use crate::progress::Stage;

/// Result type for relief pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a drawing into a mesh
#[derive(Error, Debug)]
pub enum Error {
    /// Path data could not be parsed
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - Unknown path command letters
    /// - Missing coordinates after a command
    /// - Non-numeric tokens in the `d` attribute
    #[error("[E1001] Invalid path data in path {path}: {message}")]
    InvalidPathData {
        /// Index of the offending path in paint order
        path: usize,
        /// Parser message
        message: String,
    },

    /// A stroke was requested with a width that cannot produce an outline
    ///
    /// **Error Code**: E1002
    ///
    /// **Suggestions**:
    /// - Remove the stroke, or give it a positive `stroke-width`
    #[error("[E1002] Invalid stroke on path {path}: width {width} must be positive and finite")]
    InvalidStroke {
        /// Index of the offending path in paint order
        path: usize,
        /// The rejected width
        width: f64,
    },

    /// There is nothing to build
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - No paths were supplied
    /// - Every path was open and unstroked, so no closed area remained
    #[error("[E1003] Empty input: {0}")]
    EmptyInput(String),

    /// A closed ring is not a simple polygon
    ///
    /// **Error Code**: E1004
    ///
    /// **Common Causes**:
    /// - Figure-eight outlines that revisit a vertex
    /// - Outlines whose edges cross each other
    /// - Rings with fewer than three distinct points
    ///
    /// **Suggestions**:
    /// - Clean the artwork, or build with
    ///   [`SelfIntersectionPolicy::Resolve`](crate::config::SelfIntersectionPolicy)
    #[error("[E1004] Invalid ring in path {path}: {source}")]
    InvalidRing {
        /// Index of the offending path in paint order
        path: usize,
        /// What is wrong with the ring
        #[source]
        source: RingError,
    },

    /// The SVG document could not be read
    ///
    /// **Error Code**: E1005
    #[error("[E1005] SVG parsing error: {0}")]
    Svg(#[from] quick_xml::Error),

    /// A pipeline stage produced unusable geometry
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - A ring collapsed below three points after snapping or truncation
    /// - The polygon backend rejected its input
    /// - The drawing has zero width and cannot be rescaled
    ///
    /// **Suggestions**:
    /// - Lower `mergeDistance`, or raise `precision`
    #[error("[E2001] Geometry error in stage {stage} (shape {shape}): {message}")]
    Geometry {
        /// The stage that failed
        stage: Stage,
        /// Index of the shape being processed when the stage failed
        shape: usize,
        /// Description of the degeneracy
        message: String,
    },

    /// Base-plate shape name not recognised
    ///
    /// **Error Code**: E3001
    ///
    /// **Suggestions**:
    /// - Use one of `none`, `rectangular`, `squared`, `circular`
    #[error("[E3001] Unknown base plate shape: {0}")]
    UnknownBasePlateShape(String),

    /// A color used by the drawing has no depth
    ///
    /// **Error Code**: E3002
    ///
    /// **Suggestions**:
    /// - Add the color to `typeDepths`
    /// - The reserved key `base` sets the floor thickness and is always required
    #[error("[E3002] No depth configured for color {color}")]
    MissingDepth {
        /// The color (lowercased) that has no entry
        color: String,
    },

    /// An option has an unusable value
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Invalid option: {0}")]
    InvalidOption(String),

    /// I/O error while writing output
    ///
    /// **Error Code**: E4001
    #[error("[E4001] I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a geometry error for a stage and shape
    pub fn geometry(stage: Stage, shape: usize, message: impl Into<String>) -> Self {
        Error::Geometry {
            stage,
            shape,
            message: message.into(),
        }
    }

    /// Create an invalid-option error
    pub fn invalid_option(msg: impl Into<String>) -> Self {
        Error::InvalidOption(msg.into())
    }

    /// Numeric code of the error (`"E1004"` and so on)
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPathData { .. } => "E1001",
            Error::InvalidStroke { .. } => "E1002",
            Error::EmptyInput(_) => "E1003",
            Error::InvalidRing { .. } => "E1004",
            Error::Svg(_) => "E1005",
            Error::Geometry { .. } => "E2001",
            Error::UnknownBasePlateShape(_) => "E3001",
            Error::MissingDepth { .. } => "E3002",
            Error::InvalidOption(_) => "E3003",
            Error::Io(_) => "E4001",
        }
    }

    /// True for the configuration family (E3xxx)
    pub fn is_config_error(&self) -> bool {
        self.code().starts_with("E3")
    }

    /// True for the input family (E1xxx)
    pub fn is_input_error(&self) -> bool {
        self.code().starts_with("E1")
    }

    /// Wrap a clipping backend failure as a geometry error
    pub(crate) fn from_clipping(stage: Stage, shape: usize, err: ClippingError) -> Self {
        Error::geometry(stage, shape, err.to_string())
    }

    /// Wrap a triangulation backend failure as a geometry error
    pub(crate) fn from_triangulation(shape: usize, err: TriangulationError) -> Self {
        Error::geometry(Stage::Triangulate, shape, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let err = Error::MissingDepth {
            color: "#ff0000".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("[E3002]"), "Missing code in: {}", msg);
        assert!(msg.contains("#ff0000"));
        assert_eq!(err.code(), "E3002");
        assert!(err.is_config_error());
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_geometry_error_names_stage_and_shape() {
        let err = Error::geometry(Stage::Reconcile, 7, "ring collapsed");
        let msg = err.to_string();
        assert!(msg.contains("[E2001]"));
        assert!(msg.contains("reconcile"), "Stage missing in: {}", msg);
        assert!(msg.contains("shape 7"));
    }

    #[test]
    fn test_ring_error_source_is_kept() {
        use std::error::Error as _;

        let err = Error::InvalidRing {
            path: 2,
            source: RingError::TooFewPoints(2),
        };
        assert_eq!(err.code(), "E1004");
        assert!(err.source().is_some());
        assert!(err.is_input_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        let err: Error = io_err.into();
        assert_eq!(err.code(), "E4001");
        assert!(err.to_string().contains("closed"));
    }
}
