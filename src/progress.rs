//! Stage progress reporting
//!
//! The pipeline reports each completed [`Stage`] to a [`ProgressSink`], in
//! pipeline order. Any `Fn(Stage)` closure is a sink; [`NoProgress`] discards
//! everything.

use std::fmt;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Path data to polylines and rings
    Discretize,
    /// Ring nesting into shapes, scene normalisation
    Forest,
    /// Visibility clipping and depth merging
    Boolean,
    /// Vertex snapping and shared-edge vertex insertion
    Reconcile,
    /// Triangulation and repair
    Triangulate,
    /// Extrusion, side walls, orientation and manifold check
    Extrude,
}

impl Stage {
    /// Every stage in pipeline order
    pub const ALL: [Stage; 6] = [
        Stage::Discretize,
        Stage::Forest,
        Stage::Boolean,
        Stage::Reconcile,
        Stage::Triangulate,
        Stage::Extrude,
    ];

    /// Lowercase stage name
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Discretize => "discretize",
            Stage::Forest => "forest",
            Stage::Boolean => "boolean",
            Stage::Reconcile => "reconcile",
            Stage::Triangulate => "triangulate",
            Stage::Extrude => "extrude",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver of stage-completion notifications
pub trait ProgressSink {
    /// Called once after `stage` finishes
    fn stage_completed(&self, stage: Stage);
}

impl<F> ProgressSink for F
where
    F: Fn(Stage),
{
    fn stage_completed(&self, stage: Stage) {
        self(stage)
    }
}

/// Sink that ignores all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn stage_completed(&self, _stage: Stage) {}
}
