//! Debug artifacts: intermediate pipeline geometry captured on request.
//!
//! When [`crate::PipelineConfig::debug`] is set, the pipeline snapshots
//! the raw skeleton and the selected medial path before smoothing so the
//! stages can be inspected or rendered next to the final centerline.

use serde::{Deserialize, Serialize};

use crate::medial::MedialPath;
use crate::skeleton::SkeletonGraph;
use crate::types::{Point, Polyline};

/// Intermediate geometry from one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugArtifacts {
    /// Every edge of the thinned skeleton graph, spurs and hole cycles
    /// included.
    pub skeleton_edges: Vec<(Point, Point)>,
    /// The selected medial path before smoothing, trimming, and
    /// simplification.
    pub medial_path: Polyline,
}

impl DebugArtifacts {
    /// Snapshot the skeleton and medial path.
    #[must_use]
    pub fn capture(skeleton: &SkeletonGraph, path: &MedialPath) -> Self {
        Self {
            skeleton_edges: skeleton.segments(),
            medial_path: path.polyline(),
        }
    }
}
