//! Run classification: split the medial path into edge-adjacent and
//! interior runs with a hysteresis band.
//!
//! A vertex becomes interior once its boundary distance first exceeds
//! the distance threshold; an interior run continues until the distance
//! drops below `threshold - allowable_variance`. The band prevents
//! rapid flicker when the centerline hovers near the threshold.
//! Comparisons are strict on both edges, so a distance sitting exactly
//! on a band edge never changes the current classification.
//!
//! Interior runs too short to fit a spline are demoted to edge-adjacent
//! and merged with their neighbors. The output runs partition the path:
//! the first starts at vertex 0, the last ends at the final vertex, and
//! consecutive runs share exactly one boundary vertex so the smoother
//! can stitch them seamlessly.

use serde::{Deserialize, Serialize};

use crate::medial::MedialPath;

/// Classification of one run of the medial path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunKind {
    /// Near the boundary: smoothed by iterative vertex averaging only.
    EdgeAdjacent,
    /// Far from the boundary: eligible for spline smoothing.
    Interior,
}

/// A contiguous classified sub-sequence of the medial path.
///
/// `start..=end` are vertex indices into the path. Adjacent runs share
/// their boundary vertex: `runs[i + 1].start == runs[i].end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Classification of this run.
    pub kind: RunKind,
    /// First vertex index (inclusive).
    pub start: usize,
    /// Last vertex index (inclusive).
    pub end: usize,
}

impl Run {
    /// Number of vertices covered, shared boundary vertices included.
    /// Always at least one.
    #[must_use]
    pub const fn vertex_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// Arc-length span of this run as `(start, end)` positions.
    #[must_use]
    pub fn arc_span(&self, path: &MedialPath) -> (f64, f64) {
        let vertices = path.vertices();
        (vertices[self.start].arc_pos, vertices[self.end].arc_pos)
    }
}

/// Partition the path into classified runs.
///
/// `min_interior_len` is the smallest vertex count an interior run may
/// have (the spline's minimum control-point requirement, typically
/// `spline_degree + 2`); shorter interior runs are reclassified as
/// edge-adjacent. Returns an empty vec for paths with fewer than two
/// vertices.
#[must_use]
pub fn classify(
    path: &MedialPath,
    distance_threshold: f64,
    allowable_variance: f64,
    min_interior_len: usize,
) -> Vec<Run> {
    let vertices = path.vertices();
    if vertices.len() < 2 {
        return Vec::new();
    }

    // Per-vertex hysteresis walk.
    let exit_threshold = distance_threshold - allowable_variance;
    let mut kind = RunKind::EdgeAdjacent;
    let kinds: Vec<RunKind> = vertices
        .iter()
        .map(|v| {
            match kind {
                RunKind::EdgeAdjacent if v.boundary_dist > distance_threshold => {
                    kind = RunKind::Interior;
                }
                RunKind::Interior if v.boundary_dist < exit_threshold => {
                    kind = RunKind::EdgeAdjacent;
                }
                RunKind::EdgeAdjacent | RunKind::Interior => {}
            }
            kind
        })
        .collect();

    // Group equal-kind blocks into runs that share boundary vertices.
    let mut runs: Vec<Run> = Vec::new();
    let mut block_start = 0;
    for i in 1..=kinds.len() {
        if i < kinds.len() && kinds[i] == kinds[block_start] {
            continue;
        }
        let start = if block_start == 0 { 0 } else { block_start - 1 };
        runs.push(Run {
            kind: kinds[block_start],
            start,
            end: i - 1,
        });
        block_start = i;
    }

    // Demote interior runs too short for a spline, then merge.
    for run in &mut runs {
        if run.kind == RunKind::Interior && run.vertex_count() < min_interior_len {
            run.kind = RunKind::EdgeAdjacent;
        }
    }
    merge_adjacent(runs)
}

/// Collapse consecutive runs of equal kind into one.
fn merge_adjacent(runs: Vec<Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.kind == run.kind => last.end = run.end,
            _ => merged.push(run),
        }
    }
    merged
}
