//! Per-run smoothing and stitching.
//!
//! Each classified run is smoothed with a method matched to its kind:
//! edge-adjacent runs get iterative neighbor averaging (gentle, keeps
//! the curve hugging narrow passages), interior runs get a least-squares
//! B-spline fit (stronger, irons out raster staircasing in wide areas).
//! A failed spline fit demotes its run to averaging instead of failing
//! the polygon; the demotion count is reported to the caller.
//!
//! Run endpoints are anchored by both methods, so stitching the smoothed
//! runs back together only has to drop the duplicated shared vertex at
//! each run boundary.

use crate::classify::{Run, RunKind};
use crate::medial::MedialPath;
use crate::spline::BSpline;
use crate::types::{Point, Polyline};

/// A smoothed centerline plus degradation bookkeeping.
#[derive(Debug, Clone)]
pub struct SmoothOutcome {
    /// The stitched smoothed curve.
    pub curve: Polyline,
    /// Interior runs whose spline fit failed and fell back to averaging.
    pub spline_demotions: usize,
}

/// Smooth the medial path run by run and stitch the results.
///
/// `runs` must be the partition produced by [`crate::classify::classify`]
/// for this path. Paths with fewer than three vertices are returned
/// unchanged.
#[must_use]
pub fn smooth(
    path: &MedialPath,
    runs: &[Run],
    spline_degree: usize,
    smoothing_iterations: u32,
) -> SmoothOutcome {
    if path.len() < 3 || runs.is_empty() {
        return SmoothOutcome {
            curve: path.polyline(),
            spline_demotions: 0,
        };
    }

    let vertices = path.vertices();
    let mut demotions = 0;
    let mut stitched: Vec<Point> = Vec::with_capacity(path.len());

    for run in runs {
        let segment: Vec<Point> = vertices[run.start..=run.end]
            .iter()
            .map(|v| v.point)
            .collect();

        let smoothed = match run.kind {
            RunKind::EdgeAdjacent => average(&segment, smoothing_iterations),
            RunKind::Interior => match BSpline::fit(&segment, spline_degree) {
                Ok(spline) => spline.resample(segment.len()).into_points(),
                Err(_) => {
                    demotions += 1;
                    average(&segment, smoothing_iterations)
                }
            },
        };

        // Runs share their boundary vertex; both methods anchor it, so
        // drop the duplicate when appending.
        let skip = usize::from(!stitched.is_empty());
        stitched.extend(smoothed.into_iter().skip(skip));
    }

    SmoothOutcome {
        curve: Polyline::new(stitched),
        spline_demotions: demotions,
    }
}

/// Iterative three-point neighbor averaging with anchored endpoints.
///
/// Each pass replaces every interior vertex with a 0.25/0.5/0.25 blend
/// of its predecessor, itself, and its successor. The half weight on
/// the center keeps convergence gentle over repeated passes. The
/// endpoints never move.
fn average(points: &[Point], iterations: u32) -> Vec<Point> {
    let mut current = points.to_vec();
    if current.len() < 3 {
        return current;
    }
    for _ in 0..iterations {
        let mut next = current.clone();
        for i in 1..current.len() - 1 {
            let (a, b, c) = (current[i - 1], current[i], current[i + 1]);
            next[i] = Point::new(
                0.25f64.mul_add(a.x + c.x, 0.5 * b.x),
                0.25f64.mul_add(a.y + c.y, 0.5 * b.y),
            );
        }
        current = next;
    }
    current
}
