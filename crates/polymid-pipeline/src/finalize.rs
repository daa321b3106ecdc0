//! Post-processing: symmetric arc-length end trim, then max-deviation
//! simplification.
//!
//! Trimming is arc-length based rather than vertex based, so the amount
//! removed is proportional regardless of vertex density. Simplification
//! guarantees the reduced curve deviates from its input by no more than
//! the tolerance at any point and is a fixed point: simplifying its own
//! output again removes nothing further.

use crate::types::{PipelineError, Point, Polyline};

/// Remaining arc length below this fraction of the original is treated
/// as an empty centerline.
const MIN_REMAINING_FRACTION: f64 = 1e-9;

/// Trim then simplify a smoothed centerline.
///
/// `trim_percent` percent of the total arc length is removed from each
/// end; the simplification tolerance is `simplify_factor` scaled by the
/// trimmed curve's bounding extent.
///
/// # Errors
///
/// Returns [`PipelineError::CenterlineTooShort`] when the trim leaves
/// effectively nothing. Callers fall back to the polygon centroid.
pub fn finalize(
    curve: &Polyline,
    trim_percent: u32,
    simplify_factor: f64,
) -> Result<Polyline, PipelineError> {
    let trimmed = trim(curve, trim_percent)?;
    let tolerance = simplify_factor * trimmed.bounding_extent();
    Ok(simplify(&trimmed, tolerance))
}

/// Remove `trim_percent`% of total arc length from each end of the
/// curve, interpolating exact cut points on the segments they fall in.
///
/// # Errors
///
/// Returns [`PipelineError::CenterlineTooShort`] when the curve has
/// fewer than two points or the remaining length is effectively zero
/// (`trim_percent >= 50` always trips this).
pub fn trim(curve: &Polyline, trim_percent: u32) -> Result<Polyline, PipelineError> {
    let points = curve.points();
    if points.len() < 2 {
        return Err(PipelineError::CenterlineTooShort { remaining: 0.0 });
    }

    let total = curve.arc_length();
    let cut = total * f64::from(trim_percent) / 100.0;
    let remaining = 2.0f64.mul_add(-cut, total);
    if remaining <= total * MIN_REMAINING_FRACTION {
        return Err(PipelineError::CenterlineTooShort {
            remaining: remaining.max(0.0),
        });
    }
    if trim_percent == 0 {
        return Ok(curve.clone());
    }

    let start_dist = cut;
    let end_dist = total - cut;

    let mut out = Vec::with_capacity(points.len());
    let mut accumulated = 0.0;
    for window in points.windows(2) {
        let (a, b) = (window[0], window[1]);
        let seg_len = a.distance(b);
        let next = accumulated + seg_len;
        if seg_len > 0.0 {
            if accumulated <= start_dist && next > start_dist {
                out.push(a.lerp(b, (start_dist - accumulated) / seg_len));
            }
            if accumulated < end_dist && next >= end_dist {
                out.push(a.lerp(b, (end_dist - accumulated) / seg_len));
                break;
            }
            if next > start_dist {
                out.push(b);
            }
        }
        accumulated = next;
    }

    Ok(Polyline::new(out))
}

/// Simplify a polyline with the max-deviation (Douglas-Peucker)
/// criterion: every removed point lies within `tolerance` of the
/// simplified curve. The two endpoints are always preserved.
///
/// Polylines with fewer than 3 points, or a non-positive tolerance,
/// are returned unchanged.
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, tolerance: f64) -> Polyline {
    let points = polyline.points();
    if points.len() < 3 || tolerance <= 0.0 {
        return polyline.clone();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    // Explicit stack instead of recursion: centerlines from dense
    // skeleton grids can have thousands of vertices.
    let mut spans = vec![(0usize, points.len() - 1)];
    while let Some((lo, hi)) = spans.pop() {
        if hi <= lo + 1 {
            continue;
        }

        let mut max_deviation = 0.0;
        let mut max_idx = lo;
        for (offset, p) in points[lo + 1..hi].iter().enumerate() {
            let d = deviation_from_segment(*p, points[lo], points[hi]);
            if d > max_deviation {
                max_deviation = d;
                max_idx = lo + 1 + offset;
            }
        }

        if max_deviation > tolerance {
            kept[max_idx] = true;
            spans.push((lo, max_idx));
            spans.push((max_idx, hi));
        }
    }

    let simplified: Vec<Point> = points
        .iter()
        .zip(&kept)
        .filter(|&(_, keep)| *keep)
        .map(|(&p, _)| p)
        .collect();

    Polyline::new(simplified)
}

/// Distance from `p` to the closed segment `a`-`b` (not the infinite
/// line), so the deviation bound holds even past the segment ends.
fn deviation_from_segment(p: Point, a: Point, b: Point) -> f64 {
    let len_sq = a.distance_squared(b);
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq;
    p.distance(a.lerp(b, t.clamp(0.0, 1.0)))
}
