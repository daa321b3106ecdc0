//! Shared types for the polymid centerline pipeline.

use serde::{Deserialize, Serialize};

use crate::diagnostics::DebugArtifacts;

/// A 2D point in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation from `self` toward `other`.
    ///
    /// `t = 0` returns `self`, `t = 1` returns `other`. Values outside
    /// `[0, 1]` extrapolate.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            t.mul_add(other.x - self.x, self.x),
            t.mul_add(other.y - self.y, self.y),
        )
    }
}

/// A sequence of connected points forming an open curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Total arc length: the sum of all segment lengths.
    ///
    /// Zero for polylines with fewer than two points.
    #[must_use]
    pub fn arc_length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// The longer side of the axis-aligned bounding box.
    ///
    /// Used to scale tolerances to the curve's overall size. Zero for
    /// polylines with fewer than two points.
    #[must_use]
    pub fn bounding_extent(&self) -> f64 {
        let Some(&Point { x, y }) = self.0.first() else {
            return 0.0;
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
        for p in &self.0 {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        (max_x - min_x).max(max_y - min_y)
    }
}

/// Configuration for the centerline pipeline.
///
/// All parameters have sensible defaults. Field invariants are checked
/// by [`PipelineConfig::validate`], which every [`crate::process`] call
/// runs before doing any work; invalid values return
/// [`PipelineError::InvalidConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Polygons with area below this threshold skip the pipeline and
    /// emit their centroid directly. Must be non-negative.
    pub min_area: f64,

    /// Boundary distance above which a medial-path vertex becomes
    /// eligible for spline smoothing. Must be non-negative.
    pub distance_threshold: f64,

    /// Width of the hysteresis band below `distance_threshold`. An
    /// interior run only ends once the boundary distance drops below
    /// `distance_threshold - allowable_variance`, preventing rapid
    /// flicker when the centerline hovers near the threshold.
    ///
    /// Must be non-negative and at most `distance_threshold`.
    pub allowable_variance: f64,

    /// Number of neighbor-averaging passes applied to edge-adjacent
    /// runs. Must be in `1..=10`.
    pub smoothing_iterations: u32,

    /// Degree of the parametric B-spline fitted to interior runs.
    /// Must be in `1..=5`.
    pub spline_degree: usize,

    /// Percentage of total arc length trimmed from **each** end of the
    /// smoothed curve. Must be in `0..=99`.
    pub trim_percent: u32,

    /// Simplification tolerance as a fraction of the curve's bounding
    /// extent. Must be in `0.0..=1.0`. Zero disables simplification.
    pub simplify_factor: f64,

    /// Whether to capture the raw skeleton and unsmoothed medial axis
    /// as [`DebugArtifacts`] alongside the result.
    pub debug: bool,

    /// Number of raster cells along the polygon's longest axis when
    /// extracting the skeleton. Higher values resolve finer features
    /// at quadratic cost. Must be at least 16.
    pub working_resolution: u32,

    /// Input ring presimplification tolerance as a fraction of the
    /// polygon's bounding extent, applied before skeleton extraction
    /// to speed it up. Must be in `0.0..1.0`. Zero disables it.
    pub presimplify_fraction: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_area: 0.0,
            distance_threshold: 2.0,
            allowable_variance: 0.5,
            smoothing_iterations: 3,
            spline_degree: 3,
            trim_percent: 5,
            simplify_factor: 0.002,
            debug: false,
            working_resolution: 256,
            presimplify_fraction: 0.0,
        }
    }
}

impl PipelineConfig {
    /// Check all field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "min_area must be finite and non-negative, got {}",
                self.min_area
            )));
        }
        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "distance_threshold must be finite and non-negative, got {}",
                self.distance_threshold
            )));
        }
        if !self.allowable_variance.is_finite()
            || self.allowable_variance < 0.0
            || self.allowable_variance > self.distance_threshold
        {
            return Err(PipelineError::InvalidConfig(format!(
                "allowable_variance must be in [0, distance_threshold], got {}",
                self.allowable_variance
            )));
        }
        if !(1..=10).contains(&self.smoothing_iterations) {
            return Err(PipelineError::InvalidConfig(format!(
                "smoothing_iterations must be in 1..=10, got {}",
                self.smoothing_iterations
            )));
        }
        if !(1..=5).contains(&self.spline_degree) {
            return Err(PipelineError::InvalidConfig(format!(
                "spline_degree must be in 1..=5, got {}",
                self.spline_degree
            )));
        }
        if self.trim_percent > 99 {
            return Err(PipelineError::InvalidConfig(format!(
                "trim_percent must be in 0..=99, got {}",
                self.trim_percent
            )));
        }
        if !self.simplify_factor.is_finite() || !(0.0..=1.0).contains(&self.simplify_factor) {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_factor must be in [0, 1], got {}",
                self.simplify_factor
            )));
        }
        if self.working_resolution < 16 {
            return Err(PipelineError::InvalidConfig(format!(
                "working_resolution must be at least 16, got {}",
                self.working_resolution
            )));
        }
        if !self.presimplify_fraction.is_finite()
            || !(0.0..1.0).contains(&self.presimplify_fraction)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "presimplify_fraction must be in [0, 1), got {}",
                self.presimplify_fraction
            )));
        }
        Ok(())
    }
}

/// The centerline derived for one polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CenterlineResult {
    /// The smoothed medial-axis curve (normal case).
    Curve(Polyline),
    /// The polygon centroid (sub-threshold polygons and the
    /// too-short-after-trim fallback).
    Centroid(Point),
}

impl CenterlineResult {
    /// Returns the curve, if this result is one.
    #[must_use]
    pub const fn as_curve(&self) -> Option<&Polyline> {
        match self {
            Self::Curve(polyline) => Some(polyline),
            Self::Centroid(_) => None,
        }
    }
}

/// Why a polygon's output was degraded to a simpler form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fallback {
    /// The curve remaining after the end trim was shorter than the
    /// minimum; the polygon's centroid was emitted instead.
    CenterlineTooShort,
}

/// Result of processing a single polygon.
///
/// Carries the centerline plus degradation bookkeeping so the batch
/// layer can report succeeded / degraded / failed counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonOutput {
    /// The centerline (or centroid fallback).
    pub result: CenterlineResult,
    /// Set when a recoverable failure forced a simpler output.
    pub fallback: Option<Fallback>,
    /// Number of interior runs demoted to averaging smoothing because
    /// their spline fit failed.
    pub spline_demotions: usize,
    /// Skeleton and raw medial-axis snapshots, captured only when
    /// [`PipelineConfig::debug`] is set.
    pub debug: Option<DebugArtifacts>,
}

impl PolygonOutput {
    /// Whether any recoverable failure degraded this output.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.fallback.is_some() || self.spline_demotions > 0
    }
}

/// Errors that can occur while deriving a centerline.
///
/// Recoverable variants ([`SplineFit`](Self::SplineFit),
/// [`CenterlineTooShort`](Self::CenterlineTooShort)) never escape
/// [`crate::process`]; they are handled by demotion or centroid
/// fallback and surface only through [`PolygonOutput`] bookkeeping.
/// The remaining variants are fatal for the polygon that raised them
/// but must never affect sibling polygons in a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The polygon is unusable: effectively zero area, or a ring
    /// self-intersects beyond floating-point tolerance.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The skeleton graph has no path connecting two leaves, so no
    /// centerline can be derived.
    #[error("skeleton has no path between two leaves")]
    DisconnectedSkeleton,

    /// A spline fit did not converge (degenerate or colinear control
    /// points). Recoverable: the run is demoted to averaging.
    #[error("spline fit failed: {0}")]
    SplineFit(String),

    /// The curve remaining after the end trim is too short to be a
    /// meaningful centerline. Recoverable: centroid fallback.
    #[error("centerline too short after trim: {remaining} remaining")]
    CenterlineTooShort {
        /// Arc length remaining after the trim.
        remaining: f64,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_lerp_endpoints_and_midpoint() {
        let a = Point::new(2.0, 4.0);
        let b = Point::new(6.0, 8.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Point::new(4.0, 6.0));
    }

    // --- Polyline tests ---

    #[test]
    fn polyline_basics() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        assert_eq!(pl.len(), 2);
        assert!(!pl.is_empty());
        assert_eq!(pl.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(pl.last(), Some(&Point::new(1.0, 1.0)));
    }

    #[test]
    fn polyline_arc_length_straight() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 4.0),
        ]);
        assert!((pl.arc_length() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn polyline_arc_length_degenerate() {
        assert!(Polyline::new(vec![]).arc_length().abs() < f64::EPSILON);
        assert!(
            Polyline::new(vec![Point::new(1.0, 1.0)])
                .arc_length()
                .abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn polyline_bounding_extent_takes_longer_axis() {
        let pl = Polyline::new(vec![
            Point::new(-1.0, 0.0),
            Point::new(9.0, 0.0),
            Point::new(0.0, 3.0),
        ]);
        assert!((pl.bounding_extent() - 10.0).abs() < 1e-12);
    }

    // --- PipelineConfig tests ---

    #[test]
    fn config_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_negative_min_area() {
        let config = PipelineConfig {
            min_area: -1.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_rejects_variance_above_threshold() {
        let config = PipelineConfig {
            distance_threshold: 1.0,
            allowable_variance: 2.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_rejects_out_of_range_iterations() {
        for iterations in [0, 11] {
            let config = PipelineConfig {
                smoothing_iterations: iterations,
                ..PipelineConfig::default()
            };
            assert!(config.validate().is_err(), "iterations={iterations}");
        }
    }

    #[test]
    fn config_rejects_out_of_range_degree() {
        for degree in [0, 6] {
            let config = PipelineConfig {
                spline_degree: degree,
                ..PipelineConfig::default()
            };
            assert!(config.validate().is_err(), "degree={degree}");
        }
    }

    #[test]
    fn config_rejects_trim_percent_100() {
        let config = PipelineConfig {
            trim_percent: 100,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_simplify_factor_above_one() {
        let config = PipelineConfig {
            simplify_factor: 1.5,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    // --- Error display ---

    #[test]
    fn error_display() {
        assert_eq!(
            PipelineError::DisconnectedSkeleton.to_string(),
            "skeleton has no path between two leaves"
        );
        assert_eq!(
            PipelineError::DegenerateGeometry("zero area".to_owned()).to_string(),
            "degenerate geometry: zero area"
        );
    }

    // --- Serde round-trips ---

    #[test]
    fn config_serde_round_trip() {
        let config = PipelineConfig {
            min_area: 100.0,
            distance_threshold: 3.0,
            allowable_variance: 1.0,
            smoothing_iterations: 5,
            spline_degree: 2,
            trim_percent: 10,
            simplify_factor: 0.01,
            debug: true,
            working_resolution: 128,
            presimplify_fraction: 0.005,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn centerline_result_serde_round_trip() {
        let curve = CenterlineResult::Curve(Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.0),
        ]));
        let json = serde_json::to_string(&curve).unwrap();
        let back: CenterlineResult = serde_json::from_str(&json).unwrap();
        assert_eq!(curve, back);

        let centroid = CenterlineResult::Centroid(Point::new(5.0, 5.0));
        let json = serde_json::to_string(&centroid).unwrap();
        let back: CenterlineResult = serde_json::from_str(&json).unwrap();
        assert_eq!(centroid, back);
    }

    #[test]
    fn pipeline_error_serde_round_trip() {
        let err = PipelineError::CenterlineTooShort { remaining: 0.5 };
        let json = serde_json::to_string(&err).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn polygon_output_degraded_flags() {
        let clean = PolygonOutput {
            result: CenterlineResult::Centroid(Point::new(0.0, 0.0)),
            fallback: None,
            spline_demotions: 0,
            debug: None,
        };
        assert!(!clean.is_degraded());

        let demoted = PolygonOutput {
            spline_demotions: 1,
            ..clean.clone()
        };
        assert!(demoted.is_degraded());

        let fell_back = PolygonOutput {
            fallback: Some(Fallback::CenterlineTooShort),
            ..clean
        };
        assert!(fell_back.is_degraded());
    }
}
