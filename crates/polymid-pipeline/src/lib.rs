//! polymid-pipeline: Pure polygon centerline pipeline (sans-IO).
//!
//! Converts a polygon (outer ring plus optional holes) into a single
//! smoothed centerline through:
//! boundary distance field -> skeleton extraction -> medial path
//! selection -> run classification -> per-run smoothing -> end trim ->
//! simplification.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! geometry and returns structured data. File formats and parallel
//! batch execution live in `polymid-batch`.

pub mod classify;
pub mod diagnostics;
pub mod distance;
pub mod finalize;
pub mod medial;
pub mod polygon;
pub mod skeleton;
pub mod smooth;
pub mod spline;
pub mod types;

pub use diagnostics::DebugArtifacts;
pub use polygon::{Polygon, Ring};
pub use types::{
    CenterlineResult, Fallback, PipelineConfig, PipelineError, Point, PolygonOutput, Polyline,
};

/// Derive the centerline of a single polygon.
///
/// Polygons with area below [`PipelineConfig::min_area`] skip the
/// pipeline entirely and emit their centroid. Everything else flows
/// through skeleton extraction and smoothing; if the end trim leaves
/// too little curve, the centroid is emitted as a recorded fallback
/// rather than an error.
///
/// # Pipeline steps
///
/// 1. Validate configuration
/// 2. Optional ring presimplification
/// 3. Sub-threshold area check (centroid shortcut)
/// 4. Boundary distance field construction
/// 5. Skeleton extraction (rasterize, thin, graph)
/// 6. Medial path selection (weighted leaf-pair diameter)
/// 7. Run classification (hysteresis on boundary distance)
/// 8. Per-run smoothing (averaging or B-spline) and stitching
/// 9. Symmetric end trim and max-deviation simplification
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] when a configuration field
/// is out of range, [`PipelineError::DegenerateGeometry`] when the
/// polygon has effectively zero area or a self-intersecting ring, and
/// [`PipelineError::DisconnectedSkeleton`] when no two skeleton leaves
/// are connected. Spline failures and too-short centerlines are handled
/// internally and reported through [`PolygonOutput`].
pub fn process(
    polygon: &Polygon,
    config: &PipelineConfig,
) -> Result<PolygonOutput, PipelineError> {
    // 1. Validate configuration before any work.
    config.validate()?;

    // 2. Optional presimplification of all rings.
    let simplified;
    let polygon = if config.presimplify_fraction > 0.0 {
        simplified = polygon.presimplified(config.presimplify_fraction);
        &simplified
    } else {
        polygon
    };

    // 3. Sub-threshold polygons emit their centroid directly. This is
    //    the designed output for small polygons, not a degradation.
    if polygon.area() < config.min_area {
        return Ok(PolygonOutput {
            result: CenterlineResult::Centroid(polygon.centroid()),
            fallback: None,
            spline_demotions: 0,
            debug: None,
        });
    }

    // 4. Boundary distance field over all rings.
    let field = distance::BoundaryField::new(polygon);

    // 5. Skeleton extraction.
    let skeleton = skeleton::build(polygon, &field, config.working_resolution)?;

    // 6. Medial path selection.
    let path = medial::select(&skeleton)?;
    let debug = config
        .debug
        .then(|| DebugArtifacts::capture(&skeleton, &path));

    // 7. Run classification. Interior runs must have enough vertices
    //    for the spline's minimum control-point count.
    let runs = classify::classify(
        &path,
        config.distance_threshold,
        config.allowable_variance,
        config.spline_degree + 2,
    );

    // 8. Per-run smoothing and stitching.
    let smoothed = smooth::smooth(
        &path,
        &runs,
        config.spline_degree,
        config.smoothing_iterations,
    );

    // 9. End trim and simplification, with centroid fallback.
    match finalize::finalize(&smoothed.curve, config.trim_percent, config.simplify_factor) {
        Ok(curve) => Ok(PolygonOutput {
            result: CenterlineResult::Curve(curve),
            fallback: None,
            spline_demotions: smoothed.spline_demotions,
            debug,
        }),
        Err(PipelineError::CenterlineTooShort { .. }) => Ok(PolygonOutput {
            result: CenterlineResult::Centroid(polygon.centroid()),
            fallback: Some(Fallback::CenterlineTooShort),
            spline_demotions: smoothed.spline_demotions,
            debug,
        }),
        Err(other) => Err(other),
    }
}
