//! polymid-batch: Parallel batch execution over many polygons.
//!
//! Runs the centerline pipeline across a collection of polygons on a
//! rayon thread pool. Each polygon is independent: a failure is
//! recorded in that polygon's slot and never affects its siblings.
//! Output order always matches input order regardless of worker count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use polymid_pipeline::{PipelineConfig, PipelineError, Polygon, PolygonOutput};

/// Errors raised by the batch layer itself, as opposed to per-polygon
/// pipeline errors (those are captured in [`PolygonOutcome::Failure`]).
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The shared configuration is invalid; no polygon was processed.
    #[error(transparent)]
    InvalidConfig(#[from] PipelineError),

    /// The worker thread pool could not be constructed.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Result for one polygon in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolygonOutcome {
    /// The pipeline produced an output (possibly degraded).
    Success(PolygonOutput),
    /// The pipeline failed for this polygon alone.
    Failure(PipelineError),
}

impl PolygonOutcome {
    /// Returns the output, if the pipeline succeeded.
    #[must_use]
    pub const fn output(&self) -> Option<&PolygonOutput> {
        match self {
            Self::Success(output) => Some(output),
            Self::Failure(_) => None,
        }
    }
}

/// One batch slot: the caller's polygon id paired with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Caller-supplied identifier, carried through unchanged.
    pub id: u64,
    /// What happened to this polygon.
    pub outcome: PolygonOutcome,
}

/// Aggregate counts over a batch. Every polygon lands in exactly one
/// bucket: `succeeded + degraded + failed` equals the input length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Clean outputs with no fallback or demotion.
    pub succeeded: usize,
    /// Outputs produced through a fallback or spline demotion.
    pub degraded: usize,
    /// Polygons whose pipeline returned an error.
    pub failed: usize,
}

/// Everything a batch run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Per-polygon results, in input order.
    pub entries: Vec<BatchEntry>,
    /// Aggregate counts.
    pub summary: BatchSummary,
}

/// Process a batch of polygons in parallel.
///
/// `workers` limits the thread pool size; `None` uses rayon's shared
/// global pool. Entries come back in input order.
///
/// # Errors
///
/// Returns [`BatchError::InvalidConfig`] when the shared configuration
/// fails validation (checked once, before any polygon is touched) and
/// [`BatchError::ThreadPool`] when the requested pool cannot be built.
pub fn process_batch(
    polygons: &[(u64, Polygon)],
    config: &PipelineConfig,
    workers: Option<usize>,
) -> Result<BatchReport, BatchError> {
    config.validate()?;

    let entries = match workers {
        Some(count) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(count)
                .build()
                .map_err(|e| BatchError::ThreadPool(e.to_string()))?;
            pool.install(|| run(polygons, config))
        }
        None => run(polygons, config),
    };

    let mut summary = BatchSummary::default();
    for entry in &entries {
        match &entry.outcome {
            PolygonOutcome::Success(output) if output.is_degraded() => summary.degraded += 1,
            PolygonOutcome::Success(_) => summary.succeeded += 1,
            PolygonOutcome::Failure(_) => summary.failed += 1,
        }
    }

    Ok(BatchReport { entries, summary })
}

/// Indexed parallel map; collect preserves input order.
fn run(polygons: &[(u64, Polygon)], config: &PipelineConfig) -> Vec<BatchEntry> {
    polygons
        .par_iter()
        .map(|(id, polygon)| {
            let outcome = match polymid_pipeline::process(polygon, config) {
                Ok(output) => PolygonOutcome::Success(output),
                Err(error) => PolygonOutcome::Failure(error),
            };
            BatchEntry { id: *id, outcome }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use polymid_pipeline::Point;

    fn rectangle(width: f64, height: f64) -> Polygon {
        Polygon::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(width, 0.0),
                Point::new(width, height),
                Point::new(0.0, height),
            ],
            vec![],
        )
    }

    fn bowtie() -> Polygon {
        Polygon::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 10.0),
            ],
            vec![],
        )
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            working_resolution: 64,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn output_order_matches_input_order() {
        let polygons: Vec<(u64, Polygon)> = (0..8)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let w = 50.0 + i as f64 * 10.0;
                (i * 7, rectangle(w, 10.0))
            })
            .collect();
        let report = process_batch(&polygons, &test_config(), Some(4)).unwrap();
        let ids: Vec<u64> = report.entries.iter().map(|e| e.id).collect();
        let expected: Vec<u64> = polygons.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn one_bad_polygon_does_not_poison_the_batch() {
        let polygons = vec![
            (1, rectangle(100.0, 10.0)),
            (2, bowtie()),
            (3, rectangle(80.0, 12.0)),
        ];
        let report = process_batch(&polygons, &test_config(), Some(2)).unwrap();

        assert!(matches!(
            report.entries[1].outcome,
            PolygonOutcome::Failure(PipelineError::DegenerateGeometry(_))
        ));
        assert!(report.entries[0].outcome.output().is_some());
        assert!(report.entries[2].outcome.output().is_some());
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.succeeded, 2);
    }

    #[test]
    fn summary_buckets_cover_every_polygon() {
        let degraded_config = PipelineConfig {
            trim_percent: 60, // forces the centroid fallback
            ..test_config()
        };
        let polygons = vec![(1, rectangle(100.0, 10.0)), (2, bowtie())];
        let report = process_batch(&polygons, &degraded_config, None).unwrap();
        let total =
            report.summary.succeeded + report.summary.degraded + report.summary.failed;
        assert_eq!(total, polygons.len());
        assert_eq!(report.summary.degraded, 1);
        assert_eq!(report.summary.failed, 1);
    }

    #[test]
    fn invalid_config_fails_the_whole_batch_up_front() {
        let config = PipelineConfig {
            spline_degree: 0,
            ..test_config()
        };
        let result = process_batch(&[(1, rectangle(10.0, 10.0))], &config, None);
        assert!(matches!(result, Err(BatchError::InvalidConfig(_))));
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let polygons: Vec<(u64, Polygon)> = (0..4)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let h = 10.0 + i as f64 * 2.0;
                (i, rectangle(120.0, h))
            })
            .collect();
        let serial = process_batch(&polygons, &test_config(), Some(1)).unwrap();
        let parallel = process_batch(&polygons, &test_config(), Some(4)).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn report_serde_round_trip() {
        let polygons = vec![(1, rectangle(100.0, 10.0)), (2, bowtie())];
        let report = process_batch(&polygons, &test_config(), None).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn empty_batch_is_fine() {
        let report = process_batch(&[], &test_config(), None).unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(report.summary, BatchSummary::default());
    }
}
