//! Parametric B-spline fitting for interior runs.
//!
//! Interior runs are smoothed by fitting a clamped least-squares
//! B-spline through the run's vertices with chord-length (arc-length)
//! parametrization, then resampling the fitted curve at the run's own
//! vertex count. The first and last control points are pinned to the
//! run's endpoints so the resampled curve meets its neighbors exactly.
//!
//! The fit uses fewer control points than data points (roughly one per
//! three vertices), which is what produces the smoothing: the spline is
//! the least-squares best fit, not an interpolant. Basis evaluation and
//! curve evaluation are the standard Cox-de Boor recurrences.

use crate::types::{PipelineError, Point, Polyline};

/// Pivot magnitudes below this are treated as a singular system.
const SINGULAR_PIVOT: f64 = 1e-12;

/// A clamped B-spline curve over the parameter domain `[0, 1]`.
#[derive(Debug, Clone)]
pub struct BSpline {
    degree: usize,
    knots: Vec<f64>,
    ctrl: Vec<Point>,
}

impl BSpline {
    /// Fit a clamped B-spline of `degree` through `points` by
    /// constrained least squares.
    ///
    /// The first and last control points are pinned to the first and
    /// last input points. Parameters are chord-length based, so evenly
    /// spaced input produces evenly spaced parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SplineFit`] when there are fewer than
    /// `degree + 2` points, when the points have zero total chord
    /// length, or when the normal equations are singular (coincident
    /// parameters).
    pub fn fit(points: &[Point], degree: usize) -> Result<Self, PipelineError> {
        let n = points.len();
        if degree == 0 {
            return Err(PipelineError::SplineFit("degree must be at least 1".to_owned()));
        }
        if n < degree + 2 {
            return Err(PipelineError::SplineFit(format!(
                "need at least {} points for a degree-{degree} fit, got {n}",
                degree + 2
            )));
        }

        let params = chord_length_params(points)?;
        let num_ctrl = (n.div_ceil(3)).clamp(degree + 1, n);
        let knots = averaged_knots(&params, num_ctrl, degree);

        let mut ctrl = vec![Point::new(0.0, 0.0); num_ctrl];
        ctrl[0] = points[0];
        ctrl[num_ctrl - 1] = points[n - 1];

        let free = num_ctrl - 2;
        if free == 0 {
            // Degree-1 fit with two control points: the chord itself.
            return Ok(Self { degree, knots, ctrl });
        }

        // Normal equations over the free control points, with the
        // pinned endpoint contributions moved to the right-hand side.
        let mut a = vec![0.0; free * free];
        let mut bx = vec![0.0; free];
        let mut by = vec![0.0; free];

        for (&t, &p) in params.iter().zip(points) {
            let span = find_span(&knots, degree, num_ctrl, t);
            let basis = basis_values(&knots, degree, span, t);
            let first_col = span - degree;

            let mut rx = p.x;
            let mut ry = p.y;
            for (j, &value) in basis.iter().enumerate() {
                let col = first_col + j;
                if col == 0 {
                    rx = value.mul_add(-ctrl[0].x, rx);
                    ry = value.mul_add(-ctrl[0].y, ry);
                } else if col == num_ctrl - 1 {
                    rx = value.mul_add(-ctrl[num_ctrl - 1].x, rx);
                    ry = value.mul_add(-ctrl[num_ctrl - 1].y, ry);
                }
            }

            for (j, &vj) in basis.iter().enumerate() {
                let col_j = first_col + j;
                if col_j == 0 || col_j == num_ctrl - 1 {
                    continue;
                }
                let row = col_j - 1;
                bx[row] = vj.mul_add(rx, bx[row]);
                by[row] = vj.mul_add(ry, by[row]);
                for (k, &vk) in basis.iter().enumerate() {
                    let col_k = first_col + k;
                    if col_k == 0 || col_k == num_ctrl - 1 {
                        continue;
                    }
                    a[row * free + (col_k - 1)] = vj.mul_add(vk, a[row * free + (col_k - 1)]);
                }
            }
        }

        let (xs, ys) = solve_pair(&mut a, &mut bx, &mut by, free)?;
        for (i, (x, y)) in xs.into_iter().zip(ys).enumerate() {
            ctrl[i + 1] = Point::new(x, y);
        }

        Ok(Self { degree, knots, ctrl })
    }

    /// Evaluate the curve at parameter `t` in `[0, 1]` (de Boor).
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let span = find_span(&self.knots, self.degree, self.ctrl.len(), t);
        let basis = basis_values(&self.knots, self.degree, span, t);
        let first = span - self.degree;
        let mut x = 0.0;
        let mut y = 0.0;
        for (j, &value) in basis.iter().enumerate() {
            x = value.mul_add(self.ctrl[first + j].x, x);
            y = value.mul_add(self.ctrl[first + j].y, y);
        }
        Point::new(x, y)
    }

    /// Sample the curve at `count` uniformly spaced parameters.
    ///
    /// `count` is clamped to at least 2; the first and last samples are
    /// the curve endpoints exactly (clamped knots plus pinned control
    /// points).
    #[must_use]
    pub fn resample(&self, count: usize) -> Polyline {
        let count = count.max(2);
        let points = (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 / (count - 1) as f64;
                self.evaluate(t)
            })
            .collect();
        Polyline::new(points)
    }
}

/// Normalized cumulative chord-length parameters in `[0, 1]`.
fn chord_length_params(points: &[Point]) -> Result<Vec<f64>, PipelineError> {
    let mut params = Vec::with_capacity(points.len());
    params.push(0.0);
    let mut accumulated = 0.0;
    for window in points.windows(2) {
        accumulated += window[0].distance(window[1]);
        params.push(accumulated);
    }
    if accumulated <= 0.0 {
        return Err(PipelineError::SplineFit(
            "zero total chord length (coincident points)".to_owned(),
        ));
    }
    for t in &mut params {
        *t /= accumulated;
    }
    Ok(params)
}

/// Clamped knot vector with interior knots at parameter quantiles
/// (knot averaging for approximation), giving a well-conditioned basis
/// for unevenly spaced data.
fn averaged_knots(params: &[f64], num_ctrl: usize, degree: usize) -> Vec<f64> {
    let n = params.len();
    let mut knots = vec![0.0; num_ctrl + degree + 1];
    for knot in knots.iter_mut().skip(num_ctrl) {
        *knot = 1.0;
    }
    let spans = num_ctrl - degree;
    for j in 1..spans {
        #[allow(clippy::cast_precision_loss)]
        let u = j as f64 * (n - 1) as f64 / spans as f64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i = (u.floor() as usize).min(n - 2);
        let alpha = u - u.floor();
        knots[degree + j] = alpha.mul_add(params[i + 1] - params[i], params[i]);
    }
    knots
}

/// Index of the knot span containing `t`: `knots[span] <= t < knots[span + 1]`.
fn find_span(knots: &[f64], degree: usize, num_ctrl: usize, t: f64) -> usize {
    if t >= knots[num_ctrl] {
        return num_ctrl - 1;
    }
    let mut lo = degree;
    let mut hi = num_ctrl;
    while lo + 1 < hi {
        let mid = usize::midpoint(lo, hi);
        if t < knots[mid] { hi = mid } else { lo = mid }
    }
    lo
}

/// The `degree + 1` non-zero basis function values at `t` for the given
/// span (Cox-de Boor triangular recurrence).
fn basis_values(knots: &[f64], degree: usize, span: usize, t: f64) -> Vec<f64> {
    let mut values = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    values[0] = 1.0;
    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { values[r] / denom };
            values[r] = right[r + 1].mul_add(temp, saved);
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    values
}

/// Solve `A x = bx` and `A y = by` for a shared symmetric matrix `A`
/// by Gaussian elimination with partial pivoting.
///
/// # Errors
///
/// Returns [`PipelineError::SplineFit`] when a pivot is effectively
/// zero (singular normal equations).
fn solve_pair(
    a: &mut [f64],
    bx: &mut [f64],
    by: &mut [f64],
    n: usize,
) -> Result<(Vec<f64>, Vec<f64>), PipelineError> {
    for col in 0..n {
        // Partial pivot.
        let mut pivot_row = col;
        let mut pivot_mag = a[col * n + col].abs();
        for row in col + 1..n {
            let mag = a[row * n + col].abs();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = row;
            }
        }
        if pivot_mag < SINGULAR_PIVOT {
            return Err(PipelineError::SplineFit(
                "singular normal equations".to_owned(),
            ));
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap(col * n + k, pivot_row * n + k);
            }
            bx.swap(col, pivot_row);
            by.swap(col, pivot_row);
        }

        let pivot = a[col * n + col];
        for row in col + 1..n {
            let factor = a[row * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row * n + k] = factor.mul_add(-a[col * n + k], a[row * n + k]);
            }
            bx[row] = factor.mul_add(-bx[col], bx[row]);
            by[row] = factor.mul_add(-by[col], by[row]);
        }
    }

    let mut xs = vec![0.0; n];
    let mut ys = vec![0.0; n];
    for col in (0..n).rev() {
        let mut sx = bx[col];
        let mut sy = by[col];
        for k in col + 1..n {
            sx = a[col * n + k].mul_add(-xs[k], sx);
            sy = a[col * n + k].mul_add(-ys[k], sy);
        }
        xs[col] = sx / a[col * n + col];
        ys[col] = sy / a[col * n + col];
    }
    Ok((xs, ys))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line_points(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                Point::new(i as f64, 0.0)
            })
            .collect()
    }

    #[test]
    fn too_few_points_is_a_fit_error() {
        let points = line_points(3);
        assert!(matches!(
            BSpline::fit(&points, 3),
            Err(PipelineError::SplineFit(_))
        ));
    }

    #[test]
    fn coincident_points_are_a_fit_error() {
        let points = vec![Point::new(1.0, 1.0); 8];
        assert!(matches!(
            BSpline::fit(&points, 3),
            Err(PipelineError::SplineFit(_))
        ));
    }

    #[test]
    fn straight_line_fit_stays_on_the_line() {
        let points = line_points(12);
        let spline = BSpline::fit(&points, 3).unwrap();
        let resampled = spline.resample(12);
        for p in resampled.points() {
            assert!(p.y.abs() < 1e-9, "off-line point {p:?}");
        }
    }

    #[test]
    fn endpoints_are_pinned() {
        let points: Vec<Point> = (0..10)
            .map(|i| {
                let x = f64::from(i);
                Point::new(x, (x * 0.8).sin())
            })
            .collect();
        let spline = BSpline::fit(&points, 3).unwrap();
        let resampled = spline.resample(10);
        assert_eq!(resampled.first(), points.first());
        assert_eq!(resampled.last(), points.last());
    }

    #[test]
    fn fit_tracks_a_smooth_curve() {
        // Dense parabola samples; the fit should stay close.
        let points: Vec<Point> = (0..=20)
            .map(|i| {
                let x = f64::from(i) * 0.5;
                Point::new(x, 0.1 * x * x)
            })
            .collect();
        let spline = BSpline::fit(&points, 3).unwrap();
        for &p in &points {
            // Nearest of many dense samples approximates curve distance.
            let dense = spline.resample(200);
            let min_d = dense
                .points()
                .iter()
                .map(|q| p.distance(*q))
                .fold(f64::INFINITY, f64::min);
            assert!(min_d < 0.2, "fit strays {min_d} from {p:?}");
        }
    }

    #[test]
    fn degree_one_minimum_case_is_the_chord() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 0.0),
        ];
        let spline = BSpline::fit(&points, 1).unwrap();
        let resampled = spline.resample(3);
        // Least-squares polyline of degree 1 through 3 points with 2
        // pinned control points is exactly the chord.
        assert_eq!(resampled.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(resampled.last(), Some(&Point::new(2.0, 0.0)));
    }

    #[test]
    fn resample_count_is_respected() {
        let points = line_points(10);
        let spline = BSpline::fit(&points, 2).unwrap();
        assert_eq!(spline.resample(37).len(), 37);
        // Clamped to a minimum of two samples.
        assert_eq!(spline.resample(0).len(), 2);
    }

    #[test]
    fn smoothing_reduces_noise() {
        // Zigzag around y=0: the least-squares fit should have smaller
        // peak amplitude than the input.
        let points: Vec<Point> = (0..30)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f64;
                let y = if i % 2 == 0 { 0.5 } else { -0.5 };
                Point::new(x, y)
            })
            .collect();
        let spline = BSpline::fit(&points, 3).unwrap();
        let resampled = spline.resample(30);
        let max_amplitude = resampled
            .points()
            .iter()
            .map(|p| p.y.abs())
            .fold(0.0, f64::max);
        assert!(max_amplitude < 0.5, "no smoothing: {max_amplitude}");
    }
}
