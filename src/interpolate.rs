//! Angular spline interpolation.
//!
//! Used when too many lines are drawn for the renderer to smooth each one:
//! every group is resampled onto a one-degree grid ahead of time and then
//! drawn with straight segments.

use tracing::debug;

use crate::transform::{GroupKey, GroupedRow, GroupedTable};

/// Samples copied across the 0°/360° seam on each side before fitting
const WRAP_SAMPLES: usize = 3;

/// Natural cubic spline (zero second derivative at both ends)
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second: Vec<f64>,
}

impl NaturalCubicSpline {
    /// Fit through `(xs[i], ys[i])`. `xs` must be strictly increasing and hold
    /// at least two knots, otherwise `None` is returned.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len();
        if n < 2 || ys.len() != n || xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let mut second = vec![0.0; n];

        if n > 2 {
            // Tridiagonal system for the interior second derivatives (Thomas algorithm)
            let m = n - 2;
            let mut diag = vec![0.0; m];
            let mut upper = vec![0.0; m];
            let mut rhs = vec![0.0; m];
            for k in 0..m {
                let i = k + 1;
                diag[k] = 2.0 * (h[i - 1] + h[i]);
                upper[k] = h[i];
                rhs[k] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
            }

            for k in 1..m {
                let lower = h[k];
                let w = lower / diag[k - 1];
                diag[k] -= w * upper[k - 1];
                rhs[k] -= w * rhs[k - 1];
            }

            let mut solution = vec![0.0; m];
            solution[m - 1] = rhs[m - 1] / diag[m - 1];
            for k in (0..m - 1).rev() {
                solution[k] = (rhs[k] - upper[k] * solution[k + 1]) / diag[k];
            }
            second[1..n - 1].copy_from_slice(&solution);
        }

        Some(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second,
        })
    }

    /// Value of the spline at `x`; the end segments are extended beyond the knots.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let i = self
            .xs
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
            .min(n - 2);

        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.second[i], self.second[i + 1]);
        let h = x1 - x0;
        let a = x1 - x;
        let b = x - x0;

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Resample one group's `(degrees, value)` samples onto the integer grid
/// 0..360 plus the original angles. Returns `None` if no spline can be fitted.
fn resample(samples: &[(f64, f64)]) -> Option<Vec<(f64, f64)>> {
    let n = samples.len();
    let wrap = WRAP_SAMPLES.min(n);

    let mut knots: Vec<(f64, f64)> = Vec::with_capacity(n + 2 * wrap);
    knots.extend(samples[n - wrap..].iter().map(|&(d, v)| (d - 360.0, v)));
    knots.extend_from_slice(samples);
    knots.extend(samples[..wrap].iter().map(|&(d, v)| (d + 360.0, v)));

    let xs: Vec<f64> = knots.iter().map(|k| k.0).collect();
    let ys: Vec<f64> = knots.iter().map(|k| k.1).collect();
    let spline = NaturalCubicSpline::fit(&xs, &ys)?;

    let mut grid: Vec<f64> = (0..360).map(f64::from).collect();
    grid.extend(samples.iter().map(|s| s.0).filter(|d| (0.0..360.0).contains(d)));
    grid.sort_by(|a, b| a.total_cmp(b));
    grid.dedup();

    let points = grid
        .into_iter()
        .map(|deg| {
            // knots keep their observed value exactly
            let value = samples
                .iter()
                .find(|s| s.0 == deg)
                .map(|s| s.1)
                .unwrap_or_else(|| spline.evaluate(deg));
            (deg, value)
        })
        .collect();
    Some(points)
}

/// Spline-interpolate every group with at least `min_samples` angular samples.
///
/// Groups below the threshold are left out of the result.
pub fn interpolate(grouped: &GroupedTable, groups: &[GroupKey], min_samples: usize) -> GroupedTable {
    let mut rows = Vec::new();

    for key in groups {
        let mut samples: Vec<(f64, f64)> = grouped
            .rows_for(key)
            .map(|row| (row.degrees, row.value))
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        if samples.len() < min_samples || samples.is_empty() {
            debug!(group = ?key, samples = samples.len(), "too few samples to interpolate");
            continue;
        }

        match resample(&samples) {
            Some(points) => rows.extend(points.into_iter().map(|(degrees, value)| GroupedRow {
                keys: key.clone(),
                degrees,
                value,
            })),
            None => debug!(group = ?key, "could not fit spline"),
        }
    }

    GroupedTable {
        key_columns: grouped.key_columns.clone(),
        value_column: grouped.value_column.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(groups: Vec<(&str, Vec<(f64, f64)>)>) -> GroupedTable {
        let rows = groups
            .into_iter()
            .flat_map(|(key, samples)| {
                samples.into_iter().map(move |(degrees, value)| GroupedRow {
                    keys: vec![key.to_string()],
                    degrees,
                    value,
                })
            })
            .collect();
        GroupedTable {
            key_columns: vec!["date".to_string()],
            value_column: "value".to_string(),
            rows,
        }
    }

    fn sine_samples(count: usize) -> Vec<(f64, f64)> {
        let step = 360.0 / count as f64;
        (0..count)
            .map(|i| {
                let deg = i as f64 * step;
                (deg, 10.0 + deg.to_radians().sin())
            })
            .collect()
    }

    #[test]
    fn test_spline_linear_data_is_exact() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let spline = NaturalCubicSpline::fit(&xs, &ys).unwrap();
        assert!((spline.evaluate(1.5) - 4.0).abs() < 1e-12);
        assert!((spline.evaluate(2.25) - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_spline_passes_through_knots() {
        let xs = [0.0, 1.0, 2.5, 4.0, 5.0];
        let ys = [2.0, -1.0, 0.5, 3.0, 1.0];
        let spline = NaturalCubicSpline::fit(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert!((spline.evaluate(*x) - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_spline_rejects_unsorted_knots() {
        assert!(NaturalCubicSpline::fit(&[0.0, 0.0], &[1.0, 2.0]).is_none());
        assert!(NaturalCubicSpline::fit(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_interpolate_hourly_group() {
        let grouped = table(vec![("2022-01-01", sine_samples(24))]);
        let groups = grouped.groups();
        let result = interpolate(&grouped, &groups, 8);

        assert_eq!(result.len(), 360);
        assert!(result.rows.iter().all(|r| (0.0..360.0).contains(&r.degrees)));
        for (deg, value) in sine_samples(24) {
            let row = result.rows.iter().find(|r| r.degrees == deg).unwrap();
            assert_eq!(row.value, value);
        }
    }

    #[test]
    fn test_interpolate_drops_thin_groups() {
        let grouped = table(vec![("a", sine_samples(7)), ("b", sine_samples(8))]);
        let groups = grouped.groups();
        let result = interpolate(&grouped, &groups, 8);

        assert_eq!(result.groups(), vec![vec!["b".to_string()]]);
        assert_eq!(result.len(), 360);
    }

    #[test]
    fn test_interpolate_keeps_fractional_angles() {
        // 7 samples at 360/7 degree spacing
        let grouped = table(vec![("a", sine_samples(7))]);
        let groups = grouped.groups();
        let result = interpolate(&grouped, &groups, 7);
        assert_eq!(result.len(), 360 + 6);
    }

    #[test]
    fn test_interpolated_values_are_smooth_across_seam() {
        let grouped = table(vec![("a", sine_samples(24))]);
        let groups = grouped.groups();
        let result = interpolate(&grouped, &groups, 8);
        let at = |d: f64| result.rows.iter().find(|r| r.degrees == d).unwrap().value;
        assert!((at(359.0) - (10.0 + 359f64.to_radians().sin())).abs() < 1e-2);
        assert!((at(1.0) - (10.0 + 1f64.to_radians().sin())).abs() < 1e-2);
    }
}
