//! Local regression (LOESS) smoothing for evenly spaced sequences.
//!
//! At each evaluation position the smoother selects the `window` nearest
//! neighbors (the window shifts at the series boundaries instead of
//! shrinking), weights them with the tricube kernel scaled by the distance
//! to the farthest in-window neighbor, and fits a weighted least-squares
//! polynomial of the configured degree. The fitted value at the evaluation
//! position is the smoothed output.
//!
//! With `jump > 1` only every jump-th position is fitted; skipped positions
//! are filled by linear interpolation between the fitted anchors. This is
//! the classical STL speedup and leaves results unchanged for `jump == 1`.

use crate::error::{DecomposeError, Result};
use crate::utils::stats::median;

/// Configuration for a LOESS smoothing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmootherConfig {
    /// Window length (number of nearest neighbors). Must be odd and >= 3.
    pub window: usize,
    /// Local polynomial degree: 0, 1, or 2.
    pub degree: usize,
    /// Stride for skip-fitting with linear interpolation. 1 fits every
    /// position.
    pub jump: usize,
    /// Robustness iterations: after each full pass, residual-derived
    /// tricube weights down-weight outliers and the pass is repeated.
    pub iterations: usize,
}

impl SmootherConfig {
    /// Configuration with the given window, degree 1, no jump, no
    /// robustness iterations.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            degree: 1,
            jump: 1,
            iterations: 0,
        }
    }

    /// Set the polynomial degree.
    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    /// Set the evaluation stride.
    pub fn jump(mut self, jump: usize) -> Self {
        self.jump = jump;
        self
    }

    /// Set the robustness iteration count.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.window < 3 || self.window % 2 == 0 {
            return Err(DecomposeError::InvalidInput(format!(
                "smoother window must be odd and at least 3, got {}",
                self.window
            )));
        }
        if self.degree > 2 {
            return Err(DecomposeError::InvalidInput(format!(
                "smoother degree must be 0, 1, or 2, got {}",
                self.degree
            )));
        }
        if self.jump == 0 {
            return Err(DecomposeError::InvalidInput(
                "smoother jump must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Local weighted polynomial regression smoother.
#[derive(Debug, Clone)]
pub struct LoessSmoother {
    config: SmootherConfig,
}

impl LoessSmoother {
    /// Create a smoother, validating the configuration.
    pub fn new(config: SmootherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// Smooth a sequence, producing one fitted value per input position.
    ///
    /// `weights` are external per-point multipliers (e.g. STL robustness
    /// weights); points with weight exactly zero are excluded from fits.
    pub fn smooth(&self, values: &[f64], weights: Option<&[f64]>) -> Result<Vec<f64>> {
        let n = values.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let base = self.resolve_weights(n, weights)?;
        let mut effective = base.clone();
        let mut fitted = self.pass(values, &effective)?;

        for _ in 0..self.config.iterations {
            let residuals: Vec<f64> = values
                .iter()
                .zip(fitted.iter())
                .map(|(y, f)| y - f)
                .collect();
            let robust = tricube_robustness_weights(&residuals);
            for (e, (b, r)) in effective.iter_mut().zip(base.iter().zip(robust.iter())) {
                *e = b * r;
            }
            fitted = self.pass(values, &effective)?;
        }

        Ok(fitted)
    }

    /// Smooth a sequence and extend it by one fitted value on each side,
    /// at positions -1 and n. Used for cycle-subseries extension in STL.
    ///
    /// Robustness iterations are not applied here; callers supply the
    /// robustness weights explicitly.
    pub fn smooth_extended(&self, values: &[f64], weights: Option<&[f64]>) -> Result<Vec<f64>> {
        let n = values.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let w = self.resolve_weights(n, weights)?;
        let interior = self.pass(values, &w)?;

        let mut out = Vec::with_capacity(n + 2);
        out.push(self.fit_at(values, &w, -1.0)?);
        out.extend_from_slice(&interior);
        out.push(self.fit_at(values, &w, n as f64)?);
        Ok(out)
    }

    fn resolve_weights(&self, n: usize, weights: Option<&[f64]>) -> Result<Vec<f64>> {
        match weights {
            Some(w) => {
                if w.len() != n {
                    return Err(DecomposeError::MismatchedLength {
                        expected: n,
                        got: w.len(),
                    });
                }
                Ok(w.to_vec())
            }
            None => Ok(vec![1.0; n]),
        }
    }

    /// One full pass: fit at every anchor position, interpolate the rest.
    fn pass(&self, values: &[f64], weights: &[f64]) -> Result<Vec<f64>> {
        let n = values.len();
        if n == 1 {
            return Ok(vec![values[0]]);
        }
        let mut out = vec![0.0; n];

        if self.config.jump <= 1 {
            for (i, o) in out.iter_mut().enumerate() {
                *o = self.fit_at(values, weights, i as f64)?;
            }
            return Ok(out);
        }

        let mut anchors: Vec<usize> = (0..n).step_by(self.config.jump).collect();
        if *anchors.last().unwrap() != n - 1 {
            anchors.push(n - 1);
        }
        for &i in &anchors {
            out[i] = self.fit_at(values, weights, i as f64)?;
        }
        for pair in anchors.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let span = (b - a) as f64;
            for i in a + 1..b {
                let t = (i - a) as f64 / span;
                out[i] = out[a] * (1.0 - t) + out[b] * t;
            }
        }
        Ok(out)
    }

    /// Fit the local polynomial at one evaluation position.
    ///
    /// The position may lie one step outside the data range (-1 or n),
    /// which extrapolates from the boundary window.
    fn fit_at(&self, values: &[f64], weights: &[f64], position: f64) -> Result<f64> {
        let n = values.len();
        let span = self.config.window.min(n);

        // Nearest `span` consecutive indices; the window shifts at the
        // boundaries rather than shrinking.
        let ideal = position - (span as f64 - 1.0) / 2.0;
        let left = (ideal.round() as isize).clamp(0, (n - span) as isize) as usize;
        let right = left + span - 1;

        let mut max_dist = (position - left as f64)
            .abs()
            .max((right as f64 - position).abs());
        // When the requested window exceeds the data, inflate the kernel
        // radius as if the missing neighbors extended past both ends.
        if self.config.window > n {
            max_dist += (self.config.window - n) as f64 / 2.0;
        }
        if max_dist <= 0.0 {
            return Ok(values[left]);
        }

        self.weighted_fit(values, weights, left, right, position, max_dist)
    }

    /// Weighted least-squares polynomial fit over [left, right], evaluated
    /// at `position`. Centered coordinates keep the fitted value equal to
    /// the intercept. Singular systems fall back to a lower degree.
    fn weighted_fit(
        &self,
        values: &[f64],
        weights: &[f64],
        left: usize,
        right: usize,
        position: f64,
        max_dist: f64,
    ) -> Result<f64> {
        // Moments s[m] = sum w * t^m and rhs b[m] = sum w * t^m * y,
        // with t the centered coordinate.
        let mut s = [0.0_f64; 5];
        let mut b = [0.0_f64; 3];
        for j in left..=right {
            let t = j as f64 - position;
            let u = t.abs() / max_dist;
            let w = tricube(u) * weights[j];
            if w <= 0.0 {
                continue;
            }
            let mut tp = w;
            for m in 0..=2 * self.config.degree {
                s[m] += tp;
                if m <= self.config.degree {
                    b[m] += tp * values[j];
                }
                tp *= t;
            }
        }

        if s[0] <= 0.0 {
            // Every neighbor was excluded by a zero weight; fall back to
            // the plain window mean.
            let count = (right - left + 1) as f64;
            return Ok(values[left..=right].iter().sum::<f64>() / count);
        }

        let value = solve_centered(&s, &b, self.config.degree);
        if !value.is_finite() {
            return Err(DecomposeError::NumericalInstability(format!(
                "local fit produced a non-finite value at position {position}"
            )));
        }
        Ok(value)
    }
}

/// Solve the centered normal equations for the intercept, falling back to
/// a lower degree when the system is numerically singular.
fn solve_centered(s: &[f64; 5], b: &[f64; 3], degree: usize) -> f64 {
    const REL_EPS: f64 = 1e-12;
    match degree {
        0 => b[0] / s[0],
        1 => {
            let det = s[0] * s[2] - s[1] * s[1];
            if det.abs() <= REL_EPS * s[0] * s[2].max(1.0) {
                return solve_centered(s, b, 0);
            }
            (s[2] * b[0] - s[1] * b[1]) / det
        }
        _ => {
            // 3x3 system via Cramer's rule; only the intercept is needed.
            let det = s[0] * (s[2] * s[4] - s[3] * s[3]) - s[1] * (s[1] * s[4] - s[2] * s[3])
                + s[2] * (s[1] * s[3] - s[2] * s[2]);
            let scale = s[0] * s[2] * s[4];
            if det.abs() <= REL_EPS * scale.max(1.0) {
                return solve_centered(s, b, 1);
            }
            let det0 = b[0] * (s[2] * s[4] - s[3] * s[3]) - s[1] * (b[1] * s[4] - b[2] * s[3])
                + s[2] * (b[1] * s[3] - b[2] * s[2]);
            det0 / det
        }
    }
}

/// Tricube kernel: (1 - u^3)^3 on [0, 1), zero beyond.
pub(crate) fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        0.0
    } else {
        let c = 1.0 - u * u * u;
        c * c * c
    }
}

/// Tricube robustness weights: tricube(|r| / (6 * median|r|)).
///
/// When the median vanishes (a majority of points fit exactly) the mean
/// absolute residual sets the scale instead, so isolated outliers are
/// still down-weighted. All-zero residuals leave every weight at one.
fn tricube_robustness_weights(residuals: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let mut h = 6.0 * median(&abs);
    if !(h > 1e-12) {
        let sum: f64 = abs.iter().sum();
        h = 6.0 * sum / abs.len() as f64;
    }
    if !(h > 1e-12) {
        return vec![1.0; residuals.len()];
    }
    abs.iter().map(|r| tricube(r / h)).collect()
}
