//! STL (Seasonal-Trend decomposition using LOESS) for a single period.
//!
//! The classical inner/outer iterative scheme of Cleveland et al. (1990):
//! each inner pass detrends, smooths the cycle-subseries with LOESS,
//! removes the low-frequency leakage with a moving-average cascade, and
//! re-estimates the trend; each outer pass derives robustness weights from
//! the residual and re-runs the inner loop with outliers down-weighted.
//! Iteration counts are fixed; there is no convergence-based exit.

use crate::error::{DecomposeError, Result};
use crate::smooth::{low_pass_cascade, LoessSmoother, SmootherConfig};
use crate::utils::stats::{mean, median, variance};

/// Result of a single-period STL decomposition.
#[derive(Debug, Clone)]
pub struct StlDecomposition {
    /// Trend component.
    pub trend: Vec<f64>,
    /// Seasonal component.
    pub seasonal: Vec<f64>,
    /// Residual after removing trend and seasonal.
    pub residual: Vec<f64>,
}

impl StlDecomposition {
    /// Seasonal strength in [0, 1]; values near 1 indicate strong
    /// seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        component_strength(&self.seasonal, &self.residual)
    }

    /// Trend strength in [0, 1].
    pub fn trend_strength(&self) -> f64 {
        component_strength(&self.trend, &self.residual)
    }
}

pub(crate) fn component_strength(component: &[f64], residual: &[f64]) -> f64 {
    let var_residual = variance(residual);
    let combined: Vec<f64> = component
        .iter()
        .zip(residual.iter())
        .map(|(c, r)| c + r)
        .collect();
    let var_combined = variance(&combined);
    if var_combined < 1e-10 {
        return 0.0;
    }
    (1.0 - var_residual / var_combined).clamp(0.0, 1.0)
}

/// Builder for an [`Stl`] decomposer.
///
/// Every recognized option is an explicit field with a documented default;
/// validation happens in [`StlBuilder::build`], before any data is seen.
#[derive(Debug, Clone)]
pub struct StlBuilder {
    period: usize,
    seasonal_window: Option<usize>,
    trend_window: Option<usize>,
    low_pass_window: Option<usize>,
    seasonal_degree: usize,
    trend_degree: usize,
    low_pass_degree: usize,
    seasonal_jump: usize,
    trend_jump: usize,
    low_pass_jump: usize,
    inner_iterations: Option<usize>,
    outer_iterations: Option<usize>,
    robust: bool,
}

impl StlBuilder {
    /// Start a builder for the given seasonal period.
    pub fn new(period: usize) -> Self {
        Self {
            period,
            seasonal_window: None,
            trend_window: None,
            low_pass_window: None,
            seasonal_degree: 1,
            trend_degree: 1,
            low_pass_degree: 1,
            seasonal_jump: 1,
            trend_jump: 1,
            low_pass_jump: 1,
            inner_iterations: None,
            outer_iterations: None,
            robust: false,
        }
    }

    /// Seasonal LOESS window (odd). Default 7.
    pub fn seasonal_window(mut self, window: usize) -> Self {
        self.seasonal_window = Some(window);
        self
    }

    /// Trend LOESS window (odd). Default: smallest odd integer at least
    /// 1.5 * period / (1 - 1.5 / seasonal_window).
    pub fn trend_window(mut self, window: usize) -> Self {
        self.trend_window = Some(window);
        self
    }

    /// Low-pass LOESS window (odd). Default: smallest odd integer >= period.
    pub fn low_pass_window(mut self, window: usize) -> Self {
        self.low_pass_window = Some(window);
        self
    }

    /// Seasonal smoother polynomial degree (0, 1, or 2). Default 1.
    pub fn seasonal_degree(mut self, degree: usize) -> Self {
        self.seasonal_degree = degree;
        self
    }

    /// Trend smoother polynomial degree (0, 1, or 2). Default 1.
    pub fn trend_degree(mut self, degree: usize) -> Self {
        self.trend_degree = degree;
        self
    }

    /// Low-pass smoother polynomial degree (0, 1, or 2). Default 1.
    pub fn low_pass_degree(mut self, degree: usize) -> Self {
        self.low_pass_degree = degree;
        self
    }

    /// Seasonal smoother evaluation stride. Default 1.
    pub fn seasonal_jump(mut self, jump: usize) -> Self {
        self.seasonal_jump = jump;
        self
    }

    /// Trend smoother evaluation stride. Default 1.
    pub fn trend_jump(mut self, jump: usize) -> Self {
        self.trend_jump = jump;
        self
    }

    /// Low-pass smoother evaluation stride. Default 1.
    pub fn low_pass_jump(mut self, jump: usize) -> Self {
        self.low_pass_jump = jump;
        self
    }

    /// Inner loop pass count. Default 2, or 1 in robust mode.
    pub fn inner_iterations(mut self, n: usize) -> Self {
        self.inner_iterations = Some(n);
        self
    }

    /// Outer (robustness) loop pass count. Default 0, or 15 in robust
    /// mode. Setting a nonzero count enables robust mode.
    pub fn outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = Some(n);
        if n > 0 {
            self.robust = true;
        }
        self
    }

    /// Enable robust fitting with the default outer iteration count.
    pub fn robust(mut self) -> Self {
        self.robust = true;
        self
    }

    /// Validate the configuration and construct the decomposer.
    pub fn build(self) -> Result<Stl> {
        if self.period < 2 {
            return Err(DecomposeError::InvalidPeriod(format!(
                "period must be at least 2, got {}",
                self.period
            )));
        }

        let seasonal_window = self.seasonal_window.unwrap_or(7);
        let trend_window = self.trend_window.unwrap_or_else(|| {
            let nt = 1.5 * self.period as f64 / (1.0 - 1.5 / seasonal_window as f64);
            next_odd(nt.ceil() as usize)
        });
        let low_pass_window = self.low_pass_window.unwrap_or_else(|| next_odd(self.period));

        for (name, window) in [
            ("seasonal", seasonal_window),
            ("trend", trend_window),
            ("low-pass", low_pass_window),
        ] {
            if window < 3 || window % 2 == 0 {
                return Err(DecomposeError::InvalidInput(format!(
                    "{name} window must be odd and at least 3, got {window}"
                )));
            }
        }

        let inner = self
            .inner_iterations
            .unwrap_or(if self.robust { 1 } else { 2 });
        if inner == 0 {
            return Err(DecomposeError::InvalidInput(
                "inner iteration count must be at least 1".to_string(),
            ));
        }
        let outer = self
            .outer_iterations
            .unwrap_or(if self.robust { 15 } else { 0 });

        let seasonal = LoessSmoother::new(
            SmootherConfig::new(seasonal_window)
                .degree(self.seasonal_degree)
                .jump(self.seasonal_jump),
        )?;
        let trend = LoessSmoother::new(
            SmootherConfig::new(trend_window)
                .degree(self.trend_degree)
                .jump(self.trend_jump),
        )?;
        let low_pass = LoessSmoother::new(
            SmootherConfig::new(low_pass_window)
                .degree(self.low_pass_degree)
                .jump(self.low_pass_jump),
        )?;

        Ok(Stl {
            period: self.period,
            seasonal,
            trend,
            low_pass,
            inner_iterations: inner,
            outer_iterations: outer,
            robust: self.robust,
        })
    }
}

/// Single-period STL decomposer with validated configuration.
#[derive(Debug, Clone)]
pub struct Stl {
    period: usize,
    seasonal: LoessSmoother,
    trend: LoessSmoother,
    low_pass: LoessSmoother,
    inner_iterations: usize,
    outer_iterations: usize,
    robust: bool,
}

impl Stl {
    /// Builder entry point.
    pub fn builder(period: usize) -> StlBuilder {
        StlBuilder::new(period)
    }

    /// The seasonal period.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Whether robust fitting is enabled.
    pub fn is_robust(&self) -> bool {
        self.robust
    }

    /// Decompose a series into trend, seasonal, and residual.
    pub fn decompose(&self, series: &[f64]) -> Result<StlDecomposition> {
        let n = series.len();
        if n < 2 * self.period {
            return Err(DecomposeError::InvalidPeriod(format!(
                "period {} requires at least {} observations, got {n}",
                self.period,
                2 * self.period
            )));
        }
        if let Some(pos) = series.iter().position(|v| !v.is_finite()) {
            return Err(DecomposeError::InvalidInput(format!(
                "non-finite value at index {pos}"
            )));
        }

        let mut trend = vec![0.0; n];
        let mut seasonal = vec![0.0; n];
        let mut rho = vec![1.0; n];

        let outer_passes = if self.robust {
            self.outer_iterations.max(1)
        } else {
            1
        };

        for outer in 0..outer_passes {
            for _ in 0..self.inner_iterations {
                // 1. Detrend.
                let detrended: Vec<f64> = series
                    .iter()
                    .zip(trend.iter())
                    .map(|(y, t)| y - t)
                    .collect();

                // 2. Cycle-subseries smoothing, extended one cycle on
                //    each side.
                let extended = self.smooth_cycle_subseries(&detrended, &rho)?;

                // 3. Low-pass: MA cascade back to n values, then LOESS.
                let cascade = low_pass_cascade(&extended, self.period);
                let low = self.low_pass.smooth(&cascade, None)?;

                // 4. Seasonal = smoothed subseries minus low-pass leakage.
                for i in 0..n {
                    seasonal[i] = extended[self.period + i] - low[i];
                }

                // 5. Deseasonalize.
                let deseasonalized: Vec<f64> = series
                    .iter()
                    .zip(seasonal.iter())
                    .map(|(y, s)| y - s)
                    .collect();

                // 6. Trend smoothing.
                trend = self.trend.smooth(&deseasonalized, Some(&rho))?;
            }

            if self.robust && outer + 1 < outer_passes {
                let residual: Vec<f64> = (0..n)
                    .map(|i| series[i] - trend[i] - seasonal[i])
                    .collect();
                rho = bisquare_robustness_weights(&residual);
            }
        }

        let residual: Vec<f64> = (0..n)
            .map(|i| series[i] - trend[i] - seasonal[i])
            .collect();

        Ok(StlDecomposition {
            trend,
            seasonal,
            residual,
        })
    }

    /// Smooth each of the `period` interleaved subseries independently and
    /// reassemble into a full-length estimate extended one cycle before
    /// and after the data range (length n + 2 * period).
    fn smooth_cycle_subseries(&self, detrended: &[f64], rho: &[f64]) -> Result<Vec<f64>> {
        let n = detrended.len();
        let p = self.period;
        let mut extended = vec![0.0; n + 2 * p];
        let mut values = Vec::with_capacity(n / p + 1);
        let mut weights = Vec::with_capacity(n / p + 1);

        for phase in 0..p {
            values.clear();
            weights.clear();
            let mut i = phase;
            while i < n {
                values.push(detrended[i]);
                weights.push(rho[i]);
                i += p;
            }

            let smoothed = self.seasonal.smooth_extended(&values, Some(&weights))?;
            // smoothed[j] is the fit at subseries position j - 1; it lands
            // at time phase + (j - 1) * p, i.e. extended index phase + j*p.
            for (j, &v) in smoothed.iter().enumerate() {
                extended[phase + j * p] = v;
            }
        }
        Ok(extended)
    }
}

/// Smallest odd integer greater than or equal to `n`.
fn next_odd(n: usize) -> usize {
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Bisquare robustness weights from the residual: (1 - u^2)^2 with
/// u = |r| / (6 * median|r|), zero beyond u = 1. When the median vanishes
/// (a majority of exact fits), the mean absolute residual sets the scale
/// so outliers are still down-weighted.
pub(crate) fn bisquare_robustness_weights(residuals: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let mut h = 6.0 * median(&abs);
    if !(h > 1e-12) {
        h = 6.0 * mean(&abs);
    }
    if !(h > 1e-12) {
        // Perfect fit everywhere.
        return vec![1.0; residuals.len()];
    }
    abs.iter()
        .map(|r| {
            let u = r / h;
            if u >= 1.0 {
                0.0
            } else {
                (1.0 - u * u).powi(2)
            }
        })
        .collect()
}
