//! MSTL: multiple seasonal-trend decomposition using LOESS.
//!
//! Extends STL to several seasonal periods by iterating over them: each
//! pass re-estimates one seasonal component from the series with all the
//! other seasonal components subtracted. Periods are processed in exactly
//! the order the caller supplied them; no reordering or deduplication is
//! performed, so the caller controls which period is refined last.

use chrono::{DateTime, Utc};

use crate::core::TimeSeries;
use crate::decompose::stl::{component_strength, Stl, StlBuilder};
use crate::error::{DecomposeError, Result};
use crate::transform::boxcox::{self, Lambda};

/// Builder for an [`Mstl`] decomposer.
#[derive(Debug, Clone)]
pub struct MstlBuilder {
    periods: Vec<usize>,
    seasonal_windows: Option<Vec<usize>>,
    iterate: Option<usize>,
    lambda: Lambda,
    trend_window: Option<usize>,
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

impl MstlBuilder {
    /// Start a builder for the given seasonal periods, in the order they
    /// will be extracted.
    pub fn new(periods: &[usize]) -> Self {
        Self {
            periods: periods.to_vec(),
            seasonal_windows: None,
            iterate: None,
            lambda: Lambda::Off,
            trend_window: None,
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

    /// Seasonal LOESS window per period, matching the periods slice
    /// one-to-one. The default is 7 + 4 * (k + 1) where k is the period's
    /// rank in ascending period order, so the pairing is independent of
    /// extraction order.
    pub fn seasonal_windows(mut self, windows: &[usize]) -> Self {
        self.seasonal_windows = Some(windows.to_vec());
        self
    }

    /// Number of refinement passes over the full period list. Default 2
    /// when more than one period is given, otherwise 1.
    pub fn iterate(mut self, iterate: usize) -> Self {
        self.iterate = Some(iterate);
        self
    }

    /// Box-Cox pre-transform. Default [`Lambda::Off`].
    pub fn lambda(mut self, lambda: Lambda) -> Self {
        self.lambda = lambda;
        self
    }

    /// Trend LOESS window forwarded to every inner STL fit.
    pub fn trend_window(mut self, window: usize) -> Self {
        self.trend_window = Some(window);
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

    /// Inner iteration count forwarded to every inner STL fit.
    pub fn inner_iterations(mut self, n: usize) -> Self {
        self.inner_iterations = Some(n);
        self
    }

    /// Outer iteration count forwarded to every inner STL fit. A nonzero
    /// count enables robust mode.
    pub fn outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = Some(n);
        if n > 0 {
            self.robust = true;
        }
        self
    }

    /// Enable robust STL fitting.
    pub fn robust(mut self) -> Self {
        self.robust = true;
        self
    }

    /// Validate the configuration and construct the decomposer.
    pub fn build(self) -> Result<Mstl> {
        if self.periods.is_empty() {
            return Err(DecomposeError::InvalidInput(
                "at least one seasonal period is required".to_string(),
            ));
        }
        for &period in &self.periods {
            if period < 2 {
                return Err(DecomposeError::InvalidPeriod(format!(
                    "period must be at least 2, got {period}"
                )));
            }
        }

        let windows = match self.seasonal_windows {
            Some(windows) => {
                if windows.len() != self.periods.len() {
                    return Err(DecomposeError::MismatchedLength {
                        expected: self.periods.len(),
                        got: windows.len(),
                    });
                }
                for (&window, &period) in windows.iter().zip(self.periods.iter()) {
                    if window % 2 == 0 || window < 3 {
                        return Err(DecomposeError::InvalidInput(format!(
                            "seasonal window must be odd and at least 3, got {window}"
                        )));
                    }
                    if window <= period {
                        return Err(DecomposeError::InvalidInput(format!(
                            "seasonal window {window} must exceed its period {period}"
                        )));
                    }
                }
                windows
            }
            None => {
                // Default windows follow each period's rank in ascending
                // period order, not its position in the extraction order,
                // so reordering the period list pairs the same window with
                // the same period.
                let mut by_period: Vec<usize> = (0..self.periods.len()).collect();
                by_period.sort_by_key(|&i| self.periods[i]);
                let mut windows = vec![0; self.periods.len()];
                for (rank, &i) in by_period.iter().enumerate() {
                    windows[i] = 7 + 4 * (rank + 1);
                }
                windows
            }
        };

        let iterate = self
            .iterate
            .unwrap_or(if self.periods.len() > 1 { 2 } else { 1 });
        if iterate == 0 {
            return Err(DecomposeError::InvalidInput(
                "iterate must be at least 1".to_string(),
            ));
        }

        let mut decomposers = Vec::with_capacity(self.periods.len());
        for (&period, &window) in self.periods.iter().zip(windows.iter()) {
            let mut builder = StlBuilder::new(period)
                .seasonal_window(window)
                .seasonal_degree(self.seasonal_degree)
                .trend_degree(self.trend_degree)
                .low_pass_degree(self.low_pass_degree)
                .seasonal_jump(self.seasonal_jump)
                .trend_jump(self.trend_jump)
                .low_pass_jump(self.low_pass_jump);
            if let Some(w) = self.trend_window {
                builder = builder.trend_window(w);
            }
            if let Some(n) = self.inner_iterations {
                builder = builder.inner_iterations(n);
            }
            if let Some(n) = self.outer_iterations {
                builder = builder.outer_iterations(n);
            }
            if self.robust {
                builder = builder.robust();
            }
            decomposers.push(builder.build()?);
        }

        Ok(Mstl {
            periods: self.periods,
            decomposers,
            iterate,
            lambda: self.lambda,
        })
    }
}

/// Multi-period decomposer with validated configuration.
#[derive(Debug, Clone)]
pub struct Mstl {
    periods: Vec<usize>,
    decomposers: Vec<Stl>,
    iterate: usize,
    lambda: Lambda,
}

impl Mstl {
    /// Builder entry point.
    pub fn builder(periods: &[usize]) -> MstlBuilder {
        MstlBuilder::new(periods)
    }

    /// The seasonal periods, in extraction order.
    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    /// Decompose a series into trend, one seasonal component per period,
    /// and residual.
    pub fn decompose(&self, series: &TimeSeries) -> Result<DecompositionResult> {
        let values = series.values();
        let n = values.len();
        let max_period = *self.periods.iter().max().unwrap_or(&2);
        for &period in &self.periods {
            if n < 2 * period {
                return Err(DecomposeError::InvalidPeriod(format!(
                    "period {period} requires at least {} observations, got {n}",
                    2 * period
                )));
            }
        }

        let transform = boxcox::apply(values, self.lambda, max_period)?;
        let (working, lambda) = match transform {
            Some((transformed, state)) => (transformed, Some(state.lambda)),
            None => (values.to_vec(), None),
        };

        let k = self.periods.len();
        let mut seasonals = vec![vec![0.0; n]; k];
        let mut trend = vec![0.0; n];

        for _ in 0..self.iterate {
            for idx in 0..k {
                // Remove every seasonal component except the one being
                // re-estimated.
                let mut deseasonalized = working.clone();
                for (other, seasonal) in seasonals.iter().enumerate() {
                    if other != idx {
                        for (d, s) in deseasonalized.iter_mut().zip(seasonal.iter()) {
                            *d -= s;
                        }
                    }
                }

                let fit = self.decomposers[idx].decompose(&deseasonalized)?;
                seasonals[idx] = fit.seasonal;
                trend = fit.trend;
            }
        }

        let residual: Vec<f64> = (0..n)
            .map(|i| {
                let seasonal: f64 = seasonals.iter().map(|s| s[i]).sum();
                working[i] - trend[i] - seasonal
            })
            .collect();

        Ok(DecompositionResult {
            name: series.name().to_string(),
            timestamps: series.timestamps().map(<[DateTime<Utc>]>::to_vec),
            periods: self.periods.clone(),
            observed: working,
            trend,
            seasonals,
            residual,
            lambda,
        })
    }
}

/// Output of an MSTL decomposition.
///
/// All components live in the working space: the Box-Cox transformed scale
/// when a transform was applied, the original scale otherwise. The additive
/// identity observed = trend + seasonals + residual holds exactly in that
/// space; [`DecompositionResult::reconstructed`] maps the sum back to the
/// original scale.
#[derive(Debug, Clone)]
pub struct DecompositionResult {
    name: String,
    timestamps: Option<Vec<DateTime<Utc>>>,
    periods: Vec<usize>,
    observed: Vec<f64>,
    trend: Vec<f64>,
    seasonals: Vec<Vec<f64>>,
    residual: Vec<f64>,
    lambda: Option<f64>,
}

impl DecompositionResult {
    /// Name of the source series.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timestamps of the source series, if it carried any.
    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.timestamps.as_deref()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    /// Whether the decomposition is empty. Construction prevents this.
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// The series as decomposed, in the working space.
    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    /// Trend component.
    pub fn trend(&self) -> &[f64] {
        &self.trend
    }

    /// Residual component.
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    /// The periods that were extracted, in extraction order.
    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    /// Seasonal component for the given period, if it was extracted. When
    /// a period appears more than once, the first occurrence is returned.
    pub fn seasonal(&self, period: usize) -> Option<&[f64]> {
        self.periods
            .iter()
            .position(|&p| p == period)
            .map(|idx| self.seasonals[idx].as_slice())
    }

    /// All seasonal components, ordered like [`DecompositionResult::periods`].
    pub fn seasonal_components(&self) -> &[Vec<f64>] {
        &self.seasonals
    }

    /// Component labels of the form `seasonal_<period>`.
    pub fn component_names(&self) -> Vec<String> {
        self.periods.iter().map(|p| format!("seasonal_{p}")).collect()
    }

    /// Elementwise sum of all seasonal components.
    pub fn total_seasonal(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.observed.len()];
        for seasonal in &self.seasonals {
            for (t, s) in total.iter_mut().zip(seasonal.iter()) {
                *t += s;
            }
        }
        total
    }

    /// Strength of the seasonal component at the given index, in [0, 1].
    pub fn seasonal_strength(&self, index: usize) -> Option<f64> {
        self.seasonals
            .get(index)
            .map(|s| component_strength(s, &self.residual))
    }

    /// Trend strength in [0, 1].
    pub fn trend_strength(&self) -> f64 {
        component_strength(&self.trend, &self.residual)
    }

    /// Resolved Box-Cox lambda, if a transform was applied.
    pub fn lambda(&self) -> Option<f64> {
        self.lambda
    }

    /// Sum of all components mapped back to the original scale. Without a
    /// Box-Cox transform this equals the observed series exactly.
    pub fn reconstructed(&self) -> Vec<f64> {
        let mut sum = self.total_seasonal();
        for i in 0..sum.len() {
            sum[i] += self.trend[i] + self.residual[i];
        }
        match self.lambda {
            Some(lambda) => boxcox::inv_boxcox(&sum, lambda),
            None => sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_period_series(n: usize) -> TimeSeries {
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                50.0 + 0.05 * t
                    + 8.0 * (2.0 * std::f64::consts::PI * t / 12.0).sin()
                    + 4.0 * (2.0 * std::f64::consts::PI * t / 5.0).sin()
            })
            .collect();
        TimeSeries::new("two_period", values).unwrap()
    }

    #[test]
    fn additive_identity_holds() {
        let series = two_period_series(240);
        let mstl = Mstl::builder(&[5, 12]).build().unwrap();
        let result = mstl.decompose(&series).unwrap();

        let total = result.total_seasonal();
        for i in 0..series.len() {
            let sum = result.trend()[i] + total[i] + result.residual()[i];
            assert_relative_eq!(result.observed()[i], sum, epsilon = 1e-10);
        }
    }

    #[test]
    fn single_period_matches_plain_stl() {
        let values: Vec<f64> = (0..120)
            .map(|i| {
                0.2 * i as f64 + 6.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()
            })
            .collect();
        let series = TimeSeries::new("single", values.clone()).unwrap();

        let mstl = Mstl::builder(&[12])
            .seasonal_windows(&[13])
            .build()
            .unwrap();
        let multi = mstl.decompose(&series).unwrap();

        let stl = Stl::builder(12).seasonal_window(13).build().unwrap();
        let single = stl.decompose(&values).unwrap();

        for i in 0..values.len() {
            assert_relative_eq!(multi.trend()[i], single.trend[i], epsilon = 1e-10);
            assert_relative_eq!(
                multi.seasonal(12).unwrap()[i],
                single.seasonal[i],
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn recovers_both_seasonal_periods() {
        let series = two_period_series(480);
        let mstl = Mstl::builder(&[5, 12]).build().unwrap();
        let result = mstl.decompose(&series).unwrap();

        assert_eq!(result.periods(), &[5, 12]);
        assert!(result.seasonal_strength(0).unwrap() > 0.5);
        assert!(result.seasonal_strength(1).unwrap() > 0.5);
        assert!(result.seasonal(7).is_none());
    }

    #[test]
    fn default_windows_pair_with_periods_not_positions() {
        // With default windows, reversing the extraction order must keep
        // each period on the same window, so the extracted components
        // agree once the refinement passes converge.
        let series = two_period_series(240);
        let forward = Mstl::builder(&[5, 12])
            .iterate(3)
            .build()
            .unwrap()
            .decompose(&series)
            .unwrap();
        let reverse = Mstl::builder(&[12, 5])
            .iterate(3)
            .build()
            .unwrap()
            .decompose(&series)
            .unwrap();

        for period in [5, 12] {
            let fwd = forward.seasonal(period).unwrap();
            let rev = reverse.seasonal(period).unwrap();
            let diff = fwd
                .iter()
                .zip(rev.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f64, f64::max);
            assert!(
                diff < 0.5,
                "seasonal_{period} differs across extraction orders by {diff}"
            );
        }
    }

    #[test]
    fn component_names_follow_period_order() {
        let series = two_period_series(240);
        let mstl = Mstl::builder(&[12, 5]).build().unwrap();
        let result = mstl.decompose(&series).unwrap();
        assert_eq!(result.component_names(), vec!["seasonal_12", "seasonal_5"]);
    }

    #[test]
    fn length_exactly_twice_longest_period_succeeds() {
        let series = two_period_series(24);
        let mstl = Mstl::builder(&[5, 12]).build().unwrap();
        assert!(mstl.decompose(&series).is_ok());
    }

    #[test]
    fn period_longer_than_half_series_fails() {
        let series = two_period_series(23);
        let mstl = Mstl::builder(&[5, 12]).build().unwrap();
        let err = mstl.decompose(&series).unwrap_err();
        assert!(matches!(err, DecomposeError::InvalidPeriod(_)));
    }

    #[test]
    fn empty_period_list_rejected() {
        let err = Mstl::builder(&[]).build().unwrap_err();
        assert!(matches!(err, DecomposeError::InvalidInput(_)));
    }

    #[test]
    fn mismatched_window_count_rejected() {
        let err = Mstl::builder(&[5, 12])
            .seasonal_windows(&[11])
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            DecomposeError::MismatchedLength {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn invalid_forwarded_degree_rejected() {
        let err = Mstl::builder(&[12]).trend_degree(3).build().unwrap_err();
        assert!(matches!(err, DecomposeError::InvalidInput(_)));
    }

    #[test]
    fn forwarded_jumps_keep_additive_identity() {
        let series = two_period_series(240);
        let mstl = Mstl::builder(&[5, 12])
            .seasonal_jump(2)
            .trend_jump(3)
            .low_pass_jump(2)
            .build()
            .unwrap();
        let result = mstl.decompose(&series).unwrap();
        let total = result.total_seasonal();
        for i in 0..series.len() {
            let sum = result.trend()[i] + total[i] + result.residual()[i];
            assert_relative_eq!(result.observed()[i], sum, epsilon = 1e-10);
        }
    }

    #[test]
    fn window_not_exceeding_period_rejected() {
        let err = Mstl::builder(&[12])
            .seasonal_windows(&[11])
            .build()
            .unwrap_err();
        assert!(matches!(err, DecomposeError::InvalidInput(_)));
    }

    #[test]
    fn boxcox_reconstruction_returns_to_original_scale() {
        let values: Vec<f64> = (0..120)
            .map(|i| {
                let t = i as f64;
                (20.0 + 0.1 * t) * (1.0 + 0.2 * (2.0 * std::f64::consts::PI * t / 12.0).sin())
            })
            .collect();
        let series = TimeSeries::new("positive", values.clone()).unwrap();
        let mstl = Mstl::builder(&[12])
            .lambda(Lambda::Fixed(0.0))
            .build()
            .unwrap();
        let result = mstl.decompose(&series).unwrap();

        assert_eq!(result.lambda(), Some(0.0));
        // Observed is reported in log space.
        assert_relative_eq!(result.observed()[0], values[0].ln(), epsilon = 1e-10);
        let reconstructed = result.reconstructed();
        for i in 0..values.len() {
            assert_relative_eq!(reconstructed[i], values[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn auto_lambda_requires_positive_values() {
        let series = TimeSeries::new("mixed", vec![1.0, -2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mstl = Mstl::builder(&[2]).lambda(Lambda::Auto).build().unwrap();
        let err = mstl.decompose(&series).unwrap_err();
        assert!(matches!(err, DecomposeError::InvalidInput(_)));
    }

    #[test]
    fn metadata_is_preserved() {
        use chrono::TimeZone;
        let values: Vec<f64> = (0..24).map(|i| (i % 5) as f64 + 1.0).collect();
        let timestamps: Vec<_> = (0..24)
            .map(|i| Utc.with_ymd_and_hms(2024, 1, 1, i, 0, 0).unwrap())
            .collect();
        let series = TimeSeries::with_timestamps("hourly", timestamps, values).unwrap();
        let mstl = Mstl::builder(&[5]).build().unwrap();
        let result = mstl.decompose(&series).unwrap();
        assert_eq!(result.name(), "hourly");
        assert_eq!(result.timestamps().unwrap().len(), 24);
    }
}
