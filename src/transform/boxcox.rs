//! Box-Cox power transformation with Guerrero lambda selection.
//!
//! The transform stabilizes variance before decomposition:
//! y' = (y^lambda - 1) / lambda for lambda != 0, ln(y) for lambda == 0.
//! It requires a strictly positive series; the inverse is the algebraic
//! inverse and restores the original scale.

use crate::error::{DecomposeError, Result};
use crate::utils::stats::{mean, std_dev};

/// Lambda choice for the Box-Cox stage of a decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Lambda {
    /// No transform.
    #[default]
    Off,
    /// Fixed lambda supplied by the caller.
    Fixed(f64),
    /// Select lambda from the data via Guerrero's method.
    Auto,
}

/// The lambda actually applied to a series, kept to invert the transform
/// when assembling outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCoxState {
    /// The resolved lambda.
    pub lambda: f64,
}

/// Apply the Box-Cox transform with a fixed lambda.
///
/// Fails with `InvalidInput` if any observation is non-positive.
pub fn boxcox(series: &[f64], lambda: f64) -> Result<Vec<f64>> {
    if let Some(pos) = series.iter().position(|&x| x <= 0.0) {
        return Err(DecomposeError::InvalidInput(format!(
            "Box-Cox requires strictly positive values, found {} at index {pos}",
            series[pos]
        )));
    }
    Ok(series
        .iter()
        .map(|&x| {
            if lambda.abs() < 1e-10 {
                x.ln()
            } else {
                (x.powf(lambda) - 1.0) / lambda
            }
        })
        .collect())
}

/// Inverse Box-Cox transform.
///
/// For lambda != 0: x = (lambda * y + 1)^(1/lambda); for lambda == 0:
/// x = exp(y). Values that leave the transform's range map to NaN.
pub fn inv_boxcox(transformed: &[f64], lambda: f64) -> Vec<f64> {
    transformed
        .iter()
        .map(|&y| {
            if lambda.abs() < 1e-10 {
                y.exp()
            } else {
                let v = lambda * y + 1.0;
                if v <= 0.0 {
                    f64::NAN
                } else {
                    v.powf(1.0 / lambda)
                }
            }
        })
        .collect()
}

/// Select lambda by Guerrero's method.
///
/// The series is split into non-overlapping blocks of `block_len`
/// observations (one seasonal cycle each); for a candidate lambda the
/// dispersion ratio sd_i / mean_i^(1 - lambda) is computed per block, and
/// the lambda minimizing the coefficient of variation of those ratios over
/// the grid [-1, 2] (step 0.01) is chosen.
pub fn guerrero_lambda(series: &[f64], block_len: usize) -> Result<f64> {
    if let Some(pos) = series.iter().position(|&x| x <= 0.0) {
        return Err(DecomposeError::InvalidInput(format!(
            "Box-Cox requires strictly positive values, found {} at index {pos}",
            series[pos]
        )));
    }
    let block_len = block_len.max(2);
    if series.len() < 2 * block_len {
        return Err(DecomposeError::InvalidInput(format!(
            "Guerrero lambda selection needs at least {} observations, got {}",
            2 * block_len,
            series.len()
        )));
    }

    let blocks: Vec<&[f64]> = series.chunks_exact(block_len).collect();
    let means: Vec<f64> = blocks.iter().map(|b| mean(b)).collect();
    let sds: Vec<f64> = blocks.iter().map(|b| std_dev(b)).collect();

    let mut best_lambda = f64::NAN;
    let mut best_cv = f64::INFINITY;
    for step in -100..=200 {
        let lambda = step as f64 / 100.0;
        let ratios: Vec<f64> = means
            .iter()
            .zip(sds.iter())
            .map(|(&m, &s)| s / m.powf(1.0 - lambda))
            .collect();
        let rm = mean(&ratios);
        if !(rm > 1e-12) {
            continue;
        }
        let cv = std_dev(&ratios) / rm;
        if cv.is_finite() && cv < best_cv {
            best_cv = cv;
            best_lambda = lambda;
        }
    }

    if !best_lambda.is_finite() {
        return Err(DecomposeError::NumericalInstability(
            "Guerrero objective was degenerate for every candidate lambda".to_string(),
        ));
    }
    Ok(best_lambda)
}

/// Resolve a `Lambda` choice against the data, returning the transformed
/// series and the state needed to invert it. `Lambda::Off` returns `None`.
pub fn apply(series: &[f64], lambda: Lambda, block_len: usize) -> Result<Option<(Vec<f64>, BoxCoxState)>> {
    match lambda {
        Lambda::Off => Ok(None),
        Lambda::Fixed(l) => {
            let transformed = boxcox(series, l)?;
            Ok(Some((transformed, BoxCoxState { lambda: l })))
        }
        Lambda::Auto => {
            let l = guerrero_lambda(series, block_len)?;
            let transformed = boxcox(series, l)?;
            Ok(Some((transformed, BoxCoxState { lambda: l })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lambda_one_is_shift() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = boxcox(&series, 1.0).unwrap();
        for (i, &x) in series.iter().enumerate() {
            assert_relative_eq!(result[i], x - 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn lambda_zero_is_log() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = boxcox(&series, 0.0).unwrap();
        for (i, &x) in series.iter().enumerate() {
            assert_relative_eq!(result[i], x.ln(), epsilon = 1e-10);
        }
    }

    #[test]
    fn lambda_two_is_scaled_square() {
        let series = vec![1.0, 2.0, 3.0];
        let result = boxcox(&series, 2.0).unwrap();
        assert_relative_eq!(result[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(result[1], 1.5, epsilon = 1e-10);
        assert_relative_eq!(result[2], 4.0, epsilon = 1e-10);
    }

    #[test]
    fn non_positive_values_rejected() {
        assert!(boxcox(&[1.0, 0.0, 2.0], 1.0).is_err());
        assert!(boxcox(&[-1.0, 1.0], 0.5).is_err());
        assert!(guerrero_lambda(&[0.0; 20], 4).is_err());
    }

    #[test]
    fn roundtrip_fixed_lambdas() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        for lambda in [0.0, 0.5, 1.0, 1.7, -0.3] {
            let transformed = boxcox(&series, lambda).unwrap();
            let recovered = inv_boxcox(&transformed, lambda);
            for (orig, rec) in series.iter().zip(recovered.iter()) {
                assert_relative_eq!(orig, rec, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn guerrero_near_zero_for_exponential_data() {
        // Multiplicative noise around exponential growth: sd grows
        // proportionally to the level, so the log transform stabilizes it.
        let series: Vec<f64> = (0..96)
            .map(|i| {
                let level = (0.05 * i as f64).exp();
                let wiggle = 1.0 + 0.2 * (i as f64 * 1.3).sin();
                level * wiggle
            })
            .collect();
        let lambda = guerrero_lambda(&series, 12).unwrap();
        assert!(
            lambda.abs() < 0.5,
            "expected lambda near 0 for exponential data, got {lambda}"
        );
    }

    #[test]
    fn guerrero_stays_on_grid() {
        let series: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let lambda = guerrero_lambda(&series, 6).unwrap();
        assert!((-1.0..=2.0).contains(&lambda));
    }

    #[test]
    fn apply_off_is_identity() {
        assert!(apply(&[1.0, 2.0], Lambda::Off, 2).unwrap().is_none());
    }

    #[test]
    fn apply_fixed_records_state() {
        let (transformed, state) = apply(&[1.0, 2.0, 3.0], Lambda::Fixed(0.0), 2)
            .unwrap()
            .unwrap();
        assert_eq!(state.lambda, 0.0);
        assert_relative_eq!(transformed[1], 2.0_f64.ln(), epsilon = 1e-12);
    }
}
