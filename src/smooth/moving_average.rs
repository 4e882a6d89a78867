//! Centered moving averages and the STL low-pass cascade.

/// Centered moving average of the given length.
///
/// Produces `n - length + 1` values, one per full window; the output is
/// shorter than the input by construction. Callers needing full length
/// re-extend via the LOESS engine.
pub fn moving_average(series: &[f64], length: usize) -> Vec<f64> {
    let n = series.len();
    assert!(length >= 1, "moving average length must be at least 1");
    if n < length {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(n - length + 1);
    let inv = 1.0 / length as f64;
    let mut sum: f64 = series[..length].iter().sum();
    out.push(sum * inv);
    for i in length..n {
        sum += series[i] - series[i - length];
        out.push(sum * inv);
    }
    out
}

/// STL low-pass filter cascade: MA(period), MA(period), MA(3).
///
/// Applied to a seasonal estimate extended by one full cycle on each side
/// (length `n + 2 * period`), the cascade returns exactly `n` values
/// aligned with the original observations.
pub fn low_pass_cascade(series: &[f64], period: usize) -> Vec<f64> {
    let ma1 = moving_average(series, period);
    let ma2 = moving_average(&ma1, period);
    moving_average(&ma2, 3)
}
