//! Statistical helpers shared by the decomposition engine and diagnostics.

/// Mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Median of a slice.
pub fn median(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Lag-k autocorrelation: the Pearson correlation between the series and
/// its lag-k shift, over their overlap. A perfectly periodic sequence
/// scores 1 at its own period regardless of how many cycles the overlap
/// spans.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag >= n {
        return f64::NAN;
    }
    let head = &values[..n - lag];
    let tail = &values[lag..];
    let mh = mean(head);
    let mt = mean(tail);
    let mut num = 0.0;
    let mut den_h = 0.0;
    let mut den_t = 0.0;
    for (h, t) in head.iter().zip(tail.iter()) {
        let x = h - mh;
        let y = t - mt;
        num += x * y;
        den_h += x * x;
        den_t += y * y;
    }
    let denom = (den_h * den_t).sqrt();
    if denom < 1e-12 {
        return 0.0;
    }
    num / denom
}
