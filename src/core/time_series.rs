//! TimeSeries data structure for decomposition input.
//!
//! The decomposition engine is purely positional: observations are indexed
//! 0..n-1 with an implicit fixed sampling interval. Timestamps, when
//! supplied, are carried through to the result untouched so that callers
//! can re-align components with their original index.

use crate::error::{DecomposeError, Result};
use chrono::{DateTime, Utc};

/// A named, evenly spaced, complete numeric sequence.
///
/// Invariants enforced at construction:
/// - length >= 2
/// - every value is finite (missing values are rejected, not imputed)
/// - timestamps, when present, match the number of observations
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    timestamps: Option<Vec<DateTime<Utc>>>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series from a name and values.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        validate_values(&values)?;
        Ok(Self {
            name: name.into(),
            timestamps: None,
            values,
        })
    }

    /// Create a series with explicit timestamps.
    ///
    /// Timestamps are metadata only; the engine assumes the caller supplies
    /// them evenly spaced and in order.
    pub fn with_timestamps(
        name: impl Into<String>,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(DecomposeError::MismatchedLength {
                expected: values.len(),
                got: timestamps.len(),
            });
        }
        validate_values(&values)?;
        Ok(Self {
            name: name.into(),
            timestamps: Some(timestamps),
            values,
        })
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Observation values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamps, if any were supplied.
    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.timestamps.as_deref()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series is empty (cannot happen for a constructed series).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn validate_values(values: &[f64]) -> Result<()> {
    if values.len() < 2 {
        return Err(DecomposeError::InvalidInput(format!(
            "series must have at least 2 observations, got {}",
            values.len()
        )));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(DecomposeError::InvalidInput(format!(
            "non-finite value at index {pos}; missing values are not supported"
        )));
    }
    Ok(())
}
