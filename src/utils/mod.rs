//! Utility functions for the decomposition engine.

pub mod stats;

pub use stats::{autocorrelation, mean, median, std_dev, variance};
