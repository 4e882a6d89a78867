//! Core data structures for time series decomposition.

mod time_series;

pub use time_series::TimeSeries;
