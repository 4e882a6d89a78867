//! Smoothing primitives: local regression and moving averages.

mod loess;
mod moving_average;

pub use loess::{LoessSmoother, SmootherConfig};
pub use moving_average::{low_pass_cascade, moving_average};
