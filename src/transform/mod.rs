//! Data transformations applied around the decomposition.

pub mod boxcox;

pub use boxcox::{boxcox, guerrero_lambda, inv_boxcox, BoxCoxState, Lambda};
