//! Seasonal-trend decomposition.

mod mstl;
mod stl;

pub use mstl::{DecompositionResult, Mstl, MstlBuilder};
pub use stl::{Stl, StlBuilder, StlDecomposition};
