//! Seasonal-trend decomposition of time series with multiple seasonal
//! periods (MSTL).
//!
//! The crate provides LOESS smoothing, single-period STL, an MSTL
//! orchestrator for series with several overlapping seasonalities, and an
//! optional Box-Cox pre-transform with Guerrero lambda selection.
//!
//! # Example
//!
//! ```
//! use mstl_decomp::prelude::*;
//!
//! let values: Vec<f64> = (0..96)
//!     .map(|i| {
//!         let t = i as f64;
//!         10.0 + 0.1 * t + 3.0 * (2.0 * std::f64::consts::PI * t / 12.0).sin()
//!     })
//!     .collect();
//! let series = TimeSeries::new("demand", values)?;
//!
//! let mstl = Mstl::builder(&[12]).build()?;
//! let result = mstl.decompose(&series)?;
//!
//! assert_eq!(result.trend().len(), series.len());
//! assert!(result.seasonal(12).is_some());
//! # Ok::<(), mstl_decomp::DecomposeError>(())
//! ```

#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod decompose;
pub mod error;
pub mod smooth;
pub mod transform;
pub mod utils;

pub use error::{DecomposeError, Result};

/// Common imports for typical use of the crate.
pub mod prelude {
    pub use crate::core::TimeSeries;
    pub use crate::decompose::{
        DecompositionResult, Mstl, MstlBuilder, Stl, StlBuilder, StlDecomposition,
    };
    pub use crate::error::{DecomposeError, Result};
    pub use crate::smooth::{LoessSmoother, SmootherConfig};
    pub use crate::transform::{BoxCoxState, Lambda};
}
