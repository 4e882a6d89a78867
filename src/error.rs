//! Error types for the mstl-decomp library.

use thiserror::Error;

/// Result type alias for decomposition operations.
pub type Result<T> = std::result::Result<T, DecomposeError>;

/// Errors that can occur during decomposition.
///
/// All errors are detected eagerly, before any component is computed;
/// no partial results are ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecomposeError {
    /// Input data violates a precondition (non-finite values, non-positive
    /// values under Box-Cox, even window lengths, insufficient length).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A seasonal period is outside the valid range for the series.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Two parallel sequences (e.g. periods and windows) differ in length.
    #[error("mismatched lengths: expected {expected}, got {got}")]
    MismatchedLength { expected: usize, got: usize },

    /// A numerical computation degenerated beyond what the windowing and
    /// degree-fallback policies can resolve.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}
