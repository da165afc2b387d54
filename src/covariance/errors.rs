//! Error handling for covariance operators.
//!
//! This module defines `CovarianceError`, returned by every fallible method of
//! a [`CovarianceOperator`](crate::covariance::CovarianceOperator): distance
//! scale configuration, argument validation, and factorization failures. The
//! alias `CovResult<T>` standardizes return types; the likelihood engines
//! lift these errors into `OptError` through `From`.

/// Unified error type for covariance operators.
#[derive(Debug, Clone, PartialEq)]
pub enum CovarianceError {
    // ---- Distance scale ----
    /// An operation needed the distance scale before it was set.
    DistanceScaleUnset,

    /// Distance scale length does not match the spatial dimension.
    DistanceScaleDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Distance scale entries must be finite and strictly positive.
    InvalidDistanceScale {
        index: usize,
        value: f64,
    },

    // ---- Arguments ----
    /// Eta must be finite and non-negative.
    InvalidEta {
        value: f64,
    },

    /// Derivative index exceeds the number of distance scales.
    DerivativeIndexOutOfRange {
        index: usize,
        dimension: usize,
    },

    /// Only derivatives of order 0, 1 and 2 are available.
    UnsupportedDerivativeOrder {
        order: usize,
    },

    /// Only `tr(K⁻¹)` and `tr(K⁻²)` are available.
    UnsupportedTraceExponent {
        exponent: u32,
    },

    /// Right-hand side must have one row per point.
    RhsDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Point set must be non-empty and finite.
    InvalidPoints {
        reason: &'static str,
    },

    // ---- Factorization ----
    /// `C(θ) + ηI` has no Cholesky factor.
    NotPositiveDefinite {
        eta: f64,
    },
}

pub type CovResult<T> = Result<T, CovarianceError>;

impl std::error::Error for CovarianceError {}

impl std::fmt::Display for CovarianceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Distance scale ----
            CovarianceError::DistanceScaleUnset => {
                write!(f, "Covariance Error: distance scale is not set")
            }
            CovarianceError::DistanceScaleDimMismatch { expected, found } => write!(
                f,
                "Covariance Error: distance scale has length {found}, expected {expected}"
            ),
            CovarianceError::InvalidDistanceScale { index, value } => write!(
                f,
                "Covariance Error: distance scale[{index}] = {value}, must be finite and > 0"
            ),

            // ---- Arguments ----
            CovarianceError::InvalidEta { value } => {
                write!(f, "Covariance Error: eta = {value}, must be finite and >= 0")
            }
            CovarianceError::DerivativeIndexOutOfRange { index, dimension } => write!(
                f,
                "Covariance Error: derivative index {index} out of range for dimension {dimension}"
            ),
            CovarianceError::UnsupportedDerivativeOrder { order } => {
                write!(f, "Covariance Error: derivative order {order} not supported")
            }
            CovarianceError::UnsupportedTraceExponent { exponent } => {
                write!(f, "Covariance Error: trace of K^-{exponent} not supported")
            }
            CovarianceError::RhsDimMismatch { expected, found } => {
                write!(f, "Covariance Error: right-hand side has {found} rows, expected {expected}")
            }
            CovarianceError::InvalidPoints { reason } => {
                write!(f, "Covariance Error: invalid points: {reason}")
            }

            // ---- Factorization ----
            CovarianceError::NotPositiveDefinite { eta } => {
                write!(f, "Covariance Error: K(eta) is not positive definite at eta = {eta}")
            }
        }
    }
}
