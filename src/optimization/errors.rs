//! optimization::errors — unified error surface for likelihood fitting.
//!
//! Purpose
//! -------
//! Collect every failure the fitting stack can report (option validation,
//! derivative validation, root finding, covariance algebra, profile-likelihood
//! degeneracies and Argmin backend errors) into one enum, [`OptError`], with
//! the result alias [`OptResult`].
//!
//! Conventions
//! -----------
//! - Variants carry the offending value plus a short static reason where a
//!   human-readable hint helps.
//! - Argmin errors are mapped back into `OptError`. Errors raised by our own
//!   objectives travel through Argmin as `anyhow` payloads and are recovered
//!   by downcasting before the `ArgminError` mapping is attempted.
//! - Covariance-operator failures arrive as [`CovarianceError`] and are
//!   flattened into the matching `OptError` variants.
use argmin::core::{ArgminError, Error};

use crate::covariance::errors::CovarianceError;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Implies that FD should be used
    GradientNotImplemented,

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- Hessian ----
    /// Implies that a finite-difference Hessian of the gradient should be used.
    HessianNotImplemented,

    /// Hessian matrix dimensions do not match parameter dimensions.
    HessianDimMismatch {
        expected: usize,
        found: (usize, usize),
    },

    /// Hessian values need to be finite.
    InvalidHessian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- MLEOptions ----
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// At least one tolerance must be provided.
    NoTolerancesProvided,

    /// Invalid line searcher name.
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },

    /// lbfgs_mem needs to be at least 1.
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },

    /// Unknown or inapplicable optimization method.
    InvalidOptimizationMethod {
        name: String,
        reason: &'static str,
    },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Theta hat is missing
    MissingThetaHat,

    // ---- Root finding ----
    /// Root tolerance must be positive and finite.
    InvalidRootTolerance {
        tol: f64,
        reason: &'static str,
    },
    /// Search interval is malformed or does not bracket a root.
    InvalidBracket {
        lo: f64,
        hi: f64,
        reason: &'static str,
    },
    /// Root function produced a non-finite value.
    NonFiniteRootFunction {
        x: f64,
        value: f64,
    },

    // ---- Profile likelihood ----
    /// Hyperparameter vector has the wrong length.
    InvalidHyperparamLength {
        expected: usize,
        found: usize,
    },
    /// Hyperparameter entry is not admissible.
    InvalidHyperparam {
        index: usize,
        value: f64,
        reason: &'static str,
    },
    /// Observation, design or operator dimensions disagree.
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Need more observations than mean regressors.
    InsufficientData {
        n: usize,
        m: usize,
    },
    /// Normal-equation matrix of the mean basis is not positive definite.
    SingularDesign {
        what: &'static str,
    },
    /// Profiled residual quadratic form is not strictly positive.
    DegenerateResidual {
        value: f64,
    },
    /// First derivative keeps one sign over the search interval but disagrees
    /// with the boundary behaviour at eta = 0.
    NonUnimodalLikelihood {
        der1_lo: f64,
        der1_hi: f64,
        der1_zero: f64,
        der2_zero: f64,
    },

    // ---- Covariance operator ----
    /// Distance scale has not been set on the operator.
    DistanceScaleUnset,
    /// Distance scale length does not match the spatial dimension.
    DistanceScaleDimMismatch {
        expected: usize,
        found: usize,
    },
    /// Distance scale entries must be finite and positive.
    InvalidDistanceScale {
        index: usize,
        value: f64,
    },
    /// Eta must be finite and non-negative for covariance algebra.
    InvalidEta {
        value: f64,
    },
    /// Covariance matrix failed its Cholesky factorization.
    NotPositiveDefinite {
        eta: f64,
    },
    /// Derivative index exceeds the number of distance scales.
    DerivativeIndexOutOfRange {
        index: usize,
        dimension: usize,
    },
    /// Only derivatives of order up to two are available.
    UnsupportedDerivativeOrder {
        order: usize,
    },
    /// Only traces of K⁻¹ and K⁻² are available.
    UnsupportedTraceExponent {
        exponent: u32,
    },
    /// Right-hand side does not have one row per point.
    RhsDimMismatch {
        expected: usize,
        found: usize,
    },
    /// Point coordinates must be finite and non-empty.
    InvalidPoints {
        reason: &'static str,
    },

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Gradient optimization not implemented")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- Hessian ----
            OptError::HessianNotImplemented => {
                write!(f, "Analytic Hessian not implemented")
            }
            OptError::HessianDimMismatch { expected, found } => {
                write!(
                    f,
                    "Hessian dimension mismatch: expected ({expected}, {expected}), found {found:?}"
                )
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Invalid Hessian at ({row}, {col}): {value}, must be finite")
            }

            // ---- MLEOptions ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "No tolerances provided")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }
            OptError::InvalidOptimizationMethod { name, reason } => {
                write!(f, "Invalid optimization method '{name}': {reason}")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated parameters (theta hat)")
            }

            // ---- Root finding ----
            OptError::InvalidRootTolerance { tol, reason } => {
                write!(f, "Invalid root tolerance {tol}: {reason}")
            }
            OptError::InvalidBracket { lo, hi, reason } => {
                write!(f, "Invalid bracket [{lo}, {hi}]: {reason}")
            }
            OptError::NonFiniteRootFunction { x, value } => {
                write!(f, "Root function is non-finite at x = {x}: {value}")
            }

            // ---- Profile likelihood ----
            OptError::InvalidHyperparamLength { expected, found } => {
                write!(f, "Hyperparameter length mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidHyperparam { index, value, reason } => {
                write!(f, "Invalid hyperparameter at index {index}: {value}: {reason}")
            }
            OptError::DimensionMismatch { what, expected, found } => {
                write!(f, "Dimension mismatch for {what}: expected {expected}, found {found}")
            }
            OptError::InsufficientData { n, m } => {
                write!(f, "Need more observations than regressors: n = {n}, m = {m}")
            }
            OptError::SingularDesign { what } => {
                write!(f, "Singular design: {what} is not positive definite")
            }
            OptError::DegenerateResidual { value } => {
                write!(f, "Degenerate profiled residual: z'Mz = {value}, must be positive")
            }
            OptError::NonUnimodalLikelihood { der1_lo, der1_hi, der1_zero, der2_zero } => {
                write!(
                    f,
                    "Likelihood is not unimodal in eta: dl/deta = {der1_lo} and {der1_hi} at the \
                     interval ends, dl/deta(0) = {der1_zero}, d2l/deta2(0) = {der2_zero}"
                )
            }

            // ---- Covariance operator ----
            OptError::DistanceScaleUnset => {
                write!(f, "Distance scale is not set on the covariance operator")
            }
            OptError::DistanceScaleDimMismatch { expected, found } => {
                write!(f, "Distance scale length mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidDistanceScale { index, value } => {
                write!(
                    f,
                    "Invalid distance scale at index {index}: {value}, must be finite and > 0"
                )
            }
            OptError::InvalidEta { value } => {
                write!(f, "Invalid eta: {value}, must be finite and >= 0")
            }
            OptError::NotPositiveDefinite { eta } => {
                write!(f, "Covariance matrix is not positive definite at eta = {eta}")
            }
            OptError::DerivativeIndexOutOfRange { index, dimension } => {
                write!(f, "Derivative index {index} out of range for dimension {dimension}")
            }
            OptError::UnsupportedDerivativeOrder { order } => {
                write!(f, "Derivative of order {order} is not supported (max 2)")
            }
            OptError::UnsupportedTraceExponent { exponent } => {
                write!(f, "Trace of inverse power {exponent} is not supported (1 or 2)")
            }
            OptError::RhsDimMismatch { expected, found } => {
                write!(f, "Right-hand side has {found} rows, expected {expected}")
            }
            OptError::InvalidPoints { reason } => {
                write!(f, "Invalid points: {reason}")
            }

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<CovarianceError> for OptError {
    fn from(err: CovarianceError) -> Self {
        match err {
            CovarianceError::DistanceScaleUnset => OptError::DistanceScaleUnset,
            CovarianceError::DistanceScaleDimMismatch { expected, found } => {
                OptError::DistanceScaleDimMismatch { expected, found }
            }
            CovarianceError::InvalidDistanceScale { index, value } => {
                OptError::InvalidDistanceScale { index, value }
            }
            CovarianceError::InvalidEta { value } => OptError::InvalidEta { value },
            CovarianceError::NotPositiveDefinite { eta } => OptError::NotPositiveDefinite { eta },
            CovarianceError::DerivativeIndexOutOfRange { index, dimension } => {
                OptError::DerivativeIndexOutOfRange { index, dimension }
            }
            CovarianceError::UnsupportedDerivativeOrder { order } => {
                OptError::UnsupportedDerivativeOrder { order }
            }
            CovarianceError::UnsupportedTraceExponent { exponent } => {
                OptError::UnsupportedTraceExponent { exponent }
            }
            CovarianceError::RhsDimMismatch { expected, found } => {
                OptError::RhsDimMismatch { expected, found }
            }
            CovarianceError::InvalidPoints { reason } => OptError::InvalidPoints { reason },
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<OptError> for pyo3::PyErr {
    fn from(err: OptError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(format!("OptError: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Recovery of crate errors that travelled through `argmin::core::Error`.
    // - Mapping of `ArgminError` variants and foreign errors.
    // - Flattening of `CovarianceError` into `OptError`.
    //
    // They intentionally DO NOT cover:
    // - The `From<OptError> for PyErr` conversion, which requires the Python
    //   C API.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // An `OptError` raised inside an objective and boxed by Argmin must come
    // back unchanged.
    //
    // Given
    // -----
    // - `OptError::SingularDesign` converted into `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `OptError::from` returns the original variant.
    fn from_argmin_error_recovers_crate_error() {
        // Arrange
        let original = OptError::SingularDesign { what: "X'K^-1X" };
        let boxed: Error = original.clone().into();

        // Act
        let recovered = OptError::from(boxed);

        // Assert
        assert_eq!(recovered, original);
    }

    #[test]
    // Purpose
    // -------
    // Argmin's own error variants map to their named wrappers.
    //
    // Given
    // -----
    // - `ArgminError::ConditionViolated` boxed as `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `OptError::ConditionViolated` with the same text.
    fn from_argmin_error_maps_condition_violated() {
        // Arrange
        let boxed: Error =
            ArgminError::ConditionViolated { text: "not a descent direction".to_string() }.into();

        // Act
        let mapped = OptError::from(boxed);

        // Assert
        assert_eq!(
            mapped,
            OptError::ConditionViolated { text: "not a descent direction".to_string() }
        );
    }

    #[test]
    // Purpose
    // -------
    // Covariance failures keep their payload when flattened.
    //
    // Given
    // -----
    // - `CovarianceError::NotPositiveDefinite { eta: 0.5 }`.
    //
    // Expect
    // ------
    // - `OptError::NotPositiveDefinite { eta: 0.5 }` and a message naming eta.
    fn from_covariance_error_preserves_payload() {
        // Arrange
        let err = CovarianceError::NotPositiveDefinite { eta: 0.5 };

        // Act
        let mapped = OptError::from(err);

        // Assert
        assert_eq!(mapped, OptError::NotPositiveDefinite { eta: 0.5 });
        assert!(mapped.to_string().contains("eta = 0.5"));
    }
}
