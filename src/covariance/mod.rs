//! covariance — the covariance-operator collaborator of the likelihood engines.
//!
//! Purpose
//! -------
//! Define the algebraic contract ([`CovarianceOperator`]) through which the
//! profile-likelihood engines touch the covariance `σ²C(θ) + σ0²I`, and ship a
//! dense reference implementation ([`DenseCovariance`]) backed by `nalgebra`
//! Cholesky factorizations.
//!
//! Key behaviors
//! -------------
//! - Normalized algebra on `K(η) = C(θ) + ηI`: solves, log-determinant and
//!   traces of `K⁻¹`, `K⁻²`.
//! - Materialization of the covariance and of its first/second partial
//!   derivatives with respect to the distance scale.
//! - A trace oracle hook (`trace_solve`) that matrix-free operators can
//!   override with an estimator.
//!
//! Invariants & assumptions
//! ------------------------
//! - The distance scale is the only stored hyperparameter; `η`, `σ`, `σ0`
//!   are call arguments.
//! - Setting the distance scale invalidates every cached factorization.
//!
//! Downstream usage
//! ----------------
//! - `likelihood::profile` and `likelihood::double_profile` are generic over
//!   `C: CovarianceOperator` and receive the operator as `&mut C`.
//!
//! Testing notes
//! -------------
//! - `dense` and `kernel` carry unit tests for the algebra and derivatives.

pub mod dense;
pub mod errors;
pub mod kernel;
pub mod operator;

pub use self::dense::DenseCovariance;
pub use self::errors::{CovResult, CovarianceError};
pub use self::kernel::Kernel;
pub use self::operator::CovarianceOperator;
