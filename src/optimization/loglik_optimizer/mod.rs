//! loglik_optimizer — argmin-powered log-likelihood maximization.
//!
//! Purpose
//! -------
//! Provide a high-level, Argmin-backed layer for **maximizing
//! log-likelihoods** `ℓ(θ)`. Objectives implement a single trait,
//! [`LogLikelihood`], and callers invoke [`maximize`] with a [`SolverKind`],
//! tolerances, and finite-difference fallbacks for missing derivatives.
//!
//! Key behaviors
//! -------------
//! - Convert `ℓ(θ)` into an Argmin cost `c(θ) = -ℓ(θ)` with gradient and
//!   Hessian via [`adapter::ArgMinAdapter`].
//! - [`maximize`] validates the initial guess with [`LogLikelihood::check`],
//!   builds the requested solver via [`builders`], runs it through
//!   [`run::run_solver`] and normalizes the final state into an
//!   [`OptimOutcome`].
//! - [`finite_diff`] supplies gradients and Hessians when analytic ones are
//!   missing, with validation and error capture.
//! - Configuration ([`Tolerances`], [`MLEOptions`]) and checks
//!   ([`validation`]) are centralized so downstream code can assume sane,
//!   finite inputs.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer **always maximizes** `ℓ(θ)` by minimizing `-ℓ(θ)`;
//!   objectives implement `ℓ`, `∇ℓ`, `∇²ℓ`, never the cost.
//! - Objectives report invalid inputs as [`OptError`] values, not panics;
//!   such errors travel through Argmin and come back out unchanged.
//!
//! Conventions
//! -----------
//! - Parameters live in an unconstrained optimizer space as [`Theta`]; any
//!   mapping to constrained model parameters happens in the model layer.
//! - [`OptimOutcome::value`] is a log-likelihood, not a cost.
//!
//! Downstream usage
//! ----------------
//! - The profile-likelihood objectives in `likelihood::objective` implement
//!   [`LogLikelihood`] and are driven through [`maximize`].
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover sign conventions, finite-difference
//!   fallbacks, solver construction, option validation and solver runs on
//!   closed-form objectives.
//!
//! [`OptError`]: crate::optimization::errors::OptError

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{
    Capability, LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, SolverKind, Tolerances,
};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Hessian, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{
        LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, SolverKind, Tolerances,
    };
    pub use super::types::{Cost, Grad, Hessian, Theta};
}
