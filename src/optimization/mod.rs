//! optimization — solver stack, root finding, log-space transforms and the
//! crate error surface.
//!
//! Purpose
//! -------
//! Provide the numerical machinery the profile-likelihood engines drive:
//! an Argmin-backed maximizer for multivariate problems, a bracketing root
//! finder for the one-dimensional noise-ratio problem, and the transforms
//! between public hyperparameters and optimizer coordinates.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: maximize a [`LogLikelihood`](loglik_optimizer::LogLikelihood)
//!   with Nelder–Mead, BFGS, L-BFGS, nonlinear CG, Newton–CG or a trust
//!   region.
//! - `root_finding`: sign-change search plus Chandrupatla refinement.
//! - `numerical_stability`: `log10 η` ↔ `η` conversions with the `0` / `∞`
//!   limits, and distance-scale folding.
//! - `errors`: a single enum [`OptError`](errors::OptError) with alias
//!   `OptResult<T>`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Invalid inputs and numerical failures are reported as `OptError`, never
//!   panics.
//! - Solvers work in log-space coordinates; callers convert back.
//!
//! Conventions
//! -----------
//! - All solvers maximize `ℓ` by minimizing `-ℓ`; outcomes are expressed in
//!   terms of `ℓ`.
//! - Diagnostics go through the `log` facade; nothing here installs a
//!   logger.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests on closed-form problems.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;
pub mod root_finding;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
    pub use super::root_finding::{RootOptions, chandrupatla_method, find_interval_with_sign_change};
}
