//! loglik_optimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types and Argmin solver aliases used by the
//! log-likelihood optimizer, so the rest of the crate never spells out
//! Argmin generics directly.
//!
//! Key behaviors
//! -------------
//! - Canonical aliases for parameter vectors, gradients, Hessians and scalar
//!   costs (`Theta`, `Grad`, `Hessian`, `Cost`).
//! - A map type for Argmin function-evaluation counters (`FnEvalMap`).
//! - Pre-wired solver aliases for every supported method: Nelder–Mead,
//!   BFGS, L-BFGS, nonlinear conjugate gradient and Newton–CG (each with
//!   either line search), and a Steihaug trust region.
//!
//! Invariants & assumptions
//! ------------------------
//! - All optimizer vectors and matrices are `ndarray` containers over `f64`.
//! - `Cost` is a scalar in negative log-likelihood space; higher layers flip
//!   signs between cost and log-likelihood.
//!
//! Conventions
//! -----------
//! - `DEFAULT_LBFGS_MEM` is the history size used when options leave it
//!   unset.
//! - The conjugate-gradient aliases use the Polak–Ribière update.
//!
//! Testing notes
//! -------------
//! - Type aliases only; exercised by the builder and runner tests.
use argmin::solver::{
    conjugategradient::{NonlinearConjugateGradient, beta::PolakRibiere},
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    neldermead::NelderMead,
    newton::NewtonCG,
    quasinewton::{BFGS, LBFGS},
    trustregion::{Steihaug, TrustRegion},
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ` in optimizer coordinates.
pub type Theta = Array1<f64>;

/// Gradient vector `∇ℓ(θ)` or `∇c(θ)`, same shape as `Theta`.
pub type Grad = Array1<f64>;

/// Dense Hessian matrix, `n × n` for `n = Theta.len()`.
pub type Hessian = Array2<f64>;

/// Scalar objective value; the cost `c(θ) = -ℓ(θ)`.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver
/// (e.g. `"cost_count"`, `"gradient_count"`, `"hessian_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search specialized to this crate's numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search specialized to this crate's numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// Derivative-free simplex solver.
pub type NelderMeadSolver = NelderMead<Theta, Cost>;

/// L-BFGS wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;

/// BFGS (dense inverse-Hessian update) with Hager–Zhang line search.
pub type BfgsHagerZhang = BFGS<HagerZhangLS, Cost>;

/// BFGS (dense inverse-Hessian update) with More–Thuente line search.
pub type BfgsMoreThuente = BFGS<MoreThuenteLS, Cost>;

/// Polak–Ribière nonlinear CG with Hager–Zhang line search.
pub type CgHagerZhang = NonlinearConjugateGradient<Theta, HagerZhangLS, PolakRibiere, Cost>;

/// Polak–Ribière nonlinear CG with More–Thuente line search.
pub type CgMoreThuente = NonlinearConjugateGradient<Theta, MoreThuenteLS, PolakRibiere, Cost>;

/// Line-search Newton–CG with Hager–Zhang line search.
pub type NewtonCgHagerZhang = NewtonCG<HagerZhangLS, Cost>;

/// Line-search Newton–CG with More–Thuente line search.
pub type NewtonCgMoreThuente = NewtonCG<MoreThuenteLS, Cost>;

/// Trust-region Newton method with a Steihaug truncated-CG subproblem.
pub type TrustRegionSteihaug = TrustRegion<Steihaug<Theta, Cost>, Cost>;
