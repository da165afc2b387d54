//! loglik_optimizer::builders — solver construction helpers.
//!
//! Purpose
//! -------
//! Provide small, focused builders for every supported Argmin solver. These
//! helpers hide Argmin's generic wiring and apply crate-level options
//! (tolerances, L-BFGS memory) so higher-level code can request a configured
//! solver without touching Argmin-specific types.
//!
//! Key behaviors
//! -------------
//! - Nelder–Mead: initial simplex around `θ0` plus a standard-deviation
//!   tolerance taken from `tol_cost` (or `tol_grad` when unset).
//! - BFGS / L-BFGS: gradient and cost-change tolerances.
//! - Nonlinear CG: Polak–Ribière update with periodic restarts.
//! - Newton–CG: gradient tolerance.
//! - Trust region: Steihaug subproblem with a fixed radius schedule.
//!
//! Invariants & assumptions
//! ------------------------
//! - Builders never set `θ0` on the solver state or `max_iters`; those are
//!   runtime concerns applied by [`run_solver`](super::run::run_solver).
//! - Invalid tolerances rejected by Argmin surface as `OptError` through
//!   `From<argmin::core::Error>`.
//!
//! Testing notes
//! -------------
//! - Unit tests check that every builder accepts valid options.
use argmin::solver::{
    conjugategradient::{NonlinearConjugateGradient, beta::PolakRibiere},
    neldermead::NelderMead,
    newton::NewtonCG,
    quasinewton::{BFGS, LBFGS},
    trustregion::{Steihaug, TrustRegion},
};

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{Cost, DEFAULT_LBFGS_MEM, Grad, NelderMeadSolver, Theta, TrustRegionSteihaug},
    },
};

/// Relative size of the initial Nelder–Mead simplex steps.
const SIMPLEX_REL_STEP: f64 = 0.05;

/// Absolute floor on the initial simplex steps, in optimizer coordinates.
const SIMPLEX_MIN_STEP: f64 = 0.25;

/// Restart nonlinear CG every this many iterations.
const CG_RESTART_ITERS: u64 = 10;

/// Restart nonlinear CG when successive gradients lose orthogonality.
const CG_RESTART_ORTHOGONALITY: f64 = 0.1;

/// Initial and maximal trust-region radius.
const TR_RADIUS: f64 = 1.0;
const TR_MAX_RADIUS: f64 = 100.0;

/// Acceptance threshold on the actual/predicted reduction ratio.
const TR_ETA: f64 = 0.125;

/// Iteration cap of the Steihaug truncated-CG subproblem.
const STEIHAUG_MAX_ITERS: u64 = 20;

/// build_nelder_mead — construct Nelder–Mead with an initial simplex at `θ0`.
///
/// The simplex is `θ0` plus one vertex per coordinate, shifted by
/// `max(0.05·|θ0_i|, 0.25)`. In log-space coordinates this is a step of at
/// least a quarter decade.
///
/// # Errors
/// - `OptError` from Argmin if the standard-deviation tolerance is rejected.
pub fn build_nelder_mead(theta0: &Theta, opts: &MLEOptions) -> OptResult<NelderMeadSolver> {
    let mut simplex = Vec::with_capacity(theta0.len() + 1);
    simplex.push(theta0.clone());
    for i in 0..theta0.len() {
        let mut vertex = theta0.clone();
        vertex[i] += (SIMPLEX_REL_STEP * theta0[i].abs()).max(SIMPLEX_MIN_STEP);
        simplex.push(vertex);
    }
    let mut solver = NelderMead::new(simplex);
    if let Some(tol) = opts.tols.tol_cost.or(opts.tols.tol_grad) {
        solver = solver.with_sd_tolerance(tol)?;
    }
    Ok(solver)
}

/// build_lbfgs — construct L-BFGS with the given line search.
///
/// Uses `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`] as the history size and
/// applies `tol_grad` / `tol_cost` when present.
///
/// # Errors
/// - `OptError` from Argmin if a tolerance is rejected.
pub fn build_lbfgs<L>(
    linesearch: L, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let mut solver = LBFGS::new(linesearch, mem);
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// build_bfgs — construct BFGS with the given line search.
///
/// The runner must seed the state with an initial inverse Hessian.
///
/// # Errors
/// - `OptError` from Argmin if a tolerance is rejected.
pub fn build_bfgs<L>(linesearch: L, opts: &MLEOptions) -> OptResult<BFGS<L, Cost>> {
    let mut solver = BFGS::new(linesearch);
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// build_conjugate_gradient — Polak–Ribière nonlinear CG with restarts.
///
/// Argmin's nonlinear CG has no gradient tolerance; it stops on `max_iter`.
pub fn build_conjugate_gradient<L>(
    linesearch: L,
) -> NonlinearConjugateGradient<Theta, L, PolakRibiere, Cost> {
    NonlinearConjugateGradient::new(linesearch, PolakRibiere::new())
        .restart_iters(CG_RESTART_ITERS)
        .restart_orthogonality(CG_RESTART_ORTHOGONALITY)
}

/// build_newton_cg — line-search Newton–CG.
///
/// # Errors
/// - `OptError` from Argmin if `tol_grad` is rejected.
pub fn build_newton_cg<L>(linesearch: L, opts: &MLEOptions) -> OptResult<NewtonCG<L, Cost>> {
    let mut solver = NewtonCG::new(linesearch);
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance(g)?;
    }
    Ok(solver)
}

/// build_trust_region — trust region with a Steihaug subproblem.
///
/// # Errors
/// - `OptError` from Argmin if a radius setting is rejected.
pub fn build_trust_region() -> OptResult<TrustRegionSteihaug> {
    let subproblem = Steihaug::new().with_max_iters(STEIHAUG_MAX_ITERS);
    let solver = TrustRegion::new(subproblem)
        .with_radius(TR_RADIUS)?
        .with_max_radius(TR_MAX_RADIUS)?
        .with_eta(TR_ETA)?;
    Ok(solver)
}
