//! High-level entry point for maximizing a [`LogLikelihood`].
//!
//! Selects and builds the Argmin solver named by a [`SolverKind`] (pairing
//! line-search methods with the configured [`LineSearcher`]), wraps the
//! objective in an `ArgMinAdapter` (which *minimizes* `-ℓ(θ)`), and delegates
//! the run to `run_solver`.
use ndarray::Array2;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{
            build_bfgs, build_conjugate_gradient, build_lbfgs, build_nelder_mead,
            build_newton_cg, build_trust_region,
        },
        run::run_solver,
        traits::{LineSearcher, LogLikelihood, MLEOptions, SolverKind},
        types::{Grad, HagerZhangLS, Hessian, MoreThuenteLS},
    },
};

/// Maximize a log-likelihood `ℓ(θ)` with the chosen solver.
///
/// # Behavior
/// - Validates the initial guess via `f.check(theta0)`.
/// - Wraps `f` in an `ArgMinAdapter` that exposes `c(θ) = -ℓ(θ)` to Argmin.
/// - Builds the solver for `kind`; BFGS, L-BFGS, CG and Newton–CG use
///   `opts.line_searcher`. BFGS starts from an identity inverse Hessian.
/// - Runs it through `run_solver` and returns an `OptimOutcome`.
///
/// # Errors
/// - Any error from `f.check`.
/// - Builder errors (rejected tolerances).
/// - Runtime errors from the solver or the objective.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use gp_profile_likelihood::optimization::{
///     errors::OptResult,
///     loglik_optimizer::{maximize, LogLikelihood, MLEOptions, SolverKind, Theta},
/// };
///
/// struct Bowl;
/// impl LogLikelihood for Bowl {
///     fn value(&self, theta: &Theta) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Bowl, array![0.1, -0.2, 0.3], SolverKind::Lbfgs, &MLEOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), gp_profile_likelihood::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, kind: SolverKind, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0)?;
    log::debug!(
        "maximizing over {} parameters with {kind} ({:?})",
        theta0.len(),
        kind.capability()
    );
    let problem = ArgMinAdapter::new(f);
    let dim = theta0.len();
    match (kind, opts.line_searcher) {
        (SolverKind::NelderMead, _) => {
            let solver = build_nelder_mead(&theta0, opts)?;
            run_solver::<F, _, (), ()>(problem, solver, theta0, opts, |state| state)
        }
        (SolverKind::Lbfgs, LineSearcher::MoreThuente) => {
            let solver = build_lbfgs(MoreThuenteLS::new(), opts)?;
            run_solver::<F, _, Grad, ()>(problem, solver, theta0, opts, |state| state)
        }
        (SolverKind::Lbfgs, LineSearcher::HagerZhang) => {
            let solver = build_lbfgs(HagerZhangLS::new(), opts)?;
            run_solver::<F, _, Grad, ()>(problem, solver, theta0, opts, |state| state)
        }
        (SolverKind::Bfgs, LineSearcher::MoreThuente) => {
            let solver = build_bfgs(MoreThuenteLS::new(), opts)?;
            run_solver::<F, _, Grad, Hessian>(problem, solver, theta0, opts, |state| {
                state.inv_hessian(Array2::eye(dim))
            })
        }
        (SolverKind::Bfgs, LineSearcher::HagerZhang) => {
            let solver = build_bfgs(HagerZhangLS::new(), opts)?;
            run_solver::<F, _, Grad, Hessian>(problem, solver, theta0, opts, |state| {
                state.inv_hessian(Array2::eye(dim))
            })
        }
        (SolverKind::ConjugateGradient, LineSearcher::MoreThuente) => {
            let solver = build_conjugate_gradient(MoreThuenteLS::new());
            run_solver::<F, _, Grad, ()>(problem, solver, theta0, opts, |state| state)
        }
        (SolverKind::ConjugateGradient, LineSearcher::HagerZhang) => {
            let solver = build_conjugate_gradient(HagerZhangLS::new());
            run_solver::<F, _, Grad, ()>(problem, solver, theta0, opts, |state| state)
        }
        (SolverKind::NewtonCg, LineSearcher::MoreThuente) => {
            let solver = build_newton_cg(MoreThuenteLS::new(), opts)?;
            run_solver::<F, _, Grad, Hessian>(problem, solver, theta0, opts, |state| state)
        }
        (SolverKind::NewtonCg, LineSearcher::HagerZhang) => {
            let solver = build_newton_cg(HagerZhangLS::new(), opts)?;
            run_solver::<F, _, Grad, Hessian>(problem, solver, theta0, opts, |state| state)
        }
        (SolverKind::TrustRegion, _) => {
            let solver = build_trust_region()?;
            run_solver::<F, _, Grad, Hessian>(problem, solver, theta0, opts, |state| state)
        }
    }
}
