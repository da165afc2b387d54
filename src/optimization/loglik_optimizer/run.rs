//! Execution helper that runs an `argmin` solver on a log-likelihood problem and
//! returns a crate-friendly [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Cost, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
        traits::GradNorm,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, IterState, Solver, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Solver state shared by every supported solver; `G` is the gradient type
/// (`()` for derivative-free solvers) and `H` the (inverse) Hessian type.
pub type SolverState<G, H> = IterState<Theta, G, (), H, (), Cost>;

/// Run an `argmin` solver on a log-likelihood problem.
///
/// This is the shared runner for every solver kind. It wires up:
/// - the objective via [`ArgMinAdapter`],
/// - the chosen solver,
/// - the initial parameter `theta0` plus any solver-specific state seeding
///   from `init` (e.g. BFGS's initial inverse Hessian),
/// - optional observers (behind the `obs_slog` feature),
/// - optional `max_iters`,
///
/// then executes the solver and converts the final state into
/// [`OptimOutcome`].
///
/// # Type Parameters
/// - `F`: objective implementing [`LogLikelihood`].
/// - `S`: any `argmin` solver over [`SolverState<G, H>`].
/// - `G`: gradient type carried by the state.
/// - `H`: Hessian type carried by the state.
///
/// # Feature flags
/// If `obs_slog` is enabled and `opts.verbose == true`, a terminal slog
/// observer is attached with `ObserverMode::Always`, and ℓ(θ₀) (plus
/// ‖∇ℓ(θ₀)‖ when available) is logged before the first iteration.
///
/// # Errors
/// - Any `argmin` runtime error (solver, line search, objective) via
///   `From<argmin::core::Error>`; objective errors come back unchanged.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_solver<'a, F, S, G, H>(
    problem: ArgMinAdapter<'a, F>, solver: S, theta0: Theta, opts: &MLEOptions,
    init: impl FnOnce(SolverState<G, H>) -> SolverState<G, H>,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, SolverState<G, H>> + Send + 'static,
    G: GradNorm + Clone,
    H: Clone,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| init(state.param(theta0)));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    log::debug!("solver stopped after {iterations} iterations: {termination:?}");
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let ll0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());

    log::info!(
        "init: ell(theta0) = {:.6}{}",
        ll0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
