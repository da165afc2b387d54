//! Public API surface for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait objectives implement.
//! - [`MLEOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`LineSearcher`]: line search used by the gradient-based solvers.
//! - [`SolverKind`] and [`Capability`]: the supported Argmin solvers and the
//!   derivative information each one consumes.
//! - [`OptimOutcome`]: normalized result returned by the high-level
//!   `maximize` API.
//!
//! Convention: we *maximize* a log-likelihood `ℓ(θ)` by minimizing the cost
//! `c(θ) = -ℓ(θ)`. Analytic gradients and Hessians are those of the
//! log-likelihood; the adapter flips the sign.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        types::Hessian,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::{fmt, str::FromStr};

/// Objective interface for the optimizer.
///
/// You maximize `ℓ(θ)`; internally we minimize `c(θ) = -ℓ(θ)`. Any data the
/// objective needs lives in the implementing type itself.
///
/// Required:
/// - `value(&Theta) -> OptResult<Cost>`: evaluate `ℓ(θ)`. Invalid inputs and
///   numerical failures are returned as `OptError`, never panics.
/// - `check(&Theta) -> OptResult<()>`: reject an unusable starting point.
///   Called once before optimization.
///
/// Optional:
/// - `grad(&Theta) -> OptResult<Grad>`: analytic `∇ℓ(θ)`. Finite differences
///   are used when this returns `GradientNotImplemented`.
/// - `hessian(&Theta) -> OptResult<Hessian>`: analytic `∇²ℓ(θ)`. Finite
///   differences of the gradient are used when this returns
///   `HessianNotImplemented`.
pub trait LogLikelihood {
    // Required methods
    fn value(&self, theta: &Theta) -> OptResult<Cost>;
    fn check(&self, theta: &Theta) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }

    fn hessian(&self, _theta: &Theta) -> OptResult<Hessian> {
        Err(OptError::HessianNotImplemented)
    }
}

/// Derivative information a solver consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Value,
    ValueGradient,
    ValueGradientHessian,
}

/// Argmin solver used for a multivariate maximization.
///
/// | Variant             | Argmin solver                          | Uses            |
/// |---------------------|----------------------------------------|-----------------|
/// | `NelderMead`        | `NelderMead`                           | value           |
/// | `Bfgs`              | `BFGS` + line search                   | value, gradient |
/// | `Lbfgs`             | `LBFGS` + line search                  | value, gradient |
/// | `ConjugateGradient` | `NonlinearConjugateGradient` (PR)      | value, gradient |
/// | `NewtonCg`          | `NewtonCG` + line search               | + Hessian       |
/// | `TrustRegion`       | `TrustRegion` with `Steihaug`          | + Hessian       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    NelderMead,
    Bfgs,
    Lbfgs,
    ConjugateGradient,
    NewtonCg,
    TrustRegion,
}

impl SolverKind {
    pub fn capability(&self) -> Capability {
        match self {
            SolverKind::NelderMead => Capability::Value,
            SolverKind::Bfgs | SolverKind::Lbfgs | SolverKind::ConjugateGradient => {
                Capability::ValueGradient
            }
            SolverKind::NewtonCg | SolverKind::TrustRegion => Capability::ValueGradientHessian,
        }
    }

    /// Canonical display name, matching the names accepted by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::NelderMead => "Nelder-Mead",
            SolverKind::Bfgs => "BFGS",
            SolverKind::Lbfgs => "L-BFGS",
            SolverKind::ConjugateGradient => "CG",
            SolverKind::NewtonCg => "Newton-CG",
            SolverKind::TrustRegion => "trust-ncg",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = OptError;

    /// Parse a solver name, ignoring case, `-`, `_` and spaces.
    ///
    /// Accepts `Nelder-Mead`, `BFGS`, `L-BFGS` / `L-BFGS-B`, `CG`,
    /// `Newton-CG`, and `trust-ncg` / `trust-region` / `trust-krylov`.
    /// `dogleg` and `trust-exact` are rejected: they need a dense inverse,
    /// which the `ndarray` backend in use does not provide.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String =
            s.chars().filter(|c| !matches!(c, '-' | '_' | ' ')).collect::<String>().to_lowercase();
        match key.as_str() {
            "neldermead" => Ok(SolverKind::NelderMead),
            "bfgs" => Ok(SolverKind::Bfgs),
            "lbfgs" | "lbfgsb" => Ok(SolverKind::Lbfgs),
            "cg" | "conjugategradient" => Ok(SolverKind::ConjugateGradient),
            "newtoncg" => Ok(SolverKind::NewtonCg),
            "trustncg" | "trustregion" | "trustkrylov" => Ok(SolverKind::TrustRegion),
            "dogleg" | "trustexact" => Err(OptError::InvalidOptimizationMethod {
                name: s.to_string(),
                reason: "Dogleg and trust-exact need a dense inverse (ArgminInv), which the \
                         ndarray-nolinalg backend lacks; use 'trust-ncg' or 'Newton-CG'.",
            }),
            _ => Err(OptError::InvalidOptimizationMethod {
                name: s.to_string(),
                reason: "Valid options are 'Nelder-Mead', 'BFGS', 'L-BFGS-B', 'CG', 'Newton-CG' \
                         or 'trust-ncg'.",
            }),
        }
    }
}

/// Choice of line search used inside the gradient-based solvers.
///
/// Variants:
/// - `MoreThuente`: More–Thuente line search.
/// - `HagerZhang`: Hager–Zhang line search.
///
/// Parsing:
/// This enum implements `FromStr` and accepts case-insensitive names
/// (`"MoreThuente"`, `"HagerZhang"`). Unknown names return
/// `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    /// Parse a line-search choice from a string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols: Tolerances` — numerical tolerances and iteration limits.
/// - `line_searcher: LineSearcher` — line search for BFGS, L-BFGS, CG and
///   Newton–CG.
/// - `verbose: bool` — attaches a terminal observer (feature `obs_slog`).
/// - `lbfgs_mem: Option<usize>` — L-BFGS history size; `None` uses
///   [`DEFAULT_LBFGS_MEM`](crate::optimization::loglik_optimizer::DEFAULT_LBFGS_MEM).
///
/// Default:
/// - `tols`: `tol_grad = 1e-6`, `tol_cost = None`, `max_iter = 300`
/// - `line_searcher`: `MoreThuente`
/// - `verbose`: `false`
/// - `lbfgs_mem`: `None`
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// Create a new set of optimizer options with `verbose = false`.
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] if `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, line_searcher, verbose: false, lbfgs_mem })
    }

    /// Options driven by one scalar tolerance, applied to both the gradient
    /// norm and the cost change, with the default iteration cap.
    ///
    /// # Errors
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for a
    ///   non-finite or non-positive `tol`.
    pub fn from_tol(tol: f64) -> OptResult<Self> {
        let tols = Tolerances::new(Some(tol), Some(tol), Some(DEFAULT_MAX_ITER))?;
        Self::new(tols, LineSearcher::MoreThuente, None)
    }
}

/// Iteration cap used by `Default` and `from_tol`.
pub const DEFAULT_MAX_ITER: usize = 300;

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances {
                tol_grad: Some(1e-6),
                tol_cost: None,
                max_iter: Some(DEFAULT_MAX_ITER),
            },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_grad`: terminate when the gradient norm falls below this threshold.
/// - `tol_cost`: terminate when the change in cost falls below this threshold
///   (Nelder–Mead uses it as the simplex standard-deviation tolerance).
/// - `max_iter`: hard cap on the number of iterations.
///
/// Any field can be `None` but **at least one** of the three must be provided
/// (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one of `tol_grad`, `tol_cost`, or `max_iter` must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - `OptError::InvalidMaxIter` if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Norm of whatever gradient a solver state carries. Derivative-free
/// solvers carry `()`, which has no norm.
pub trait GradNorm {
    fn grad_norm(&self) -> Option<f64>;
}

impl GradNorm for () {
    fn grad_norm(&self) -> Option<f64> {
        None
    }
}

impl GradNorm for Grad {
    fn grad_norm(&self) -> Option<f64> {
        Some(self.l2_norm())
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best **log-likelihood** value `ℓ(θ)` (not the cost).
/// - `converged`: `true` if the solver stopped on its own criterion, `false`
///   when it was still running or hit the iteration cap.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available gradient, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// Performs:
    /// - `theta_hat` check via `validate_theta_hat` (present and all finite).
    /// - `value` check via `validate_value` (finite).
    /// - Maps `TerminationStatus` into `(converged, status)`.
    /// - Computes `grad_norm` if a gradient was provided.
    ///
    /// # Errors
    /// - Propagates any validation errors for `theta_hat` or `value`.
    pub fn new<G: GradNorm>(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<G>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match &termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(reason) => {
                (!matches!(reason, TerminationReason::MaxItersReached), reason.text().to_string())
            }
        };
        let iterations = iterations as usize;
        let grad_norm = grad.and_then(|g| g.grad_norm());
        Ok(Self { theta_hat, value, converged, status, iterations, fn_evals, grad_norm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Parsing of solver and line-search names.
    // - Option validation and defaults.
    // - Mapping of termination status into the outcome's convergence flag.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Scipy-style method names map to solver kinds regardless of case and
    // punctuation.
    //
    // Given
    // -----
    // - A list of accepted spellings and one dense-inverse method.
    //
    // Expect
    // ------
    // - Accepted names parse; `dogleg` is `InvalidOptimizationMethod`.
    fn solver_kind_parses_scipy_names() {
        assert_eq!("Nelder-Mead".parse::<SolverKind>().expect("nm"), SolverKind::NelderMead);
        assert_eq!("bfgs".parse::<SolverKind>().expect("bfgs"), SolverKind::Bfgs);
        assert_eq!("L-BFGS-B".parse::<SolverKind>().expect("lbfgs"), SolverKind::Lbfgs);
        assert_eq!("CG".parse::<SolverKind>().expect("cg"), SolverKind::ConjugateGradient);
        assert_eq!("Newton-CG".parse::<SolverKind>().expect("ncg"), SolverKind::NewtonCg);
        assert_eq!("trust-ncg".parse::<SolverKind>().expect("tr"), SolverKind::TrustRegion);
        assert!(matches!(
            "dogleg".parse::<SolverKind>(),
            Err(OptError::InvalidOptimizationMethod { .. })
        ));
        assert!(matches!(
            "simplex".parse::<SolverKind>(),
            Err(OptError::InvalidOptimizationMethod { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Capabilities reflect which derivatives each solver consumes.
    //
    // Given
    // -----
    // - Every `SolverKind`.
    //
    // Expect
    // ------
    // - Nelder–Mead needs values only; Newton–CG and trust region need
    //   Hessians; the rest need gradients.
    fn capability_matches_solver() {
        assert_eq!(SolverKind::NelderMead.capability(), Capability::Value);
        assert_eq!(SolverKind::Lbfgs.capability(), Capability::ValueGradient);
        assert_eq!(SolverKind::Bfgs.capability(), Capability::ValueGradient);
        assert_eq!(SolverKind::ConjugateGradient.capability(), Capability::ValueGradient);
        assert_eq!(SolverKind::NewtonCg.capability(), Capability::ValueGradientHessian);
        assert_eq!(SolverKind::TrustRegion.capability(), Capability::ValueGradientHessian);
    }

    #[test]
    // Purpose
    // -------
    // Tolerance and option validation reject unusable settings.
    //
    // Given
    // -----
    // - All-`None` tolerances, a zero cap, a negative tolerance and zero
    //   L-BFGS memory.
    //
    // Expect
    // ------
    // - The matching `OptError` for each case; `from_tol` sets both
    //   tolerances.
    fn options_validate_inputs() {
        assert!(matches!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided)));
        assert!(matches!(
            Tolerances::new(Some(1e-6), None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));
        assert!(matches!(
            Tolerances::new(Some(-1.0), None, None),
            Err(OptError::InvalidTolGrad { .. })
        ));
        let tols = Tolerances::new(Some(1e-6), None, Some(10)).expect("tolerances");
        assert!(matches!(
            MLEOptions::new(tols, LineSearcher::HagerZhang, Some(0)),
            Err(OptError::InvalidLBFGSMem { .. })
        ));

        let opts = MLEOptions::from_tol(1e-5).expect("from_tol");
        assert_eq!(opts.tols.tol_grad, Some(1e-5));
        assert_eq!(opts.tols.tol_cost, Some(1e-5));
        assert!(!opts.verbose);
    }

    #[test]
    // Purpose
    // -------
    // Hitting the iteration cap is reported as not converged.
    //
    // Given
    // -----
    // - `MaxItersReached` and `SolverConverged` terminations.
    //
    // Expect
    // ------
    // - `converged` is false for the former and true for the latter; the
    //   gradient norm is computed when a gradient is present.
    fn outcome_maps_termination_status() {
        // Arrange
        let theta = array![1.0, 2.0];

        // Act
        let capped = OptimOutcome::new(
            Some(theta.clone()),
            -1.0,
            TerminationStatus::Terminated(TerminationReason::MaxItersReached),
            300,
            FnEvalMap::new(),
            None::<()>,
        )
        .expect("outcome");
        let done = OptimOutcome::new(
            Some(theta),
            -1.0,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            12,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
        )
        .expect("outcome");

        // Assert
        assert!(!capped.converged);
        assert!(capped.grad_norm.is_none());
        assert!(done.converged);
        assert_eq!(done.iterations, 12);
        assert_eq!(done.grad_norm, Some(5.0));
    }
}
