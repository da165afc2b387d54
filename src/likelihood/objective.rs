//! likelihood::objective — profile likelihoods as [`LogLikelihood`]
//! objectives in log-space coordinates.
//!
//! Purpose
//! -------
//! Adapt the profile-likelihood engines to the Argmin-backed optimizer.
//! Optimizers work on `θ_opt = [log10 η, log10 θ...]` (single profile) or
//! `log10 θ` (double profile), so positivity holds by construction and the
//! `abs` folding of the public hyperparameters is never crossed.
//!
//! Key behaviors
//! -------------
//! - Each objective owns the exclusive borrow of the covariance operator for
//!   the duration of a run, in a `RefCell` so the `&self` evaluation methods
//!   can set the distance scale before their solves.
//! - Gradients and Hessians from the engines are mapped to log-space with
//!   `∂/∂log10 θ = θ ln10 ∂/∂θ` and the matching second-order term.
//! - The double-profile objective memoizes the inner `η` solve per distance
//!   scale, keyed by the quantized `log10 θ`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every evaluation sets the distance scale it needs; no evaluation
//!   depends on which one ran before it.
//! - The memo lives only as long as one objective, i.e. one outer run.
use std::{cell::RefCell, collections::HashMap, f64::consts::LN_10};

use ndarray::{Array1, Array2, s};

use crate::{
    covariance::CovarianceOperator,
    likelihood::{double_profile, options::DoubleProfileOptions, profile},
    optimization::{
        errors::OptResult,
        loglik_optimizer::{
            Grad, Hessian, LogLikelihood, Theta, finite_diff::compute_hessian_fallible,
            validation::validate_coordinates,
        },
        numerical_stability::{distance_scale_from_log10, log10_from_eta},
    },
};

/// Resolution of the memo key in `log10 θ`.
const MEMO_QUANTUM: f64 = 1e-10;

/// Scale factor `∂h_k/∂θ_opt,k`: `1` for coordinates before `first`
/// (already `log10 η`), `h_k ln10` for the distance scales.
fn chain_factor(hp: &Array1<f64>, first: usize, k: usize) -> f64 {
    if k < first { 1.0 } else { hp[k] * LN_10 }
}

/// Gradient with respect to optimizer coordinates from the gradient in
/// public coordinates `hp`, whose entries from `first` on are distance
/// scales.
pub(crate) fn chain_gradient(jac: &Array1<f64>, hp: &Array1<f64>, first: usize) -> Grad {
    Array1::from_shape_fn(jac.len(), |k| jac[k] * chain_factor(hp, first, k))
}

/// Hessian with respect to optimizer coordinates.
///
/// `H_opt[k, l] = H[k, l] f_k f_l + δ_kl J_k h_k ln²10` for distance-scale
/// coordinates `k`, with `f_k` from [`chain_factor`].
pub(crate) fn chain_hessian(
    hess: &Array2<f64>, jac: &Array1<f64>, hp: &Array1<f64>, first: usize,
) -> Hessian {
    let n = jac.len();
    let mut out = Array2::from_shape_fn((n, n), |(k, l)| {
        hess[[k, l]] * chain_factor(hp, first, k) * chain_factor(hp, first, l)
    });
    for k in first..n {
        out[[k, k]] += jac[k] * hp[k] * LN_10 * LN_10;
    }
    out
}

// ---- Single profile ---------------------------------------------------------

/// `ℓ(log10 η, log10 θ)` for the single-profile engine.
///
/// With `optimize_scale = false` only `log10 η` is optimized and the
/// operator's distance scale is held fixed.
pub struct SingleProfileObjective<'a, C: CovarianceOperator + ?Sized> {
    z: &'a Array1<f64>,
    x: &'a Array2<f64>,
    cov: RefCell<&'a mut C>,
    optimize_scale: bool,
}

impl<'a, C: CovarianceOperator + ?Sized> SingleProfileObjective<'a, C> {
    pub fn new(
        z: &'a Array1<f64>, x: &'a Array2<f64>, cov: &'a mut C, optimize_scale: bool,
    ) -> Self {
        Self { z, x, cov: RefCell::new(cov), optimize_scale }
    }

    fn dim(&self) -> usize {
        if self.optimize_scale { 1 + self.cov.borrow().dimension() } else { 1 }
    }

    /// Public hyperparameters `[log10 η, θ...]` for optimizer coordinates.
    fn hyperparam(&self, theta: &Theta) -> Array1<f64> {
        let mut hp = theta.clone();
        if self.optimize_scale {
            let scale = distance_scale_from_log10(theta.slice(s![1..]));
            hp.slice_mut(s![1..]).assign(&scale);
        }
        hp
    }
}

impl<C: CovarianceOperator + ?Sized> LogLikelihood for SingleProfileObjective<'_, C> {
    fn value(&self, theta: &Theta) -> OptResult<f64> {
        let hp = self.hyperparam(theta);
        let mut cov = self.cov.borrow_mut();
        profile::likelihood(self.z, self.x, &mut **cov, false, &hp)
    }

    fn check(&self, theta: &Theta) -> OptResult<()> {
        validate_coordinates(theta, self.dim())
    }

    fn grad(&self, theta: &Theta) -> OptResult<Grad> {
        let hp = self.hyperparam(theta);
        let mut cov = self.cov.borrow_mut();
        let jac = profile::likelihood_jacobian(self.z, self.x, &mut **cov, false, &hp)?;
        Ok(chain_gradient(&jac, &hp, 1))
    }

    fn hessian(&self, theta: &Theta) -> OptResult<Hessian> {
        let hp = self.hyperparam(theta);
        let mut cov = self.cov.borrow_mut();
        let jac = profile::likelihood_jacobian(self.z, self.x, &mut **cov, false, &hp)?;
        let hess = profile::likelihood_hessian(self.z, self.x, &mut **cov, false, &hp)?;
        Ok(chain_hessian(&hess, &jac, &hp, 1))
    }
}

// ---- Double profile ---------------------------------------------------------

/// Doubly profiled `ℓ(log10 θ)`: `η` is re-optimized for every distance
/// scale and cached per quantized `log10 θ`.
pub struct DoubleProfileObjective<'a, C: CovarianceOperator + ?Sized> {
    z: &'a Array1<f64>,
    x: &'a Array2<f64>,
    cov: RefCell<&'a mut C>,
    opts: &'a DoubleProfileOptions,
    memo: RefCell<HashMap<Vec<i64>, f64>>,
}

impl<'a, C: CovarianceOperator + ?Sized> DoubleProfileObjective<'a, C> {
    pub fn new(
        z: &'a Array1<f64>, x: &'a Array2<f64>, cov: &'a mut C, opts: &'a DoubleProfileOptions,
    ) -> Self {
        Self { z, x, cov: RefCell::new(cov), opts, memo: RefCell::new(HashMap::new()) }
    }

    /// Number of inner `η` solves actually run.
    pub fn inner_solves(&self) -> usize {
        self.memo.borrow().len()
    }

    fn memo_key(theta: &Theta) -> Vec<i64> {
        theta.iter().map(|u| (u / MEMO_QUANTUM).round() as i64).collect()
    }

    /// Optimal `η` at `log10 θ = theta`, from the memo when available.
    fn resolve_eta(&self, cov: &mut C, theta: &Theta, scale: &Array1<f64>) -> OptResult<f64> {
        let key = Self::memo_key(theta);
        if let Some(&eta) = self.memo.borrow().get(&key) {
            return Ok(eta);
        }
        let eta = double_profile::find_optimal_eta(
            self.z,
            self.x,
            cov,
            scale,
            self.opts.log_eta_guess,
            self.opts,
        )?;
        self.memo.borrow_mut().insert(key, eta);
        Ok(eta)
    }

    /// Public single-profile hyperparameters `[log10 η̂(θ), θ...]`.
    fn hyperparam(&self, cov: &mut C, theta: &Theta) -> OptResult<Array1<f64>> {
        let scale = distance_scale_from_log10(theta.view());
        let eta = self.resolve_eta(cov, theta, &scale)?;
        let mut hp = Array1::zeros(scale.len() + 1);
        hp[0] = log10_from_eta(eta);
        hp.slice_mut(s![1..]).assign(&scale);
        Ok(hp)
    }
}

impl<C: CovarianceOperator + ?Sized> LogLikelihood for DoubleProfileObjective<'_, C> {
    fn value(&self, theta: &Theta) -> OptResult<f64> {
        let mut cov = self.cov.borrow_mut();
        let hp = self.hyperparam(&mut **cov, theta)?;
        profile::likelihood(self.z, self.x, &mut **cov, false, &hp)
    }

    fn check(&self, theta: &Theta) -> OptResult<()> {
        validate_coordinates(theta, self.cov.borrow().dimension())
    }

    /// Envelope gradient: the distance-scale block of the single-profile
    /// Jacobian at `η̂(θ)`.
    fn grad(&self, theta: &Theta) -> OptResult<Grad> {
        let mut cov = self.cov.borrow_mut();
        let hp = self.hyperparam(&mut **cov, theta)?;
        let jac = profile::likelihood_jacobian(self.z, self.x, &mut **cov, false, &hp)?;
        let scale_jac = jac.slice(s![1..]).to_owned();
        let scale = hp.slice(s![1..]).to_owned();
        Ok(chain_gradient(&scale_jac, &scale, 0))
    }

    /// Central differences of the envelope gradient.
    fn hessian(&self, theta: &Theta) -> OptResult<Hessian> {
        compute_hessian_fallible(|t: &Theta| self.grad(t), theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covariance::{DenseCovariance, Kernel};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Log-space gradients and Hessians against central differences of the
    //   objective values.
    // - Memoization of the inner η solve.
    // - Coordinate validation.
    //
    // They intentionally DO NOT cover:
    // - Full optimizer runs (see `profile`, `double_profile` and `tests/`).
    // -------------------------------------------------------------------------

    fn setup() -> (DenseCovariance, Array1<f64>, Array2<f64>) {
        let n = 10;
        let points = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / (n - 1) as f64);
        let z = Array1::from_shape_fn(n, |i| (3.0 * points[[i, 0]]).sin() + 0.2 * (i % 3) as f64);
        let x = Array2::ones((n, 1));
        let cov = DenseCovariance::new(points, Kernel::Exponential).expect("operator");
        (cov, z, x)
    }

    #[test]
    // Purpose
    // -------
    // The single-profile objective's log-space derivatives match central
    // differences of its value.
    //
    // Given
    // -----
    // - θ_opt = [-0.7, log10 0.3] on a 1-D exponential-kernel problem.
    //
    // Expect
    // ------
    // - Gradient within 1e-4 relative, Hessian within 1e-3 relative.
    fn single_objective_derivatives_match_differences() {
        let (mut cov, z, x) = setup();
        let objective = SingleProfileObjective::new(&z, &x, &mut cov, true);
        let theta = array![-0.7, 0.3f64.log10()];
        let h = 1e-5;

        let grad = objective.grad(&theta).expect("grad");
        let hess = objective.hessian(&theta).expect("hessian");

        for k in 0..2 {
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[k] += h;
            down[k] -= h;
            let fd = (objective.value(&up).expect("up") - objective.value(&down).expect("down"))
                / (2.0 * h);
            assert_relative_eq!(grad[k], fd, max_relative = 1e-4, epsilon = 1e-8);
            let gu = objective.grad(&up).expect("grad up");
            let gd = objective.grad(&down).expect("grad down");
            for l in 0..2 {
                let fd2 = (gu[l] - gd[l]) / (2.0 * h);
                assert_relative_eq!(hess[[l, k]], fd2, max_relative = 1e-3, epsilon = 1e-6);
            }
        }
        assert!(objective.check(&array![0.0]).is_err());
        assert!(objective.check(&array![0.0, f64::NAN]).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Repeated evaluations at one distance scale reuse the inner η solve.
    //
    // Given
    // -----
    // - The double-profile objective evaluated three times at the same
    //   θ_opt and once at a different one.
    //
    // Expect
    // ------
    // - Identical values at the repeated point; two inner solves in total.
    fn double_objective_memoizes_inner_solves() {
        let (mut cov, z, x) = setup();
        let opts = DoubleProfileOptions::default();
        let objective = DoubleProfileObjective::new(&z, &x, &mut cov, &opts);
        let theta = array![0.25f64.log10()];

        let first = objective.value(&theta).expect("first");
        let second = objective.value(&theta).expect("second");
        let _grad = objective.grad(&theta).expect("grad");
        let _other = objective.value(&array![0.5f64.log10()]).expect("other");

        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(objective.inner_solves(), 2);
    }

    #[test]
    // Purpose
    // -------
    // The log-space chain rule adds the first-order term on the diagonal
    // only for distance-scale coordinates.
    //
    // Given
    // -----
    // - hp = [ξ, 2], J = [1, 3], H = [[4, 5], [5, 6]], first = 1.
    //
    // Expect
    // ------
    // - g = [1, 6 ln10]; H_opt = [[4, 10 ln10], [10 ln10, 24 ln²10 + 6 ln²10]].
    fn chain_rule_in_log_space() {
        let hp = array![0.3, 2.0];
        let jac = array![1.0, 3.0];
        let hess = array![[4.0, 5.0], [5.0, 6.0]];

        let g = chain_gradient(&jac, &hp, 1);
        let h = chain_hessian(&hess, &jac, &hp, 1);

        assert_relative_eq!(g[0], 1.0);
        assert_relative_eq!(g[1], 6.0 * LN_10, max_relative = 1e-14);
        assert_relative_eq!(h[[0, 1]], 10.0 * LN_10, max_relative = 1e-14);
        assert_relative_eq!(h[[1, 0]], h[[0, 1]]);
        assert_relative_eq!(h[[1, 1]], 30.0 * LN_10 * LN_10, max_relative = 1e-14);
    }
}
