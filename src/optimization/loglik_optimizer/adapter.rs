//! Adapter that exposes a [`LogLikelihood`] as an `argmin` problem.
//!
//! We convert a *maximization* of `ℓ(θ)` into a *minimization* by defining the
//! cost `c(θ) = -ℓ(θ)`. Analytic gradients and Hessians are negated
//! accordingly. Missing derivatives are finite-differenced on the **cost**
//! side, so no sign flip is needed on that branch.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::{compute_hessian_fallible, run_fd_diff},
        traits::LogLikelihood,
        types::{Cost, Grad, Hessian, Theta},
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::{CostFunction, Error, Gradient, Hessian as ArgminHessian};
use finitediff::FiniteDiff;

/// Bridges a [`LogLikelihood`] to `argmin`'s `CostFunction`, `Gradient` and
/// `Hessian`.
///
/// - `cost` returns `-ℓ(θ)`.
/// - `gradient` returns `-∇ℓ(θ)` or a finite-difference gradient of the cost.
/// - `hessian` returns `-∇²ℓ(θ)` or a finite-difference Hessian of the cost
///   gradient.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F) -> Self {
        Self { f }
    }

    fn cost_gradient(&self, theta: &Theta) -> Result<Grad, OptError> {
        let dim = theta.len();
        match self.f.grad(theta) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                run_fd_diff(theta, &cost_func, &closure_err)
            }
            Err(e) => Err(e),
        }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate the cost `c(θ) = -ℓ(θ)`.
    ///
    /// # Errors
    /// - Any `OptError` from `value`.
    /// - `OptError::NonFiniteCost` if `ℓ(θ)` is not finite.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate the gradient of the cost at `θ`.
    ///
    /// - Analytic: validate `grad(θ)` and return `-grad`.
    /// - Otherwise: central differences of the cost; if a cost evaluation
    ///   failed or the result is not finite, retry once with forward
    ///   differences and validate again.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.cost_gradient(theta)?)
    }
}

impl<'a, F: LogLikelihood> ArgminHessian for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Hessian = Hessian;

    /// Evaluate the Hessian of the cost at `θ`.
    ///
    /// - Analytic: validate `hessian(θ)` and return its negation.
    /// - Otherwise: finite differences of the cost gradient.
    fn hessian(&self, theta: &Self::Param) -> Result<Self::Hessian, Error> {
        let dim = theta.len();
        match self.f.hessian(theta) {
            Ok(h) => {
                validate_hessian(&h, dim)?;
                Ok(-h)
            }
            Err(OptError::HessianNotImplemented) => {
                Ok(compute_hessian_fallible(|t: &Theta| self.cost_gradient(t), theta)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
