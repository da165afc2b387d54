//! loglik_optimizer::finite_diff — finite-difference gradient and Hessian helpers.
//!
//! Purpose
//! -------
//! Provide finite-difference gradient and Hessian approximations around a
//! parameter vector, together with validation and symmetry cleanup, so the
//! rest of the crate can request derivatives without depending directly on
//! the `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - Forward-difference gradients with error capture and post-hoc
//!   validation via [`run_fd_diff`].
//! - Central-difference Hessians of an infallible gradient, falling back to
//!   forward differences when validation fails, via [`compute_hessian`].
//! - The same for a fallible gradient via [`compute_hessian_fallible`]: the
//!   first error raised by the gradient aborts the computation and is
//!   returned unchanged.
//! - In-place symmetrization of Hessians via [`symmetrize_hess`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Gradients and Hessians returned from this module satisfy
//!   [`validate_grad`] and [`validate_hessian`].
//! - Errors raised inside a differencing closure are routed into a shared
//!   cell and the closure reports `NaN` in their place.
//!
//! Downstream usage
//! ----------------
//! - The Argmin adapter calls [`run_fd_diff`] and
//!   [`compute_hessian_fallible`] when an objective provides no analytic
//!   gradient or Hessian.
//! - The doubly-profiled likelihood builds its Hessian by differencing its
//!   envelope gradient with [`compute_hessian_fallible`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover successful and failing paths, including the
//!   central→forward fallback and error propagation out of closures.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// Parameters
/// ----------
/// - `theta`: `&Theta`
///   Point at which the gradient is approximated; its length is the
///   expected gradient dimension.
/// - `func`: `&G`
///   Objective closure. It must write any runtime error into `closure_err`
///   and return `NaN` in that case.
/// - `closure_err`: `&RefCell<Option<Error>>`
///   Shared error slot; cleared on entry and inspected after differencing.
///
/// Errors
/// ------
/// - The captured error, converted via `From<Error> for OptError`.
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
///
/// Examples
/// --------
/// ```rust
/// # use std::cell::RefCell;
/// # use argmin::core::Error;
/// # use ndarray::Array1;
/// # use gp_profile_likelihood::optimization::loglik_optimizer::Theta;
/// # use gp_profile_likelihood::optimization::loglik_optimizer::finite_diff::run_fd_diff;
/// let theta: Theta = Array1::from(vec![0.0_f64, 1.0]);
/// let closure_err: RefCell<Option<Error>> = RefCell::new(None);
/// let f = |x: &Theta| x.dot(x);
///
/// let grad = run_fd_diff(&theta, &f, &closure_err).unwrap();
/// assert_eq!(grad.len(), theta.len());
/// ```
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    let dim = theta.len();
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, dim)?;
    Ok(fd_grad)
}

/// compute_hessian — finite-difference Hessian of a gradient function.
///
/// Central differences are tried first; if that matrix fails validation
/// (shape or finiteness), forward differences are used instead. The result
/// is symmetrized.
///
/// Errors
/// ------
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` when the
///   forward-difference fallback also fails validation.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::Array1;
/// # use gp_profile_likelihood::optimization::loglik_optimizer::Theta;
/// # use gp_profile_likelihood::optimization::loglik_optimizer::finite_diff::compute_hessian;
/// let grad_fn = |theta: &Theta| theta.mapv(|x| 2.0 * x);
/// let theta: Theta = Array1::from(vec![1.0_f64, 2.0]);
/// let hess = compute_hessian(&grad_fn, &theta).unwrap();
/// assert_eq!(hess.shape(), &[2, 2]);
/// ```
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut cent_hess = theta.central_hessian(f);
    match validate_hessian(&cent_hess, dim) {
        Ok(_) => {
            symmetrize_hess(&mut cent_hess);
            Ok(cent_hess)
        }
        Err(_) => {
            let mut forward_hess = theta.forward_hessian(f);
            validate_hessian(&forward_hess, dim)?;
            symmetrize_hess(&mut forward_hess);
            Ok(forward_hess)
        }
    }
}

/// compute_hessian_fallible — [`compute_hessian`] for a gradient that can
/// fail.
///
/// The first error returned by `f` is kept and returned once differencing
/// finishes; it takes precedence over any validation failure caused by the
/// `NaN` placeholders.
///
/// Errors
/// ------
/// - The first error returned by `f`.
/// - Validation errors as in [`compute_hessian`].
pub fn compute_hessian_fallible<F>(f: F, theta: &Theta) -> OptResult<Hessian>
where
    F: Fn(&Theta) -> OptResult<Grad>,
{
    let dim = theta.len();
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let grad_fn = |x: &Theta| -> Grad {
        match f(x) {
            Ok(g) => g,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                Grad::from_elem(dim, f64::NAN)
            }
        }
    };
    let result = compute_hessian(&grad_fn, theta);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    result
}

/// symmetrize_hess — replace each off-diagonal pair by its average.
///
/// Called only after validation, so it performs no shape or finiteness
/// checks of its own.
pub fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
