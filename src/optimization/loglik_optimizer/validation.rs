//! Consistency checks shared by the optimizer layer and the objectives.
//!
//! - Tolerances: [`verify_tol_grad`], [`verify_tol_cost`].
//! - Objective inputs: [`validate_coordinates`] for optimizer coordinates.
//! - Objective outputs: [`validate_value`], [`validate_grad`],
//!   [`validate_hessian`].
//! - Solver results: [`validate_theta_hat`].
//!
//! Every check reports the first offending entry through a dedicated
//! [`OptError`] variant.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta, types::Hessian},
};

/// Index and value of the first non-finite entry, if any.
fn first_non_finite<'a, I>(values: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    values.into_iter().copied().enumerate().find(|(_, v)| !v.is_finite())
}

fn tol_reason(tol: f64) -> Option<&'static str> {
    if !tol.is_finite() {
        Some("Tolerance must be finite.")
    } else if tol <= 0.0 {
        Some("Tolerance must be positive.")
    } else {
        None
    }
}

/// Validate the optional gradient-norm tolerance; `None` disables the rule.
///
/// # Errors
/// [`OptError::InvalidTolGrad`] for a non-finite or non-positive value.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tol_reason(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolGrad { tol, reason }),
        None => Ok(()),
    }
}

/// Validate the optional cost-change tolerance; `None` disables the rule.
///
/// # Errors
/// [`OptError::InvalidTolCost`] for a non-finite or non-positive value.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol.and_then(|t| tol_reason(t).map(|reason| (t, reason))) {
        Some((tol, reason)) => Err(OptError::InvalidTolCost { tol, reason }),
        None => Ok(()),
    }
}

/// Check optimizer coordinates before an objective evaluates them.
///
/// # Errors
/// - [`OptError::InvalidHyperparamLength`] if `theta.len() != expected`.
/// - [`OptError::InvalidHyperparam`] for the first non-finite coordinate.
pub fn validate_coordinates(theta: &Theta, expected: usize) -> OptResult<()> {
    if theta.len() != expected {
        return Err(OptError::InvalidHyperparamLength { expected, found: theta.len() });
    }
    if let Some((index, value)) = first_non_finite(theta) {
        return Err(OptError::InvalidHyperparam {
            index,
            value,
            reason: "optimizer coordinates must be finite",
        });
    }
    Ok(())
}

/// Check an analytic or finite-difference gradient.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if `grad.len() != dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite entry.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match first_non_finite(grad) {
        Some((index, value)) => Err(OptError::InvalidGradient {
            index,
            value,
            reason: "Gradient elements must be finite.",
        }),
        None => Ok(()),
    }
}

/// Unwrap the solver's best parameter vector.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if the solver kept no best point.
/// - [`OptError::InvalidThetaHat`] for the first non-finite entry.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some((index, value)) = first_non_finite(&theta) {
        return Err(OptError::InvalidThetaHat {
            index,
            value,
            reason: "Parameter estimates must be finite.",
        });
    }
    Ok(theta)
}

/// A log-likelihood value must be finite; its sign is unrestricted.
pub fn validate_value(value: f64) -> OptResult<()> {
    if value.is_finite() { Ok(()) } else { Err(OptError::NonFiniteCost { value }) }
}

/// Check a `dim × dim` Hessian with finite entries.
///
/// # Errors
/// - [`OptError::HessianDimMismatch`] on a shape mismatch.
/// - [`OptError::InvalidHessian`] with the row and column of the first
///   non-finite entry.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.dim() != (dim, dim) {
        return Err(OptError::HessianDimMismatch { expected: dim, found: hessian.dim() });
    }
    match hessian.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(OptError::InvalidHessian { row, col, value }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    // Purpose
    // -------
    // Each check reports the first offending entry.
    //
    // Given
    // -----
    // - Tolerances 0 and NaN; coordinates of the wrong length and with a NaN;
    //   a gradient and a Hessian with an infinite entry.
    //
    // Expect
    // ------
    // - The matching error variants, with the offending index.
    fn checks_report_first_offender() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(matches!(verify_tol_grad(Some(0.0)), Err(OptError::InvalidTolGrad { .. })));
        assert!(matches!(verify_tol_cost(Some(f64::NAN)), Err(OptError::InvalidTolCost { .. })));

        assert!(matches!(
            validate_coordinates(&array![0.0], 2),
            Err(OptError::InvalidHyperparamLength { expected: 2, found: 1 })
        ));
        assert!(matches!(
            validate_coordinates(&array![0.0, f64::NAN], 2),
            Err(OptError::InvalidHyperparam { index: 1, .. })
        ));

        assert!(matches!(
            validate_grad(&array![1.0, f64::INFINITY, f64::NAN], 3),
            Err(OptError::InvalidGradient { index: 1, .. })
        ));
        let mut hess = Array2::<f64>::eye(2);
        hess[[1, 0]] = f64::NEG_INFINITY;
        assert!(matches!(
            validate_hessian(&hess, 2),
            Err(OptError::InvalidHessian { row: 1, col: 0, .. })
        ));
        assert!(matches!(validate_theta_hat(None), Err(OptError::MissingThetaHat)));
    }
}
