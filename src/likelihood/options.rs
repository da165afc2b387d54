//! likelihood::options — configuration for the profile-likelihood fits.
//!
//! Purpose
//! -------
//! Bundle the already-validated optimizer and root-finder options each
//! engine needs, so the maximize entry points take one options value.
//!
//! Invariants & assumptions
//! ------------------------
//! - Component options (`MLEOptions`, `RootOptions`) are validated by their
//!   own constructors; these carriers only add the checks that span fields.
//! - [`DoubleProfileOptions::inner_method`] is the method used for the inner
//!   `η` solve. Any method is accepted there, including `Chandrupatla`.
use crate::{
    likelihood::{method::OptimizationMethod, profile::MAX_ABS_LOG_ETA_GUESS},
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{MLEOptions, SolverKind},
        root_finding::RootOptions,
    },
};

/// Tolerance of the inner `η` solve of the double-profile engine.
pub const DEFAULT_INNER_TOL: f64 = 1e-3;

/// Initial `log10 η` of the inner solve.
pub const DEFAULT_LOG_ETA_GUESS: f64 = 1.0;

/// Options for the single-profile engine.
///
/// - `mle`: tolerances and line search of the Argmin minimizers.
/// - `root`: tolerance and budget of the bracket-and-refine search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileOptions {
    pub mle: MLEOptions,
    pub root: RootOptions,
}

impl ProfileOptions {
    pub fn new(mle: MLEOptions, root: RootOptions) -> Self {
        Self { mle, root }
    }

    /// Apply one scalar tolerance to the minimizer (gradient and cost
    /// change) and to the root search, keeping the default budgets.
    ///
    /// # Errors
    /// - Tolerance validation errors from either component.
    pub fn from_tol(tol: f64) -> OptResult<Self> {
        let mle = MLEOptions::from_tol(tol)?;
        let defaults = RootOptions::default();
        let root = RootOptions::new(tol, defaults.max_iter, defaults.num_bracket_trials)?;
        Ok(Self { mle, root })
    }
}

/// Options for the double-profile engine.
///
/// - `inner_method`: method resolving `η` for each trial distance scale.
/// - `inner_tol`: tolerance of that inner solve.
/// - `log_eta_guess`: starting `log10 η` of the inner solve.
/// - `mle`: options of the outer minimizer over `log10 θ`.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleProfileOptions {
    pub inner_method: OptimizationMethod,
    pub inner_tol: f64,
    pub log_eta_guess: f64,
    pub mle: MLEOptions,
}

impl DoubleProfileOptions {
    /// # Errors
    /// - [`OptError::InvalidRootTolerance`] if `inner_tol` is not finite and
    ///   positive.
    /// - [`OptError::InvalidHyperparam`] if `log_eta_guess` is not finite or
    ///   exceeds [`MAX_ABS_LOG_ETA_GUESS`] in magnitude.
    pub fn new(
        inner_method: OptimizationMethod, inner_tol: f64, log_eta_guess: f64, mle: MLEOptions,
    ) -> OptResult<Self> {
        if !inner_tol.is_finite() || inner_tol <= 0.0 {
            return Err(OptError::InvalidRootTolerance {
                tol: inner_tol,
                reason: "Inner tolerance must be finite and positive.",
            });
        }
        if !log_eta_guess.is_finite() || log_eta_guess.abs() > MAX_ABS_LOG_ETA_GUESS {
            return Err(OptError::InvalidHyperparam {
                index: 0,
                value: log_eta_guess,
                reason: "log10(eta) guess must be finite and within [-100, 100]",
            });
        }
        Ok(Self { inner_method, inner_tol, log_eta_guess, mle })
    }

    /// Options of the inner single-profile solve.
    pub(crate) fn inner_options(&self) -> OptResult<ProfileOptions> {
        ProfileOptions::from_tol(self.inner_tol)
    }
}

impl Default for DoubleProfileOptions {
    fn default() -> Self {
        Self {
            inner_method: OptimizationMethod::Minimizer(SolverKind::NelderMead),
            inner_tol: DEFAULT_INNER_TOL,
            log_eta_guess: DEFAULT_LOG_ETA_GUESS,
            mle: MLEOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Scalar tolerances reach both components; invalid inner settings are
    // rejected.
    //
    // Given
    // -----
    // - `ProfileOptions::from_tol(1e-4)`; double-profile options with a
    //   negative tolerance, an infinite guess and a guess of 200.
    //
    // Expect
    // ------
    // - Tolerances of 1e-4 on the minimizer and root search; both invalid
    //   constructions fail.
    fn options_validate_and_propagate_tolerances() {
        let opts = ProfileOptions::from_tol(1e-4).expect("valid tolerance");
        assert_eq!(opts.mle.tols.tol_grad, Some(1e-4));
        assert_eq!(opts.mle.tols.tol_cost, Some(1e-4));
        assert_eq!(opts.root.tol, 1e-4);

        let method = OptimizationMethod::default();
        assert!(matches!(
            DoubleProfileOptions::new(method, -1.0, 1.0, MLEOptions::default()),
            Err(OptError::InvalidRootTolerance { .. })
        ));
        assert!(matches!(
            DoubleProfileOptions::new(method, 1e-3, f64::INFINITY, MLEOptions::default()),
            Err(OptError::InvalidHyperparam { .. })
        ));
        assert!(matches!(
            DoubleProfileOptions::new(method, 1e-3, 200.0, MLEOptions::default()),
            Err(OptError::InvalidHyperparam { .. })
        ));
    }
}
