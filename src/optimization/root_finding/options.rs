//! root_finding::options — configuration shared by the bracket search and
//! Chandrupatla's method.
use crate::optimization::errors::{OptError, OptResult};

/// Default absolute tolerance on the root location.
pub const DEFAULT_ROOT_TOL: f64 = 1e-6;

/// Default cap on Chandrupatla iterations.
pub const DEFAULT_ROOT_MAX_ITER: usize = 100;

/// Default number of subdivide-then-expand rounds in the bracket search.
pub const DEFAULT_BRACKET_TRIALS: usize = 3;

/// Options for bracketed scalar root finding.
///
/// - `tol`: absolute tolerance `eps_a`; the relative tolerance `eps_m` is
///   set to the same value.
/// - `max_iter`: maximum number of Chandrupatla iterations.
/// - `num_bracket_trials`: retries of the sign-change search before the
///   caller falls back to a boundary decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOptions {
    pub tol: f64,
    pub max_iter: usize,
    pub num_bracket_trials: usize,
}

impl RootOptions {
    /// Construct validated root-finding options.
    ///
    /// # Errors
    /// - [`OptError::InvalidRootTolerance`] if `tol` is non-finite or ≤ 0.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(tol: f64, max_iter: usize, num_bracket_trials: usize) -> OptResult<Self> {
        if !tol.is_finite() {
            return Err(OptError::InvalidRootTolerance { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidRootTolerance {
                tol,
                reason: "Tolerance must be positive.",
            });
        }
        if max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol, max_iter, num_bracket_trials })
    }
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            tol: DEFAULT_ROOT_TOL,
            max_iter: DEFAULT_ROOT_MAX_ITER,
            num_bracket_trials: DEFAULT_BRACKET_TRIALS,
        }
    }
}

/// `true` when `fa` and `fb` bracket a root: opposite signs or an exact zero.
#[inline]
pub fn changes_sign(fa: f64, fb: f64) -> bool {
    fa == 0.0 || fb == 0.0 || (fa < 0.0) != (fb < 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Construction rejects unusable tolerances and iteration caps.
    //
    // Given
    // -----
    // - tol ∈ {0, NaN} and max_iter = 0.
    //
    // Expect
    // ------
    // - `InvalidRootTolerance` and `InvalidMaxIter` respectively.
    fn new_rejects_invalid_settings() {
        assert!(matches!(
            RootOptions::new(0.0, 10, 3),
            Err(OptError::InvalidRootTolerance { .. })
        ));
        assert!(matches!(
            RootOptions::new(f64::NAN, 10, 3),
            Err(OptError::InvalidRootTolerance { .. })
        ));
        assert!(matches!(RootOptions::new(1e-6, 0, 3), Err(OptError::InvalidMaxIter { .. })));
        assert_eq!(RootOptions::new(1e-6, 100, 3).expect("valid"), RootOptions::default());
    }

    #[test]
    // Purpose
    // -------
    // Sign-change predicate treats exact zeros as bracketing.
    //
    // Given
    // -----
    // - Same-sign, opposite-sign and zero pairs.
    //
    // Expect
    // ------
    // - Only the same-sign pair is rejected.
    fn changes_sign_handles_zeros() {
        assert!(!changes_sign(1.0, 2.0));
        assert!(!changes_sign(-1.0, -2.0));
        assert!(changes_sign(-1.0, 2.0));
        assert!(changes_sign(0.0, 2.0));
        assert!(changes_sign(-3.0, 0.0));
    }
}
