//! Log-space transforms for the noise ratio and distance scales.
//!
//! The public hyperparameter vector stores `log10 η` and raw distance scales;
//! optimizers see `log10 η` and `log10 θ`. These helpers convert between the
//! representations and encode the `η = 0` / `η = ∞` limits.
//!
//! # Provided items
//! - [`MIN_ETA`], [`MAX_ETA`]: regime thresholds below/above which the
//!   profiled estimators switch to their limiting closed forms.
//! - [`ASYMPTOTIC_ETA`]: threshold above which η-derivatives use their
//!   leading-order expansion in `1/η`.
//! - [`eta_from_log10`], [`log10_from_eta`]: `log10 η ↔ η` with `±∞` mapped
//!   to `η ∈ {0, ∞}`.
//! - [`fold_distance_scale`]: `abs` folding of raw distance scales plus the
//!   sign factors needed by the chain rule.
//! - [`distance_scale_from_log10`], [`log10_distance_scale`]: optimizer
//!   coordinates for the distance scales.
use ndarray::{Array1, ArrayView1};

use crate::optimization::errors::{OptError, OptResult};

/// Below this noise ratio the noise standard deviation is reported as zero.
pub const MIN_ETA: f64 = 1e-16;

/// At or above this noise ratio the data are treated as pure noise and the
/// likelihood is evaluated from ordinary least squares.
pub const MAX_ETA: f64 = 1e16;

/// At or above this noise ratio the η-derivatives switch to the leading term
/// of their expansion in `1/η`; the exact expressions lose every significant
/// digit to cancellation well before [`MAX_ETA`].
pub const ASYMPTOTIC_ETA: f64 = 1e8;

/// Map `log10 η` to `η`, sending `-∞` to `0` and `+∞` to `∞`.
///
/// # Errors
/// - [`OptError::InvalidHyperparam`] (index 0) for `NaN`.
pub fn eta_from_log10(log_eta: f64) -> OptResult<f64> {
    if log_eta.is_nan() {
        return Err(OptError::InvalidHyperparam {
            index: 0,
            value: log_eta,
            reason: "log10(eta) must not be NaN",
        });
    }
    if log_eta == f64::NEG_INFINITY {
        return Ok(0.0);
    }
    Ok(10f64.powf(log_eta))
}

/// Map `η ≥ 0` to `log10 η`, with `log10 0 = -∞` and `log10 ∞ = ∞`.
pub fn log10_from_eta(eta: f64) -> f64 {
    if eta == 0.0 { f64::NEG_INFINITY } else { eta.log10() }
}

/// Fold raw distance scales through `abs`.
///
/// Returns `(|θ|, sign(θ))`. `offset` is added to the reported index on
/// error so callers can point into the full hyperparameter vector.
///
/// # Errors
/// - [`OptError::InvalidHyperparam`] for zero or non-finite entries.
pub fn fold_distance_scale(
    raw: ArrayView1<'_, f64>, offset: usize,
) -> OptResult<(Array1<f64>, Array1<f64>)> {
    for (i, &value) in raw.iter().enumerate() {
        if !value.is_finite() || value == 0.0 {
            return Err(OptError::InvalidHyperparam {
                index: i + offset,
                value,
                reason: "distance scale must be finite and non-zero",
            });
        }
    }
    Ok((raw.mapv(f64::abs), raw.mapv(f64::signum)))
}

/// `θ = 10^u` elementwise.
pub fn distance_scale_from_log10(log_scale: ArrayView1<'_, f64>) -> Array1<f64> {
    log_scale.mapv(|u| 10f64.powf(u))
}

/// `u = log10 |θ|` elementwise.
///
/// # Errors
/// - [`OptError::InvalidHyperparam`] for zero or non-finite entries.
pub fn log10_distance_scale(
    distance_scale: ArrayView1<'_, f64>, offset: usize,
) -> OptResult<Array1<f64>> {
    let (abs, _) = fold_distance_scale(distance_scale, offset)?;
    Ok(abs.mapv(f64::log10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The `±∞` limits of the η conversions.
    // - Folding of signed distance scales and rejection of zeros.
    //
    // They intentionally DO NOT cover:
    // - How the likelihood engines consume the sign factors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // η conversions map the infinite ends of log-space onto 0 and ∞.
    //
    // Given
    // -----
    // - log10 η ∈ {-∞, -2, 3, +∞} and NaN.
    //
    // Expect
    // ------
    // - η ∈ {0, 0.01, 1000, ∞}; the inverse maps back; NaN is rejected.
    fn eta_conversions_handle_limits() {
        assert_eq!(eta_from_log10(f64::NEG_INFINITY).expect("-inf"), 0.0);
        assert_relative_eq!(eta_from_log10(-2.0).expect("-2"), 0.01, max_relative = 1e-14);
        assert_relative_eq!(eta_from_log10(3.0).expect("3"), 1000.0, max_relative = 1e-14);
        assert!(eta_from_log10(f64::INFINITY).expect("inf").is_infinite());

        assert_eq!(log10_from_eta(0.0), f64::NEG_INFINITY);
        assert_eq!(log10_from_eta(f64::INFINITY), f64::INFINITY);
        assert_relative_eq!(log10_from_eta(0.01), -2.0, max_relative = 1e-14);

        assert!(matches!(
            eta_from_log10(f64::NAN),
            Err(OptError::InvalidHyperparam { index: 0, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Folding returns magnitudes plus signs and rejects zeros with an offset
    // index.
    //
    // Given
    // -----
    // - θ = (-0.5, 2) and θ = (1, 0) with offset 1.
    //
    // Expect
    // ------
    // - (|θ|, sign) = ((0.5, 2), (-1, 1)); zero reported at index 2.
    fn fold_distance_scale_returns_signs() {
        let (abs, signs) = fold_distance_scale(array![-0.5, 2.0].view(), 1).expect("fold");
        assert_eq!(abs, array![0.5, 2.0]);
        assert_eq!(signs, array![-1.0, 1.0]);

        let err = fold_distance_scale(array![1.0, 0.0].view(), 1).expect_err("zero scale");
        assert!(matches!(err, OptError::InvalidHyperparam { index: 2, .. }));

        let log_scale = log10_distance_scale(array![-0.1, 100.0].view(), 0).expect("log");
        assert_relative_eq!(log_scale[0], -1.0, max_relative = 1e-14);
        let back = distance_scale_from_log10(log_scale.view());
        assert_relative_eq!(back[1], 100.0, max_relative = 1e-12);
    }
}
