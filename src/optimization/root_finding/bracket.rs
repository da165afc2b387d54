//! root_finding::bracket — search for an interval on which a scalar function
//! changes sign.
use crate::optimization::{
    errors::{OptError, OptResult},
    root_finding::options::changes_sign,
};

/// Result of a sign-change search.
///
/// - `found`: whether `values.0` and `values.1` have opposite signs (or one
///   of them is exactly zero).
/// - `bracket`: the interval `(a, b)` with `a < b`. When nothing was found this
///   is the last, most expanded interval that was probed.
/// - `values`: `(f(a), f(b))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub found: bool,
    pub bracket: (f64, f64),
    pub values: (f64, f64),
}

impl Bracket {
    fn found(a: f64, b: f64, fa: f64, fb: f64) -> Self {
        log::debug!("sign change bracketed on [{a}, {b}] with values ({fa}, {fb})");
        Bracket { found: true, bracket: (a, b), values: (fa, fb) }
    }
}

/// find_interval_with_sign_change — bracket a root of `f`.
///
/// Purpose
/// -------
/// Locate an interval over which `f` changes sign, starting from `bracket`
/// and retrying up to `num_trials` times before giving up.
///
/// Parameters
/// ----------
/// - `f`: `FnMut(f64) -> OptResult<f64>`
///   Function to bracket. Errors are propagated immediately.
/// - `bracket`: `(lo, hi)`
///   Initial interval; must be finite with `lo < hi`.
/// - `num_trials`: `usize`
///   Number of subdivide-then-expand rounds after the endpoint test.
///
/// Returns
/// -------
/// `OptResult<Bracket>`
///   `found == true` with the first sign-change cell, or `found == false`
///   with the final expanded interval and its end values.
///
/// Errors
/// ------
/// - `OptError::InvalidBracket` for a malformed initial interval.
/// - `OptError::NonFiniteRootFunction` when `f` returns NaN or ±∞.
/// - Any error returned by `f`.
///
/// Notes
/// -----
/// - Round `t` (1-based) probes the `2^t − 1` interior points of an even
///   subdivision of the current interval, then widens each end by half of
///   the initial width and tests the two new end cells.
/// - The growth is linear in `num_trials`, so a caller working in log space
///   keeps the search within a predictable range.
pub fn find_interval_with_sign_change<F>(
    mut f: F, bracket: (f64, f64), num_trials: usize,
) -> OptResult<Bracket>
where
    F: FnMut(f64) -> OptResult<f64>,
{
    let (mut lo, mut hi) = bracket;
    if !lo.is_finite() || !hi.is_finite() {
        return Err(OptError::InvalidBracket { lo, hi, reason: "Endpoints must be finite." });
    }
    if lo >= hi {
        return Err(OptError::InvalidBracket { lo, hi, reason: "Lower end must be below upper." });
    }

    let mut lo_v = evaluate(&mut f, lo)?;
    let mut hi_v = evaluate(&mut f, hi)?;
    if changes_sign(lo_v, hi_v) {
        return Ok(Bracket::found(lo, hi, lo_v, hi_v));
    }

    let step = 0.5 * (hi - lo);
    for trial in 1..=num_trials {
        let cells = 1usize << trial.min(20);
        let width = (hi - lo) / cells as f64;
        let (mut prev_x, mut prev_v) = (lo, lo_v);
        for k in 1..cells {
            let x = lo + width * k as f64;
            let v = evaluate(&mut f, x)?;
            if changes_sign(prev_v, v) {
                return Ok(Bracket::found(prev_x, x, prev_v, v));
            }
            (prev_x, prev_v) = (x, v);
        }
        if changes_sign(prev_v, hi_v) {
            return Ok(Bracket::found(prev_x, hi, prev_v, hi_v));
        }

        let new_lo = lo - step;
        let new_lo_v = evaluate(&mut f, new_lo)?;
        if changes_sign(new_lo_v, lo_v) {
            return Ok(Bracket::found(new_lo, lo, new_lo_v, lo_v));
        }
        let new_hi = hi + step;
        let new_hi_v = evaluate(&mut f, new_hi)?;
        if changes_sign(hi_v, new_hi_v) {
            return Ok(Bracket::found(hi, new_hi, hi_v, new_hi_v));
        }
        (lo, lo_v, hi, hi_v) = (new_lo, new_lo_v, new_hi, new_hi_v);
    }

    log::debug!(
        "no sign change on [{lo}, {hi}] after {num_trials} trials; end values ({lo_v}, {hi_v})"
    );
    Ok(Bracket { found: false, bracket: (lo, hi), values: (lo_v, hi_v) })
}

fn evaluate<F>(f: &mut F, x: f64) -> OptResult<f64>
where
    F: FnMut(f64) -> OptResult<f64>,
{
    let value = f(x)?;
    if !value.is_finite() {
        return Err(OptError::NonFiniteRootFunction { x, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Immediate success when the endpoints already differ in sign.
    // - Success by subdivision (two roots inside the interval).
    // - Success by expansion (root outside the interval).
    // - Failure reporting and input validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Endpoints with opposite signs are returned unchanged.
    //
    // Given
    // -----
    // - f(x) = x − 0.3 on [0, 1].
    //
    // Expect
    // ------
    // - found, bracket (0, 1), two evaluations only.
    fn endpoints_with_opposite_signs_succeed_immediately() {
        // Arrange
        let mut calls = 0;
        let f = |x: f64| {
            calls += 1;
            Ok(x - 0.3)
        };

        // Act
        let out = find_interval_with_sign_change(f, (0.0, 1.0), 3).expect("search");

        // Assert
        assert!(out.found);
        assert_eq!(out.bracket, (0.0, 1.0));
        assert_eq!(calls, 2);
    }

    #[test]
    // Purpose
    // -------
    // Two roots inside the interval are separated by subdivision.
    //
    // Given
    // -----
    // - f(x) = (x − 0.3)(x − 0.7), positive at both ends of [0, 1].
    //
    // Expect
    // ------
    // - found with bracket (0, 0.5).
    fn subdivision_finds_interior_sign_change() {
        // Arrange
        let f = |x: f64| Ok((x - 0.3) * (x - 0.7));

        // Act
        let out = find_interval_with_sign_change(f, (0.0, 1.0), 3).expect("search");

        // Assert
        assert!(out.found);
        assert_eq!(out.bracket, (0.0, 0.5));
        assert!(out.values.0 > 0.0 && out.values.1 < 0.0);
    }

    #[test]
    // Purpose
    // -------
    // A root to the right of the interval is reached by expansion.
    //
    // Given
    // -----
    // - f(x) = x − 2.2 on [0, 1]; each expansion adds 0.5 per side.
    //
    // Expect
    // ------
    // - found; the bracket contains 2.2.
    fn expansion_finds_exterior_sign_change() {
        // Arrange
        let f = |x: f64| Ok(x - 2.2);

        // Act
        let out = find_interval_with_sign_change(f, (0.0, 1.0), 3).expect("search");

        // Assert
        assert!(out.found);
        assert!(out.bracket.0 <= 2.2 && 2.2 <= out.bracket.1);
    }

    #[test]
    // Purpose
    // -------
    // A function without roots reports `found == false` with the final
    // expanded interval.
    //
    // Given
    // -----
    // - f(x) = 1 + x² on [−1, 1] with 2 trials (step 1 per side per trial).
    //
    // Expect
    // ------
    // - not found; bracket (−3, 3); both values positive.
    fn missing_sign_change_returns_expanded_interval() {
        // Arrange
        let f = |x: f64| Ok(1.0 + x * x);

        // Act
        let out = find_interval_with_sign_change(f, (-1.0, 1.0), 2).expect("search");

        // Assert
        assert!(!out.found);
        assert_eq!(out.bracket, (-3.0, 3.0));
        assert_eq!(out.values, (10.0, 10.0));
    }

    #[test]
    // Purpose
    // -------
    // Malformed intervals and non-finite function values are errors.
    //
    // Given
    // -----
    // - A reversed interval, and a function returning NaN.
    //
    // Expect
    // ------
    // - `InvalidBracket` and `NonFiniteRootFunction`.
    fn invalid_inputs_are_rejected() {
        let err = find_interval_with_sign_change(|x| Ok(x), (1.0, 0.0), 1).unwrap_err();
        assert!(matches!(err, OptError::InvalidBracket { .. }));

        let err = find_interval_with_sign_change(|_| Ok(f64::NAN), (0.0, 1.0), 1).unwrap_err();
        assert!(matches!(err, OptError::NonFiniteRootFunction { .. }));
    }
}
