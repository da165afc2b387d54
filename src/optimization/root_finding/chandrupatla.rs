//! root_finding::chandrupatla — bracketed root refinement.
//!
//! Chandrupatla's method keeps a sign-change bracket `[a, b]` plus the
//! previously discarded end point `c`. Each step proposes
//! `x = a + t(b − a)` with `t` from inverse quadratic interpolation through
//! `(a, b, c)` when the local shape test admits it, and `t = ½` otherwise.
//! `t` is clamped to `[t_lim, 1 − t_lim]`, so every evaluation lies strictly
//! inside the current bracket and at least one tolerance away from its ends.
use crate::optimization::{
    errors::{OptError, OptResult},
    root_finding::options::changes_sign,
};

/// Outcome of a root refinement.
///
/// - `root`: best estimate (the bracket end with the smaller `|f|`).
/// - `value`: `f(root)`.
/// - `iterations`: number of function evaluations made by the refinement.
/// - `converged`: `false` when `max_iter` was exhausted first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOutcome {
    pub root: f64,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// chandrupatla_method — refine a bracketed root of `f`.
///
/// Parameters
/// ----------
/// - `f`: `FnMut(f64) -> OptResult<f64>`
/// - `bracket`: `(x0, x1)` with a sign change between them (either order).
/// - `values`: `(f(x0), f(x1))`, already evaluated by the caller.
/// - `eps_m`: relative tolerance on the root.
/// - `eps_a`: absolute tolerance on the root.
/// - `max_iter`: cap on new evaluations.
///
/// Returns
/// -------
/// `OptResult<RootOutcome>`. Running out of iterations is not an error: the
/// best point is returned with `converged = false` and a warning is logged.
///
/// Errors
/// ------
/// - `OptError::InvalidBracket` if the ends are non-finite, coincide, or do
///   not bracket a sign change.
/// - `OptError::InvalidRootTolerance` for negative or non-finite tolerances,
///   or when both are zero.
/// - `OptError::NonFiniteRootFunction` if `f` returns NaN or ±∞.
///
/// Notes
/// -----
/// - Stops as soon as `2·eps_m·|x_best| + eps_a` exceeds half of the current
///   bracket width, or `f(x_best) == 0`.
pub fn chandrupatla_method<F>(
    mut f: F, bracket: (f64, f64), values: (f64, f64), eps_m: f64, eps_a: f64, max_iter: usize,
) -> OptResult<RootOutcome>
where
    F: FnMut(f64) -> OptResult<f64>,
{
    let (mut b, mut a) = bracket;
    let (mut fb, mut fa) = values;
    validate_inputs(a, b, fa, fb, eps_m, eps_a)?;

    if fa == 0.0 {
        return Ok(RootOutcome { root: a, value: fa, iterations: 0, converged: true });
    }
    if fb == 0.0 {
        return Ok(RootOutcome { root: b, value: fb, iterations: 0, converged: true });
    }

    let mut c;
    let mut fc;
    let mut t = 0.5;
    let (mut x_best, mut f_best) = if fa.abs() < fb.abs() { (a, fa) } else { (b, fb) };

    for iteration in 1..=max_iter {
        let xt = a + t * (b - a);
        let ft = f(xt)?;
        if !ft.is_finite() {
            return Err(OptError::NonFiniteRootFunction { x: xt, value: ft });
        }

        if (ft < 0.0) == (fa < 0.0) {
            c = a;
            fc = fa;
        } else {
            c = b;
            fc = fb;
            b = a;
            fb = fa;
        }
        a = xt;
        fa = ft;

        (x_best, f_best) = if fa.abs() < fb.abs() { (a, fa) } else { (b, fb) };
        if f_best == 0.0 {
            return Ok(RootOutcome {
                root: x_best,
                value: f_best,
                iterations: iteration,
                converged: true,
            });
        }

        let tol = 2.0 * eps_m * x_best.abs() + eps_a;
        let t_lim = tol / (b - a).abs();
        if t_lim > 0.5 {
            return Ok(RootOutcome {
                root: x_best,
                value: f_best,
                iterations: iteration,
                converged: true,
            });
        }

        let xi = (a - b) / (c - b);
        let phi = (fa - fb) / (fc - fb);
        t = if phi * phi < xi && (1.0 - phi) * (1.0 - phi) < 1.0 - xi {
            fa / (fb - fa) * fc / (fb - fc) + (c - a) / (b - a) * fa / (fc - fa) * fb / (fc - fb)
        } else {
            0.5
        };
        t = t.clamp(t_lim, 1.0 - t_lim);
    }

    log::warn!(
        "Chandrupatla refinement stopped after {max_iter} iterations; \
         best point {x_best} with residual {f_best}"
    );
    Ok(RootOutcome { root: x_best, value: f_best, iterations: max_iter, converged: false })
}

fn validate_inputs(a: f64, b: f64, fa: f64, fb: f64, eps_m: f64, eps_a: f64) -> OptResult<()> {
    let (lo, hi) = (a.min(b), a.max(b));
    if !a.is_finite() || !b.is_finite() {
        return Err(OptError::InvalidBracket { lo, hi, reason: "Endpoints must be finite." });
    }
    if a == b {
        return Err(OptError::InvalidBracket { lo, hi, reason: "Endpoints must differ." });
    }
    if !fa.is_finite() || !fb.is_finite() {
        return Err(OptError::InvalidBracket { lo, hi, reason: "End values must be finite." });
    }
    if !changes_sign(fa, fb) {
        return Err(OptError::InvalidBracket { lo, hi, reason: "End values must differ in sign." });
    }
    for tol in [eps_m, eps_a] {
        if !tol.is_finite() || tol < 0.0 {
            return Err(OptError::InvalidRootTolerance {
                tol,
                reason: "Tolerances must be finite and non-negative.",
            });
        }
    }
    if eps_m == 0.0 && eps_a == 0.0 {
        return Err(OptError::InvalidRootTolerance {
            tol: 0.0,
            reason: "At least one tolerance must be positive.",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Accuracy on smooth test functions.
    // - Evaluations staying strictly inside the initial bracket.
    // - Exact-zero shortcuts and iteration exhaustion.
    // - Rejection of invalid brackets.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The classic cubic x³ − 2x − 5 is solved to tolerance.
    //
    // Given
    // -----
    // - Bracket [2, 3], eps_m = eps_a = 1e-12.
    //
    // Expect
    // ------
    // - root ≈ 2.0945514815423265, converged, fewer than 20 evaluations.
    fn solves_cubic_to_tolerance() {
        // Arrange
        let f = |x: f64| Ok(x * x * x - 2.0 * x - 5.0);

        // Act
        let out = chandrupatla_method(f, (2.0, 3.0), (-1.0, 16.0), 1e-12, 1e-12, 100)
            .expect("refinement");

        // Assert
        assert!(out.converged);
        assert_abs_diff_eq!(out.root, 2.0945514815423265, epsilon = 1e-10);
        assert!(out.iterations > 0 && out.iterations < 20);
    }

    #[test]
    // Purpose
    // -------
    // Every evaluation lies strictly inside the starting bracket.
    //
    // Given
    // -----
    // - f(x) = cos x − x on [0, 1] (root ≈ 0.7390851332).
    //
    // Expect
    // ------
    // - All recorded x satisfy 0 < x < 1 and the root is accurate.
    fn evaluations_stay_inside_bracket() {
        // Arrange
        let mut seen = Vec::new();
        let f = |x: f64| {
            seen.push(x);
            Ok(x.cos() - x)
        };

        // Act
        let out = chandrupatla_method(f, (0.0, 1.0), (1.0, 1f64.cos() - 1.0), 1e-10, 1e-10, 100)
            .expect("refinement");

        // Assert
        assert_abs_diff_eq!(out.root, 0.7390851332151607, epsilon = 1e-8);
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&x| x > 0.0 && x < 1.0));
    }

    #[test]
    // Purpose
    // -------
    // An exact zero at an end returns without evaluating.
    //
    // Given
    // -----
    // - values = (0, 1).
    //
    // Expect
    // ------
    // - root equals the first end, iterations = 0.
    fn zero_at_end_short_circuits() {
        let f = |_: f64| -> OptResult<f64> { panic!("no evaluation expected") };
        let out =
            chandrupatla_method(f, (0.5, 2.0), (0.0, 1.0), 1e-8, 1e-8, 10).expect("refinement");
        assert_eq!(out.root, 0.5);
        assert_eq!(out.iterations, 0);
        assert!(out.converged);
    }

    #[test]
    // Purpose
    // -------
    // Exhausting the iteration cap returns the best point without error.
    //
    // Given
    // -----
    // - f(x) = x³ − 0.2 on [0, 1] with max_iter = 2 and a tight tol.
    //
    // Expect
    // ------
    // - converged = false, iterations = 2, root within the bracket.
    fn exhaustion_is_reported_not_raised() {
        // Arrange
        let f = |x: f64| Ok(x * x * x - 0.2);

        // Act
        let out =
            chandrupatla_method(f, (0.0, 1.0), (-0.2, 0.8), 1e-15, 1e-15, 2).expect("refinement");

        // Assert
        assert!(!out.converged);
        assert_eq!(out.iterations, 2);
        assert!(out.root > 0.0 && out.root < 1.0);
    }

    #[test]
    // Purpose
    // -------
    // A bracket without a sign change is rejected.
    //
    // Given
    // -----
    // - values (1, 2).
    //
    // Expect
    // ------
    // - `InvalidBracket`.
    fn same_sign_bracket_is_rejected() {
        let err = chandrupatla_method(|x| Ok(x), (0.0, 1.0), (1.0, 2.0), 1e-8, 1e-8, 10)
            .unwrap_err();
        assert!(matches!(err, OptError::InvalidBracket { .. }));
    }
}
