//! likelihood::profile — single profile likelihood in `(η, θ)`.
//!
//! Purpose
//! -------
//! Evaluate and maximize the log-likelihood of `z ~ N(Xβ, σ²C(θ) + σ0²I)`
//! with `β` and `σ²` profiled out analytically, leaving the noise ratio
//! `η = σ0²/σ²` and the distance scales `θ` as free hyperparameters.
//!
//! Key behaviors
//! -------------
//! - [`likelihood`] evaluates
//!   `ℓ = −½(n−m)ln 2π − ½(n−m)ln σ̂² − ½ln det K − ½ln det(XᵀK⁻¹X) − ½(n−m)`
//!   with `K = C + ηI` and `σ̂² = zᵀMz/(n−m)`. For `η ≥ 1e16` the `η → ∞`
//!   limit is evaluated from ordinary least squares residuals.
//! - Closed-form first and second derivatives in `η`, in `θ` and mixed,
//!   assembled into a Jacobian and Hessian over `[log10 η, θ...]`.
//! - Closed-form `σ̂`, `σ̂0` for a given `η`.
//! - [`find_likelihood_der1_zeros`] brackets and refines the root of
//!   `∂ℓ/∂η`, falling back to a boundary decision between `η = 0` and
//!   `η = ∞` when the derivative keeps its sign.
//! - [`maximize_likelihood`] dispatches on [`OptimizationMethod`] and
//!   returns an [`OptimizationRecord`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Hyperparameter vectors are `[log10 η]` or `[log10 η, θ_1, ..., θ_d]`.
//!   `log10 η = −∞` means `η = 0`. Raw `θ` entries are folded through `abs`;
//!   derivatives carry the matching sign factors.
//! - When `θ` is present it is set on the operator before any algebra, so
//!   each call is a pure function of its arguments. When absent, the
//!   operator's current distance scale is used.
//! - `M` is never formed; every product goes through operator solves.
//! - For `η ≥ 1e8` the `η`-derivatives use their leading term in `1/η`.
//!   The exact expressions are differences of nearly equal `O(1/η)`
//!   quantities there.
//!
//! Conventions
//! -----------
//! - Derivatives named `*_eta` are with respect to physical `η`; the
//!   Jacobian/Hessian use `log10 η` as their first coordinate.
//! - `sign_switch = true` negates the returned value (and derivatives), so
//!   the same code serves minimizers.
//!
//! Testing notes
//! -------------
//! - Unit tests check sign-switch antisymmetry, derivatives against central
//!   differences, the at-root second derivative, idempotence, continuity at
//!   the large-`η` switch, the `σ̂`, `σ̂0` limits and the boundary decision.
use std::f64::consts::{LN_10, PI};

use ndarray::{Array1, Array2, s};

use crate::{
    covariance::CovarianceOperator,
    likelihood::{
        gls::{GlsSystem, ols_fit, trace_of_product, validate_data},
        method::OptimizationMethod,
        objective::SingleProfileObjective,
        options::ProfileOptions,
        types::{HyperparamRecord, OptimizationRecord, OptimizationSummary, Stopwatch},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::maximize,
        numerical_stability::{
            ASYMPTOTIC_ETA, MAX_ETA, MIN_ETA, distance_scale_from_log10, eta_from_log10,
            fold_distance_scale, log10_distance_scale,
        },
        root_finding::{RootOptions, chandrupatla_method, find_interval_with_sign_change},
    },
};

/// Lower edge of the default `η` search interval.
const ETA_INTERVAL_LO: f64 = 1e-4;

/// Upper edge of the default `η` search interval.
const ETA_INTERVAL_HI: f64 = 1e3;

/// Largest accepted `|log10 η|` guess; the search interval stays finite.
pub const MAX_ABS_LOG_ETA_GUESS: f64 = 100.0;

/// `∂ℓ/∂η(0)` counts as zero below this fraction of the larger end
/// derivative.
const FLAT_DER1_RTOL: f64 = 1e-10;

/// Result of the one-dimensional search for the optimal `η`.
///
/// - `eta`: the root of `∂ℓ/∂η`, or `0` / `∞` from the boundary decision.
/// - `iterations`: Chandrupatla iterations; `0` for a boundary decision.
/// - `converged`: `false` only if the refinement ran out of iterations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaRoot {
    pub eta: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Evaluation point decoded from a public hyperparameter vector.
struct EvalPoint {
    eta: f64,
    signs: Option<Array1<f64>>,
}

/// Validate inputs, decode `η` and set the distance scale when present.
fn prepare<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam: &Array1<f64>,
) -> OptResult<EvalPoint>
where
    C: CovarianceOperator + ?Sized,
{
    validate_data(z, x, &*cov)?;
    let d = cov.dimension();
    if hyperparam.len() != 1 && hyperparam.len() != 1 + d {
        return Err(OptError::InvalidHyperparamLength { expected: 1 + d, found: hyperparam.len() });
    }
    let eta = eta_from_log10(hyperparam[0])?;
    if hyperparam.len() == 1 {
        return Ok(EvalPoint { eta, signs: None });
    }
    let (scale, signs) = fold_distance_scale(hyperparam.slice(s![1..]), 1)?;
    cov.set_distance_scale(&scale)?;
    Ok(EvalPoint { eta, signs: Some(signs) })
}

fn signed(value: f64, sign_switch: bool) -> f64 {
    if sign_switch { -value } else { value }
}

// ---- Likelihood -------------------------------------------------------------

/// likelihood — profile log-likelihood at `hyperparam`.
///
/// Parameters
/// ----------
/// - `z`: observations, length `n`.
/// - `x`: design matrix, `n × m`, full column rank.
/// - `cov`: covariance operator over the `n` points.
/// - `sign_switch`: return `−ℓ` instead of `ℓ`.
/// - `hyperparam`: `[log10 η]` or `[log10 η, θ...]`.
///
/// Errors
/// ------
/// - Shape and hyperparameter validation errors.
/// - `NotPositiveDefinite`, `SingularDesign`, `DegenerateResidual` from the
///   algebra.
pub fn likelihood<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, sign_switch: bool, hyperparam: &Array1<f64>,
) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    Ok(signed(profile_value(z, x, &*cov, point.eta)?, sign_switch))
}

/// `ℓ(η)` at the operator's current distance scale.
pub(crate) fn profile_value<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64,
) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    let dof = (x.nrows() - x.ncols()) as f64;
    let base = -0.5 * dof * ((2.0 * PI).ln() + 1.0);
    if eta >= MAX_ETA {
        let ols = ols_fit(z, x)?;
        let sigma0_sq = ols.rss / dof;
        if !sigma0_sq.is_finite() || sigma0_sq <= 0.0 {
            return Err(OptError::DegenerateResidual { value: ols.rss });
        }
        return Ok(base - 0.5 * dof * sigma0_sq.ln() - 0.5 * ols.logdet_xtx);
    }
    let gls = GlsSystem::new(cov, z, x, eta)?;
    Ok(base - 0.5 * dof * gls.sigma2().ln() - 0.5 * cov.logdet(eta)? - 0.5 * gls.logdet_b)
}

// ---- Derivatives in eta -----------------------------------------------------

/// Leading coefficient `L1` of `ℓ(η) = ℓ(∞) + L1/η + O(1/η²)`.
///
/// `L1 = ½[(n−m) rᵀCr / rᵀr − tr(QC)]`, `r` the OLS residual and
/// `Q = I − X(XᵀX)⁻¹Xᵀ`.
fn large_eta_coefficient<C>(z: &Array1<f64>, x: &Array2<f64>, cov: &C) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    let dof = (x.nrows() - x.ncols()) as f64;
    let ols = ols_fit(z, x)?;
    if !ols.rss.is_finite() || ols.rss <= 0.0 {
        return Err(OptError::DegenerateResidual { value: ols.rss });
    }
    let corr = cov.get_matrix(1.0, 0.0, &[])?;
    let rcr = ols.residual.dot(&corr.dot(&ols.residual));
    let xtcx = x.t().dot(&corr.dot(x));
    let tr_qc = corr.diag().sum() - trace_of_product(&ols.xtx_inv, &xtcx);
    Ok(0.5 * (dof * rcr / ols.rss - tr_qc))
}

fn der1_eta_at<C>(z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    if eta.is_infinite() {
        return Ok(0.0);
    }
    if eta >= ASYMPTOTIC_ETA {
        return Ok(-large_eta_coefficient(z, x, cov)? / (eta * eta));
    }
    let gls = GlsSystem::new(cov, z, x, eta)?;
    let zm2z = gls.mz.dot(&gls.mz);
    Ok(-0.5 * (gls.trace_m()? - zm2z / gls.sigma2()))
}

fn der2_eta_at<C>(z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    if eta.is_infinite() {
        return Ok(0.0);
    }
    if eta >= ASYMPTOTIC_ETA {
        return Ok(2.0 * large_eta_coefficient(z, x, cov)? / eta.powi(3));
    }
    let gls = GlsSystem::new(cov, z, x, eta)?;
    let sigma2 = gls.sigma2();
    let m2z = gls.apply_m(&gls.mz)?;
    let zm2z = gls.mz.dot(&gls.mz);
    let zm3z = gls.mz.dot(&m2z);
    Ok(0.5
        * (gls.trace_m2()? - 2.0 * zm3z / sigma2 + zm2z * zm2z / (gls.dof * sigma2 * sigma2)))
}

/// likelihood_der1_eta — `∂ℓ/∂η` with `σ̂²(η)` profiled.
///
/// `∂ℓ/∂η = −½(tr M − zᵀM²z/σ̂²)`; `0` at `η = ∞`.
///
/// Errors
/// ------
/// - As [`likelihood`].
pub fn likelihood_der1_eta<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam: &Array1<f64>,
) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    der1_eta_at(z, x, &*cov, point.eta)
}

/// likelihood_der2_eta — `∂²ℓ/∂η²` including the chain rule through
/// `σ̂²(η)`:
///
/// `½(tr M² − 2zᵀM³z/σ̂² + (zᵀM²z)²/((n−m)σ̂⁴))`.
///
/// Valid at any `η`; this is the form fed to Hessian-based optimizers.
pub fn likelihood_der2_eta<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam: &Array1<f64>,
) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    der2_eta_at(z, x, &*cov, point.eta)
}

/// likelihood_der2_eta_at_root — simplified `∂²ℓ/∂η²` that uses
/// `tr M = zᵀM²z/σ̂²`.
///
/// `(½/σ̂²)[(tr M²/(n−m) + (tr M/(n−m))²) zᵀMz − 2zᵀM³z]`
///
/// Only equal to [`likelihood_der2_eta`] where `∂ℓ/∂η = 0`. Useful to
/// classify a root; never use it away from one.
pub fn likelihood_der2_eta_at_root<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam: &Array1<f64>,
) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    if point.eta >= MAX_ETA {
        return Ok(0.0);
    }
    let gls = GlsSystem::new(cov, z, x, point.eta)?;
    let m2z = gls.apply_m(&gls.mz)?;
    let zm3z = gls.mz.dot(&m2z);
    let tr_m = gls.trace_m()? / gls.dof;
    let tr_m2 = gls.trace_m2()? / gls.dof;
    Ok(0.5 / gls.sigma2() * ((tr_m2 + tr_m * tr_m) * gls.zmz - 2.0 * zm3z))
}

// ---- Derivatives in the distance scale --------------------------------------

/// Per-index building blocks shared by the distance-scale derivatives.
struct ScaleTerms {
    /// `∂K/∂θp`.
    kp: Vec<Array2<f64>>,
    /// `Kp Mz`.
    kp_mz: Vec<Array1<f64>>,
    /// `Kp Y`.
    kp_y: Vec<Array2<f64>>,
}

impl ScaleTerms {
    fn new<C>(cov: &C, gls: &GlsSystem<'_, C>) -> OptResult<Self>
    where
        C: CovarianceOperator + ?Sized,
    {
        let d = cov.dimension();
        let mut kp = Vec::with_capacity(d);
        let mut kp_mz = Vec::with_capacity(d);
        let mut kp_y = Vec::with_capacity(d);
        for p in 0..d {
            let k = cov.get_matrix(1.0, 0.0, &[p])?;
            kp_mz.push(k.dot(&gls.mz));
            kp_y.push(k.dot(&gls.y));
            kp.push(k);
        }
        Ok(Self { kp, kp_mz, kp_y })
    }
}

fn der1_distance_scale_at<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64,
) -> OptResult<Array1<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let d = cov.dimension();
    if eta >= MAX_ETA {
        return Ok(Array1::zeros(d));
    }
    let gls = GlsSystem::new(cov, z, x, eta)?;
    let terms = ScaleTerms::new(cov, &gls)?;
    let sigma2 = gls.sigma2();
    let mut out = Array1::zeros(d);
    for p in 0..d {
        let tr_kinv_kp = cov.trace_solve(eta, &terms.kp[p])?;
        let tr_m_kp = tr_kinv_kp - gls.trace_b_inv(&gls.y.t().dot(&terms.kp_y[p]));
        out[p] = -0.5 * tr_m_kp + 0.5 * gls.mz.dot(&terms.kp_mz[p]) / sigma2;
    }
    Ok(out)
}

fn der2_distance_scale_at<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64,
) -> OptResult<Array2<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let d = cov.dimension();
    if eta >= MAX_ETA {
        return Ok(Array2::zeros((d, d)));
    }
    let gls = GlsSystem::new(cov, z, x, eta)?;
    let terms = ScaleTerms::new(cov, &gls)?;
    let sigma2 = gls.sigma2();
    let dof = gls.dof;

    let mut kinv_kp = Vec::with_capacity(d);
    let mut m_kp_mz = Vec::with_capacity(d);
    let mut yt_kp_y = Vec::with_capacity(d);
    for p in 0..d {
        kinv_kp.push(cov.solve(eta, &terms.kp[p])?);
        m_kp_mz.push(gls.apply_m(&terms.kp_mz[p])?);
        yt_kp_y.push(gls.y.t().dot(&terms.kp_y[p]));
    }
    let zm_kp_mz: Vec<f64> = terms.kp_mz.iter().map(|v| gls.mz.dot(v)).collect();

    let mut out = Array2::zeros((d, d));
    for p in 0..d {
        let kinv_kp_y = kinv_kp[p].dot(&gls.y);
        let b_inv_yt_kp_y = gls.b_inv.dot(&yt_kp_y[p]);
        for q in p..d {
            let kinv_kq_y = kinv_kp[q].dot(&gls.y);
            let b_inv_yt_kq_y = gls.b_inv.dot(&yt_kp_y[q]);
            let tr_m_kp_m_kq = trace_of_product(&kinv_kp[p], &kinv_kp[q])
                - gls.trace_b_inv(&terms.kp_y[q].t().dot(&kinv_kp_y))
                - gls.trace_b_inv(&terms.kp_y[p].t().dot(&kinv_kq_y))
                + trace_of_product(&b_inv_yt_kp_y, &b_inv_yt_kq_y);

            let kpq = cov.get_matrix(1.0, 0.0, &[p, q])?;
            let tr_m_kpq =
                cov.trace_solve(eta, &kpq)? - gls.trace_b_inv(&gls.y.t().dot(&kpq.dot(&gls.y)));
            let zm_kpq_mz = gls.mz.dot(&kpq.dot(&gls.mz));
            let zm_kp_m_kq_mz = terms.kp_mz[p].dot(&m_kp_mz[q]);

            let value = 0.5 * tr_m_kp_m_kq - 0.5 * tr_m_kpq + 0.5 * zm_kpq_mz / sigma2
                - zm_kp_m_kq_mz / sigma2
                + 0.5 * zm_kp_mz[p] * zm_kp_mz[q] / (dof * sigma2 * sigma2);
            out[[p, q]] = value;
            out[[q, p]] = value;
        }
    }
    Ok(out)
}

fn der2_mixed_at<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64,
) -> OptResult<Array1<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let d = cov.dimension();
    if eta >= MAX_ETA {
        return Ok(Array1::zeros(d));
    }
    let gls = GlsSystem::new(cov, z, x, eta)?;
    let terms = ScaleTerms::new(cov, &gls)?;
    let sigma2 = gls.sigma2();
    let m2z = gls.apply_m(&gls.mz)?;
    let zm2z = gls.mz.dot(&gls.mz);
    let v = cov.solve(eta, &gls.y)?;
    let yty = gls.y.t().dot(&gls.y);
    let b_inv_yty = gls.b_inv.dot(&yty);

    let mut out = Array1::zeros(d);
    for p in 0..d {
        let kinv_kp = cov.solve(eta, &terms.kp[p])?;
        let yt_kp_y = gls.y.t().dot(&terms.kp_y[p]);
        let tr_m_kp_m = cov.trace_solve(eta, &kinv_kp)?
            - 2.0 * gls.trace_b_inv(&v.t().dot(&terms.kp_y[p]))
            + trace_of_product(&gls.b_inv.dot(&yt_kp_y), &b_inv_yty);
        let zm_kp_mz = gls.mz.dot(&terms.kp_mz[p]);
        out[p] = 0.5 * tr_m_kp_m - terms.kp_mz[p].dot(&m2z) / sigma2
            + 0.5 * zm_kp_mz * zm2z / (gls.dof * sigma2 * sigma2);
    }
    Ok(out)
}

/// likelihood_der1_distance_scale — `∂ℓ/∂θp` for every distance scale.
///
/// `∂ℓ/∂θp = −½tr(M Kp) + ½zᵀM Kp Mz/σ̂²` with `Kp = ∂C/∂θp`. Returned with
/// respect to the folded scales `|θ|`; zero for `η ≥ 1e16`.
///
/// Errors
/// ------
/// - As [`likelihood`], plus `DistanceScaleUnset` if neither `hyperparam`
///   nor the operator provides a distance scale.
pub fn likelihood_der1_distance_scale<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam: &Array1<f64>,
) -> OptResult<Array1<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    der1_distance_scale_at(z, x, &*cov, point.eta)
}

/// likelihood_der2_distance_scale — `∂²ℓ/∂θp∂θq` (symmetric `d × d`):
///
/// `½tr(MKpMKq) − ½tr(MKpq) + ½zᵀMKpqMz/σ̂² − zᵀMKpMKqMz/σ̂²
///  + ½(zᵀMKpMz)(zᵀMKqMz)/((n−m)σ̂⁴)`.
pub fn likelihood_der2_distance_scale<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam: &Array1<f64>,
) -> OptResult<Array2<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    der2_distance_scale_at(z, x, &*cov, point.eta)
}

/// likelihood_der2_mixed — `∂²ℓ/∂η∂θp`:
///
/// `½tr(MKpM) − zᵀMKpM²z/σ̂² + ½(zᵀMKpMz)(zᵀM²z)/((n−m)σ̂⁴)`.
pub fn likelihood_der2_mixed<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam: &Array1<f64>,
) -> OptResult<Array1<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    der2_mixed_at(z, x, &*cov, point.eta)
}

// ---- Jacobian and Hessian ---------------------------------------------------

/// likelihood_jacobian — gradient over `[log10 η, θ...]`.
///
/// `∂ℓ/∂log10 η = η ln10 ∂ℓ/∂η`; distance-scale entries are multiplied by
/// `sign(θ_i)` to undo the folding. Negated under `sign_switch`.
pub fn likelihood_jacobian<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, sign_switch: bool, hyperparam: &Array1<f64>,
) -> OptResult<Array1<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    let mut jac = Array1::zeros(hyperparam.len());
    jac[0] = log_eta_first(point.eta, der1_eta_at(z, x, &*cov, point.eta)?);
    if let Some(signs) = &point.signs {
        let der1 = der1_distance_scale_at(z, x, &*cov, point.eta)?;
        jac.slice_mut(s![1..]).assign(&(der1 * signs));
    }
    if sign_switch {
        jac.mapv_inplace(|v| -v);
    }
    Ok(jac)
}

/// likelihood_hessian — symmetric Hessian over `[log10 η, θ...]`.
///
/// - `∂²ℓ/∂(log10 η)² = ln²10 (η² ∂²ℓ/∂η² + η ∂ℓ/∂η)`
/// - `∂²ℓ/∂log10 η ∂θi = ln10 η ∂²ℓ/∂η∂θi · sign(θi)`
/// - `∂²ℓ/∂θi∂θj · sign(θi) sign(θj)`
///
/// Negated under `sign_switch`.
pub fn likelihood_hessian<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, sign_switch: bool, hyperparam: &Array1<f64>,
) -> OptResult<Array2<f64>>
where
    C: CovarianceOperator + ?Sized,
{
    let point = prepare(z, x, cov, hyperparam)?;
    let eta = point.eta;
    let k = hyperparam.len();
    let mut hess = Array2::zeros((k, k));
    let d1 = der1_eta_at(z, x, &*cov, eta)?;
    let d2 = der2_eta_at(z, x, &*cov, eta)?;
    hess[[0, 0]] = log_eta_second(eta, d1, d2);
    if let Some(signs) = &point.signs {
        let mixed = der2_mixed_at(z, x, &*cov, eta)?;
        let scale = der2_distance_scale_at(z, x, &*cov, eta)?;
        for i in 0..signs.len() {
            let h0i = if eta.is_finite() { LN_10 * eta * mixed[i] * signs[i] } else { 0.0 };
            hess[[0, i + 1]] = h0i;
            hess[[i + 1, 0]] = h0i;
            for j in 0..signs.len() {
                hess[[i + 1, j + 1]] = scale[[i, j]] * signs[i] * signs[j];
            }
        }
    }
    if sign_switch {
        hess.mapv_inplace(|v| -v);
    }
    Ok(hess)
}

/// `η ln10 ∂ℓ/∂η`, with the `η ∈ {0, ∞}` limits set to zero.
pub(crate) fn log_eta_first(eta: f64, der1: f64) -> f64 {
    if eta == 0.0 || eta.is_infinite() { 0.0 } else { LN_10 * eta * der1 }
}

/// `ln²10 (η² ∂²ℓ/∂η² + η ∂ℓ/∂η)`, zero at `η ∈ {0, ∞}`.
pub(crate) fn log_eta_second(eta: f64, der1: f64, der2: f64) -> f64 {
    if eta == 0.0 || eta.is_infinite() {
        0.0
    } else {
        LN_10 * LN_10 * (eta * eta * der2 + eta * der1)
    }
}

// ---- Profiled scales --------------------------------------------------------

/// find_optimal_sigma_sigma0 — closed-form `(σ̂, σ̂0)` at `η`, using the
/// operator's current distance scale.
///
/// - `η < 1e-16`: `σ̂² = zᵀMz/(n−m)`, `σ̂0 = 0`.
/// - `η ≥ 1e16`: `σ̂0` is the OLS residual standard deviation and
///   `σ̂ = σ̂0/√η` (exactly `0` at `η = ∞`).
/// - otherwise `σ̂0 = σ̂ √η`.
///
/// Errors
/// ------
/// - `InvalidEta` for negative or NaN `η`; algebra errors as in
///   [`likelihood`].
pub fn find_optimal_sigma_sigma0<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64,
) -> OptResult<(f64, f64)>
where
    C: CovarianceOperator + ?Sized,
{
    validate_data(z, x, &*cov)?;
    if eta.is_nan() || eta < 0.0 {
        return Err(OptError::InvalidEta { value: eta });
    }
    if eta >= MAX_ETA {
        let dof = (x.nrows() - x.ncols()) as f64;
        let sigma0 = (ols_fit(z, x)?.rss / dof).sqrt();
        let sigma = if eta.is_infinite() { 0.0 } else { sigma0 / eta.sqrt() };
        return Ok((sigma, sigma0));
    }
    let sigma = GlsSystem::new(cov, z, x, eta)?.sigma2().sqrt();
    let sigma0 = if eta < MIN_ETA { 0.0 } else { sigma * eta.sqrt() };
    Ok((sigma, sigma0))
}

/// find_optimal_sigma — `σ̂` at `η`; see [`find_optimal_sigma_sigma0`].
pub fn find_optimal_sigma<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64,
) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    Ok(find_optimal_sigma_sigma0(z, x, &*cov, eta)?.0)
}

/// find_optimal_sigma0 — `σ̂0` at `η`; see [`find_optimal_sigma_sigma0`].
pub fn find_optimal_sigma0<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, eta: f64,
) -> OptResult<f64>
where
    C: CovarianceOperator + ?Sized,
{
    Ok(find_optimal_sigma_sigma0(z, x, &*cov, eta)?.1)
}

// ---- One-dimensional search in eta ------------------------------------------

/// decide_degenerate_eta — choose `η = 0` or `η = ∞` when `∂ℓ/∂η` keeps its
/// sign over the whole search interval.
///
/// `∂ℓ/∂η(0)` is flat when `|∂ℓ/∂η(0)| ≤ 1e-10 · max(|∂ℓ/∂η(lo)|,
/// |∂ℓ/∂η(hi)|)`. A flat first derivative hands the decision to
/// `∂²ℓ/∂η²(0)`; otherwise the sign of `∂ℓ/∂η(0)` decides.
///
/// - Negative at both ends: `ℓ` decreases in `η`. Accept `η = 0` if
///   `∂ℓ/∂η(0) < 0`, or flat with `∂²ℓ/∂η²(0) ≤ 0`.
/// - Positive at both ends: `ℓ` increases in `η`. Accept `η = ∞` if
///   `∂ℓ/∂η(0) > 0`, or flat with `∂²ℓ/∂η²(0) ≥ 0`.
///
/// Errors
/// ------
/// - `NonUnimodalLikelihood` for any other sign pattern.
pub fn decide_degenerate_eta(
    der1_lo: f64, der1_hi: f64, der1_zero: f64, der2_zero: f64,
) -> OptResult<f64> {
    let inconsistent =
        OptError::NonUnimodalLikelihood { der1_lo, der1_hi, der1_zero, der2_zero };
    let flat = der1_zero.abs() <= FLAT_DER1_RTOL * der1_lo.abs().max(der1_hi.abs());
    if der1_lo < 0.0 && der1_hi < 0.0 {
        if (!flat && der1_zero < 0.0) || (flat && der2_zero <= 0.0) {
            return Ok(0.0);
        }
        return Err(inconsistent);
    }
    if der1_lo > 0.0 && der1_hi > 0.0 {
        if (!flat && der1_zero > 0.0) || (flat && der2_zero >= 0.0) {
            return Ok(f64::INFINITY);
        }
        return Err(inconsistent);
    }
    Err(inconsistent)
}

/// find_likelihood_der1_zeros — maximize `ℓ` over `η` alone.
///
/// Parameters
/// ----------
/// - `interval_eta`: `(lo, hi)` in `η`, `0 < lo < hi < ∞`. The search runs
///   on `log10 η` with root function `η ln10 ∂ℓ/∂η`, which has the sign of
///   `∂ℓ/∂η`.
/// - `opts`: tolerance (absolute and relative, in `log10 η`), iteration cap
///   and bracket retries.
///
/// Returns
/// -------
/// [`EtaRoot`]. Without a sign change, `η` is `0` or `∞` per
/// [`decide_degenerate_eta`], with `iterations = 0`.
///
/// Errors
/// ------
/// - `InvalidBracket` for a malformed interval.
/// - `NonUnimodalLikelihood` if neither boundary is consistent.
/// - Algebra errors from the derivative evaluations.
pub fn find_likelihood_der1_zeros<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &C, interval_eta: (f64, f64), opts: &RootOptions,
) -> OptResult<EtaRoot>
where
    C: CovarianceOperator + ?Sized,
{
    validate_data(z, x, &*cov)?;
    let (lo, hi) = interval_eta;
    if !lo.is_finite() || !hi.is_finite() || lo <= 0.0 || hi <= lo {
        return Err(OptError::InvalidBracket {
            lo,
            hi,
            reason: "Eta interval must satisfy 0 < lo < hi < inf.",
        });
    }
    let root_fn = |log_eta: f64| -> OptResult<f64> {
        let eta = 10f64.powf(log_eta);
        Ok(log_eta_first(eta, der1_eta_at(z, x, &*cov, eta)?))
    };
    let bracket =
        find_interval_with_sign_change(root_fn, (lo.log10(), hi.log10()), opts.num_bracket_trials)?;

    if bracket.found {
        let out = chandrupatla_method(
            root_fn,
            bracket.bracket,
            bracket.values,
            opts.tol,
            opts.tol,
            opts.max_iter,
        )?;
        return Ok(EtaRoot {
            eta: 10f64.powf(out.root),
            iterations: out.iterations,
            converged: out.converged,
        });
    }

    let der1_zero = der1_eta_at(z, x, &*cov, 0.0)?;
    let der2_zero = der2_eta_at(z, x, &*cov, 0.0)?;
    let (der1_lo, der1_hi) = bracket.values;
    log::debug!(
        "no sign change of dl/deta on log10(eta) in [{}, {}]: ends ({der1_lo}, {der1_hi}), \
         dl/deta(0) = {der1_zero}, d2l/deta2(0) = {der2_zero}",
        bracket.bracket.0,
        bracket.bracket.1
    );
    let eta = decide_degenerate_eta(der1_lo, der1_hi, der1_zero, der2_zero)?;
    Ok(EtaRoot { eta, iterations: 0, converged: true })
}

// ---- Maximization -----------------------------------------------------------

/// Default `η` search interval around a `log10 η` guess `g`:
/// `[min(1e-4, 10^(2g−2)), max(1e3, 10^(2g+2))]`.
///
/// Callers keep `|g| ≤` [`MAX_ABS_LOG_ETA_GUESS`] so both edges are finite
/// and positive.
pub fn eta_search_interval(log_eta_guess: f64) -> (f64, f64) {
    let lo = ETA_INTERVAL_LO.min(10f64.powf(2.0 * log_eta_guess - 2.0));
    let hi = ETA_INTERVAL_HI.max(10f64.powf(2.0 * log_eta_guess + 2.0));
    (lo, hi)
}

/// maximize_likelihood — fit `η` (and `θ`) by maximizing the profile
/// likelihood.
///
/// Parameters
/// ----------
/// - `hyperparam_guess`: `[log10 η]` or `[log10 η, θ...]`; `log10 η` must be
///   finite with `|log10 η| ≤` [`MAX_ABS_LOG_ETA_GUESS`].
/// - `method`:
///   - `Chandrupatla`: root search on `∂ℓ/∂η` over
///     [`eta_search_interval`]. Distance-scale entries of the guess are
///     ignored with a warning, except that they initialize an operator with
///     no distance scale yet (also warned).
///   - `Minimizer(kind)`: Argmin run on `[log10 η, log10 θ...]` with the
///     analytic gradient and Hessian. With a length-1 guess only `η` is
///     optimized at the operator's current distance scale.
/// - `opts`: minimizer and root-search options.
///
/// Returns
/// -------
/// An [`OptimizationRecord`]. The operator's distance scale is left at the
/// returned optimum.
///
/// Errors
/// ------
/// - Hyperparameter validation errors.
/// - Algebra and solver errors; running out of iterations is reported
///   through `converged = false` instead.
pub fn maximize_likelihood<C>(
    z: &Array1<f64>, x: &Array2<f64>, cov: &mut C, hyperparam_guess: &Array1<f64>,
    method: OptimizationMethod, opts: &ProfileOptions,
) -> OptResult<OptimizationRecord>
where
    C: CovarianceOperator + ?Sized,
{
    let watch = Stopwatch::start();
    validate_data(z, x, &*cov)?;
    let d = cov.dimension();
    if hyperparam_guess.len() != 1 && hyperparam_guess.len() != 1 + d {
        return Err(OptError::InvalidHyperparamLength {
            expected: 1 + d,
            found: hyperparam_guess.len(),
        });
    }
    let log_eta_guess = hyperparam_guess[0];
    if !log_eta_guess.is_finite() {
        return Err(OptError::InvalidHyperparam {
            index: 0,
            value: log_eta_guess,
            reason: "initial log10(eta) must be finite",
        });
    }
    if log_eta_guess.abs() > MAX_ABS_LOG_ETA_GUESS {
        return Err(OptError::InvalidHyperparam {
            index: 0,
            value: log_eta_guess,
            reason: "initial log10(eta) must lie in [-100, 100]",
        });
    }

    let (eta, summary) = match method {
        OptimizationMethod::Chandrupatla => {
            if hyperparam_guess.len() > 1 {
                log::warn!(
                    "the chandrupatla method optimizes eta only; distance scale entries of \
                     the guess are ignored"
                );
                if cov.get_distance_scale().is_none() {
                    let (scale, _) = fold_distance_scale(hyperparam_guess.slice(s![1..]), 1)?;
                    cov.set_distance_scale(&scale)?;
                    log::warn!("distance scale initialized from the guess: {scale}");
                }
            }
            let interval = eta_search_interval(log_eta_guess);
            let root = find_likelihood_der1_zeros(z, x, &*cov, interval, &opts.root)?;
            let max_likelihood = profile_value(z, x, &*cov, root.eta)?;
            let status = if root.iterations == 0 {
                "No sign change of dl/deta; boundary eta selected"
            } else if root.converged {
                "Root of dl/deta converged"
            } else {
                "Maximum number of root iterations reached"
            };
            let summary = OptimizationSummary {
                max_likelihood,
                iter: root.iterations as u64,
                converged: root.converged,
                status: status.to_string(),
            };
            (root.eta, summary)
        }
        OptimizationMethod::Minimizer(kind) => {
            let optimize_scale = hyperparam_guess.len() > 1;
            let mut theta0 = Array1::zeros(hyperparam_guess.len());
            theta0[0] = log_eta_guess;
            if optimize_scale {
                let log_scale = log10_distance_scale(hyperparam_guess.slice(s![1..]), 1)?;
                theta0.slice_mut(s![1..]).assign(&log_scale);
            }
            let outcome = {
                let objective = SingleProfileObjective::new(z, x, &mut *cov, optimize_scale);
                maximize(&objective, theta0, kind, &opts.mle)?
            };
            let theta_hat = &outcome.theta_hat;
            if optimize_scale {
                cov.set_distance_scale(&distance_scale_from_log10(theta_hat.slice(s![1..])))?;
            }
            let summary = OptimizationSummary {
                max_likelihood: outcome.value,
                iter: outcome.iterations as u64,
                converged: outcome.converged,
                status: outcome.status.clone(),
            };
            (eta_from_log10(theta_hat[0])?, summary)
        }
    };

    let (sigma, sigma0) = find_optimal_sigma_sigma0(z, x, &*cov, eta)?;
    let hyperparam =
        HyperparamRecord { sigma, sigma0, eta, distance_scale: cov.get_distance_scale() };
    Ok(OptimizationRecord { hyperparam, optimization: summary, time: watch.stop() })
}
