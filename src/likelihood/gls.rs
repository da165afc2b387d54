//! likelihood::gls — generalized least squares algebra behind the profile
//! likelihood.
//!
//! Purpose
//! -------
//! Profiling `β` and `σ²` out of `z ~ N(Xβ, σ²K(η))` leaves everything in
//! terms of the projector
//!
//! `M = K⁻¹ − K⁻¹X (XᵀK⁻¹X)⁻¹ XᵀK⁻¹`.
//!
//! [`GlsSystem`] holds the pieces needed to apply `M` to vectors and
//! matrices without materializing it: `Y = K⁻¹X`, `B⁻¹ = (XᵀY)⁻¹`,
//! `ln det B` and `Mz`.
//!
//! Key behaviors
//! -------------
//! - `M v = K⁻¹v − Y B⁻¹ Yᵀ v`, one operator solve per application.
//! - [`ols_fit`] provides the `η → ∞` limit, where `M ∝ I − X(XᵀX)⁻¹Xᵀ`.
//! - Small `m × m` systems are inverted through `nalgebra`'s Cholesky
//!   factorization. A failed factorization, or a pivot that carries no more
//!   than a rounding-level share of its diagonal entry, means the design is
//!   rank deficient and is reported, never regularized.
//!
//! Invariants & assumptions
//! ------------------------
//! - `z` has one entry per operator point, `X` one row per point, `n > m`.
//! - `B = XᵀK⁻¹X` is symmetric positive definite whenever `X` has full
//!   column rank and `K(η)` is positive definite.
use nalgebra::Cholesky;
use ndarray::{Array1, Array2};

use crate::{
    covariance::CovarianceOperator,
    optimization::errors::{OptError, OptResult},
    utils::{from_dmatrix, to_dmatrix},
};

/// Validate shapes of `z`, `X` and the operator; returns `(n, m)`.
///
/// # Errors
/// - [`OptError::DimensionMismatch`] if `z` or `X` disagree with the operator.
/// - [`OptError::InsufficientData`] if `n <= m`.
pub fn validate_data<C>(z: &Array1<f64>, x: &Array2<f64>, cov: &C) -> OptResult<(usize, usize)>
where
    C: CovarianceOperator + ?Sized,
{
    let n = cov.size();
    if z.len() != n {
        return Err(OptError::DimensionMismatch { what: "z", expected: n, found: z.len() });
    }
    if x.nrows() != n {
        return Err(OptError::DimensionMismatch { what: "X rows", expected: n, found: x.nrows() });
    }
    let m = x.ncols();
    if n <= m {
        return Err(OptError::InsufficientData { n, m });
    }
    Ok((n, m))
}

/// Smallest accepted `L_ii² / A_ii` of a Cholesky pivot.
///
/// `L_ii² / A_ii` is the share of column `i` left after projecting out the
/// earlier columns; exact collinearity leaves only rounding noise of order
/// `m·ε`.
const PIVOT_RTOL: f64 = 1e-12;

/// Inverse and log-determinant of a small symmetric positive definite
/// matrix.
///
/// # Errors
/// - [`OptError::SingularDesign`] naming `what` if the Cholesky
///   factorization fails, a pivot fails the relative rank test
///   `L_ii² > 1e-12 · A_ii`, or the result is not finite.
pub fn spd_inverse_logdet(a: &Array2<f64>, what: &'static str) -> OptResult<(Array2<f64>, f64)> {
    if a.nrows() == 0 {
        return Ok((Array2::zeros((0, 0)), 0.0));
    }
    let chol = Cholesky::new(to_dmatrix(a)).ok_or(OptError::SingularDesign { what })?;
    let pivots = chol.l_dirty().diagonal();
    let rank_deficient = pivots
        .iter()
        .zip(a.diag().iter())
        .any(|(&l, &a_ii)| a_ii <= 0.0 || l * l <= PIVOT_RTOL * a_ii);
    if rank_deficient {
        return Err(OptError::SingularDesign { what });
    }
    let logdet = 2.0 * pivots.iter().map(|d| d.ln()).sum::<f64>();
    if !logdet.is_finite() {
        return Err(OptError::SingularDesign { what });
    }
    let inverse = from_dmatrix(&chol.inverse());
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(OptError::SingularDesign { what });
    }
    Ok((inverse, logdet))
}

/// `tr(A B)` for square matrices of equal size, without forming the product.
pub fn trace_of_product(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter().zip(b.t().iter()).map(|(x, y)| x * y).sum()
}

/// Ordinary least squares fit of `z` on `X`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub residual: Array1<f64>,
    pub rss: f64,
    pub xtx_inv: Array2<f64>,
    pub logdet_xtx: f64,
}

/// Fit `z ≈ Xβ` by ordinary least squares.
///
/// # Errors
/// - [`OptError::SingularDesign`] if `XᵀX` is not positive definite.
pub fn ols_fit(z: &Array1<f64>, x: &Array2<f64>) -> OptResult<OlsFit> {
    let xtx = x.t().dot(x);
    let (xtx_inv, logdet_xtx) = spd_inverse_logdet(&xtx, "X'X")?;
    let beta = xtx_inv.dot(&x.t().dot(z));
    let residual = z - &x.dot(&beta);
    let rss = residual.dot(&residual);
    Ok(OlsFit { residual, rss, xtx_inv, logdet_xtx })
}

/// Generalized least squares system at a fixed `η`, borrowing the operator
/// whose distance scale is already set.
pub struct GlsSystem<'a, C: CovarianceOperator + ?Sized> {
    cov: &'a C,
    pub eta: f64,
    /// Degrees of freedom `n − m`.
    pub dof: f64,
    /// `Y = K⁻¹X`, `n × m`.
    pub y: Array2<f64>,
    /// `B⁻¹ = (XᵀK⁻¹X)⁻¹`, `m × m`.
    pub b_inv: Array2<f64>,
    pub logdet_b: f64,
    /// `Mz`.
    pub mz: Array1<f64>,
    /// `zᵀMz`.
    pub zmz: f64,
}

impl<'a, C: CovarianceOperator + ?Sized> GlsSystem<'a, C> {
    /// Factor the system for `(z, X)` at `η`.
    ///
    /// # Errors
    /// - Operator errors (`NotPositiveDefinite`, `DistanceScaleUnset`, ...).
    /// - [`OptError::SingularDesign`] if `XᵀK⁻¹X` is singular.
    /// - [`OptError::DegenerateResidual`] if `zᵀMz` is not strictly
    ///   positive and finite.
    pub fn new(cov: &'a C, z: &Array1<f64>, x: &Array2<f64>, eta: f64) -> OptResult<Self> {
        let dof = (x.nrows() - x.ncols()) as f64;
        let y = cov.solve(eta, x)?;
        let b = x.t().dot(&y);
        let (b_inv, logdet_b) = spd_inverse_logdet(&b, "X'K^-1X")?;
        let kinv_z = cov.solve_vec(eta, z)?;
        let mz = &kinv_z - &y.dot(&b_inv.dot(&y.t().dot(z)));
        let zmz = z.dot(&mz);
        if !zmz.is_finite() || zmz <= 0.0 {
            return Err(OptError::DegenerateResidual { value: zmz });
        }
        Ok(Self { cov, eta, dof, y, b_inv, logdet_b, mz, zmz })
    }

    /// Profiled signal variance `σ² = zᵀMz / (n − m)`.
    pub fn sigma2(&self) -> f64 {
        self.zmz / self.dof
    }

    /// `M v`.
    pub fn apply_m(&self, v: &Array1<f64>) -> OptResult<Array1<f64>> {
        let kinv_v = self.cov.solve_vec(self.eta, v)?;
        Ok(kinv_v - self.y.dot(&self.b_inv.dot(&self.y.t().dot(v))))
    }

    /// `M V` column by column.
    pub fn apply_m_mat(&self, v: &Array2<f64>) -> OptResult<Array2<f64>> {
        let kinv_v = self.cov.solve(self.eta, v)?;
        Ok(kinv_v - self.y.dot(&self.b_inv.dot(&self.y.t().dot(v))))
    }

    /// `tr(B⁻¹ A)` for an `m × m` matrix `A`.
    pub fn trace_b_inv(&self, a: &Array2<f64>) -> f64 {
        trace_of_product(&self.b_inv, a)
    }

    /// `tr M = tr K⁻¹ − tr(B⁻¹ YᵀY)`.
    pub fn trace_m(&self) -> OptResult<f64> {
        let yty = self.y.t().dot(&self.y);
        Ok(self.cov.traceinv(self.eta, 1)? - self.trace_b_inv(&yty))
    }

    /// `tr M² = tr K⁻² − 2 tr(B⁻¹ YᵀK⁻¹Y) + tr((B⁻¹ YᵀY)²)`.
    pub fn trace_m2(&self) -> OptResult<f64> {
        let yty = self.y.t().dot(&self.y);
        let v = self.cov.solve(self.eta, &self.y)?;
        let ytv = self.y.t().dot(&v);
        let b_inv_yty = self.b_inv.dot(&yty);
        Ok(self.cov.traceinv(self.eta, 2)? - 2.0 * self.trace_b_inv(&ytv)
            + trace_of_product(&b_inv_yty, &b_inv_yty))
    }
}
