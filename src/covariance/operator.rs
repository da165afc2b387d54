//! covariance::operator — the contract the likelihood engines rely on.
//!
//! A covariance operator represents `σ²C(θ) + σ0²I` for a fixed point set.
//! The likelihood engines work with the normalized form
//! `K(η) = C(θ) + ηI`, `η = σ0²/σ²`, so every algebraic method takes `η`
//! as an argument while only the distance scale `θ` is stored.
use ndarray::{Array1, Array2, Axis};

use crate::covariance::errors::{CovResult, CovarianceError};

/// Covariance operator over a fixed set of `n` points in `d` dimensions.
///
/// Required:
/// - `size`, `dimension`: number of points and spatial dimension.
/// - `set_distance_scale`: validate and store `θ`; must invalidate any cached
///   factorization.
/// - `get_distance_scale`: current `θ`, or `None` before the first set.
/// - `solve(η, B)`: `K(η)⁻¹B` for an `n × k` right-hand side.
/// - `logdet(η)`: `ln det K(η)`.
/// - `traceinv(η, k)`: `tr K(η)⁻ᵏ` for `k ∈ {1, 2}`.
/// - `get_matrix(σ, σ0, derivative)`: `σ²C + σ0²I` for an empty index list,
///   `σ²∂C/∂θp` for `[p]` and `σ²∂²C/∂θp∂θq` for `[p, q]`.
///
/// Provided:
/// - `solve_vec`, `dot` and `trace_solve` are expressed through the required
///   methods. Large or matrix-free operators override `dot` to avoid
///   materializing and `trace_solve` to plug in a trace estimator.
pub trait CovarianceOperator {
    fn size(&self) -> usize;
    fn dimension(&self) -> usize;

    fn set_distance_scale(&mut self, distance_scale: &Array1<f64>) -> CovResult<()>;
    fn get_distance_scale(&self) -> Option<Array1<f64>>;

    fn solve(&self, eta: f64, rhs: &Array2<f64>) -> CovResult<Array2<f64>>;
    fn logdet(&self, eta: f64) -> CovResult<f64>;
    fn traceinv(&self, eta: f64, exponent: u32) -> CovResult<f64>;
    fn get_matrix(&self, sigma: f64, sigma0: f64, derivative: &[usize])
    -> CovResult<Array2<f64>>;

    /// `K(η)⁻¹v` for a single vector.
    fn solve_vec(&self, eta: f64, rhs: &Array1<f64>) -> CovResult<Array1<f64>> {
        let rhs = rhs.view().insert_axis(Axis(1)).to_owned();
        let out = self.solve(eta, &rhs)?;
        Ok(out.column(0).to_owned())
    }

    /// `get_matrix(σ, σ0, derivative) · v`.
    fn dot(
        &self, sigma: f64, sigma0: f64, v: &Array1<f64>, derivative: &[usize],
    ) -> CovResult<Array1<f64>> {
        if v.len() != self.size() {
            return Err(CovarianceError::RhsDimMismatch { expected: self.size(), found: v.len() });
        }
        Ok(self.get_matrix(sigma, sigma0, derivative)?.dot(v))
    }

    /// Trace oracle `tr(K(η)⁻¹A)` for a square `n × n` matrix `A`.
    fn trace_solve(&self, eta: f64, a: &Array2<f64>) -> CovResult<f64> {
        Ok(self.solve(eta, a)?.diag().sum())
    }
}
