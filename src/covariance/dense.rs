//! covariance::dense — dense kernel covariance with a cached Cholesky factor.
//!
//! Purpose
//! -------
//! Reference [`CovarianceOperator`] for moderate `n`: materializes the
//! correlation matrix `C(θ)` once per distance scale and factorizes
//! `K(η) = C(θ) + ηI` with `nalgebra`'s Cholesky decomposition, keeping the
//! most recent factor for reuse across the solves of one likelihood
//! evaluation.
//!
//! Key behaviors
//! -------------
//! - `set_distance_scale` validates `θ`, rebuilds `C(θ)` and drops the cached
//!   factor.
//! - The factor is keyed by the exact bit pattern of `η`; any other `η`
//!   triggers a refactorization.
//! - Derivative matrices with respect to `θ` are assembled on demand from the
//!   kernel's radial derivatives and the chain rule through `r(θ)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Points are finite; `θ` entries are finite and strictly positive.
//! - Derivative entries at coincident points (`r = 0`) are zero.
//!
//! Conventions
//! -----------
//! - `points` is `n × d`, one row per location.
//! - `σ` scales the correlation part, `σ0` the identity part; derivative
//!   matrices carry only the `σ²` factor.
//!
//! Testing notes
//! -------------
//! - Unit tests compare solves and log-determinants with direct `nalgebra`
//!   computations, check trace identities, and validate derivative matrices
//!   against central differences in `θ`.
use std::cell::RefCell;

use nalgebra::{Cholesky, Dyn};
use ndarray::{Array1, Array2};

use crate::{
    covariance::{
        errors::{CovResult, CovarianceError},
        kernel::Kernel,
        operator::CovarianceOperator,
    },
    utils::{from_dmatrix, to_dmatrix},
};

/// Dense covariance operator for a kernel evaluated on a fixed point set.
#[derive(Debug)]
pub struct DenseCovariance {
    points: Array2<f64>,
    kernel: Kernel,
    distance_scale: Option<Array1<f64>>,
    correlation: Option<Array2<f64>>,
    factor: RefCell<Option<CachedFactor>>,
}

#[derive(Debug)]
struct CachedFactor {
    eta_bits: u64,
    chol: Cholesky<f64, Dyn>,
}

impl DenseCovariance {
    /// Build an operator over `points` (`n × d`) with no distance scale set.
    ///
    /// # Errors
    /// - [`CovarianceError::InvalidPoints`] for an empty or non-finite point set.
    pub fn new(points: Array2<f64>, kernel: Kernel) -> CovResult<Self> {
        if points.nrows() == 0 || points.ncols() == 0 {
            return Err(CovarianceError::InvalidPoints { reason: "point set must be non-empty" });
        }
        if points.iter().any(|v| !v.is_finite()) {
            return Err(CovarianceError::InvalidPoints { reason: "coordinates must be finite" });
        }
        Ok(Self {
            points,
            kernel,
            distance_scale: None,
            correlation: None,
            factor: RefCell::new(None),
        })
    }

    /// Build an operator and set its distance scale in one step.
    pub fn with_distance_scale(
        points: Array2<f64>, kernel: Kernel, distance_scale: &Array1<f64>,
    ) -> CovResult<Self> {
        let mut cov = Self::new(points, kernel)?;
        cov.set_distance_scale(distance_scale)?;
        Ok(cov)
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    fn scale(&self) -> CovResult<&Array1<f64>> {
        self.distance_scale.as_ref().ok_or(CovarianceError::DistanceScaleUnset)
    }

    fn correlation(&self) -> CovResult<&Array2<f64>> {
        self.correlation.as_ref().ok_or(CovarianceError::DistanceScaleUnset)
    }

    /// Scaled distance between points `i` and `j`.
    fn scaled_distance(&self, scale: &Array1<f64>, i: usize, j: usize) -> f64 {
        let mut acc = 0.0;
        for (p, &theta) in scale.iter().enumerate() {
            let delta = (self.points[[i, p]] - self.points[[j, p]]) / theta;
            acc += delta * delta;
        }
        acc.sqrt()
    }

    /// `u_p = Δp² / θp³`, the building block of `∂r/∂θp = −u_p / r`.
    fn u(&self, scale: &Array1<f64>, i: usize, j: usize, p: usize) -> f64 {
        let delta = self.points[[i, p]] - self.points[[j, p]];
        delta * delta / scale[p].powi(3)
    }

    fn check_index(&self, index: usize) -> CovResult<()> {
        let dimension = self.dimension();
        if index >= dimension {
            return Err(CovarianceError::DerivativeIndexOutOfRange { index, dimension });
        }
        Ok(())
    }

    fn first_derivative(&self, p: usize) -> CovResult<Array2<f64>> {
        self.check_index(p)?;
        let scale = self.scale()?;
        let n = self.size();
        let mut out = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..i {
                let r = self.scaled_distance(scale, i, j);
                if r == 0.0 {
                    continue;
                }
                let dr = -self.u(scale, i, j, p) / r;
                let value = self.kernel.der1(r) * dr;
                out[[i, j]] = value;
                out[[j, i]] = value;
            }
        }
        Ok(out)
    }

    fn second_derivative(&self, p: usize, q: usize) -> CovResult<Array2<f64>> {
        self.check_index(p)?;
        self.check_index(q)?;
        let scale = self.scale()?;
        let n = self.size();
        let mut out = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..i {
                let r = self.scaled_distance(scale, i, j);
                if r == 0.0 {
                    continue;
                }
                let u_p = self.u(scale, i, j, p);
                let u_q = self.u(scale, i, j, q);
                let dr_p = -u_p / r;
                let dr_q = -u_q / r;
                let mut d2r = -u_p * u_q / r.powi(3);
                if p == q {
                    d2r += 3.0 * u_p / (scale[p] * r);
                }
                let value = self.kernel.der2(r) * dr_p * dr_q + self.kernel.der1(r) * d2r;
                out[[i, j]] = value;
                out[[j, i]] = value;
            }
        }
        Ok(out)
    }

    /// Run `f` on the Cholesky factor of `K(η)`, refactorizing when the cached
    /// factor belongs to a different `η`.
    fn with_factor<R>(
        &self, eta: f64, f: impl FnOnce(&Cholesky<f64, Dyn>) -> R,
    ) -> CovResult<R> {
        if !eta.is_finite() || eta < 0.0 {
            return Err(CovarianceError::InvalidEta { value: eta });
        }
        let mut slot = self.factor.borrow_mut();
        if let Some(cached) = slot.as_ref() {
            if cached.eta_bits == eta.to_bits() {
                return Ok(f(&cached.chol));
            }
        }
        let mut k = to_dmatrix(self.correlation()?);
        for i in 0..k.nrows() {
            k[(i, i)] += eta;
        }
        let chol = Cholesky::new(k).ok_or(CovarianceError::NotPositiveDefinite { eta })?;
        let out = f(&chol);
        *slot = Some(CachedFactor { eta_bits: eta.to_bits(), chol });
        Ok(out)
    }
}

impl CovarianceOperator for DenseCovariance {
    fn size(&self) -> usize {
        self.points.nrows()
    }

    fn dimension(&self) -> usize {
        self.points.ncols()
    }

    fn set_distance_scale(&mut self, distance_scale: &Array1<f64>) -> CovResult<()> {
        let dimension = self.dimension();
        if distance_scale.len() != dimension {
            return Err(CovarianceError::DistanceScaleDimMismatch {
                expected: dimension,
                found: distance_scale.len(),
            });
        }
        for (index, &value) in distance_scale.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(CovarianceError::InvalidDistanceScale { index, value });
            }
        }
        if self.distance_scale.as_ref() == Some(distance_scale) {
            return Ok(());
        }
        let n = self.size();
        let mut corr = Array2::<f64>::eye(n);
        for i in 0..n {
            for j in 0..i {
                let value = self.kernel.value(self.scaled_distance(distance_scale, i, j));
                corr[[i, j]] = value;
                corr[[j, i]] = value;
            }
        }
        self.distance_scale = Some(distance_scale.clone());
        self.correlation = Some(corr);
        self.factor.replace(None);
        Ok(())
    }

    fn get_distance_scale(&self) -> Option<Array1<f64>> {
        self.distance_scale.clone()
    }

    fn solve(&self, eta: f64, rhs: &Array2<f64>) -> CovResult<Array2<f64>> {
        let n = self.size();
        if rhs.nrows() != n {
            return Err(CovarianceError::RhsDimMismatch { expected: n, found: rhs.nrows() });
        }
        let b = to_dmatrix(rhs);
        self.with_factor(eta, |chol| from_dmatrix(&chol.solve(&b)))
    }

    fn logdet(&self, eta: f64) -> CovResult<f64> {
        self.with_factor(eta, |chol| {
            2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>()
        })
    }

    fn traceinv(&self, eta: f64, exponent: u32) -> CovResult<f64> {
        if exponent != 1 && exponent != 2 {
            return Err(CovarianceError::UnsupportedTraceExponent { exponent });
        }
        self.with_factor(eta, |chol| {
            let inv = chol.inverse();
            if exponent == 1 { inv.trace() } else { inv.iter().map(|v| v * v).sum() }
        })
    }

    fn get_matrix(
        &self, sigma: f64, sigma0: f64, derivative: &[usize],
    ) -> CovResult<Array2<f64>> {
        let sigma2 = sigma * sigma;
        match derivative {
            [] => {
                let mut out = self.correlation()? * sigma2;
                out.diag_mut().mapv_inplace(|v| v + sigma0 * sigma0);
                Ok(out)
            }
            [p] => Ok(self.first_derivative(*p)? * sigma2),
            [p, q] => Ok(self.second_derivative(*p, *q)? * sigma2),
            _ => Err(CovarianceError::UnsupportedDerivativeOrder { order: derivative.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Solves, log-determinants and inverse traces against direct nalgebra
    //   computations on K(η) = C + ηI.
    // - Cache invalidation on `set_distance_scale`.
    // - First and second distance-scale derivatives against central
    //   differences of `get_matrix`.
    // - Argument validation (unset scale, bad eta, bad indices).
    //
    // They intentionally DO NOT cover:
    // - Likelihood algebra built on top of the operator (see `likelihood`).
    // -------------------------------------------------------------------------

    fn grid_2d() -> Array2<f64> {
        let mut pts = Array2::<f64>::zeros((9, 2));
        for i in 0..3 {
            for j in 0..3 {
                pts[[3 * i + j, 0]] = i as f64 / 2.0;
                pts[[3 * i + j, 1]] = j as f64 / 2.0 + 0.1 * i as f64;
            }
        }
        pts
    }

    fn dense_k(cov: &DenseCovariance, eta: f64) -> nalgebra::DMatrix<f64> {
        let mut k = to_dmatrix(&cov.get_matrix(1.0, 0.0, &[]).expect("correlation"));
        for i in 0..k.nrows() {
            k[(i, i)] += eta;
        }
        k
    }

    #[test]
    // Purpose
    // -------
    // `solve`, `logdet` and `traceinv` agree with explicit inversion.
    //
    // Given
    // -----
    // - A 3×3 grid in 2-D with a Matérn-5/2 kernel, θ = [0.4, 0.7], η = 0.05.
    //
    // Expect
    // ------
    // - K·solve(η, B) ≈ B, logdet ≈ ln det K, traceinv(1|2) ≈ tr(K⁻¹), tr(K⁻²).
    fn dense_algebra_matches_explicit_inverse() {
        // Arrange
        let cov = DenseCovariance::with_distance_scale(grid_2d(), Kernel::Matern52, &array![
            0.4, 0.7
        ])
        .expect("operator");
        let eta = 0.05;
        let k = dense_k(&cov, eta);
        let inv = k.clone().try_inverse().expect("K should be invertible");
        let rhs = Array2::from_shape_fn((9, 2), |(i, j)| (i as f64 + 1.0) * (j as f64 - 0.5));

        // Act
        let sol = cov.solve(eta, &rhs).expect("solve");
        let logdet = cov.logdet(eta).expect("logdet");
        let tr1 = cov.traceinv(eta, 1).expect("traceinv 1");
        let tr2 = cov.traceinv(eta, 2).expect("traceinv 2");

        // Assert
        let back = from_dmatrix(&(&k * to_dmatrix(&sol)));
        for (a, b) in back.iter().zip(rhs.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
        assert_relative_eq!(logdet, k.determinant().ln(), epsilon = 1e-10);
        assert_relative_eq!(tr1, inv.trace(), epsilon = 1e-10);
        assert_relative_eq!(tr2, (&inv * &inv).trace(), epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Changing the distance scale must discard the cached factor.
    //
    // Given
    // -----
    // - A 1-D grid, exponential kernel, same η before and after a new θ.
    //
    // Expect
    // ------
    // - The log-determinant changes and matches a freshly built operator.
    fn set_distance_scale_invalidates_cached_factor() {
        // Arrange
        let pts = Array2::from_shape_fn((8, 1), |(i, _)| i as f64 / 7.0);
        let mut cov =
            DenseCovariance::with_distance_scale(pts.clone(), Kernel::Exponential, &array![0.2])
                .expect("operator");
        let before = cov.logdet(0.1).expect("logdet");

        // Act
        cov.set_distance_scale(&array![0.5]).expect("set");
        let after = cov.logdet(0.1).expect("logdet");

        // Assert
        let fresh = DenseCovariance::with_distance_scale(pts, Kernel::Exponential, &array![0.5])
            .expect("operator");
        assert!((before - after).abs() > 1e-6);
        assert_eq!(after, fresh.logdet(0.1).expect("logdet"));
    }

    #[test]
    // Purpose
    // -------
    // First and second derivative matrices match central differences of the
    // correlation matrix in θ.
    //
    // Given
    // -----
    // - 2-D grid, squared-exponential kernel, θ = [0.6, 0.9], step h = 1e-6.
    //
    // Expect
    // ------
    // - ∂C/∂θp and ∂²C/∂θp∂θq agree with FD within 1e-6 absolute.
    fn derivative_matrices_match_central_differences() {
        // Arrange
        let theta = array![0.6, 0.9];
        let h = 1e-6;
        let mut cov = DenseCovariance::with_distance_scale(
            grid_2d(),
            Kernel::SquaredExponential,
            &theta,
        )
        .expect("operator");
        let d1: Vec<Array2<f64>> =
            (0..2).map(|p| cov.get_matrix(1.0, 0.0, &[p]).expect("d1")).collect();
        let d2 = cov.get_matrix(1.0, 0.0, &[0, 1]).expect("d2");
        let d2_diag = cov.get_matrix(1.0, 0.0, &[1, 1]).expect("d2");

        // Act / Assert
        for p in 0..2 {
            let mut plus = theta.clone();
            plus[p] += h;
            let mut minus = theta.clone();
            minus[p] -= h;
            cov.set_distance_scale(&plus).expect("set");
            let c_plus = cov.get_matrix(1.0, 0.0, &[]).expect("c");
            let d1_plus = cov.get_matrix(1.0, 0.0, &[1]).expect("d1");
            cov.set_distance_scale(&minus).expect("set");
            let c_minus = cov.get_matrix(1.0, 0.0, &[]).expect("c");
            let d1_minus = cov.get_matrix(1.0, 0.0, &[1]).expect("d1");

            let fd1 = (&c_plus - &c_minus) / (2.0 * h);
            let fd2 = (&d1_plus - &d1_minus) / (2.0 * h);
            let analytic2 = if p == 0 { &d2 } else { &d2_diag };
            for (a, b) in d1[p].iter().zip(fd1.iter()) {
                assert!((a - b).abs() < 1e-6, "dC/dθ{p}: {a} vs {b}");
            }
            for (a, b) in analytic2.iter().zip(fd2.iter()) {
                assert!((a - b).abs() < 1e-6, "d2C/dθ{p}dθ1: {a} vs {b}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // `dot` equals the materialized matrix product and scales with σ².
    //
    // Given
    // -----
    // - 1-D grid, Matérn-3/2, σ = 2, σ0 = 0.3.
    //
    // Expect
    // ------
    // - `dot(σ, σ0, v, [])` == (σ²C + σ0²I)v and `dot(σ, σ0, v, [0])` ==
    //   σ²(∂C/∂θ)v.
    fn dot_matches_materialized_product() {
        // Arrange
        let pts = Array2::from_shape_fn((6, 1), |(i, _)| i as f64 * 0.3);
        let cov = DenseCovariance::with_distance_scale(pts, Kernel::Matern32, &array![0.5])
            .expect("operator");
        let v = Array1::from_shape_fn(6, |i| (i as f64).sin());

        // Act
        let full = cov.dot(2.0, 0.3, &v, &[]).expect("dot");
        let deriv = cov.dot(2.0, 0.3, &v, &[0]).expect("dot");

        // Assert
        let corr = cov.get_matrix(1.0, 0.0, &[]).expect("c");
        let expected = corr.dot(&v) * 4.0 + &v * 0.09;
        for (a, b) in full.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        let d = cov.get_matrix(1.0, 0.0, &[0]).expect("d");
        for (a, b) in deriv.iter().zip((d.dot(&v) * 4.0).iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Invalid configurations are reported rather than panicking.
    //
    // Given
    // -----
    // - An operator without a distance scale, bad scales, bad η and indices.
    //
    // Expect
    // ------
    // - The matching `CovarianceError` for each case.
    fn invalid_arguments_are_rejected() {
        // Arrange
        let pts = Array2::from_shape_fn((4, 1), |(i, _)| i as f64);
        let mut cov = DenseCovariance::new(pts, Kernel::Exponential).expect("operator");

        // Act / Assert
        assert_eq!(cov.logdet(0.1), Err(CovarianceError::DistanceScaleUnset));
        assert_eq!(cov.get_distance_scale(), None);
        assert_eq!(
            cov.set_distance_scale(&array![1.0, 2.0]),
            Err(CovarianceError::DistanceScaleDimMismatch { expected: 1, found: 2 })
        );
        assert_eq!(
            cov.set_distance_scale(&array![-1.0]),
            Err(CovarianceError::InvalidDistanceScale { index: 0, value: -1.0 })
        );
        cov.set_distance_scale(&array![1.0]).expect("set");
        assert_eq!(cov.logdet(-0.5), Err(CovarianceError::InvalidEta { value: -0.5 }));
        assert_eq!(
            cov.get_matrix(1.0, 0.0, &[3]),
            Err(CovarianceError::DerivativeIndexOutOfRange { index: 3, dimension: 1 })
        );
        assert_eq!(
            cov.get_matrix(1.0, 0.0, &[0, 0, 0]),
            Err(CovarianceError::UnsupportedDerivativeOrder { order: 3 })
        );
        assert_eq!(
            cov.traceinv(0.1, 3),
            Err(CovarianceError::UnsupportedTraceExponent { exponent: 3 })
        );
    }
}
