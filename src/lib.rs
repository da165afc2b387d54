//! gp_profile_likelihood — profile-likelihood hyperparameter estimation for
//! Gaussian processes with a linear mean, with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the profile-likelihood fits to Python via the
//! `_gp_profile_likelihood` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules: `covariance` (the operator contract and a
//!   dense implementation), `likelihood` (single and double profile
//!   engines) and `optimization` (Argmin adapter, root finding, numerical
//!   helpers).
//! - When `python-bindings` is enabled, define the `ProfileLikelihoodFit`
//!   result class and the `maximize_profile_likelihood` /
//!   `maximize_double_profile_likelihood` functions.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work happens in the inner modules; this file performs
//!   only FFI glue, input conversion and error mapping.
//! - The Python entry points always use `DenseCovariance`; Rust callers can
//!   supply any `CovarianceOperator`.
//!
//! Conventions
//! -----------
//! - Method and kernel names are parsed with the same `FromStr` impls Rust
//!   callers use, so Python accepts the same spellings.
//! - Errors surface as `ValueError` through `From<OptError> for PyErr`.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should call `likelihood::profile::maximize_likelihood`
//!   or `likelihood::double_profile::maximize_likelihood` directly.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   the integration tests under `tests/`. The PyO3 layer is exercised from
//!   Python.

pub mod covariance;
pub mod likelihood;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::str::FromStr;

#[cfg(feature = "python-bindings")]
use ndarray::{Array1, s};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    covariance::{CovarianceOperator, DenseCovariance, Kernel},
    likelihood::{
        DoubleProfileOptions, OptimizationMethod, OptimizationRecord, ProfileOptions,
        double_profile, profile,
    },
    optimization::{errors::OptError, root_finding::RootOptions},
    utils::{extract_matrix, extract_mle_opts, extract_vector},
};

/// ProfileLikelihoodFit — Python-facing view of an `OptimizationRecord`.
///
/// Purpose
/// -------
/// Expose the fitted hyperparameters, the optimization summary and timing
/// of a profile-likelihood fit as read-only properties.
///
/// Fields
/// ------
/// - `inner`: the record returned by the Rust engines.
///
/// Notes
/// -----
/// - Instances are created by the module functions, never by user code.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "gp_profile_likelihood", frozen)]
pub struct ProfileLikelihoodFit {
    inner: OptimizationRecord,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl ProfileLikelihoodFit {
    #[getter]
    pub fn sigma(&self) -> f64 {
        self.inner.hyperparam.sigma
    }

    #[getter]
    pub fn sigma0(&self) -> f64 {
        self.inner.hyperparam.sigma0
    }

    #[getter]
    pub fn eta(&self) -> f64 {
        self.inner.hyperparam.eta
    }

    #[getter]
    pub fn distance_scale(&self) -> Option<Vec<f64>> {
        self.inner.hyperparam.distance_scale.as_ref().map(|s| s.to_vec())
    }

    #[getter]
    pub fn max_likelihood(&self) -> f64 {
        self.inner.optimization.max_likelihood
    }

    #[getter]
    pub fn iterations(&self) -> u64 {
        self.inner.optimization.iter
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.optimization.converged
    }

    #[getter]
    pub fn status(&self) -> String {
        self.inner.optimization.status.clone()
    }

    /// Elapsed wall-clock seconds.
    #[getter]
    pub fn wall_time(&self) -> f64 {
        self.inner.time.wall_time
    }

    /// Process CPU seconds.
    #[getter]
    pub fn proc_time(&self) -> f64 {
        self.inner.time.proc_time
    }

    pub fn __repr__(&self) -> String {
        let hp = &self.inner.hyperparam;
        format!(
            "ProfileLikelihoodFit(sigma={}, sigma0={}, eta={}, distance_scale={:?}, \
             max_likelihood={}, iterations={})",
            hp.sigma,
            hp.sigma0,
            hp.eta,
            self.distance_scale(),
            self.inner.optimization.max_likelihood,
            self.inner.optimization.iter,
        )
    }
}

/// Build the dense operator shared by both Python entry points.
#[cfg(feature = "python-bindings")]
fn build_operator<'py>(
    py: Python<'py>, points: &Bound<'py, PyAny>, kernel: &str,
    distance_scale: &Bound<'py, PyAny>,
) -> PyResult<(DenseCovariance, Array1<f64>)> {
    let points = extract_matrix(py, points)?;
    let kernel = Kernel::from_str(kernel)?;
    let scale = extract_vector(py, distance_scale)?;
    let cov = DenseCovariance::new(points, kernel).map_err(OptError::from)?;
    Ok((cov, scale))
}

/// maximize_profile_likelihood — fit `η` (and optionally the distance
/// scale) of a dense Gaussian-process model.
///
/// Parameters
/// ----------
/// - `points`: `n × d` coordinates (1-D input is one column).
/// - `z`: `n` observations.
/// - `x`: `n × m` design matrix (1-D input is one column).
/// - `distance_scale`: `d` starting (or fixed) distance scales.
/// - `kernel`: `"exponential"`, `"squared_exponential"`, `"matern32"` or
///   `"matern52"`.
/// - `method`: `"chandrupatla"` or a minimizer name such as
///   `"Nelder-Mead"`, `"BFGS"`, `"L-BFGS-B"`.
/// - `log_eta_guess`: starting `log10 η`.
/// - `fix_distance_scale`: keep the distance scale fixed under a minimizer.
///   Always the case for `"chandrupatla"`.
/// - `tol`, `max_iter`, `line_searcher`, `lbfgs_mem`, `verbose`: solver
///   settings.
///
/// Errors
/// ------
/// - `ValueError` for invalid inputs and numerical failures.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    signature = (
        points,
        z,
        x,
        distance_scale,
        kernel = "exponential",
        method = "chandrupatla",
        log_eta_guess = 1.0,
        fix_distance_scale = false,
        tol = 1e-6,
        max_iter = None,
        line_searcher = None,
        lbfgs_mem = None,
        verbose = false,
    ),
    text_signature = "(points, z, x, distance_scale, /, kernel='exponential', \
                      method='chandrupatla', log_eta_guess=1.0, fix_distance_scale=False, \
                      tol=1e-6, max_iter=None, line_searcher=None, lbfgs_mem=None, \
                      verbose=False)"
)]
#[allow(clippy::too_many_arguments)]
pub fn maximize_profile_likelihood<'py>(
    py: Python<'py>, points: &Bound<'py, PyAny>, z: &Bound<'py, PyAny>, x: &Bound<'py, PyAny>,
    distance_scale: &Bound<'py, PyAny>, kernel: &str, method: &str, log_eta_guess: f64,
    fix_distance_scale: bool, tol: f64, max_iter: Option<usize>, line_searcher: Option<&str>,
    lbfgs_mem: Option<usize>, verbose: bool,
) -> PyResult<ProfileLikelihoodFit> {
    let (mut cov, scale) = build_operator(py, points, kernel, distance_scale)?;
    let z = extract_vector(py, z)?;
    let x = extract_matrix(py, x)?;
    let method = OptimizationMethod::from_str(method)?;

    let mle = extract_mle_opts(tol, max_iter, line_searcher, lbfgs_mem, verbose)?;
    let defaults = RootOptions::default();
    let root = RootOptions::new(tol, defaults.max_iter, defaults.num_bracket_trials)?;
    let opts = ProfileOptions::new(mle, root);

    let fixed = fix_distance_scale || method == OptimizationMethod::Chandrupatla;
    let guess = if fixed {
        cov.set_distance_scale(&scale).map_err(OptError::from)?;
        Array1::from_elem(1, log_eta_guess)
    } else {
        let mut guess = Array1::zeros(scale.len() + 1);
        guess[0] = log_eta_guess;
        guess.slice_mut(s![1..]).assign(&scale);
        guess
    };

    let inner = profile::maximize_likelihood(&z, &x, &mut cov, &guess, method, &opts)?;
    Ok(ProfileLikelihoodFit { inner })
}

/// maximize_double_profile_likelihood — fit the distance scale with `η`
/// re-optimized at every trial scale.
///
/// Parameters
/// ----------
/// - `points`, `z`, `x`, `distance_scale`, `kernel`: as in
///   `maximize_profile_likelihood`; `distance_scale` is the starting point.
/// - `method`: outer minimizer name (not `"chandrupatla"`).
/// - `inner_method`, `inner_tol`: the per-scale `η` solve.
/// - `log_eta_guess`: starting `log10 η` of every inner solve.
/// - `tol`, `max_iter`, `line_searcher`, `lbfgs_mem`, `verbose`: outer
///   solver settings.
///
/// Errors
/// ------
/// - `ValueError` for invalid inputs, for `"chandrupatla"` as outer method
///   and for numerical failures.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    signature = (
        points,
        z,
        x,
        distance_scale,
        kernel = "exponential",
        method = "Nelder-Mead",
        inner_method = "Nelder-Mead",
        inner_tol = 1e-3,
        log_eta_guess = 1.0,
        tol = 1e-6,
        max_iter = None,
        line_searcher = None,
        lbfgs_mem = None,
        verbose = false,
    ),
    text_signature = "(points, z, x, distance_scale, /, kernel='exponential', \
                      method='Nelder-Mead', inner_method='Nelder-Mead', inner_tol=1e-3, \
                      log_eta_guess=1.0, tol=1e-6, max_iter=None, line_searcher=None, \
                      lbfgs_mem=None, verbose=False)"
)]
#[allow(clippy::too_many_arguments)]
pub fn maximize_double_profile_likelihood<'py>(
    py: Python<'py>, points: &Bound<'py, PyAny>, z: &Bound<'py, PyAny>, x: &Bound<'py, PyAny>,
    distance_scale: &Bound<'py, PyAny>, kernel: &str, method: &str, inner_method: &str,
    inner_tol: f64, log_eta_guess: f64, tol: f64, max_iter: Option<usize>,
    line_searcher: Option<&str>, lbfgs_mem: Option<usize>, verbose: bool,
) -> PyResult<ProfileLikelihoodFit> {
    let (mut cov, scale) = build_operator(py, points, kernel, distance_scale)?;
    let z = extract_vector(py, z)?;
    let x = extract_matrix(py, x)?;
    let method = OptimizationMethod::from_str(method)?;
    let inner_method = OptimizationMethod::from_str(inner_method)?;

    let mle = extract_mle_opts(tol, max_iter, line_searcher, lbfgs_mem, verbose)?;
    let opts = DoubleProfileOptions::new(inner_method, inner_tol, log_eta_guess, mle)?;

    let inner = double_profile::maximize_likelihood(&z, &x, &mut cov, &scale, method, &opts)?;
    Ok(ProfileLikelihoodFit { inner })
}

/// _gp_profile_likelihood — PyO3 module initializer for the Python
/// extension.
///
/// Registers `ProfileLikelihoodFit` and the two fit functions. Invoked by
/// Python when importing the compiled extension.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _gp_profile_likelihood<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<ProfileLikelihoodFit>()?;
    m.add_function(wrap_pyfunction!(maximize_profile_likelihood, m)?)?;
    m.add_function(wrap_pyfunction!(maximize_double_profile_likelihood, m)?)?;
    Ok(())
}
