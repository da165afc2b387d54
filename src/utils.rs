//! utils — shared conversion helpers.
//!
//! - `ndarray` ↔ `nalgebra` copies used wherever a Cholesky factorization or
//!   eigendecomposition is needed on data that otherwise lives in `ndarray`.
//! - Python argument extraction for the PyO3 bindings (feature
//!   `python-bindings`).
use nalgebra::DMatrix;
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use std::str::FromStr;

#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
use crate::optimization::loglik_optimizer::traits::{LineSearcher, MLEOptions, Tolerances};

/// Copy an `ndarray` matrix into a freshly allocated `nalgebra::DMatrix`.
pub fn to_dmatrix(src: &Array2<f64>) -> DMatrix<f64> {
    let mut dst = DMatrix::<f64>::zeros(src.nrows(), src.ncols());
    fill_dmatrix(src, &mut dst);
    dst
}

/// Copy `src` into a preallocated `dst` of the same shape, column by column
/// so writes follow `DMatrix`'s column-major layout.
pub fn fill_dmatrix(src: &Array2<f64>, dst: &mut DMatrix<f64>) {
    for j in 0..src.ncols() {
        for i in 0..src.nrows() {
            dst[(i, j)] = src[[i, j]];
        }
    }
}

/// Copy a `nalgebra::DMatrix` back into an `ndarray` matrix.
pub fn from_dmatrix(src: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((src.nrows(), src.ncols()), |(i, j)| src[(i, j)])
}

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Extract a 1-D float array as an owned `Array1<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_vector<'py>(py: Python<'py>, raw: &Bound<'py, PyAny>) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw)?;
    Ok(arr.as_array().to_owned())
}

/// Extract a 2-D float array; 1-D input is promoted to a single column so
/// 1-D point sets and single-regressor designs can be passed as vectors.
#[cfg(feature = "python-bindings")]
pub fn extract_matrix<'py>(py: Python<'py>, raw: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().to_owned());
    }
    if let Ok(obj) = raw.call_method("to_numpy", (), None) {
        if let Ok(arr) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(arr.as_array().to_owned());
        }
    }
    let column = extract_vector(py, raw).map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 2-D numpy.ndarray, pandas.DataFrame, or 1-D sequence of float64",
        )
    })?;
    let n = column.len();
    column
        .into_shape((n, 1))
        .map_err(|e| PyValueError::new_err(format!("could not reshape input: {e}")))
}

/// Build validated [`MLEOptions`] from Python keyword arguments.
#[cfg(feature = "python-bindings")]
pub fn extract_mle_opts(
    tol: f64, max_iter: Option<usize>, line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
    verbose: bool,
) -> PyResult<MLEOptions> {
    let tols = Tolerances::new(Some(tol), None, Some(max_iter.unwrap_or(300)))?;
    let ls = match line_searcher {
        Some(name) => LineSearcher::from_str(name)?,
        None => LineSearcher::MoreThuente,
    };
    let mut opts = MLEOptions::new(tols, ls, lbfgs_mem)?;
    opts.verbose = verbose;
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Lossless ndarray → nalgebra → ndarray copies for non-square input.
    //
    // They intentionally DO NOT cover:
    // - Python extraction helpers, which need a live interpreter.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Copies preserve every entry and the (row, col) orientation.
    //
    // Given
    // -----
    // - A 2×3 matrix with distinct entries.
    //
    // Expect
    // ------
    // - `to_dmatrix` places entries at the same (i, j) and `from_dmatrix`
    //   restores the original array.
    fn dmatrix_copies_preserve_orientation() {
        // Arrange
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];

        // Act
        let m = to_dmatrix(&a);
        let back = from_dmatrix(&m);

        // Assert
        assert_eq!((m.nrows(), m.ncols()), (2, 3));
        assert_eq!(m[(1, 2)], 6.0);
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(back, a);
    }
}
