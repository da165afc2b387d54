//! covariance::kernel — isotropic correlation functions of a scaled distance.
//!
//! Each kernel is a function `k(r)` of the scaled Euclidean distance
//! `r = ‖(x − x') / θ‖` with `k(0) = 1`. Alongside the value we expose the
//! first and second derivatives in `r`; the dense operator chains these with
//! `∂r/∂θ` to build derivative matrices with respect to the distance scale.
use std::str::FromStr;

use crate::optimization::errors::OptError;

/// Stationary correlation kernel.
///
/// Variants:
/// - `Exponential`: `exp(−r)` (Matérn ν = 1/2).
/// - `SquaredExponential`: `exp(−r²/2)`.
/// - `Matern32`: `(1 + √3 r) exp(−√3 r)`.
/// - `Matern52`: `(1 + √5 r + 5r²/3) exp(−√5 r)`.
///
/// Parsing accepts case-insensitive names with `-`/`_` ignored, e.g.
/// `"exponential"`, `"squared-exponential"`, `"rbf"`, `"matern32"`,
/// `"Matern_52"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Exponential,
    SquaredExponential,
    Matern32,
    Matern52,
}

impl Kernel {
    /// Correlation value `k(r)` for `r ≥ 0`.
    pub fn value(&self, r: f64) -> f64 {
        match self {
            Kernel::Exponential => (-r).exp(),
            Kernel::SquaredExponential => (-0.5 * r * r).exp(),
            Kernel::Matern32 => {
                let a = 3.0_f64.sqrt() * r;
                (1.0 + a) * (-a).exp()
            }
            Kernel::Matern52 => {
                let a = 5.0_f64.sqrt() * r;
                (1.0 + a + a * a / 3.0) * (-a).exp()
            }
        }
    }

    /// First derivative `k'(r)`.
    pub fn der1(&self, r: f64) -> f64 {
        match self {
            Kernel::Exponential => -(-r).exp(),
            Kernel::SquaredExponential => -r * (-0.5 * r * r).exp(),
            Kernel::Matern32 => {
                let a = 3.0_f64.sqrt() * r;
                -3.0 * r * (-a).exp()
            }
            Kernel::Matern52 => {
                let a = 5.0_f64.sqrt() * r;
                -(5.0 / 3.0) * r * (1.0 + a) * (-a).exp()
            }
        }
    }

    /// Second derivative `k''(r)`.
    pub fn der2(&self, r: f64) -> f64 {
        match self {
            Kernel::Exponential => (-r).exp(),
            Kernel::SquaredExponential => (r * r - 1.0) * (-0.5 * r * r).exp(),
            Kernel::Matern32 => {
                let a = 3.0_f64.sqrt() * r;
                3.0 * (a - 1.0) * (-a).exp()
            }
            Kernel::Matern52 => {
                let a = 5.0_f64.sqrt() * r;
                -(5.0 / 3.0) * (1.0 + a - a * a) * (-a).exp()
            }
        }
    }
}

impl FromStr for Kernel {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(|c| !matches!(c, '-' | '_' | ' ')).collect();
        match key.to_lowercase().as_str() {
            "exponential" | "exp" => Ok(Kernel::Exponential),
            "squaredexponential" | "rbf" | "gaussian" => Ok(Kernel::SquaredExponential),
            "matern32" => Ok(Kernel::Matern32),
            "matern52" => Ok(Kernel::Matern52),
            _ => Err(OptError::InvalidParameter {
                text: format!(
                    "Unknown kernel '{s}'. Valid options are 'exponential', \
                     'squared_exponential', 'matern32' or 'matern52'."
                ),
            }),
        }
    }
}
