//! likelihood::method — how a profile likelihood is maximized.
//!
//! [`OptimizationMethod`] replaces a free-form method string: either the
//! dedicated root search on `∂ℓ/∂η` (one free hyperparameter) or one of the
//! Argmin minimizers described by [`SolverKind`].
use std::{fmt, str::FromStr};

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{Capability, SolverKind},
};

/// Strategy for maximizing a profile likelihood.
///
/// Parsing is case-insensitive and accepts scipy-style names
/// (`"chandrupatla"`, `"Nelder-Mead"`, `"BFGS"`, `"L-BFGS-B"`, `"CG"`,
/// `"Newton-CG"`, `"trust-ncg"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationMethod {
    /// Bracket the root of `∂ℓ/∂η` and refine it with Chandrupatla's method.
    /// Optimizes `η` only; the distance scale stays as set on the operator.
    Chandrupatla,
    /// General minimizer over the full hyperparameter vector.
    Minimizer(SolverKind),
}

impl OptimizationMethod {
    /// Derivative information the method consumes.
    pub fn capability(&self) -> Capability {
        match self {
            OptimizationMethod::Chandrupatla => Capability::ValueGradient,
            OptimizationMethod::Minimizer(kind) => kind.capability(),
        }
    }
}

impl Default for OptimizationMethod {
    fn default() -> Self {
        OptimizationMethod::Minimizer(SolverKind::NelderMead)
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationMethod::Chandrupatla => f.write_str("chandrupatla"),
            OptimizationMethod::Minimizer(kind) => kind.fmt(f),
        }
    }
}

impl FromStr for OptimizationMethod {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("chandrupatla") {
            return Ok(OptimizationMethod::Chandrupatla);
        }
        SolverKind::from_str(s).map(OptimizationMethod::Minimizer)
    }
}
