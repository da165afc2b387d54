//! likelihood — profile-likelihood engines for Gaussian-process
//! hyperparameters.
//!
//! Purpose
//! -------
//! Estimate the noise ratio `η = σ0²/σ²` and the distance scales `θ` of
//! `z ~ N(Xβ, σ²C(θ) + σ0²I)` by maximizing a likelihood from which `β` and
//! `σ²` have been profiled out analytically.
//!
//! Key behaviors
//! -------------
//! - [`profile`]: single profile likelihood in `(η, θ)` with closed-form
//!   derivatives, the bracket-and-refine root search on `∂ℓ/∂η` and the
//!   method dispatcher.
//! - [`double_profile`]: likelihood in `θ` alone, with `η` re-optimized by
//!   the single-profile engine at every evaluation.
//! - [`objective`]: both likelihoods as Argmin objectives in log-space.
//! - [`gls`]: the generalized least squares algebra shared by the engines.
//! - [`method`], [`options`], [`types`]: strategy enum, option carriers and
//!   the returned record.
//!
//! Invariants & assumptions
//! ------------------------
//! - The engines are stateless. The only mutable state is the operator's
//!   distance scale, which every evaluation sets before use.
//! - `X` has full column rank and `n > m`.
//!
//! Downstream usage
//! ----------------
//! - Call [`profile::maximize_likelihood`] or
//!   [`double_profile::maximize_likelihood`] with a
//!   [`CovarianceOperator`](crate::covariance::CovarianceOperator) and read
//!   the returned [`OptimizationRecord`].

pub mod double_profile;
pub mod gls;
pub mod method;
pub mod objective;
pub mod options;
pub mod profile;
pub mod types;

pub use self::method::OptimizationMethod;
pub use self::objective::{DoubleProfileObjective, SingleProfileObjective};
pub use self::options::{
    DEFAULT_INNER_TOL, DEFAULT_LOG_ETA_GUESS, DoubleProfileOptions, ProfileOptions,
};
pub use self::profile::EtaRoot;
pub use self::types::{HyperparamRecord, OptimizationRecord, OptimizationSummary, TimeRecord};

pub mod prelude {
    pub use super::double_profile;
    pub use super::profile;
    pub use super::{
        DoubleProfileOptions, EtaRoot, HyperparamRecord, OptimizationMethod, OptimizationRecord,
        OptimizationSummary, ProfileOptions, TimeRecord,
    };
}
