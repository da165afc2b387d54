//! numerical_stability — log-space transforms and η regime thresholds.
//!
//! Purpose
//! -------
//! Keep the conversions between public hyperparameters and optimizer
//! coordinates in one place, together with the thresholds that decide when
//! the likelihood switches to its limiting forms in `η`.
//!
//! Key behaviors
//! -------------
//! - `log10 η ↔ η` with `-∞ ↔ 0` and `+∞ ↔ ∞`.
//! - Distance-scale folding (`θ ↦ |θ|`) that also returns the sign factors
//!   required to push derivatives back to the raw coordinates.
//! - `log10 θ ↔ θ` for optimizer coordinates.
//!
//! Invariants & assumptions
//! ------------------------
//! - `MIN_ETA < ASYMPTOTIC_ETA < MAX_ETA`.
//! - Folding rejects zero and non-finite scales; everything downstream may
//!   assume strictly positive, finite `θ`.
//!
//! Conventions
//! -----------
//! - Pure functions, no logging, no global state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] cover the infinite limits and the
//!   folding signs.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    ASYMPTOTIC_ETA, MAX_ETA, MIN_ETA, distance_scale_from_log10, eta_from_log10,
    fold_distance_scale, log10_distance_scale, log10_from_eta,
};

pub mod prelude {
    pub use super::transformations::{
        MAX_ETA, MIN_ETA, eta_from_log10, fold_distance_scale, log10_from_eta,
    };
}
