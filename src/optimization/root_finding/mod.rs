//! root_finding — bracketing and derivative-free root refinement for scalar
//! functions.
//!
//! Purpose
//! -------
//! Locate zeros of the profile-likelihood derivative in `log10 η` without
//! ever leaving a valid sign-change bracket.
//!
//! Key behaviors
//! -------------
//! - [`find_interval_with_sign_change`]: test the ends of an interval, then
//!   alternately subdivide and expand it until a sign change is found or the
//!   trial budget runs out.
//! - [`chandrupatla_method`]: refine a bracketed root with Chandrupatla's
//!   blend of inverse quadratic interpolation and bisection.
//!
//! Invariants & assumptions
//! ------------------------
//! - Functions are fallible (`FnMut(f64) -> OptResult<f64>`); their errors
//!   propagate unchanged and non-finite values are rejected.
//! - Refinement never evaluates outside the last valid bracket.
//!
//! Conventions
//! -----------
//! - Failure to find a bracket is reported as `Bracket { found: false, .. }`,
//!   not as an error; the caller owns the fallback decision.
//! - Iteration exhaustion is a best-effort result (`converged = false`).
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each routine and use closed-form roots.

pub mod bracket;
pub mod chandrupatla;
pub mod options;

pub use self::bracket::{Bracket, find_interval_with_sign_change};
pub use self::chandrupatla::{RootOutcome, chandrupatla_method};
pub use self::options::{
    DEFAULT_BRACKET_TRIALS, DEFAULT_ROOT_MAX_ITER, DEFAULT_ROOT_TOL, RootOptions,
};
