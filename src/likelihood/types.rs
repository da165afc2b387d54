//! likelihood::types — result records returned by the maximize entry points.
//!
//! Purpose
//! -------
//! Describe one completed hyperparameter fit: the estimated scales and
//! length-scales, what the optimizer reported, and how long it took.
//!
//! Conventions
//! -----------
//! - `eta` may be exactly `0` or `∞` when the noise ratio sits on a boundary;
//!   `sigma0` is then `0`, respectively `sigma` is `0`.
//! - Times are in seconds. `proc_time` is CPU time of the whole process.
use std::time::Instant;

use cpu_time::ProcessTime;
use ndarray::Array1;

/// Estimated hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparamRecord {
    /// Signal standard deviation `σ`.
    pub sigma: f64,
    /// Noise standard deviation `σ0`.
    pub sigma0: f64,
    /// Noise-to-signal variance ratio `η = σ0² / σ²`.
    pub eta: f64,
    /// Length-scales at the optimum; `None` if the operator never had any.
    pub distance_scale: Option<Array1<f64>>,
}

/// What the solver reported.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationSummary {
    /// Profile log-likelihood at the optimum (not negated).
    pub max_likelihood: f64,
    /// Iterations of the root finder or minimizer; `0` for a boundary
    /// decision without a bracket.
    pub iter: u64,
    pub converged: bool,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRecord {
    pub wall_time: f64,
    pub proc_time: f64,
}

/// Outcome of a top-level `maximize_likelihood` call, returned by value.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRecord {
    pub hyperparam: HyperparamRecord,
    pub optimization: OptimizationSummary,
    pub time: TimeRecord,
}

/// Wall-clock and process CPU timer started at construction.
#[derive(Debug)]
pub(crate) struct Stopwatch {
    wall: Instant,
    proc: ProcessTime,
}

impl Stopwatch {
    pub(crate) fn start() -> Self {
        Self { wall: Instant::now(), proc: ProcessTime::now() }
    }

    pub(crate) fn stop(&self) -> TimeRecord {
        TimeRecord {
            wall_time: self.wall.elapsed().as_secs_f64(),
            proc_time: self.proc.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // The stopwatch reports non-negative, finite durations.
    //
    // Given
    // -----
    // - A stopwatch started and stopped immediately.
    //
    // Expect
    // ------
    // - Both times are finite and >= 0.
    fn stopwatch_reports_nonnegative_times() {
        let watch = Stopwatch::start();

        let time = watch.stop();

        assert!(time.wall_time.is_finite() && time.wall_time >= 0.0);
        assert!(time.proc_time.is_finite() && time.proc_time >= 0.0);
    }
}
