//! Data shapes produced by a run: progress snapshots and the final result.

use serde::Serialize;

use crate::config::AlgorithmParams;
use crate::domains::{Statistics, Visualization};
use crate::stats::convergence::{downsample, ConvergencePoint};

use super::state::RunStatus;

/// State of a run at one emission boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Trials completed.
    pub iteration: u64,
    /// Trials the run executes.
    pub total: u64,
    /// `iteration / total`.
    pub progress: f64,
    /// Named statistics.
    pub statistics: Statistics,
    /// Algorithm-specific plot payload.
    pub visualization: Visualization,
    /// Convergence history, downsampled at emission time.
    pub convergence_history: Vec<ConvergencePoint>,
}

impl ProgressSnapshot {
    /// True for the snapshot emitted after the last trial.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.iteration == self.total
    }
}

/// Input parameters echoed in the final result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunParameters {
    /// Trials executed, including any burn-in inflation.
    pub n_simulations: u64,
    /// Effective batch size.
    pub batch_size: u64,
    /// Emission cadence in trials.
    pub update_frequency: u64,
    /// Seed actually used; replays the run when passed back in.
    pub seed: u64,
    /// Algorithm parameters.
    pub algorithm: AlgorithmParams,
}

/// Outcome of a run that completed or was stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
    /// Trials completed.
    pub total_iterations: u64,
    /// `Completed` or `Stopped`.
    pub status: RunStatus,
    /// Statistics recomputed from the accumulated state.
    pub statistics: Statistics,
    /// Full convergence history.
    pub convergence_history: Vec<ConvergencePoint>,
    /// Plot payload from the accumulated state.
    pub visualization: Visualization,
    /// Echoed inputs.
    pub parameters: RunParameters,
    /// Wall-clock duration of the loop in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl FinalResult {
    /// Convergence history reduced to at most `max_points` points.
    #[must_use]
    pub fn downsampled_history(&self, max_points: usize) -> Vec<ConvergencePoint> {
        downsample(&self.convergence_history, max_points)
    }
}
