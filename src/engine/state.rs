//! Per-run mutable state.
//!
//! A [`RunState`] is created when a run starts and dropped with it; it is
//! never reused. The running flag is the only piece shared with other
//! threads, through [`StopHandle`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::stats::convergence::{ConvergencePoint, ConvergenceTracker};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no batch executed yet.
    Pending,
    /// Batches are executing.
    Running,
    /// Every requested trial ran.
    Completed,
    /// The running flag was cleared before completion.
    Stopped,
    /// A batch or statistics computation failed.
    Failed,
}

impl RunStatus {
    /// True once the loop has exited.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }
}

/// Cloneable handle that requests cancellation of a run.
///
/// The request becomes visible at the next batch boundary.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Clear the running flag.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// True until [`stop`](Self::stop) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Iteration counter, status, running flag and convergence history of one run.
#[derive(Debug)]
pub struct RunState {
    iteration: u64,
    total: u64,
    status: RunStatus,
    stop: StopHandle,
    history: ConvergenceTracker,
}

impl RunState {
    /// Fresh state for a run of `total` trials.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            iteration: 0,
            total,
            status: RunStatus::Pending,
            stop: StopHandle::new(),
            history: ConvergenceTracker::new(),
        }
    }

    /// Trials completed.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Trials the run executes.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Trials still to run.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.iteration)
    }

    /// `iteration / total`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.iteration as f64 / self.total as f64
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    /// Handle sharing this run's running flag.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// True until a stop was requested.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.stop.is_running()
    }

    /// Advance the counter after a batch of `n` trials.
    pub fn advance(&mut self, n: u64) {
        self.iteration = self.iteration.saturating_add(n).min(self.total);
    }

    /// True when the current iteration is an emission boundary.
    #[must_use]
    pub const fn at_emission(&self, update_frequency: u64) -> bool {
        self.iteration == self.total
            || (update_frequency > 0 && self.iteration % update_frequency == 0)
    }

    /// True once every trial ran.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.iteration >= self.total
    }

    /// Append a convergence point.
    pub fn record(&mut self, point: ConvergencePoint) {
        self.history.append(point);
    }

    /// Convergence history.
    #[must_use]
    pub const fn history(&self) -> &ConvergenceTracker {
        &self.history
    }
}
