//! Jidoka (自働化): stop the line on a non-finite estimate.
//!
//! The guard runs after every statistics computation. A NaN or infinite
//! estimate, or a NaN standard error, is a defect: the run aborts instead of
//! streaming it. An infinite standard error is allowed; it is the defined
//! sentinel for an effective sample size of zero.

use crate::domains::Statistics;
use crate::error::{SimError, SimResult};

/// Finite-value guard over emitted statistics.
#[derive(Debug, Clone, Default)]
pub struct JidokaGuard {
    checks_passed: u64,
}

impl JidokaGuard {
    /// Create a guard.
    #[must_use]
    pub const fn new() -> Self {
        Self { checks_passed: 0 }
    }

    /// Check one statistics record produced by the `kind` estimator.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NonFiniteValue`] naming the offending field.
    pub fn check(&mut self, kind: &str, stats: &Statistics) -> SimResult<()> {
        let core = stats.core();
        if !core.estimate.is_finite() {
            return Err(SimError::non_finite(format!("{kind}.estimate")));
        }
        if core.std_error.is_nan() {
            return Err(SimError::non_finite(format!("{kind}.std_error")));
        }
        self.checks_passed += 1;
        Ok(())
    }

    /// Checks that passed so far.
    #[must_use]
    pub const fn checks_passed(&self) -> u64 {
        self.checks_passed
    }
}
