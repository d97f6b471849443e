//! Error types for montesim.
//!
//! All fallible operations return `Result<T, SimError>` instead of panicking.
//! Degenerate numeric cases (zero variance, missing analytical reference) are
//! never errors: they surface as sentinels or omitted fields in the
//! statistics.

use thiserror::Error;

/// Result type alias for montesim operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all montesim operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Jidoka Violations =====
    /// Numerical instability detected (NaN or Inf).
    #[error("Jidoka: non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location where the non-finite value was detected.
        location: String,
    },

    // ===== Configuration Errors =====
    /// An algorithm parameter was rejected at construction time.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid run configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== Run Lifecycle Errors =====
    /// A batch or statistics computation failed; the run was aborted.
    #[error("Simulation failed at iteration {iteration}: {source}")]
    SimulationFailure {
        /// Completed iterations when the failure happened.
        iteration: u64,
        /// Underlying cause.
        #[source]
        source: Box<SimError>,
    },

    /// Final results were requested before the run loop exited.
    #[error("Run still in progress: final results are available once the loop exits")]
    RunInProgress,

    /// Final results were requested from a run that aborted.
    #[error("Run aborted after a failure; no final result is available")]
    RunFailed,

    /// The worker thread driving a streamed run panicked or vanished.
    #[error("Run worker disconnected: {0}")]
    Disconnected(String),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    /// Create an invalid-parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a non-finite value error for the given location.
    #[must_use]
    pub fn non_finite(location: impl Into<String>) -> Self {
        Self::NonFiniteValue {
            location: location.into(),
        }
    }

    /// Wrap an error raised mid-run.
    #[must_use]
    pub fn simulation_failure(iteration: u64, source: Self) -> Self {
        Self::SimulationFailure {
            iteration,
            source: Box::new(source),
        }
    }

    /// Check if this error is a Jidoka violation (requires immediate stop).
    #[must_use]
    pub const fn is_jidoka_violation(&self) -> bool {
        matches!(self, Self::NonFiniteValue { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jidoka_violation_detection() {
        let non_finite = SimError::non_finite("pi.estimate");
        assert!(non_finite.is_jidoka_violation());

        let config = SimError::config("invalid");
        assert!(!config.is_jidoka_violation());
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = SimError::invalid_parameter("function_type", "unknown integrand 'cosh'");
        let msg = err.to_string();
        assert!(msg.contains("function_type"));
        assert!(msg.contains("cosh"));
    }

    #[test]
    fn test_simulation_failure_keeps_source() {
        use std::error::Error as _;

        let err = SimError::simulation_failure(3000, SimError::non_finite("var.estimate"));
        let msg = err.to_string();
        assert!(msg.contains("3000"));
        assert!(msg.contains("var.estimate"));

        let source = err.source().map(ToString::to_string);
        assert!(source.is_some_and(|s| s.contains("non-finite")));
    }

    #[test]
    fn test_error_config() {
        let err = SimError::config("batch size must be positive");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_lifecycle_errors_display() {
        assert!(SimError::RunInProgress.to_string().contains("in progress"));
        assert!(SimError::RunFailed.to_string().contains("aborted"));
        assert!(SimError::Disconnected("worker".into())
            .to_string()
            .contains("worker"));
    }

    #[test]
    fn test_error_debug() {
        let err = SimError::serialization("bad map");
        let debug = format!("{err:?}");
        assert!(debug.contains("Serialization"));
    }
}
