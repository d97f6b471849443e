//! Normal-approximation confidence intervals.
//!
//! Only two discrete levels are supported: 0.95 maps to z = 1.96 and every
//! other level is treated as 0.99 (z = 2.576). Arbitrary levels would need a
//! continuous quantile, see [`crate::stats::normal::inverse_cdf`].

use serde::{Deserialize, Serialize};

/// z-score for a 95% two-sided interval.
pub const Z_95: f64 = 1.96;

/// z-score for a 99% two-sided interval.
pub const Z_99: f64 = 2.576;

/// Default interval level used by every estimator.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Closed interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Width of the interval.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Check whether `value` lies inside the interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// z-score used for the given confidence level.
#[must_use]
pub fn z_score(confidence: f64) -> f64 {
    if (confidence - 0.95).abs() < f64::EPSILON {
        Z_95
    } else {
        Z_99
    }
}

/// `[estimate - z * std_error, estimate + z * std_error]`.
#[must_use]
pub fn interval(estimate: f64, std_error: f64, confidence: f64) -> ConfidenceInterval {
    let half = z_score(confidence) * std_error;
    ConfidenceInterval {
        lower: estimate - half,
        upper: estimate + half,
    }
}
