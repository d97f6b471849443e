//! Power of a one-sample z-test by simulation.
//!
//! Each trial draws `n` observations from the alternative `N(μ₁, σ)`, forms
//!
//! ```text
//! z = (x̄ - μ₀) / (σ / √n)
//! ```
//!
//! and rejects per the test type. The rejection rate estimates the power,
//! which is compared with its closed form.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::{reference_errors, BatchContext, Estimate, Estimator, Statistics, Visualization};
use crate::config::{AlgorithmParams, HypothesisParams};
use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};
use crate::stats::accumulator::{CappedSeries, Merge};
use crate::stats::descriptive::{histogram, linspace, Histogram};
use crate::stats::normal;

/// Hard cap on retained p-values and z-statistics.
pub const MAX_STORED_TESTS: usize = 5_000;

/// Most recent tests shown in the plots.
pub const DISPLAY_WINDOW: usize = 1_000;

/// Bins of the p-value histogram over `[0, 1]`.
pub const P_VALUE_BINS: usize = 20;

/// Half-width of the plotted z axis.
const Z_AXIS_LIMIT: f64 = 4.0;

/// Resolution of the sampling-density curves.
const Z_AXIS_POINTS: usize = 100;

/// Rejection region of the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    /// Reject for large `|z|`.
    TwoSided,
    /// Reject for large `z`.
    RightTailed,
    /// Reject for small `z`.
    LeftTailed,
}

impl TestType {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TwoSided => "two-sided",
            Self::RightTailed => "right-tailed",
            Self::LeftTailed => "left-tailed",
        }
    }

    /// Critical value at level `alpha`; negative for a left-tailed test.
    #[must_use]
    pub fn critical_value(self, alpha: f64) -> f64 {
        match self {
            Self::TwoSided => normal::inverse_cdf(1.0 - alpha / 2.0),
            Self::RightTailed => normal::inverse_cdf(1.0 - alpha),
            Self::LeftTailed => -normal::inverse_cdf(1.0 - alpha),
        }
    }

    /// p-value of statistic `z`.
    #[must_use]
    pub fn p_value(self, z: f64) -> f64 {
        match self {
            Self::TwoSided => 2.0 * (1.0 - normal::cdf(z.abs())),
            Self::RightTailed => 1.0 - normal::cdf(z),
            Self::LeftTailed => normal::cdf(z),
        }
    }

    /// Decision for statistic `z` against `critical`.
    #[must_use]
    pub fn rejects(self, z: f64, critical: f64) -> bool {
        match self {
            Self::TwoSided => z.abs() > critical,
            Self::RightTailed => z > critical,
            Self::LeftTailed => z < critical,
        }
    }

    /// Closed-form power for a standardized shift `effect`.
    #[must_use]
    pub fn power(self, critical: f64, effect: f64) -> f64 {
        match self {
            Self::TwoSided => {
                1.0 - normal::cdf(critical - effect) + normal::cdf(-critical - effect)
            }
            Self::RightTailed => 1.0 - normal::cdf(critical - effect),
            Self::LeftTailed => normal::cdf(critical - effect),
        }
    }

    /// Plotted rejection regions on `[-4, 4]`.
    #[must_use]
    pub fn critical_regions(self, critical: f64) -> Vec<[f64; 2]> {
        match self {
            Self::TwoSided => vec![[-Z_AXIS_LIMIT, -critical], [critical, Z_AXIS_LIMIT]],
            Self::RightTailed => vec![[critical, Z_AXIS_LIMIT]],
            Self::LeftTailed => vec![[-Z_AXIS_LIMIT, critical]],
        }
    }
}

impl FromStr for TestType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-sided" => Ok(Self::TwoSided),
            "right-tailed" => Ok(Self::RightTailed),
            "left-tailed" => Ok(Self::LeftTailed),
            other => Err(SimError::invalid_parameter(
                "test_type",
                format!("unknown test type '{other}'"),
            )),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct HypothesisBatch {
    /// Rejected tests.
    pub reject_count: u64,
    /// Tests run.
    pub total_tests: u64,
    /// p-values, in trial order.
    pub p_values: Vec<f64>,
    /// z-statistics, in trial order.
    pub test_statistics: Vec<f64>,
}

/// Power statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisStatistics {
    /// Estimate block; the estimate is the rejection rate.
    #[serde(flatten)]
    pub core: Estimate,
    /// Closed-form power.
    pub theoretical_power: f64,
    /// `|estimate - theoretical_power|`.
    pub error: f64,
    /// Percent error; absent when the closed-form power is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
    /// Significance level.
    pub type_i_error_rate: f64,
    /// `(μ₁ - μ₀) / σ`.
    pub effect_size: f64,
    /// Rejection region.
    pub test_type: TestType,
}

/// Null and alternative densities of the z-statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingDistributions {
    /// z grid.
    pub x: Vec<f64>,
    /// Density under the null, `N(0, 1)`.
    pub null: Vec<f64>,
    /// Density under the alternative, `N(shift, 1)`.
    pub alternative: Vec<f64>,
}

impl SamplingDistributions {
    fn on_grid(x: Vec<f64>, shift: f64) -> Self {
        Self {
            null: x.iter().map(|&v| normal::pdf(v, 0.0)).collect(),
            alternative: x.iter().map(|&v| normal::pdf(v, shift)).collect(),
            x,
        }
    }
}

/// Hypothesis test plot payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisPlot {
    /// p-values of the last [`DISPLAY_WINDOW`] retained tests.
    pub p_value_histogram: Histogram,
    /// z-statistics of the last [`DISPLAY_WINDOW`] retained tests.
    pub test_statistics: Vec<f64>,
    /// Sampling densities on `[-4, 4]`.
    pub sampling_distributions: SamplingDistributions,
    /// Rejection regions as `[from, to]`.
    pub critical_regions: Vec<[f64; 2]>,
    /// Critical value.
    pub critical_value: f64,
    /// Significance level.
    pub alpha: f64,
    /// Rejection rate over all tests.
    pub rejection_rate: f64,
}

/// Hypothesis power estimator.
#[derive(Debug, Clone)]
pub struct HypothesisPowerEstimator {
    params: HypothesisParams,
    test_type: TestType,
    critical: f64,
    se: f64,
    theoretical_power: f64,
    reject_count: u64,
    total_tests: u64,
    p_values: CappedSeries<f64>,
    test_statistics: CappedSeries<f64>,
}

impl HypothesisPowerEstimator {
    /// Create an estimator.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for an unknown test type, a
    /// non-positive standard deviation or sample size, or `alpha` outside
    /// `(0, 1)`.
    pub fn new(params: &HypothesisParams) -> SimResult<Self> {
        let test_type: TestType = params.test_type.parse()?;
        if !(params.std_dev.is_finite() && params.std_dev > 0.0) {
            return Err(SimError::invalid_parameter("std_dev", "must be positive"));
        }
        if params.sample_size == 0 {
            return Err(SimError::invalid_parameter("sample_size", "must be at least 1"));
        }
        if !(params.alpha > 0.0 && params.alpha < 1.0) {
            return Err(SimError::invalid_parameter("alpha", "must lie in (0, 1)"));
        }

        let critical = test_type.critical_value(params.alpha);
        let se = params.std_dev / f64::from(params.sample_size).sqrt();
        let shift = (params.alt_mean - params.null_mean) / se;

        Ok(Self {
            params: params.clone(),
            test_type,
            critical,
            se,
            theoretical_power: test_type.power(critical, shift),
            reject_count: 0,
            total_tests: 0,
            p_values: CappedSeries::new(MAX_STORED_TESTS),
            test_statistics: CappedSeries::new(MAX_STORED_TESTS),
        })
    }

    /// Closed-form power.
    #[must_use]
    pub const fn theoretical_power(&self) -> f64 {
        self.theoretical_power
    }

    fn rejection_rate(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            self.reject_count as f64 / self.total_tests as f64
        }
    }
}

impl Estimator for HypothesisPowerEstimator {
    type Contribution = HypothesisBatch;

    fn kind(&self) -> &'static str {
        "hypothesis"
    }

    fn simulate_batch(
        &mut self,
        batch: BatchContext,
        rng: &mut SimRng,
    ) -> SimResult<HypothesisBatch> {
        let keep = (batch.size as usize).min(self.p_values.remaining());
        let mut p_values = Vec::with_capacity(keep);
        let mut test_statistics = Vec::with_capacity(keep);
        let mut reject_count = 0;

        let n = self.params.sample_size;
        for trial in 0..batch.size as usize {
            let sum: f64 = (0..n)
                .map(|_| rng.gen_normal(self.params.alt_mean, self.params.std_dev))
                .sum();
            let sample_mean = sum / f64::from(n);
            let z = (sample_mean - self.params.null_mean) / self.se;

            if self.test_type.rejects(z, self.critical) {
                reject_count += 1;
            }
            if trial < keep {
                p_values.push(self.test_type.p_value(z));
                test_statistics.push(z);
            }
        }

        Ok(HypothesisBatch {
            reject_count,
            total_tests: batch.size,
            p_values,
            test_statistics,
        })
    }

    fn accumulate(&mut self, batch: HypothesisBatch) -> SimResult<()> {
        self.reject_count.merge(batch.reject_count);
        self.total_tests.merge(batch.total_tests);
        self.p_values.merge(batch.p_values);
        self.test_statistics.merge(batch.test_statistics);
        Ok(())
    }

    fn calculate_statistics(&self, _rng: &mut SimRng) -> SimResult<Statistics> {
        let effect_size = (self.params.alt_mean - self.params.null_mean) / self.params.std_dev;
        if self.total_tests == 0 {
            return Ok(Statistics::Hypothesis(HypothesisStatistics {
                core: Estimate::zero(),
                theoretical_power: self.theoretical_power,
                error: 0.0,
                relative_error: None,
                type_i_error_rate: self.params.alpha,
                effect_size,
                test_type: self.test_type,
            }));
        }

        let power = self.rejection_rate();
        let std_error = (power * (1.0 - power) / self.total_tests as f64).sqrt();
        let (error, relative) = reference_errors(power, self.theoretical_power);
        let relative_error = relative.filter(|_| self.theoretical_power > 0.0);

        Ok(Statistics::Hypothesis(HypothesisStatistics {
            core: Estimate::new(power, std_error),
            theoretical_power: self.theoretical_power,
            error,
            relative_error,
            type_i_error_rate: self.params.alpha,
            effect_size,
            test_type: self.test_type,
        }))
    }

    fn visualization_data(&self, _rng: &mut SimRng) -> Visualization {
        let recent_p = self.p_values.tail(DISPLAY_WINDOW);
        let x = linspace(-Z_AXIS_LIMIT, Z_AXIS_LIMIT, Z_AXIS_POINTS);
        let shift = (self.params.alt_mean - self.params.null_mean) / self.se;

        Visualization::HypothesisTest(HypothesisPlot {
            p_value_histogram: histogram(recent_p, P_VALUE_BINS, Some((0.0, 1.0))),
            test_statistics: self.test_statistics.tail(DISPLAY_WINDOW).to_vec(),
            sampling_distributions: SamplingDistributions::on_grid(x, shift),
            critical_regions: self.test_type.critical_regions(self.critical),
            critical_value: self.critical,
            alpha: self.params.alpha,
            rejection_rate: self.rejection_rate(),
        })
    }

    fn parameters(&self) -> AlgorithmParams {
        AlgorithmParams::Hypothesis(self.params.clone())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Falsification: p-values are probabilities and rejection agrees with p < alpha.
        #[test]
        fn prop_p_value_consistent_with_decision(z in -6.0f64..6.0, alpha in 0.01f64..0.2) {
            for test in [TestType::TwoSided, TestType::RightTailed, TestType::LeftTailed] {
                let p = test.p_value(z);
                prop_assert!((0.0..=1.0).contains(&p));
                let c = test.critical_value(alpha);
                if test.rejects(z, c) {
                    prop_assert!(p <= alpha + 1e-9);
                } else {
                    prop_assert!(p >= alpha - 1e-9);
                }
            }
        }
    }
}
