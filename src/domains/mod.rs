//! Monte Carlo estimators.
//!
//! Every estimator implements the same capability set, [`Estimator`]:
//! - Pi: points in the unit square
//! - Integral: definite integral of a named function
//! - Option pricing: Black-Scholes Monte Carlo
//! - Hypothesis power: rejection rate of a z-test
//! - Value at Risk: loss percentile with bootstrap error
//! - Metropolis-Hastings: random-walk chain with ESS-corrected error
//!
//! [`Algorithm`] is the closed tagged union the run loop dispatches through.

pub mod algorithm;
pub mod hypothesis_power;
pub mod integral;
pub mod metropolis_hastings;
pub mod option_pricing;
pub mod pi;
pub mod value_at_risk;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::AlgorithmParams;
use crate::engine::rng::SimRng;
use crate::error::SimResult;
use crate::stats::interval::{interval, DEFAULT_CONFIDENCE};

pub use algorithm::{Algorithm, Contribution};
pub use hypothesis_power::{
    HypothesisPlot, HypothesisPowerEstimator, HypothesisStatistics, TestType,
};
pub use integral::{IntegralEstimator, IntegralStatistics, IntegrandKind, IntegrationPlot};
pub use metropolis_hastings::{ChainPlot, ChainStatistics, MetropolisHastingsEstimator, TargetDensity};
pub use option_pricing::{OptionPricingEstimator, OptionStatistics, OptionType, PathPlot};
pub use pi::{PiEstimator, PiStatistics, ScatterPlot};
pub use value_at_risk::{ReturnModel, RiskPlot, RiskStatistics, ValueAtRiskEstimator};

/// Position of a batch inside the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchContext {
    /// Trials in this batch.
    pub size: u64,
    /// Trials completed before this batch started.
    pub iteration: u64,
}

/// Per-algorithm capability set driven by the run loop.
///
/// The loop calls [`simulate_batch`](Estimator::simulate_batch) and feeds the
/// returned partial contribution to [`accumulate`](Estimator::accumulate).
/// Statistics and visualization are computed from the accumulated state only
/// at emission boundaries.
pub trait Estimator {
    /// Partial result of one batch.
    type Contribution;

    /// Short algorithm name.
    fn kind(&self) -> &'static str;

    /// Total trials the run loop executes for `requested` trials.
    fn total_trials(&self, requested: u64) -> u64 {
        requested
    }

    /// Run one batch of `batch.size` trials.
    ///
    /// # Errors
    ///
    /// Returns error if the batch cannot be simulated; the run aborts.
    fn simulate_batch(
        &mut self,
        batch: BatchContext,
        rng: &mut SimRng,
    ) -> SimResult<Self::Contribution>;

    /// Merge a batch contribution into the running accumulator.
    ///
    /// # Errors
    ///
    /// Returns error if the contribution does not belong to this estimator.
    fn accumulate(&mut self, contribution: Self::Contribution) -> SimResult<()>;

    /// Statistics over everything accumulated so far.
    ///
    /// # Errors
    ///
    /// Returns error if the statistics cannot be computed; the run aborts.
    fn calculate_statistics(&self, rng: &mut SimRng) -> SimResult<Statistics>;

    /// Visualization payload over the retained samples.
    fn visualization_data(&self, rng: &mut SimRng) -> Visualization;

    /// Parameters this estimator was built from.
    fn parameters(&self) -> AlgorithmParams;
}

/// Point estimate with standard error and confidence interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Estimate {
    /// Point estimate.
    pub estimate: f64,
    /// Standard error of the estimate.
    pub std_error: f64,
    /// Lower confidence bound.
    pub lower_ci: f64,
    /// Upper confidence bound.
    pub upper_ci: f64,
}

impl Estimate {
    /// Estimate with a 95% normal-approximation interval.
    #[must_use]
    pub fn new(estimate: f64, std_error: f64) -> Self {
        let ci = interval(estimate, std_error, DEFAULT_CONFIDENCE);
        Self {
            estimate,
            std_error,
            lower_ci: ci.lower,
            upper_ci: ci.upper,
        }
    }

    /// Estimate with an externally computed interval (bootstrap).
    #[must_use]
    pub const fn with_interval(
        estimate: f64,
        std_error: f64,
        lower_ci: f64,
        upper_ci: f64,
    ) -> Self {
        Self {
            estimate,
            std_error,
            lower_ci,
            upper_ci,
        }
    }

    /// All-zero estimate reported before any trial completed.
    #[must_use]
    pub const fn zero() -> Self {
        Self::with_interval(0.0, 0.0, 0.0, 0.0)
    }
}

/// Absolute and percent error against a reference value.
///
/// The percent error is `None` when the reference is zero.
#[must_use]
pub fn reference_errors(estimate: f64, reference: f64) -> (f64, Option<f64>) {
    let error = (estimate - reference).abs();
    let relative = (reference != 0.0).then(|| error / reference.abs() * 100.0);
    (error, relative)
}

/// Named statistics of one estimator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Statistics {
    /// Pi estimator.
    Pi(PiStatistics),
    /// Integral estimator.
    Integration(IntegralStatistics),
    /// Option pricing estimator.
    OptionPricing(OptionStatistics),
    /// Hypothesis power estimator.
    Hypothesis(HypothesisStatistics),
    /// Value at Risk estimator.
    Risk(RiskStatistics),
    /// Metropolis-Hastings sampler.
    Markov(ChainStatistics),
}

impl Statistics {
    /// Shared estimate block.
    #[must_use]
    pub const fn core(&self) -> &Estimate {
        match self {
            Self::Pi(s) => &s.core,
            Self::Integration(s) => &s.core,
            Self::OptionPricing(s) => &s.core,
            Self::Hypothesis(s) => &s.core,
            Self::Risk(s) => &s.core,
            Self::Markov(s) => &s.core,
        }
    }

    /// Point estimate.
    #[must_use]
    pub fn estimate(&self) -> f64 {
        self.core().estimate
    }

    /// Standard error.
    #[must_use]
    pub fn std_error(&self) -> f64 {
        self.core().std_error
    }

    /// Flatten every numeric field into a string-keyed map.
    ///
    /// Nested fields use dotted keys (`percentiles.50%`, `bounds.0`); text
    /// and flag fields are skipped. Only boundary consumers need this shape.
    ///
    /// # Errors
    ///
    /// Returns error if the statistics cannot be serialized.
    pub fn to_map(&self) -> SimResult<BTreeMap<String, f64>> {
        let value = serde_json::to_value(self)
            .map_err(|e| crate::error::SimError::serialization(e.to_string()))?;
        let mut map = BTreeMap::new();
        flatten_numbers(String::new(), &value, &mut map);

        // JSON has no infinity; restore the core block verbatim.
        let core = self.core();
        map.insert("estimate".to_string(), core.estimate);
        map.insert("std_error".to_string(), core.std_error);
        map.insert("lower_ci".to_string(), core.lower_ci);
        map.insert("upper_ci".to_string(), core.upper_ci);
        Ok(map)
    }
}

fn child_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn flatten_numbers(prefix: String, value: &serde_json::Value, out: &mut BTreeMap<String, f64>) {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_f64() {
                out.insert(prefix, v);
            }
        }
        serde_json::Value::Object(fields) => {
            for (key, inner) in fields {
                flatten_numbers(child_key(&prefix, key), inner, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, inner) in items.iter().enumerate() {
                flatten_numbers(child_key(&prefix, &i.to_string()), inner, out);
            }
        }
        _ => {}
    }
}

/// `(x, y)` samples of a curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Curve {
    /// Abscissae.
    pub x: Vec<f64>,
    /// Ordinates.
    pub y: Vec<f64>,
}

/// Algorithm-specific visualization payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Visualization {
    /// Pi scatter plot.
    Scatter(ScatterPlot),
    /// Integrand curve with sample points.
    FunctionIntegration(IntegrationPlot),
    /// GBM display paths.
    Paths(PathPlot),
    /// Test statistic and p-value distributions.
    HypothesisTest(HypothesisPlot),
    /// Return and loss histograms.
    ValueAtRisk(RiskPlot),
    /// Chain histogram, trace and autocorrelation.
    MarkovChain(ChainPlot),
}
