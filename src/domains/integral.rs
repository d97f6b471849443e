//! Definite integrals by uniform sampling.
//!
//! For `x_i ~ U(a, b)`:
//!
//! ```text
//! Î = (b - a) · mean(f(x_i)),   se = (b - a) · √(Var[f] / n)
//! ```

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::{
    reference_errors, BatchContext, Curve, Estimate, Estimator, Statistics, Visualization,
};
use crate::config::{AlgorithmParams, IntegralParams};
use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};
use crate::stats::accumulator::{CappedSeries, Merge};
use crate::stats::descriptive::linspace;

/// Hard cap on retained sample points.
pub const MAX_STORED_SAMPLES: usize = 1_000;

/// Sample points retained from a single batch.
pub const SAMPLES_PER_BATCH: usize = 50;

/// Sample points handed to the plot.
pub const MAX_DISPLAY_SAMPLES: usize = 500;

/// Resolution of the integrand curve.
pub const CURVE_POINTS: usize = 200;

/// Integrands selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrandKind {
    /// `exp(-x²)`
    Gaussian,
    /// `sin(x)`
    Sine,
    /// `x³ - 2x² + x`
    Polynomial,
    /// `exp(-|x|)`
    Exponential,
    /// `1 / (1 + x²)`, the Lorentzian
    Reciprocal,
}

impl IntegrandKind {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Sine => "sine",
            Self::Polynomial => "polynomial",
            Self::Exponential => "exponential",
            Self::Reciprocal => "reciprocal",
        }
    }

    /// Evaluate the integrand.
    #[must_use]
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Self::Gaussian => (-x * x).exp(),
            Self::Sine => x.sin(),
            Self::Polynomial => x * x * x - 2.0 * x * x + x,
            Self::Exponential => (-x.abs()).exp(),
            Self::Reciprocal => 1.0 / (1.0 + x * x),
        }
    }

    /// Closed-form integral over `[a, b]`, where one is used for comparison.
    #[must_use]
    pub fn analytical(self, a: f64, b: f64) -> Option<f64> {
        match self {
            Self::Polynomial => {
                let antiderivative = |x: f64| x.powi(4) / 4.0 - 2.0 * x.powi(3) / 3.0 + x * x / 2.0;
                Some(antiderivative(b) - antiderivative(a))
            }
            Self::Sine => Some(-b.cos() + a.cos()),
            Self::Gaussian | Self::Exponential | Self::Reciprocal => None,
        }
    }
}

impl FromStr for IntegrandKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gaussian" => Ok(Self::Gaussian),
            "sine" => Ok(Self::Sine),
            "polynomial" => Ok(Self::Polynomial),
            "exponential" => Ok(Self::Exponential),
            "reciprocal" | "lorentzian" => Ok(Self::Reciprocal),
            other => Err(SimError::invalid_parameter(
                "function_type",
                format!("unknown function type '{other}'"),
            )),
        }
    }
}

impl fmt::Display for IntegrandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralBatch {
    /// `Σ f(x_i)`
    pub sum: f64,
    /// `Σ f(x_i)²`
    pub sum_squared: f64,
    /// Points evaluated.
    pub count: u64,
    /// Random subset of `(x, f(x))` kept for display.
    pub samples: Vec<[f64; 2]>,
}

/// Integral statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegralStatistics {
    /// Estimate block.
    #[serde(flatten)]
    pub core: Estimate,
    /// Integrand name.
    pub function_type: IntegrandKind,
    /// `[lower, upper]`.
    pub bounds: [f64; 2],
    /// Closed-form value, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytical_result: Option<f64>,
    /// Absolute error against the closed form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
    /// Percent error; absent when the closed form is zero or unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
}

/// Shaded-area plot payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationPlot {
    /// Integrand over the bounds.
    pub function_curve: Curve,
    /// Up to [`MAX_DISPLAY_SAMPLES`] `(x, f(x))` points.
    pub sample_points: Vec<[f64; 2]>,
    /// `[lower, upper]`.
    pub bounds: [f64; 2],
    /// The area under the curve is shaded.
    pub shaded_area: bool,
}

/// Integral estimator.
#[derive(Debug, Clone)]
pub struct IntegralEstimator {
    params: IntegralParams,
    function: IntegrandKind,
    analytical: Option<f64>,
    sum: f64,
    sum_squared: f64,
    count: u64,
    samples: CappedSeries<[f64; 2]>,
}

impl IntegralEstimator {
    /// Create an estimator.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for an unknown integrand or
    /// bounds that are not finite and increasing.
    pub fn new(params: &IntegralParams) -> SimResult<Self> {
        let function: IntegrandKind = params.function_type.parse()?;
        let (a, b) = (params.lower_bound, params.upper_bound);
        if !(a.is_finite() && b.is_finite() && a < b) {
            return Err(SimError::invalid_parameter(
                "bounds",
                format!("expected finite lower < upper, got [{a}, {b}]"),
            ));
        }

        Ok(Self {
            params: params.clone(),
            function,
            analytical: function.analytical(a, b),
            sum: 0.0,
            sum_squared: 0.0,
            count: 0,
            samples: CappedSeries::new(MAX_STORED_SAMPLES),
        })
    }

    fn range(&self) -> f64 {
        self.params.upper_bound - self.params.lower_bound
    }

    fn bounds(&self) -> [f64; 2] {
        [self.params.lower_bound, self.params.upper_bound]
    }
}

impl Estimator for IntegralEstimator {
    type Contribution = IntegralBatch;

    fn kind(&self) -> &'static str {
        "integration"
    }

    fn simulate_batch(
        &mut self,
        batch: BatchContext,
        rng: &mut SimRng,
    ) -> SimResult<IntegralBatch> {
        let n = batch.size as usize;
        let (a, b) = (self.params.lower_bound, self.params.upper_bound);
        let points: Vec<[f64; 2]> = (0..n)
            .map(|_| {
                let x = rng.gen_range_f64(a, b);
                [x, self.function.eval(x)]
            })
            .collect();

        let sum = points.iter().map(|p| p[1]).sum();
        let sum_squared = points.iter().map(|p| p[1] * p[1]).sum();

        let keep = SAMPLES_PER_BATCH.min(n).min(self.samples.remaining());
        let samples = rng
            .sample_indices(n, keep)
            .into_iter()
            .map(|i| points[i])
            .collect();

        Ok(IntegralBatch {
            sum,
            sum_squared,
            count: batch.size,
            samples,
        })
    }

    fn accumulate(&mut self, batch: IntegralBatch) -> SimResult<()> {
        self.sum.merge(batch.sum);
        self.sum_squared.merge(batch.sum_squared);
        self.count.merge(batch.count);
        self.samples.merge(batch.samples);
        Ok(())
    }

    fn calculate_statistics(&self, _rng: &mut SimRng) -> SimResult<Statistics> {
        if self.count == 0 {
            return Ok(Statistics::Integration(IntegralStatistics {
                core: Estimate::zero(),
                function_type: self.function,
                bounds: self.bounds(),
                analytical_result: self.analytical,
                error: self.analytical.map(|_| 0.0),
                relative_error: None,
            }));
        }

        let n = self.count as f64;
        let mean_f = self.sum / n;
        let variance_f = (self.sum_squared / n - mean_f * mean_f).max(0.0);
        let estimate = self.range() * mean_f;
        let std_error = self.range() * (variance_f / n).sqrt();

        let (error, relative_error) = match self.analytical {
            Some(reference) => {
                let (error, relative) = reference_errors(estimate, reference);
                (Some(error), relative)
            }
            None => (None, None),
        };

        Ok(Statistics::Integration(IntegralStatistics {
            core: Estimate::new(estimate, std_error),
            function_type: self.function,
            bounds: self.bounds(),
            analytical_result: self.analytical,
            error,
            relative_error,
        }))
    }

    fn visualization_data(&self, rng: &mut SimRng) -> Visualization {
        let x = linspace(self.params.lower_bound, self.params.upper_bound, CURVE_POINTS);
        let y = x.iter().map(|&v| self.function.eval(v)).collect();

        let stored = self.samples.as_slice();
        let sample_points = if stored.len() > MAX_DISPLAY_SAMPLES {
            rng.sample_indices(stored.len(), MAX_DISPLAY_SAMPLES)
                .into_iter()
                .map(|i| stored[i])
                .collect()
        } else {
            stored.to_vec()
        };

        Visualization::FunctionIntegration(IntegrationPlot {
            function_curve: Curve { x, y },
            sample_points,
            bounds: self.bounds(),
            shaded_area: true,
        })
    }

    fn parameters(&self) -> AlgorithmParams {
        AlgorithmParams::Integration(self.params.clone())
    }
}
