//! Random-walk Metropolis-Hastings over a one-dimensional target density.
//!
//! The run loop executes `requested + burn_in` steps. Every state enters the
//! trace; only states after the burn-in enter the statistics pool. The
//! standard error of the pool mean is corrected for autocorrelation through
//! the effective sample size.

use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use super::{BatchContext, Curve, Estimate, Estimator, Statistics, Visualization};
use crate::config::{AlgorithmParams, ChainParams};
use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};
use crate::stats::accumulator::{Merge, TrailingWindow};
use crate::stats::descriptive::{
    histogram, linspace, mean, percentile_sorted, population_variance, sorted, trapezoid,
};
use crate::stats::ess::{autocorrelation_function, effective_sample_size};

/// States kept for the trace plot.
pub const TRACE_LENGTH: usize = 1_000;

/// Most recent pool samples shown in the histogram.
pub const DISPLAY_WINDOW: usize = 5_000;

/// Histogram bins.
pub const HISTOGRAM_BINS: usize = 50;

/// Largest lag in the autocorrelation plot.
pub const MAX_PLOT_LAG: usize = 50;

/// Grid points of the target density curve.
pub const DENSITY_POINTS: usize = 200;

/// Unnormalized target density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetDensity {
    /// `exp(-x²/2)`.
    Normal,
    /// `x e^{-x}` on `x > 0`, shape of Gamma(2, 1).
    Gamma,
    /// `30 x²(1-x)²` on `(0, 1)`, Beta(3, 3).
    Beta,
    /// Equal mixture of unit normals at ±2.
    Bimodal,
    /// Standard Cauchy.
    Cauchy,
    /// `e^{-x}` on `x > 0`.
    Exponential,
}

impl TargetDensity {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Gamma => "gamma",
            Self::Beta => "beta",
            Self::Bimodal => "bimodal",
            Self::Cauchy => "cauchy",
            Self::Exponential => "exponential",
        }
    }

    /// Density at `x`, zero outside the support.
    #[must_use]
    pub fn density(self, x: f64) -> f64 {
        match self {
            Self::Normal => (-0.5 * x * x).exp(),
            Self::Gamma if x > 0.0 => x * (-x).exp(),
            Self::Beta if x > 0.0 && x < 1.0 => 30.0 * x * x * (1.0 - x) * (1.0 - x),
            Self::Bimodal => {
                0.5 * (-0.5 * (x - 2.0).powi(2)).exp() + 0.5 * (-0.5 * (x + 2.0).powi(2)).exp()
            }
            Self::Cauchy => 1.0 / (PI * (1.0 + x * x)),
            Self::Exponential if x > 0.0 => (-x).exp(),
            Self::Gamma | Self::Beta | Self::Exponential => 0.0,
        }
    }

    /// Closed-form `(mean, variance)`; `None` for Cauchy.
    #[must_use]
    pub const fn moments(self) -> Option<(f64, f64)> {
        match self {
            Self::Normal => Some((0.0, 1.0)),
            Self::Gamma => Some((2.0, 2.0)),
            Self::Beta => Some((0.5, 1.0 / 28.0)),
            Self::Bimodal => Some((0.0, 5.0)),
            Self::Cauchy => None,
            Self::Exponential => Some((1.0, 1.0)),
        }
    }
}

impl FromStr for TargetDensity {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "gamma" => Ok(Self::Gamma),
            "beta" => Ok(Self::Beta),
            "bimodal" => Ok(Self::Bimodal),
            "cauchy" => Ok(Self::Cauchy),
            "exponential" => Ok(Self::Exponential),
            other => Err(SimError::invalid_parameter(
                "distribution_type",
                format!("unknown target density '{other}'"),
            )),
        }
    }
}

impl fmt::Display for TargetDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metropolis acceptance probability for a symmetric proposal.
///
/// From a zero-density state any move into the support is accepted.
#[must_use]
pub(crate) fn acceptance_ratio(current_density: f64, proposed_density: f64) -> f64 {
    if current_density > 0.0 {
        proposed_density / current_density
    } else if proposed_density > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Partial result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainBatch {
    /// Post-burn-in states.
    pub samples: Vec<f64>,
    /// Accepted proposals.
    pub accepted: u64,
    /// Proposals made.
    pub proposed: u64,
    /// Every state visited, in order.
    pub states: Vec<f64>,
}

/// Pool percentiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Percentiles {
    #[serde(rename = "2.5%")]
    pub p2_5: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    #[serde(rename = "97.5%")]
    pub p97_5: f64,
}

/// Chain statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStatistics {
    /// Estimate block; the estimate is the pool mean.
    #[serde(flatten)]
    pub core: Estimate,
    /// Population variance of the pool.
    pub variance: f64,
    /// Accepted over proposed, over all steps including burn-in.
    pub acceptance_rate: f64,
    /// Autocorrelation-corrected pool size.
    pub effective_sample_size: f64,
    /// Pool size.
    pub actual_sample_size: u64,
    /// Pool percentiles.
    pub percentiles: Percentiles,
    /// Target density.
    pub distribution_type: TargetDensity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theoretical_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theoretical_variance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_error: Option<f64>,
}

/// One autocorrelation plot point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LagPoint {
    pub lag: usize,
    pub acf: f64,
}

/// Chain plot payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainPlot {
    /// Density histogram of the recent pool: bin centers and densities.
    pub histogram: Curve,
    /// Last [`TRACE_LENGTH`] states.
    pub trace_plot: Vec<f64>,
    /// Autocorrelation of the recent pool.
    pub autocorrelation: Vec<LagPoint>,
    /// Normalized target density over the observed range.
    pub target_density: Curve,
    pub acceptance_rate: f64,
    pub current_state: f64,
}

/// Metropolis-Hastings estimator.
#[derive(Debug, Clone)]
pub struct MetropolisHastingsEstimator {
    params: ChainParams,
    target: TargetDensity,
    current: f64,
    accepted: u64,
    proposed: u64,
    samples: Vec<f64>,
    trace: TrailingWindow<f64>,
}

impl MetropolisHastingsEstimator {
    /// Create a chain at `params.initial_value`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for an unknown target density
    /// or a non-positive step size.
    pub fn new(params: &ChainParams) -> SimResult<Self> {
        let target: TargetDensity = params.distribution_type.parse()?;
        if !(params.step_size > 0.0 && params.step_size.is_finite()) {
            return Err(SimError::invalid_parameter(
                "step_size",
                "must be positive and finite",
            ));
        }
        Ok(Self {
            params: params.clone(),
            target,
            current: params.initial_value,
            accepted: 0,
            proposed: 0,
            samples: Vec::new(),
            trace: TrailingWindow::new(TRACE_LENGTH),
        })
    }

    /// Current chain state.
    #[must_use]
    pub const fn current_state(&self) -> f64 {
        self.current
    }

    fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    fn recent_samples(&self) -> &[f64] {
        &self.samples[self.samples.len().saturating_sub(DISPLAY_WINDOW)..]
    }

    fn target_curve(&self, window: &[f64]) -> Curve {
        let lo = window.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let x = linspace(lo - 1.0, hi + 1.0, DENSITY_POINTS);
        let mut y: Vec<f64> = x.iter().map(|&v| self.target.density(v)).collect();

        if y.iter().copied().fold(0.0, f64::max) > 0.0 {
            let norm = trapezoid(&y, &x);
            if norm > 0.0 {
                y.iter_mut().for_each(|v| *v /= norm);
            }
        }
        Curve { x, y }
    }
}

impl Estimator for MetropolisHastingsEstimator {
    type Contribution = ChainBatch;

    fn kind(&self) -> &'static str {
        "markov"
    }

    fn total_trials(&self, requested: u64) -> u64 {
        requested.saturating_add(self.params.burn_in)
    }

    fn simulate_batch(&mut self, batch: BatchContext, rng: &mut SimRng) -> SimResult<ChainBatch> {
        let n = batch.size as usize;
        let mut states = Vec::with_capacity(n);
        let mut samples = Vec::new();
        let mut accepted = 0;

        for i in 0..batch.size {
            let proposal = self.current + rng.gen_normal(0.0, self.params.step_size);
            let ratio = acceptance_ratio(
                self.target.density(self.current),
                self.target.density(proposal),
            );
            if rng.gen_f64() < ratio {
                self.current = proposal;
                accepted += 1;
            }

            states.push(self.current);
            if batch.iteration + i + 1 > self.params.burn_in {
                samples.push(self.current);
            }
        }

        Ok(ChainBatch {
            samples,
            accepted,
            proposed: batch.size,
            states,
        })
    }

    fn accumulate(&mut self, batch: ChainBatch) -> SimResult<()> {
        self.samples.extend(batch.samples);
        self.accepted.merge(batch.accepted);
        self.proposed.merge(batch.proposed);
        self.trace.merge(batch.states);
        Ok(())
    }

    fn calculate_statistics(&self, _rng: &mut SimRng) -> SimResult<Statistics> {
        let moments = self.target.moments();
        if self.samples.is_empty() {
            return Ok(Statistics::Markov(ChainStatistics {
                core: Estimate::zero(),
                variance: 0.0,
                acceptance_rate: 0.0,
                effective_sample_size: 0.0,
                actual_sample_size: 0,
                percentiles: Percentiles::default(),
                distribution_type: self.target,
                theoretical_mean: None,
                mean_error: None,
                theoretical_variance: None,
                variance_error: None,
            }));
        }

        let m = mean(&self.samples);
        let variance = population_variance(&self.samples);
        let ess = effective_sample_size(&self.samples);
        let std_error = if ess > 0.0 {
            (variance / ess).sqrt()
        } else {
            f64::INFINITY
        };

        let pool = sorted(&self.samples);
        let percentiles = Percentiles {
            p2_5: percentile_sorted(&pool, 2.5),
            p25: percentile_sorted(&pool, 25.0),
            p50: percentile_sorted(&pool, 50.0),
            p75: percentile_sorted(&pool, 75.0),
            p97_5: percentile_sorted(&pool, 97.5),
        };

        Ok(Statistics::Markov(ChainStatistics {
            core: Estimate::new(m, std_error),
            variance,
            acceptance_rate: self.acceptance_rate(),
            effective_sample_size: ess,
            actual_sample_size: self.samples.len() as u64,
            percentiles,
            distribution_type: self.target,
            theoretical_mean: moments.map(|(mu, _)| mu),
            mean_error: moments.map(|(mu, _)| (m - mu).abs()),
            theoretical_variance: moments.map(|(_, var)| var),
            variance_error: moments.map(|(_, var)| (variance - var).abs()),
        }))
    }

    fn visualization_data(&self, _rng: &mut SimRng) -> Visualization {
        let window = self.recent_samples();
        let trace_plot = self.trace.iter().copied().collect();

        if window.is_empty() {
            return Visualization::MarkovChain(ChainPlot {
                histogram: Curve::default(),
                trace_plot,
                autocorrelation: Vec::new(),
                target_density: Curve::default(),
                acceptance_rate: self.acceptance_rate(),
                current_state: self.current,
            });
        }

        let hist = histogram(window, HISTOGRAM_BINS, None);
        let autocorrelation = if window.len() > 20 {
            autocorrelation_function(window, MAX_PLOT_LAG.min(window.len() / 2))
                .into_iter()
                .enumerate()
                .map(|(lag, acf)| LagPoint { lag, acf })
                .collect()
        } else {
            Vec::new()
        };

        Visualization::MarkovChain(ChainPlot {
            histogram: Curve {
                y: hist.density(),
                x: hist.bins,
            },
            trace_plot,
            autocorrelation,
            target_density: self.target_curve(window),
            acceptance_rate: self.acceptance_rate(),
            current_state: self.current,
        })
    }

    fn parameters(&self) -> AlgorithmParams {
        AlgorithmParams::Markov(self.params.clone())
    }
}
