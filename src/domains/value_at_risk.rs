//! Portfolio Value at Risk by simulating compounded daily returns.
//!
//! Annual parameters are converted with 252 trading days. Each trial
//! compounds `horizon` daily returns and records the loss
//! `value · (-cumulative_return)`. VaR is the confidence-level percentile of
//! the losses; its standard error and interval come from a bootstrap over the
//! entire loss sample, redone on every snapshot.

use rand_distr::StudentT;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::{reference_errors, BatchContext, Estimate, Estimator, Statistics, Visualization};
use crate::config::{AlgorithmParams, RiskParams};
use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};
use crate::stats::descriptive::{
    histogram, mean, percentile_sorted, population_std, sorted, Histogram,
};
use crate::stats::normal;

/// Trading days per year.
pub const TRADING_DAYS: f64 = 252.0;

/// Bootstrap resamples per statistics computation.
pub const BOOTSTRAP_RESAMPLES: usize = 1_000;

/// Most recent trials shown in the histograms.
pub const DISPLAY_WINDOW: usize = 5_000;

/// Histogram bins.
pub const HISTOGRAM_BINS: usize = 50;

/// Target length of the plotted return series.
pub const RETURN_SERIES_POINTS: usize = 1_000;

/// Degrees of freedom of the Student-t shocks.
const STUDENT_T_DOF: f64 = 5.0;

/// Probability of the calm regime in the mixture model.
const CALM_PROBABILITY: f64 = 0.95;

/// Daily drift penalty in the stressed regime.
const STRESS_DRIFT_PENALTY: f64 = 0.02;

/// Volatility multiplier in the stressed regime.
const STRESS_VOL_MULTIPLIER: f64 = 3.0;

/// Daily return model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnModel {
    /// Gaussian daily returns.
    Normal,
    /// Student-t shocks with 5 degrees of freedom, rescaled to unit variance.
    #[serde(rename = "t")]
    StudentT,
    /// 95% calm / 5% stressed normal mixture.
    Historical,
}

impl ReturnModel {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::StudentT => "t",
            Self::Historical => "historical",
        }
    }
}

impl FromStr for ReturnModel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "t" | "student-t" => Ok(Self::StudentT),
            "historical" | "mixture" => Ok(Self::Historical),
            other => Err(SimError::invalid_parameter(
                "distribution",
                format!("unknown return model '{other}'"),
            )),
        }
    }
}

impl fmt::Display for ReturnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampler behind a [`ReturnModel`].
#[derive(Debug, Clone)]
enum Shocks {
    Normal,
    StudentT { dist: StudentT<f64>, scale: f64 },
    Mixture,
}

/// Partial result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskBatch {
    /// Loss per trial, in trial order.
    pub losses: Vec<f64>,
}

/// Value at Risk statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskStatistics {
    /// Estimate block; the estimate is VaR with a bootstrap interval.
    #[serde(flatten)]
    pub core: Estimate,
    /// Mean loss strictly beyond VaR (VaR itself if none).
    pub expected_shortfall: f64,
    /// Mean horizon return, percent.
    pub mean_return: f64,
    /// Horizon return volatility, percent.
    pub volatility: f64,
    /// `mean_return / volatility`, 0 for zero volatility.
    pub sharpe_ratio: f64,
    /// Largest simulated loss.
    pub max_loss: f64,
    /// VaR confidence level.
    pub confidence_level: f64,
    /// Horizon in trading days.
    pub time_horizon: u32,
    /// Return model.
    pub distribution: ReturnModel,
    /// Closed-form VaR (normal model only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytical_var: Option<f64>,
    /// `|estimate - analytical_var|`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
    /// Percent error against the closed form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
}

/// Risk plot payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskPlot {
    /// Horizon returns of the last [`DISPLAY_WINDOW`] trials.
    pub returns_histogram: Histogram,
    /// Losses of the last [`DISPLAY_WINDOW`] trials.
    pub losses_histogram: Histogram,
    /// Every k-th return, about [`RETURN_SERIES_POINTS`] points.
    pub return_series: Vec<f64>,
    /// VaR over the display window.
    pub var_line: f64,
    /// Expected Shortfall over the display window.
    pub es_line: f64,
    /// VaR confidence level.
    pub confidence_level: f64,
    /// Portfolio value.
    pub portfolio_value: f64,
}

/// Value at Risk estimator.
#[derive(Debug, Clone)]
pub struct ValueAtRiskEstimator {
    params: RiskParams,
    model: ReturnModel,
    shocks: Shocks,
    daily_return: f64,
    daily_volatility: f64,
    analytical_var: Option<f64>,
    losses: Vec<f64>,
}

impl ValueAtRiskEstimator {
    /// Create an estimator.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for an unknown return model, a
    /// non-positive portfolio value, a zero horizon, or a confidence level
    /// outside `(0, 1)`.
    pub fn new(params: &RiskParams) -> SimResult<Self> {
        let model: ReturnModel = params.distribution.parse()?;
        if !(params.portfolio_value > 0.0 && params.portfolio_value.is_finite()) {
            return Err(SimError::invalid_parameter(
                "portfolio_value",
                "must be a positive finite amount",
            ));
        }
        if params.time_horizon == 0 {
            return Err(SimError::invalid_parameter("time_horizon", "must be at least 1 day"));
        }
        if !(params.confidence_level > 0.0 && params.confidence_level < 1.0) {
            return Err(SimError::invalid_parameter(
                "confidence_level",
                "must lie in (0, 1)",
            ));
        }

        let shocks = match model {
            ReturnModel::Normal => Shocks::Normal,
            ReturnModel::StudentT => Shocks::StudentT {
                dist: StudentT::new(STUDENT_T_DOF)
                    .map_err(|e| SimError::invalid_parameter("distribution", e.to_string()))?,
                scale: (STUDENT_T_DOF / (STUDENT_T_DOF - 2.0)).sqrt(),
            },
            ReturnModel::Historical => Shocks::Mixture,
        };

        let daily_return = params.expected_return / TRADING_DAYS;
        let daily_volatility = params.portfolio_volatility / TRADING_DAYS.sqrt();
        let horizon = f64::from(params.time_horizon);
        let analytical_var = (model == ReturnModel::Normal).then(|| {
            let z = normal::inverse_cdf(1.0 - params.confidence_level);
            let period_return = daily_return * horizon;
            let period_volatility = daily_volatility * horizon.sqrt();
            params.portfolio_value * (-period_return + period_volatility * (-z))
        });

        Ok(Self {
            params: params.clone(),
            model,
            shocks,
            daily_return,
            daily_volatility,
            analytical_var,
            losses: Vec::new(),
        })
    }

    fn var_percentile(&self) -> f64 {
        100.0 - (1.0 - self.params.confidence_level) * 100.0
    }

    fn horizon_return(&self, rng: &mut SimRng) -> f64 {
        let (mu, sigma) = match self.shocks {
            Shocks::Mixture if rng.gen_f64() >= CALM_PROBABILITY => (
                self.daily_return - STRESS_DRIFT_PENALTY,
                self.daily_volatility * STRESS_VOL_MULTIPLIER,
            ),
            _ => (self.daily_return, self.daily_volatility),
        };

        let mut growth = 1.0;
        for _ in 0..self.params.time_horizon {
            let daily = match &self.shocks {
                Shocks::StudentT { dist, scale } => mu + sigma * rng.sample(dist) / scale,
                Shocks::Normal | Shocks::Mixture => rng.gen_normal(mu, sigma),
            };
            growth *= 1.0 + daily;
        }
        growth - 1.0
    }

    /// Horizon return implied by a recorded loss.
    fn to_return(&self, loss: f64) -> f64 {
        -loss / self.params.portfolio_value
    }
}

/// VaR and Expected Shortfall of an ascending loss sample.
fn var_and_shortfall(sorted_losses: &[f64], q: f64) -> (f64, f64) {
    let var = percentile_sorted(sorted_losses, q);
    let tail: Vec<f64> = sorted_losses.iter().copied().filter(|&l| l > var).collect();
    let es = if tail.is_empty() { var } else { mean(&tail) };
    (var, es)
}

/// Percentile `q` of a resample given as multiplicities over a sorted base.
///
/// Equivalent to sorting the resample and interpolating, without the sort.
fn resample_percentile(sorted_base: &[f64], counts: &[u32], q: f64) -> f64 {
    let n: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    if n == 0 {
        return 0.0;
    }
    let rank = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo_rank = rank.floor() as u64;
    let hi_rank = rank.ceil() as u64;

    let mut lo = None;
    let mut hi = None;
    let mut seen = 0u64;
    for (value, &c) in sorted_base.iter().zip(counts) {
        seen += u64::from(c);
        if lo.is_none() && seen > lo_rank {
            lo = Some(*value);
        }
        if seen > hi_rank {
            hi = Some(*value);
            break;
        }
    }

    match (lo, hi) {
        (Some(lo), Some(hi)) => lo + (hi - lo) * (rank - lo_rank as f64),
        _ => 0.0,
    }
}

/// Bootstrap distribution of the percentile `q`.
fn bootstrap_percentiles(sorted_losses: &[f64], q: f64, rng: &mut SimRng) -> Vec<f64> {
    let n = sorted_losses.len();
    let mut counts = vec![0u32; n];
    (0..BOOTSTRAP_RESAMPLES)
        .map(|_| {
            counts.fill(0);
            for _ in 0..n {
                counts[rng.gen_index(n)] += 1;
            }
            resample_percentile(sorted_losses, &counts, q)
        })
        .collect()
}

impl Estimator for ValueAtRiskEstimator {
    type Contribution = RiskBatch;

    fn kind(&self) -> &'static str {
        "risk"
    }

    fn simulate_batch(&mut self, batch: BatchContext, rng: &mut SimRng) -> SimResult<RiskBatch> {
        let value = self.params.portfolio_value;
        let losses = (0..batch.size)
            .map(|_| value * -self.horizon_return(rng))
            .collect();
        Ok(RiskBatch { losses })
    }

    fn accumulate(&mut self, batch: RiskBatch) -> SimResult<()> {
        self.losses.extend(batch.losses);
        Ok(())
    }

    fn calculate_statistics(&self, rng: &mut SimRng) -> SimResult<Statistics> {
        if self.losses.is_empty() {
            return Ok(Statistics::Risk(RiskStatistics {
                core: Estimate::zero(),
                expected_shortfall: 0.0,
                mean_return: 0.0,
                volatility: 0.0,
                sharpe_ratio: 0.0,
                max_loss: 0.0,
                confidence_level: self.params.confidence_level,
                time_horizon: self.params.time_horizon,
                distribution: self.model,
                analytical_var: self.analytical_var,
                error: None,
                relative_error: None,
            }));
        }

        let q = self.var_percentile();
        let sorted_losses = sorted(&self.losses);
        let (var, expected_shortfall) = var_and_shortfall(&sorted_losses, q);

        let boot = bootstrap_percentiles(&sorted_losses, q, rng);
        let std_error = population_std(&boot);
        let boot_sorted = sorted(&boot);
        let lower_ci = percentile_sorted(&boot_sorted, 2.5);
        let upper_ci = percentile_sorted(&boot_sorted, 97.5);

        let returns: Vec<f64> = self.losses.iter().map(|&l| self.to_return(l)).collect();
        let mean_return = mean(&returns);
        let volatility = population_std(&returns);
        let sharpe_ratio = if volatility > 0.0 {
            mean_return / volatility
        } else {
            0.0
        };
        let max_loss = sorted_losses.last().copied().unwrap_or_default();

        let (error, relative_error) = match self.analytical_var {
            Some(reference) => {
                let (error, relative) = reference_errors(var, reference);
                (Some(error), relative)
            }
            None => (None, None),
        };

        Ok(Statistics::Risk(RiskStatistics {
            core: Estimate::with_interval(var, std_error, lower_ci, upper_ci),
            expected_shortfall,
            mean_return: mean_return * 100.0,
            volatility: volatility * 100.0,
            sharpe_ratio,
            max_loss,
            confidence_level: self.params.confidence_level,
            time_horizon: self.params.time_horizon,
            distribution: self.model,
            analytical_var: self.analytical_var,
            error,
            relative_error,
        }))
    }

    fn visualization_data(&self, _rng: &mut SimRng) -> Visualization {
        let window = &self.losses[self.losses.len().saturating_sub(DISPLAY_WINDOW)..];
        let window_returns: Vec<f64> = window.iter().map(|&l| self.to_return(l)).collect();
        let (var_line, es_line) = if window.is_empty() {
            (0.0, 0.0)
        } else {
            var_and_shortfall(&sorted(window), self.var_percentile())
        };

        let step = (self.losses.len() / RETURN_SERIES_POINTS).max(1);
        let return_series = self
            .losses
            .iter()
            .step_by(step)
            .map(|&l| self.to_return(l))
            .collect();

        Visualization::ValueAtRisk(RiskPlot {
            returns_histogram: histogram(&window_returns, HISTOGRAM_BINS, None),
            losses_histogram: histogram(window, HISTOGRAM_BINS, None),
            return_series,
            var_line,
            es_line,
            confidence_level: self.params.confidence_level,
            portfolio_value: self.params.portfolio_value,
        })
    }

    fn parameters(&self) -> AlgorithmParams {
        AlgorithmParams::Risk(self.params.clone())
    }
}
