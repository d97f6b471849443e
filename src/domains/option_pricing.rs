//! European option pricing under Black-Scholes dynamics.
//!
//! The terminal price is sampled exactly,
//!
//! ```text
//! S_T = S0 · exp((r - σ²/2)T + σ√T · Z),   Z ~ N(0, 1)
//! ```
//!
//! and the price estimate is the mean discounted payoff. The closed-form
//! Black-Scholes price is computed once at construction for comparison.
//!
//! Display paths are simulated separately on a 50-step grid and never feed
//! the estimate.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::{reference_errors, BatchContext, Estimate, Estimator, Statistics, Visualization};
use crate::config::{AlgorithmParams, OptionParams};
use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};
use crate::stats::accumulator::{CappedSeries, Merge};
use crate::stats::descriptive::{histogram, linspace, Histogram};
use crate::stats::normal;

/// Hard cap on retained display paths.
pub const MAX_STORED_PATHS: usize = 100;

/// Display paths simulated per batch.
pub const PATHS_PER_BATCH: usize = 10;

/// Display paths handed to the plot.
pub const MAX_DISPLAY_PATHS: usize = 50;

/// Time steps of a display path.
pub const PATH_STEPS: usize = 50;

/// Bins of the display-path payoff histogram.
pub const PAYOFF_BINS: usize = 20;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Right to buy at the strike.
    Call,
    /// Right to sell at the strike.
    Put,
}

impl OptionType {
    /// Payoff at expiry for terminal price `s`.
    #[must_use]
    pub fn payoff(self, s: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (s - strike).max(0.0),
            Self::Put => (strike - s).max(0.0),
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl FromStr for OptionType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            _ => Err(SimError::invalid_parameter(
                "option_type",
                format!("unknown option type '{s}'"),
            )),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed-form Black-Scholes price of a European option.
#[must_use]
pub fn black_scholes_price(params: &OptionParams, option_type: OptionType) -> f64 {
    let OptionParams {
        stock_price: s,
        strike_price: k,
        volatility: sigma,
        risk_free_rate: r,
        time_to_maturity: t,
        ..
    } = *params;

    let vol_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / vol_sqrt_t;
    let d2 = d1 - vol_sqrt_t;
    let discounted_strike = k * (-r * t).exp();

    match option_type {
        OptionType::Call => s * normal::cdf(d1) - discounted_strike * normal::cdf(d2),
        OptionType::Put => discounted_strike * normal::cdf(-d2) - s * normal::cdf(-d1),
    }
}

/// One display path on the `[0, T]` grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePath {
    /// Grid times, `PATH_STEPS + 1` points.
    pub times: Vec<f64>,
    /// Prices at the grid times.
    pub prices: Vec<f64>,
    /// Undiscounted payoff at the last price.
    pub final_payoff: f64,
}

/// Partial result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionBatch {
    /// `Σ` discounted payoff.
    pub payoff_sum: f64,
    /// `Σ` discounted payoff².
    pub payoff_sum_squared: f64,
    /// Terminal prices sampled.
    pub count: u64,
    /// Display paths.
    pub paths: Vec<SamplePath>,
}

/// Option pricing statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionStatistics {
    /// Estimate block.
    #[serde(flatten)]
    pub core: Estimate,
    /// Black-Scholes price.
    pub analytical_price: f64,
    /// `|estimate - analytical_price|`.
    pub error: f64,
    /// Percent error; absent when the closed form is not positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
    /// Call or put.
    pub option_type: OptionType,
}

/// Path plot payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathPlot {
    /// First [`MAX_DISPLAY_PATHS`] retained paths.
    pub paths: Vec<SamplePath>,
    /// Strike `K`.
    pub strike_price: f64,
    /// Spot `S0`.
    pub initial_price: f64,
    /// Payoff histogram over the retained paths.
    pub payoff_distribution: Histogram,
}

/// Option pricing estimator.
#[derive(Debug, Clone)]
pub struct OptionPricingEstimator {
    params: OptionParams,
    option_type: OptionType,
    discount_factor: f64,
    drift: f64,
    diffusion: f64,
    analytical_price: f64,
    payoff_sum: f64,
    payoff_sum_squared: f64,
    count: u64,
    paths: CappedSeries<SamplePath>,
}

impl OptionPricingEstimator {
    /// Create an estimator.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for an unknown option type or a
    /// non-positive price, strike, volatility or maturity.
    pub fn new(params: &OptionParams) -> SimResult<Self> {
        let option_type: OptionType = params.option_type.parse()?;
        for (name, value) in [
            ("stock_price", params.stock_price),
            ("strike_price", params.strike_price),
            ("volatility", params.volatility),
            ("time_to_maturity", params.time_to_maturity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::invalid_parameter(
                    name,
                    format!("must be positive, got {value}"),
                ));
            }
        }

        let (sigma, r, t) = (params.volatility, params.risk_free_rate, params.time_to_maturity);
        Ok(Self {
            params: params.clone(),
            option_type,
            discount_factor: (-r * t).exp(),
            drift: (r - 0.5 * sigma * sigma) * t,
            diffusion: sigma * t.sqrt(),
            analytical_price: black_scholes_price(params, option_type),
            payoff_sum: 0.0,
            payoff_sum_squared: 0.0,
            count: 0,
            paths: CappedSeries::new(MAX_STORED_PATHS),
        })
    }

    /// Closed-form reference price.
    #[must_use]
    pub const fn analytical_price(&self) -> f64 {
        self.analytical_price
    }

    fn display_path(&self, times: &[f64], rng: &mut SimRng) -> SamplePath {
        let sigma = self.params.volatility;
        let dt = self.params.time_to_maturity / PATH_STEPS as f64;
        let step_drift = (self.params.risk_free_rate - 0.5 * sigma * sigma) * dt;
        let step_vol = sigma * dt.sqrt();

        let mut s = self.params.stock_price;
        let mut prices = Vec::with_capacity(PATH_STEPS + 1);
        prices.push(s);
        for _ in 0..PATH_STEPS {
            s *= (step_drift + step_vol * rng.gen_standard_normal()).exp();
            prices.push(s);
        }

        SamplePath {
            times: times.to_vec(),
            final_payoff: self.option_type.payoff(s, self.params.strike_price),
            prices,
        }
    }
}

impl Estimator for OptionPricingEstimator {
    type Contribution = OptionBatch;

    fn kind(&self) -> &'static str {
        "option-pricing"
    }

    fn simulate_batch(&mut self, batch: BatchContext, rng: &mut SimRng) -> SimResult<OptionBatch> {
        let strike = self.params.strike_price;
        let mut payoff_sum = 0.0;
        let mut payoff_sum_squared = 0.0;
        for _ in 0..batch.size {
            let z = rng.gen_standard_normal();
            let s_t = self.params.stock_price * (self.drift + self.diffusion * z).exp();
            let discounted = self.option_type.payoff(s_t, strike) * self.discount_factor;
            payoff_sum += discounted;
            payoff_sum_squared += discounted * discounted;
        }

        let n_paths = PATHS_PER_BATCH
            .min(batch.size as usize)
            .min(self.paths.remaining());
        let times = linspace(0.0, self.params.time_to_maturity, PATH_STEPS + 1);
        let paths = (0..n_paths)
            .map(|_| self.display_path(&times, rng))
            .collect();

        Ok(OptionBatch {
            payoff_sum,
            payoff_sum_squared,
            count: batch.size,
            paths,
        })
    }

    fn accumulate(&mut self, batch: OptionBatch) -> SimResult<()> {
        self.payoff_sum.merge(batch.payoff_sum);
        self.payoff_sum_squared.merge(batch.payoff_sum_squared);
        self.count.merge(batch.count);
        self.paths.merge(batch.paths);
        Ok(())
    }

    fn calculate_statistics(&self, _rng: &mut SimRng) -> SimResult<Statistics> {
        if self.count == 0 {
            return Ok(Statistics::OptionPricing(OptionStatistics {
                core: Estimate::zero(),
                analytical_price: self.analytical_price,
                error: 0.0,
                relative_error: None,
                option_type: self.option_type,
            }));
        }

        let n = self.count as f64;
        let estimate = self.payoff_sum / n;
        let variance = (self.payoff_sum_squared / n - estimate * estimate).max(0.0);
        let std_error = (variance / n).sqrt();

        let (error, relative) = reference_errors(estimate, self.analytical_price);
        let relative_error = relative.filter(|_| self.analytical_price > 0.0);

        Ok(Statistics::OptionPricing(OptionStatistics {
            core: Estimate::new(estimate, std_error),
            analytical_price: self.analytical_price,
            error,
            relative_error,
            option_type: self.option_type,
        }))
    }

    fn visualization_data(&self, _rng: &mut SimRng) -> Visualization {
        let stored = self.paths.as_slice();
        let payoffs: Vec<f64> = stored.iter().map(|p| p.final_payoff).collect();

        Visualization::Paths(PathPlot {
            paths: stored.iter().take(MAX_DISPLAY_PATHS).cloned().collect(),
            strike_price: self.params.strike_price,
            initial_price: self.params.stock_price,
            payoff_distribution: histogram(&payoffs, PAYOFF_BINS, None),
        })
    }

    fn parameters(&self) -> AlgorithmParams {
        AlgorithmParams::OptionPricing(self.params.clone())
    }
}
