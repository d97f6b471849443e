//! Run configuration with YAML loading and validation.
//!
//! Implements Poka-Yoke (mistake-proofing) through:
//! - Type-safe configuration structs
//! - Range checks via `validator`
//! - Semantic validation of the algorithm parameters
//!
//! Named choices (integrand, option type, test type, return model, target
//! density) are kept as strings here and parsed when the estimator is
//! constructed, so an unknown name surfaces as
//! [`SimError::InvalidParameter`] before any batch runs.

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::{SimError, SimResult};

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Requested number of trials.
    #[validate(range(min = 1))]
    #[serde(default = "default_n_simulations")]
    pub n_simulations: u64,

    /// Trials per batch; capped at the total when the run starts.
    #[validate(range(min = 1))]
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Emit a snapshot whenever the iteration count is a multiple of this.
    #[validate(range(min = 1))]
    #[serde(default = "default_update_frequency")]
    pub update_frequency: u64,

    /// RNG seed; `None` draws one from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Algorithm and its parameters.
    #[serde(default)]
    pub algorithm: AlgorithmParams,
}

const fn default_n_simulations() -> u64 {
    10_000
}

const fn default_batch_size() -> u64 {
    1_000
}

const fn default_update_frequency() -> u64 {
    1_000
}

impl SimulationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> SimResult<String> {
        serde_yaml::to_string(self).map_err(|e| SimError::serialization(e.to_string()))
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Run schema and semantic validation.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Validation`] for out-of-range fields.
    pub fn check(&self) -> SimResult<()> {
        self.validate()?;
        self.algorithm.validate_params()
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_simulations: default_n_simulations(),
            batch_size: default_batch_size(),
            update_frequency: default_update_frequency(),
            seed: None,
            algorithm: AlgorithmParams::default(),
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct SimulationConfigBuilder {
    n_simulations: Option<u64>,
    batch_size: Option<u64>,
    update_frequency: Option<u64>,
    seed: Option<u64>,
    algorithm: Option<AlgorithmParams>,
}

impl SimulationConfigBuilder {
    /// Set the number of trials.
    #[must_use]
    pub const fn n_simulations(mut self, n: u64) -> Self {
        self.n_simulations = Some(n);
        self
    }

    /// Set the batch size.
    #[must_use]
    pub const fn batch_size(mut self, size: u64) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the update frequency.
    #[must_use]
    pub const fn update_frequency(mut self, every: u64) -> Self {
        self.update_frequency = Some(every);
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the algorithm parameters.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // AlgorithmParams holds Strings
    pub fn algorithm(mut self, params: AlgorithmParams) -> Self {
        self.algorithm = Some(params);
        self
    }

    /// Build the configuration; unset fields take their defaults.
    #[must_use]
    pub fn build(self) -> SimulationConfig {
        let mut config = SimulationConfig::default();

        if let Some(n) = self.n_simulations {
            config.n_simulations = n;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(every) = self.update_frequency {
            config.update_frequency = every;
        }
        config.seed = self.seed;
        if let Some(params) = self.algorithm {
            config.algorithm = params;
        }
        config
    }
}

/// Algorithm selection, tagged by `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AlgorithmParams {
    /// Estimate pi from points in the unit square.
    #[default]
    Pi,
    /// Definite integral of a named function.
    Integration(IntegralParams),
    /// European option under Black-Scholes dynamics.
    OptionPricing(OptionParams),
    /// Power of a one-sample z-test.
    Hypothesis(HypothesisParams),
    /// Portfolio Value at Risk.
    Risk(RiskParams),
    /// Metropolis-Hastings sampling of a target density.
    Markov(ChainParams),
}

impl AlgorithmParams {
    /// Short name used in logs and on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pi => "pi",
            Self::Integration(_) => "integration",
            Self::OptionPricing(_) => "option-pricing",
            Self::Hypothesis(_) => "hypothesis",
            Self::Risk(_) => "risk",
            Self::Markov(_) => "markov",
        }
    }

    /// Validate the numeric ranges of the selected parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Validation`] for out-of-range fields.
    pub fn validate_params(&self) -> SimResult<()> {
        match self {
            Self::Pi => Ok(()),
            Self::Integration(p) => {
                p.validate()?;
                if !(p.lower_bound.is_finite() && p.upper_bound.is_finite()) {
                    return Err(SimError::invalid_parameter(
                        "bounds",
                        "integration bounds must be finite",
                    ));
                }
                Ok(())
            }
            Self::OptionPricing(p) => Ok(p.validate()?),
            Self::Hypothesis(p) => Ok(p.validate()?),
            Self::Risk(p) => Ok(p.validate()?),
            Self::Markov(p) => Ok(p.validate()?),
        }
    }
}

/// Parameters of the integral estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IntegralParams {
    /// Integrand name: gaussian, sine, polynomial, exponential, reciprocal.
    pub function_type: String,
    /// Lower integration bound.
    pub lower_bound: f64,
    /// Upper integration bound.
    pub upper_bound: f64,
}

impl Default for IntegralParams {
    fn default() -> Self {
        Self {
            function_type: "gaussian".to_string(),
            lower_bound: -2.0,
            upper_bound: 2.0,
        }
    }
}

/// Parameters of the option pricing estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OptionParams {
    /// Spot price `S0`.
    #[validate(range(exclusive_min = 0.0))]
    pub stock_price: f64,
    /// Strike `K`.
    #[validate(range(exclusive_min = 0.0))]
    pub strike_price: f64,
    /// Annualised volatility `sigma`.
    #[validate(range(exclusive_min = 0.0))]
    pub volatility: f64,
    /// Continuously compounded risk-free rate `r`.
    pub risk_free_rate: f64,
    /// Time to maturity `T` in years.
    #[validate(range(exclusive_min = 0.0))]
    pub time_to_maturity: f64,
    /// `call` or `put`.
    pub option_type: String,
}

impl Default for OptionParams {
    fn default() -> Self {
        Self {
            stock_price: 100.0,
            strike_price: 110.0,
            volatility: 0.2,
            risk_free_rate: 0.05,
            time_to_maturity: 1.0,
            option_type: "call".to_string(),
        }
    }
}

/// Parameters of the hypothesis power estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HypothesisParams {
    /// Mean under the null hypothesis.
    pub null_mean: f64,
    /// True mean the observations are drawn from.
    pub alt_mean: f64,
    /// Known population standard deviation.
    #[validate(range(exclusive_min = 0.0))]
    pub std_dev: f64,
    /// Observations per simulated test.
    #[validate(range(min = 1))]
    pub sample_size: u32,
    /// Significance level.
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub alpha: f64,
    /// `two-sided`, `right-tailed` or `left-tailed`.
    pub test_type: String,
}

impl Default for HypothesisParams {
    fn default() -> Self {
        Self {
            null_mean: 0.0,
            alt_mean: 0.5,
            std_dev: 1.0,
            sample_size: 30,
            alpha: 0.05,
            test_type: "two-sided".to_string(),
        }
    }
}

/// Parameters of the Value at Risk estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RiskParams {
    /// Portfolio value today.
    #[validate(range(exclusive_min = 0.0))]
    pub portfolio_value: f64,
    /// Expected annual return.
    pub expected_return: f64,
    /// Annual volatility.
    #[validate(range(min = 0.0))]
    pub portfolio_volatility: f64,
    /// Horizon in trading days.
    #[validate(range(min = 1))]
    pub time_horizon: u32,
    /// VaR confidence level.
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub confidence_level: f64,
    /// Return model: `normal`, `t` or `historical`.
    pub distribution: String,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            portfolio_value: 1_000_000.0,
            expected_return: 0.08,
            portfolio_volatility: 0.15,
            time_horizon: 10,
            confidence_level: 0.95,
            distribution: "normal".to_string(),
        }
    }
}

/// Parameters of the Metropolis-Hastings sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ChainParams {
    /// Target density name.
    pub distribution_type: String,
    /// Steps discarded before samples are pooled.
    pub burn_in: u64,
    /// Standard deviation of the random-walk proposal.
    #[validate(range(exclusive_min = 0.0))]
    pub step_size: f64,
    /// Starting state of the chain.
    pub initial_value: f64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            distribution_type: "normal".to_string(),
            burn_in: 1_000,
            step_size: 0.5,
            initial_value: 0.0,
        }
    }
}
