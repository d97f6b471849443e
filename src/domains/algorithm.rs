//! Closed set of estimators selected by configuration.

use super::hypothesis_power::{HypothesisBatch, HypothesisPowerEstimator};
use super::integral::{IntegralBatch, IntegralEstimator};
use super::metropolis_hastings::{ChainBatch, MetropolisHastingsEstimator};
use super::option_pricing::{OptionBatch, OptionPricingEstimator};
use super::pi::{PiBatch, PiEstimator};
use super::value_at_risk::{RiskBatch, ValueAtRiskEstimator};
use super::{BatchContext, Estimator, Statistics, Visualization};
use crate::config::AlgorithmParams;
use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};

/// Estimator chosen by [`AlgorithmParams`].
#[derive(Debug, Clone)]
pub enum Algorithm {
    Pi(PiEstimator),
    Integration(IntegralEstimator),
    OptionPricing(OptionPricingEstimator),
    Hypothesis(HypothesisPowerEstimator),
    Risk(ValueAtRiskEstimator),
    Markov(MetropolisHastingsEstimator),
}

/// Batch contribution of any [`Algorithm`].
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    Pi(PiBatch),
    Integration(IntegralBatch),
    OptionPricing(OptionBatch),
    Hypothesis(HypothesisBatch),
    Risk(RiskBatch),
    Markov(ChainBatch),
}

impl Contribution {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Pi(_) => "pi",
            Self::Integration(_) => "integration",
            Self::OptionPricing(_) => "option-pricing",
            Self::Hypothesis(_) => "hypothesis",
            Self::Risk(_) => "risk",
            Self::Markov(_) => "markov",
        }
    }
}

impl Algorithm {
    /// Build the estimator for a parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for unknown names or
    /// out-of-range values; no batch runs in that case.
    pub fn from_params(params: &AlgorithmParams) -> SimResult<Self> {
        Ok(match params {
            AlgorithmParams::Pi => Self::Pi(PiEstimator::new()),
            AlgorithmParams::Integration(p) => Self::Integration(IntegralEstimator::new(p)?),
            AlgorithmParams::OptionPricing(p) => {
                Self::OptionPricing(OptionPricingEstimator::new(p)?)
            }
            AlgorithmParams::Hypothesis(p) => Self::Hypothesis(HypothesisPowerEstimator::new(p)?),
            AlgorithmParams::Risk(p) => Self::Risk(ValueAtRiskEstimator::new(p)?),
            AlgorithmParams::Markov(p) => Self::Markov(MetropolisHastingsEstimator::new(p)?),
        })
    }
}

/// Forward a call to whichever estimator is selected.
macro_rules! dispatch {
    ($self:expr, $est:ident => $body:expr) => {
        match $self {
            Algorithm::Pi($est) => $body,
            Algorithm::Integration($est) => $body,
            Algorithm::OptionPricing($est) => $body,
            Algorithm::Hypothesis($est) => $body,
            Algorithm::Risk($est) => $body,
            Algorithm::Markov($est) => $body,
        }
    };
}

impl Estimator for Algorithm {
    type Contribution = Contribution;

    fn kind(&self) -> &'static str {
        dispatch!(self, e => e.kind())
    }

    fn total_trials(&self, requested: u64) -> u64 {
        dispatch!(self, e => e.total_trials(requested))
    }

    fn simulate_batch(
        &mut self,
        batch: BatchContext,
        rng: &mut SimRng,
    ) -> SimResult<Contribution> {
        Ok(match self {
            Self::Pi(e) => Contribution::Pi(e.simulate_batch(batch, rng)?),
            Self::Integration(e) => Contribution::Integration(e.simulate_batch(batch, rng)?),
            Self::OptionPricing(e) => Contribution::OptionPricing(e.simulate_batch(batch, rng)?),
            Self::Hypothesis(e) => Contribution::Hypothesis(e.simulate_batch(batch, rng)?),
            Self::Risk(e) => Contribution::Risk(e.simulate_batch(batch, rng)?),
            Self::Markov(e) => Contribution::Markov(e.simulate_batch(batch, rng)?),
        })
    }

    fn accumulate(&mut self, contribution: Contribution) -> SimResult<()> {
        match (self, contribution) {
            (Self::Pi(e), Contribution::Pi(c)) => e.accumulate(c),
            (Self::Integration(e), Contribution::Integration(c)) => e.accumulate(c),
            (Self::OptionPricing(e), Contribution::OptionPricing(c)) => e.accumulate(c),
            (Self::Hypothesis(e), Contribution::Hypothesis(c)) => e.accumulate(c),
            (Self::Risk(e), Contribution::Risk(c)) => e.accumulate(c),
            (Self::Markov(e), Contribution::Markov(c)) => e.accumulate(c),
            (estimator, c) => Err(SimError::config(format!(
                "{} contribution cannot merge into a {} estimator",
                c.kind(),
                estimator.kind()
            ))),
        }
    }

    fn calculate_statistics(&self, rng: &mut SimRng) -> SimResult<Statistics> {
        dispatch!(self, e => e.calculate_statistics(rng))
    }

    fn visualization_data(&self, rng: &mut SimRng) -> Visualization {
        dispatch!(self, e => e.visualization_data(rng))
    }

    fn parameters(&self) -> AlgorithmParams {
        dispatch!(self, e => e.parameters())
    }
}
