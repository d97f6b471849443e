//! Effective sample size of an autocorrelated chain.
//!
//! Consecutive Metropolis-Hastings states are correlated, so `n` pooled
//! samples carry less information than `n` independent draws. The effective
//! sample size rescales `n` by the integrated autocorrelation time:
//!
//! ```text
//! ESS = n / (1 + 2 * Σ_{k≥1} ρ_k)
//! ```
//!
//! The sum is truncated at the first lag whose `|ρ_k|` falls below
//! [`ACF_CUTOFF`] (that lag is still included).

use super::descriptive::{mean, population_variance};

/// Truncation threshold for the autocorrelation sum.
pub const ACF_CUTOFF: f64 = 0.05;

/// Upper bound on the number of lags examined.
pub const MAX_LAG: usize = 1000;

/// Sample autocorrelation at `lag`, normalised by the population variance.
///
/// Lag 0 is exactly 1. Callers guarantee `variance > 0` and `lag < n`.
#[must_use]
pub fn autocorrelation(samples: &[f64], mean: f64, variance: f64, lag: usize) -> f64 {
    if lag == 0 {
        return 1.0;
    }
    let pairs = samples.len() - lag;
    let cov: f64 = samples[..pairs]
        .iter()
        .zip(&samples[lag..])
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum();
    cov / pairs as f64 / variance
}

/// Autocorrelation for lags `0..max_lag`; empty for a constant series.
#[must_use]
pub fn autocorrelation_function(samples: &[f64], max_lag: usize) -> Vec<f64> {
    let m = mean(samples);
    let var = population_variance(samples);
    if var <= 0.0 {
        return Vec::new();
    }
    (0..max_lag.min(samples.len()))
        .map(|lag| autocorrelation(samples, m, var, lag))
        .collect()
}

/// Effective sample size, in `[1, n]` for non-trivial input.
///
/// - fewer than 10 samples: `n` (too short to estimate correlation),
/// - zero variance: 1,
/// - non-positive autocorrelation sum: `n`.
#[must_use]
pub fn effective_sample_size(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 10 {
        return n as f64;
    }

    let m = mean(samples);
    let var = population_variance(samples);
    if var == 0.0 {
        return 1.0;
    }

    let max_lag = (n / 4).min(MAX_LAG);
    let mut acf_sum = 0.0;
    for lag in 1..max_lag {
        let rho = autocorrelation(samples, m, var, lag);
        acf_sum += rho;
        if rho.abs() < ACF_CUTOFF {
            break;
        }
    }

    let n = n as f64;
    let denom = 1.0 + 2.0 * acf_sum;
    let ess = if denom > 0.0 { n / denom } else { n };
    ess.min(n)
}
