//! Standard normal distribution helpers built on `statrs` error functions.

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{PI, SQRT_2};

/// Standard normal CDF `Φ(x)`.
#[must_use]
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal quantile `Φ⁻¹(p)`; `±∞` at the endpoints.
#[must_use]
pub fn inverse_cdf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Normal density with the given mean and unit variance.
#[must_use]
pub fn pdf(x: f64, mean: f64) -> f64 {
    let z = x - mean;
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}
