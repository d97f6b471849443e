//! Descriptive statistics over plain `f64` slices.
//!
//! Percentiles use linear interpolation between closest ranks, histograms use
//! equal-width bins with the last bin closed on the right.

use serde::{Deserialize, Serialize};

/// Arithmetic mean; 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`); 0 for an empty slice.
#[must_use]
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
#[must_use]
pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Sort a copy of `values` ascending (NaN last).
#[must_use]
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_unstable_by(f64::total_cmp);
    out
}

/// Percentile `q` (0..=100) of an ascending slice.
///
/// Returns 0 for an empty slice.
#[must_use]
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Percentile `q` (0..=100) of unsorted values.
#[must_use]
pub fn percentile(values: &[f64], q: f64) -> f64 {
    percentile_sorted(&sorted(values), q)
}

/// Equal-width histogram reported by bin centres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin centres.
    pub bins: Vec<f64>,
    /// Observations per bin.
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Counts normalised so the histogram integrates to one.
    #[must_use]
    pub fn density(&self) -> Vec<f64> {
        let total: u64 = self.counts.iter().sum();
        let width = match self.bins.as_slice() {
            [a, b, ..] => b - a,
            _ => 1.0,
        };
        if total == 0 || width <= 0.0 {
            return vec![0.0; self.counts.len()];
        }
        let norm = total as f64 * width;
        self.counts.iter().map(|&c| c as f64 / norm).collect()
    }

    /// True if no bins were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Histogram of `values` over `n_bins` equal-width bins.
///
/// Without an explicit `range` the data range is used; a degenerate range
/// `min == max` widens to `[min - 0.5, max + 0.5]`. Values outside the range
/// and non-finite values are ignored. An empty input gives an empty
/// histogram.
#[must_use]
pub fn histogram(values: &[f64], n_bins: usize, range: Option<(f64, f64)>) -> Histogram {
    let finite = || values.iter().copied().filter(|v| v.is_finite());
    if n_bins == 0 || finite().next().is_none() {
        return Histogram::default();
    }

    let (mut lo, mut hi) = range.unwrap_or_else(|| {
        finite().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / n_bins as f64;
    let mut counts = vec![0u64; n_bins];
    for v in finite().filter(|v| (lo..=hi).contains(v)) {
        let idx = (((v - lo) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }

    let bins = (0..n_bins)
        .map(|i| lo + width * (i as f64 + 0.5))
        .collect();
    Histogram { bins, counts }
}

/// `n` evenly spaced values over `[start, end]`, both ends included.
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Trapezoidal integral of `y` sampled at `x`.
#[must_use]
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(mean(&v), 2.5);
        assert_relative_eq!(population_variance(&v), 1.25);
        assert_relative_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [10.0, 1.0, 4.0, 7.0];
        assert_relative_eq!(percentile(&v, 0.0), 1.0);
        assert_relative_eq!(percentile(&v, 100.0), 10.0);
        assert_relative_eq!(percentile(&v, 50.0), 5.5);
        // rank = 0.95 * 3 = 2.85 -> 7 + 0.85 * 3
        assert_relative_eq!(percentile(&v, 95.0), 9.55, epsilon = 1e-12);
    }

    #[test]
    fn test_histogram_last_bin_closed() {
        let h = histogram(&[0.0, 0.5, 1.0], 2, Some((0.0, 1.0)));
        assert_eq!(h.counts, vec![1, 2]);
        assert_relative_eq!(h.bins[0], 0.25);
        assert_relative_eq!(h.bins[1], 0.75);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let h = histogram(&[3.0; 10], 5, None);
        assert_eq!(h.counts.iter().sum::<u64>(), 10);
        assert_relative_eq!(h.bins[0], 2.6, epsilon = 1e-12);
        assert_relative_eq!(h.bins[4], 3.4, epsilon = 1e-12);
    }

    #[test]
    fn test_histogram_empty_input() {
        assert!(histogram(&[], 20, Some((0.0, 1.0))).is_empty());
    }

    #[test]
    fn test_density_integrates_to_one() {
        let values: Vec<f64> = (0..1000).map(|i| f64::from(i) / 100.0).collect();
        let h = histogram(&values, 50, None);
        let width = h.bins[1] - h.bins[0];
        let area: f64 = h.density().iter().map(|d| d * width).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linspace_endpoints() {
        let x = linspace(-4.0, 4.0, 100);
        assert_eq!(x.len(), 100);
        assert_relative_eq!(x[0], -4.0);
        assert_relative_eq!(x[99], 4.0);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_trapezoid_linear() {
        let x = linspace(0.0, 2.0, 11);
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();
        assert_relative_eq!(trapezoid(&y, &x), 6.0, epsilon = 1e-12);
    }
}
