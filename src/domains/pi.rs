//! Estimate pi from uniform points in `[-1, 1]²`.
//!
//! The fraction of points inside the unit circle estimates `π/4`:
//!
//! ```text
//! p = inside / total,   π̂ = 4p,   se = 4 √(p(1 - p) / total)
//! ```

use serde::Serialize;
use std::f64::consts::PI;

use super::{reference_errors, BatchContext, Estimate, Estimator, Statistics, Visualization};
use crate::config::AlgorithmParams;
use crate::engine::rng::SimRng;
use crate::error::SimResult;
use crate::stats::accumulator::{CappedSeries, Merge};

/// Hard cap on retained scatter points.
pub const MAX_STORED_POINTS: usize = 5_000;

/// Points retained from a single batch.
pub const POINTS_PER_BATCH: usize = 100;

/// Points handed to the scatter plot.
pub const MAX_DISPLAY_POINTS: usize = 1_000;

/// Partial result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PiBatch {
    /// Points with `x² + y² <= 1`.
    pub inside: u64,
    /// Points drawn.
    pub total: u64,
    /// Random subset kept for display.
    pub points: Vec<[f64; 2]>,
}

/// Pi statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PiStatistics {
    /// Estimate block.
    #[serde(flatten)]
    pub core: Estimate,
    /// π.
    pub true_value: f64,
    /// `|π̂ - π|`.
    pub error: f64,
    /// Percent error, absent before the first batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
}

/// Scatter plot payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPlot {
    /// Up to [`MAX_DISPLAY_POINTS`] points.
    pub points: Vec<[f64; 2]>,
    /// Horizontal extent.
    pub x_range: [f64; 2],
    /// Vertical extent.
    pub y_range: [f64; 2],
    /// Fraction of all drawn points inside the circle.
    pub inside_ratio: f64,
}

/// Pi estimator.
#[derive(Debug, Clone)]
pub struct PiEstimator {
    inside: u64,
    total: u64,
    points: CappedSeries<[f64; 2]>,
}

impl Default for PiEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PiEstimator {
    /// Create an empty estimator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inside: 0,
            total: 0,
            points: CappedSeries::new(MAX_STORED_POINTS),
        }
    }

    fn inside_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.inside as f64 / self.total as f64
        }
    }
}

impl Estimator for PiEstimator {
    type Contribution = PiBatch;

    fn kind(&self) -> &'static str {
        "pi"
    }

    fn simulate_batch(&mut self, batch: BatchContext, rng: &mut SimRng) -> SimResult<PiBatch> {
        let n = batch.size as usize;
        let drawn: Vec<[f64; 2]> = (0..n)
            .map(|_| [rng.gen_range_f64(-1.0, 1.0), rng.gen_range_f64(-1.0, 1.0)])
            .collect();
        let inside = drawn
            .iter()
            .filter(|[x, y]| x * x + y * y <= 1.0)
            .count() as u64;

        let keep = POINTS_PER_BATCH.min(n).min(self.points.remaining());
        let points = rng
            .sample_indices(n, keep)
            .into_iter()
            .map(|i| drawn[i])
            .collect();

        Ok(PiBatch {
            inside,
            total: batch.size,
            points,
        })
    }

    fn accumulate(&mut self, batch: PiBatch) -> SimResult<()> {
        self.inside.merge(batch.inside);
        self.total.merge(batch.total);
        self.points.merge(batch.points);
        Ok(())
    }

    fn calculate_statistics(&self, _rng: &mut SimRng) -> SimResult<Statistics> {
        if self.total == 0 {
            return Ok(Statistics::Pi(PiStatistics {
                core: Estimate::zero(),
                true_value: PI,
                error: 0.0,
                relative_error: None,
            }));
        }

        let p = self.inside_ratio();
        let estimate = 4.0 * p;
        let variance = p * (1.0 - p) / self.total as f64;
        let std_error = 4.0 * variance.sqrt();
        let (error, relative_error) = reference_errors(estimate, PI);

        Ok(Statistics::Pi(PiStatistics {
            core: Estimate::new(estimate, std_error),
            true_value: PI,
            error,
            relative_error,
        }))
    }

    fn visualization_data(&self, rng: &mut SimRng) -> Visualization {
        let stored = self.points.as_slice();
        let points = if stored.len() > MAX_DISPLAY_POINTS {
            rng.sample_indices(stored.len(), MAX_DISPLAY_POINTS)
                .into_iter()
                .map(|i| stored[i])
                .collect()
        } else {
            stored.to_vec()
        };

        Visualization::Scatter(ScatterPlot {
            points,
            x_range: [-1.0, 1.0],
            y_range: [-1.0, 1.0],
            inside_ratio: self.inside_ratio(),
        })
    }

    fn parameters(&self) -> AlgorithmParams {
        AlgorithmParams::Pi
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn run(estimator: &mut PiEstimator, rng: &mut SimRng, batches: u64, size: u64) {
        for b in 0..batches {
            let ctx = BatchContext {
                size,
                iteration: b * size,
            };
            let batch = estimator.simulate_batch(ctx, rng).unwrap();
            estimator.accumulate(batch).unwrap();
        }
    }

    #[test]
    fn test_empty_statistics_are_zero() {
        let estimator = PiEstimator::new();
        let stats = estimator.calculate_statistics(&mut SimRng::new(1));
        assert!(matches!(
            stats,
            Ok(Statistics::Pi(ref s)) if s.core == Estimate::zero() && s.relative_error.is_none()
        ));
    }

    #[test]
    fn test_estimate_near_pi() {
        let mut estimator = PiEstimator::new();
        let mut rng = SimRng::new(42);
        run(&mut estimator, &mut rng, 100, 1_000);

        let stats = estimator.calculate_statistics(&mut rng).unwrap();
        assert!((stats.estimate() - PI).abs() < 0.05, "estimate {}", stats.estimate());
        assert!(stats.std_error() > 0.0 && stats.std_error() < 0.01);
    }

    #[test]
    fn test_retained_points_capped() {
        let mut estimator = PiEstimator::new();
        let mut rng = SimRng::new(3);
        run(&mut estimator, &mut rng, 60, 1_000);

        assert_eq!(estimator.points.len(), MAX_STORED_POINTS);
        assert!(estimator.points.as_slice().iter().all(|[x, y]| x.abs() <= 1.0 && y.abs() <= 1.0));
    }

    #[test]
    fn test_small_batches_keep_every_point() {
        let mut estimator = PiEstimator::new();
        let mut rng = SimRng::new(5);
        run(&mut estimator, &mut rng, 3, 7);
        assert_eq!(estimator.points.len(), 21);
    }

    #[test]
    fn test_visualization_limits_points() {
        let mut estimator = PiEstimator::new();
        let mut rng = SimRng::new(9);
        run(&mut estimator, &mut rng, 20, 1_000);

        let viz = estimator.visualization_data(&mut rng);
        assert!(matches!(
            viz,
            Visualization::Scatter(ref plot)
                if plot.points.len() == MAX_DISPLAY_POINTS
                    && plot.inside_ratio > 0.7
                    && plot.inside_ratio < 0.85
        ));
    }
}
