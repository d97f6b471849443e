//! Convergence history: `(iteration, estimate, std_error)` per emission.

use serde::{Deserialize, Serialize};

/// Default number of points handed to a plotting consumer.
pub const DEFAULT_MAX_POINTS: usize = 100;

/// One recorded point of the estimator trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    /// Completed iterations when the point was recorded.
    pub iteration: u64,
    /// Estimate at that iteration.
    pub estimate: f64,
    /// Standard error at that iteration.
    pub std_error: f64,
}

/// Append-only convergence history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceTracker {
    points: Vec<ConvergencePoint>,
}

impl ConvergenceTracker {
    /// Create an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Record a point. The full history is retained for the final result.
    pub fn append(&mut self, point: ConvergencePoint) {
        self.points.push(point);
    }

    /// Number of recorded points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Full history.
    #[must_use]
    pub fn points(&self) -> &[ConvergencePoint] {
        &self.points
    }

    /// Evenly spaced subset of the history, see [`downsample`].
    #[must_use]
    pub fn downsample(&self, max_points: usize) -> Vec<ConvergencePoint> {
        downsample(&self.points, max_points)
    }
}

/// Pick at most `max_points` items evenly spaced over `[0, len - 1]`.
///
/// Short inputs are returned unchanged. Otherwise index `i` maps to
/// `floor(i * (len - 1) / (max_points - 1))`, so the first and last items are
/// always kept and the time range is never truncated.
#[must_use]
pub fn downsample<T: Clone>(items: &[T], max_points: usize) -> Vec<T> {
    let len = items.len();
    if len <= max_points {
        return items.to_vec();
    }
    match max_points {
        0 => Vec::new(),
        1 => items[..1].to_vec(),
        _ => {
            let last = (len - 1) as f64;
            let steps = (max_points - 1) as f64;
            (0..max_points)
                .map(|i| {
                    let idx = ((i as f64 * last / steps) as usize).min(len - 1);
                    items[idx].clone()
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(iteration: u64) -> ConvergencePoint {
        ConvergencePoint {
            iteration,
            estimate: iteration as f64,
            std_error: 0.0,
        }
    }

    #[test]
    fn test_short_history_is_identity() {
        let mut tracker = ConvergenceTracker::new();
        for i in 1..=10 {
            tracker.append(point(i * 100));
        }
        assert_eq!(tracker.downsample(DEFAULT_MAX_POINTS), tracker.points());
    }

    #[test]
    fn test_long_history_keeps_endpoints() {
        let mut tracker = ConvergenceTracker::new();
        for i in 1..=1000 {
            tracker.append(point(i));
        }
        let sampled = tracker.downsample(100);
        assert_eq!(sampled.len(), 100);
        assert_eq!(sampled.first().map(|p| p.iteration), Some(1));
        assert_eq!(sampled.last().map(|p| p.iteration), Some(1000));
        assert!(sampled.windows(2).all(|w| w[0].iteration < w[1].iteration));
        // The underlying history is never truncated.
        assert_eq!(tracker.len(), 1000);
    }

    #[test]
    fn test_downsample_degenerate_limits() {
        let items: Vec<u32> = (0..10).collect();
        assert!(downsample(&items, 0).is_empty());
        assert_eq!(downsample(&items, 1), vec![0]);
        assert_eq!(downsample(&items, 2), vec![0, 9]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Falsification: length bound, identity when short, endpoints kept.
        #[test]
        fn prop_downsample_contract(len in 0usize..2000, max_points in 2usize..300) {
            let items: Vec<usize> = (0..len).collect();
            let sampled = downsample(&items, max_points);

            prop_assert!(sampled.len() <= max_points);
            if len <= max_points {
                prop_assert_eq!(&sampled, &items);
            } else {
                prop_assert_eq!(sampled.first(), items.first());
                prop_assert_eq!(sampled.last(), items.last());
            }
        }
    }
}
