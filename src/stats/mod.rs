//! Leaf statistics shared by the run loop and the estimators.
//!
//! Nothing in here knows about batches or algorithms:
//! - [`accumulator`]: merge rules for per-batch contributions
//! - [`convergence`]: convergence history and downsampling
//! - [`interval`]: normal-approximation confidence intervals
//! - [`ess`]: effective sample size of a correlated chain
//! - [`descriptive`]: mean, variance, percentiles, histograms
//! - [`normal`]: standard normal CDF, quantile and density

pub mod accumulator;
pub mod convergence;
pub mod descriptive;
pub mod ess;
pub mod interval;
pub mod normal;

pub use accumulator::{CappedSeries, Merge, TrailingWindow};
pub use convergence::{ConvergencePoint, ConvergenceTracker};
pub use descriptive::Histogram;
pub use ess::effective_sample_size;
pub use interval::{interval, ConfidenceInterval};
