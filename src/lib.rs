//! # montesim
//!
//! Batch-driven Monte Carlo estimators with streamed progress snapshots.
//!
//! A run executes trials in batches, folds each batch into a per-algorithm
//! accumulator, and at every update boundary emits a [`ProgressSnapshot`]
//! carrying named statistics, a visualization payload and the downsampled
//! convergence history. Six estimators are provided:
//! - Pi from points in the unit square
//! - Definite integrals of named functions
//! - Black-Scholes option prices
//! - Statistical power of a z-test
//! - Portfolio Value at Risk with a bootstrap interval
//! - Metropolis-Hastings chains with ESS-corrected errors
//!
//! ## Example
//!
//! ```rust
//! use montesim::prelude::*;
//!
//! let config = SimulationConfig::builder()
//!     .n_simulations(20_000)
//!     .seed(42)
//!     .build();
//!
//! let mut run = SimulationEngine::new(config)?.run();
//! for snapshot in run.by_ref() {
//!     let snapshot = snapshot?;
//!     assert!(snapshot.statistics.estimate() <= 4.0);
//! }
//! let result = run.final_result()?;
//! assert_eq!(result.total_iterations, 20_000);
//! # Ok::<(), montesim::SimError>(())
//! ```
//!
//! [`ProgressSnapshot`]: engine::ProgressSnapshot

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops,  // Formulas are written as in the literature
    clippy::imprecise_flops,   // Numerical code choices are intentional
    clippy::too_many_lines,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
    clippy::float_cmp,             // Exact comparisons against sentinels and references
)]

pub mod cli;
pub mod config;
pub mod domains;
pub mod engine;
pub mod error;
pub mod stats;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{AlgorithmParams, SimulationConfig, SimulationConfigBuilder};
    pub use crate::domains::{Algorithm, Estimator, Statistics, Visualization};
    pub use crate::engine::rng::SimRng;
    pub use crate::engine::{
        FinalResult, ProgressSnapshot, RunHandle, RunStatus, SimulationEngine, SimulationRun,
        StopHandle,
    };
    pub use crate::error::{SimError, SimResult};
}

/// Re-export for public API
pub use error::{SimError, SimResult};
