//! Core simulation engine.
//!
//! Implements the batch-driven run loop with:
//! - Deterministic RNG (PCG, seed echoed in the final result)
//! - Incremental accumulation through the [`Estimator`] contract
//! - Jidoka guards on every emitted statistics record
//! - Cooperative cancellation at batch boundaries
//!
//! A [`SimulationRun`] is a single-pass iterator of progress snapshots. Each
//! `next()` executes batches until the iteration count reaches an emission
//! boundary (a multiple of the update frequency, or the total), the running
//! flag is cleared, or a batch fails.

pub mod jidoka;
pub mod report;
pub mod rng;
pub mod state;
pub mod stream;

use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

pub use jidoka::JidokaGuard;
pub use report::{FinalResult, ProgressSnapshot, RunParameters};
pub use rng::SimRng;
pub use state::{RunState, RunStatus, StopHandle};
pub use stream::RunHandle;

use crate::config::SimulationConfig;
use crate::domains::{Algorithm, BatchContext, Estimator};
use crate::error::{SimError, SimResult};
use crate::stats::convergence::{ConvergencePoint, DEFAULT_MAX_POINTS};

/// Validated configuration bound to an estimator, ready to run.
#[derive(Debug, Clone)]
pub struct SimulationEngine<E: Estimator = Algorithm> {
    config: SimulationConfig,
    estimator: E,
}

impl SimulationEngine<Algorithm> {
    /// Create an engine for the algorithm named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if configuration validation fails or the algorithm
    /// parameters are rejected by the estimator.
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.check()?;
        let estimator = Algorithm::from_params(&config.algorithm)?;
        Ok(Self { config, estimator })
    }
}

impl<E: Estimator> SimulationEngine<E> {
    /// Bind an already constructed estimator to a configuration.
    ///
    /// The `algorithm` section of the configuration is ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the run settings fail validation.
    pub fn with_estimator(config: SimulationConfig, estimator: E) -> SimResult<Self> {
        use validator::Validate;
        config.validate()?;
        Ok(Self { config, estimator })
    }

    /// Run configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Start a run. Nothing executes until the first snapshot is pulled.
    #[must_use]
    pub fn run(self) -> SimulationRun<E> {
        let total = self.estimator.total_trials(self.config.n_simulations);
        SimulationRun {
            rng: SimRng::from_optional_seed(self.config.seed),
            state: RunState::new(total),
            guard: JidokaGuard::new(),
            batch_size: self.config.batch_size.min(total),
            update_frequency: self.config.update_frequency,
            estimator: self.estimator,
            started: None,
            elapsed: None,
        }
    }
}

/// One run of an estimator; an iterator of progress snapshots.
///
/// The iterator is not restartable. After it returns `None` (or yields an
/// error), [`final_result`](Self::final_result) reports the outcome.
#[derive(Debug)]
pub struct SimulationRun<E: Estimator = Algorithm> {
    estimator: E,
    rng: SimRng,
    state: RunState,
    guard: JidokaGuard,
    batch_size: u64,
    update_frequency: u64,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl<E: Estimator> SimulationRun<E> {
    /// Handle that stops this run at the next batch boundary.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.state.stop_handle()
    }

    /// Request a stop; equivalent to `stop_handle().stop()`.
    pub fn stop(&self) {
        self.state.stop_handle().stop();
    }

    /// Trials completed so far.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.state.iteration()
    }

    /// Trials the run executes.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.state.total()
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.state.status()
    }

    /// Seed driving this run.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.master_seed()
    }

    /// Full convergence history recorded so far.
    #[must_use]
    pub fn history(&self) -> &[ConvergencePoint] {
        self.state.history().points()
    }

    /// The estimator and its accumulated state.
    #[must_use]
    pub const fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Final result, available once the loop has exited.
    ///
    /// Statistics and visualization are recomputed from whatever was
    /// accumulated, so a stopped run reports its partial state.
    ///
    /// # Errors
    ///
    /// - [`SimError::RunInProgress`] while the loop has not exited
    /// - [`SimError::RunFailed`] after a failed run
    /// - [`SimError::NonFiniteValue`] if the recomputed statistics are not finite
    pub fn final_result(&mut self) -> SimResult<FinalResult> {
        match self.state.status() {
            RunStatus::Pending | RunStatus::Running => return Err(SimError::RunInProgress),
            RunStatus::Failed => return Err(SimError::RunFailed),
            RunStatus::Completed | RunStatus::Stopped => {}
        }

        let statistics = self.estimator.calculate_statistics(&mut self.rng)?;
        self.guard.check(self.estimator.kind(), &statistics)?;
        let visualization = self.estimator.visualization_data(&mut self.rng);

        Ok(FinalResult {
            total_iterations: self.state.iteration(),
            status: self.state.status(),
            statistics,
            convergence_history: self.state.history().points().to_vec(),
            visualization,
            parameters: RunParameters {
                n_simulations: self.state.total(),
                batch_size: self.batch_size,
                update_frequency: self.update_frequency,
                seed: self.rng.master_seed(),
                algorithm: self.estimator.parameters(),
            },
            execution_time: self.elapsed.map(|d| d.as_secs_f64()),
        })
    }

    /// Drive the run to its end, discarding snapshots, and return the result.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised by the loop.
    pub fn run_to_completion(mut self) -> SimResult<FinalResult> {
        for snapshot in self.by_ref() {
            snapshot?;
        }
        self.final_result()
    }

    fn begin(&mut self) {
        self.started = Some(Instant::now());
        self.state.set_status(RunStatus::Running);
        info!(
            algorithm = self.estimator.kind(),
            total = self.state.total(),
            batch_size = self.batch_size,
            update_frequency = self.update_frequency,
            seed = self.rng.master_seed(),
            "run started"
        );
    }

    fn finish(&mut self, status: RunStatus) {
        self.state.set_status(status);
        self.elapsed = self.started.map(|t| t.elapsed());
        match status {
            RunStatus::Completed => info!(
                algorithm = self.estimator.kind(),
                iterations = self.state.iteration(),
                checks_passed = self.guard.checks_passed(),
                "run completed"
            ),
            RunStatus::Stopped => info!(
                algorithm = self.estimator.kind(),
                iterations = self.state.iteration(),
                total = self.state.total(),
                "run stopped"
            ),
            RunStatus::Failed => error!(
                algorithm = self.estimator.kind(),
                iterations = self.state.iteration(),
                "run failed"
            ),
            RunStatus::Pending | RunStatus::Running => {}
        }
    }

    /// Execute one batch; returns a snapshot at emission boundaries.
    fn step(&mut self) -> SimResult<Option<ProgressSnapshot>> {
        let size = self.state.remaining().min(self.batch_size);
        let batch = BatchContext {
            size,
            iteration: self.state.iteration(),
        };

        let contribution = self.estimator.simulate_batch(batch, &mut self.rng)?;
        self.estimator.accumulate(contribution)?;
        self.state.advance(size);
        trace!(iteration = self.state.iteration(), size, "batch merged");

        if !self.state.at_emission(self.update_frequency) {
            return Ok(None);
        }

        let snapshot = self.snapshot()?;
        if self.state.is_complete() {
            self.finish(RunStatus::Completed);
        }
        Ok(Some(snapshot))
    }

    fn snapshot(&mut self) -> SimResult<ProgressSnapshot> {
        let statistics = self.estimator.calculate_statistics(&mut self.rng)?;
        self.guard.check(self.estimator.kind(), &statistics)?;

        self.state.record(ConvergencePoint {
            iteration: self.state.iteration(),
            estimate: statistics.estimate(),
            std_error: statistics.std_error(),
        });
        let visualization = self.estimator.visualization_data(&mut self.rng);

        debug!(
            iteration = self.state.iteration(),
            estimate = statistics.estimate(),
            std_error = statistics.std_error(),
            "snapshot"
        );

        Ok(ProgressSnapshot {
            iteration: self.state.iteration(),
            total: self.state.total(),
            progress: self.state.progress(),
            statistics,
            visualization,
            convergence_history: self.state.history().downsample(DEFAULT_MAX_POINTS),
        })
    }
}

impl<E: Estimator> Iterator for SimulationRun<E> {
    type Item = SimResult<ProgressSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        let status = self.state.status();
        if status.is_terminal() {
            return None;
        }
        if status == RunStatus::Pending {
            self.begin();
        }

        loop {
            if !self.state.is_running() {
                self.finish(RunStatus::Stopped);
                return None;
            }
            if self.state.is_complete() {
                self.finish(RunStatus::Completed);
                return None;
            }

            match self.step() {
                Ok(Some(snapshot)) => return Some(Ok(snapshot)),
                Ok(None) => std::thread::yield_now(),
                Err(source) => {
                    let iteration = self.state.iteration();
                    error!(iteration, error = %source, "batch failed");
                    self.finish(RunStatus::Failed);
                    return Some(Err(SimError::simulation_failure(iteration, source)));
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{AlgorithmParams, ChainParams, IntegralParams};
    use crate::domains::Statistics;

    fn pi_config(n: u64, batch: u64, update: u64) -> SimulationConfig {
        SimulationConfig::builder()
            .n_simulations(n)
            .batch_size(batch)
            .update_frequency(update)
            .seed(42)
            .build()
    }

    #[test]
    fn test_emission_cadence() {
        let run = SimulationEngine::new(pi_config(10_000, 1_000, 2_500))
            .unwrap()
            .run();
        let iterations: Vec<u64> = run.map(|s| s.unwrap().iteration).collect();
        // only batch boundaries divisible by 2500 emit
        assert_eq!(iterations, vec![5_000, 10_000]);
    }

    #[test]
    fn test_partial_last_batch_emits_total() {
        let run = SimulationEngine::new(pi_config(2_500, 1_000, 1_000))
            .unwrap()
            .run();
        let snapshots: Vec<ProgressSnapshot> = run.map(Result::unwrap).collect();
        let iterations: Vec<u64> = snapshots.iter().map(|s| s.iteration).collect();
        assert_eq!(iterations, vec![1_000, 2_000, 2_500]);
        assert!(snapshots.last().unwrap().is_final());
        assert!((snapshots[0].progress - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_batch_capped_at_total() {
        let mut run = SimulationEngine::new(pi_config(300, 1_000, 1_000))
            .unwrap()
            .run();
        let first = run.next().unwrap().unwrap();
        assert_eq!(first.iteration, 300);
        assert!(run.next().is_none());
        assert_eq!(run.final_result().unwrap().parameters.batch_size, 300);
    }

    #[test]
    fn test_batch_capped_at_total_including_burn_in() {
        let config = SimulationConfig::builder()
            .n_simulations(1_000)
            .batch_size(2_000)
            .update_frequency(1_000)
            .seed(11)
            .algorithm(AlgorithmParams::Markov(ChainParams {
                burn_in: 1_000,
                ..ChainParams::default()
            }))
            .build();
        let mut run = SimulationEngine::new(config).unwrap().run();

        let iterations: Vec<u64> = run.by_ref().map(|s| s.unwrap().iteration).collect();
        assert_eq!(iterations, vec![2_000], "one batch covers burn-in and sampling");

        let result = run.final_result().unwrap();
        assert_eq!(result.parameters.batch_size, 2_000);
        assert_eq!(result.total_iterations, 2_000);
    }

    #[test]
    fn test_final_result_requires_exit() {
        let mut run = SimulationEngine::new(pi_config(5_000, 1_000, 1_000))
            .unwrap()
            .run();
        assert!(matches!(run.final_result(), Err(SimError::RunInProgress)));
        let _ = run.next();
        assert!(matches!(run.final_result(), Err(SimError::RunInProgress)));
    }

    #[test]
    fn test_stop_before_start_reports_empty_state() {
        let mut run = SimulationEngine::new(pi_config(5_000, 1_000, 1_000))
            .unwrap()
            .run();
        run.stop();
        assert!(run.next().is_none());
        assert_eq!(run.status(), RunStatus::Stopped);

        let result = run.final_result().unwrap();
        assert_eq!(result.total_iterations, 0);
        assert_eq!(result.statistics.estimate(), 0.0);
        assert!(result.convergence_history.is_empty());
    }

    #[test]
    fn test_stop_mid_run_has_no_extra_snapshot() {
        let mut run = SimulationEngine::new(pi_config(10_000, 1_000, 1_000))
            .unwrap()
            .run();
        let handle = run.stop_handle();
        let first = run.next().unwrap().unwrap();
        assert_eq!(first.iteration, 1_000);

        handle.stop();
        assert!(run.next().is_none());
        let result = run.final_result().unwrap();
        assert_eq!(result.status, RunStatus::Stopped);
        assert_eq!(result.total_iterations, 1_000);
        assert_eq!(result.convergence_history.len(), 1);
    }

    #[test]
    fn test_markov_run_includes_burn_in() {
        let config = SimulationConfig::builder()
            .n_simulations(2_000)
            .batch_size(500)
            .update_frequency(500)
            .seed(3)
            .algorithm(AlgorithmParams::Markov(ChainParams {
                burn_in: 500,
                ..ChainParams::default()
            }))
            .build();
        let result = SimulationEngine::new(config)
            .unwrap()
            .run()
            .run_to_completion()
            .unwrap();

        assert_eq!(result.total_iterations, 2_500);
        assert_eq!(result.parameters.n_simulations, 2_500);
        assert!(matches!(
            result.statistics,
            Statistics::Markov(ref s) if s.actual_sample_size == 2_000
        ));
    }

    #[test]
    fn test_invalid_parameters_fail_before_running() {
        let config = SimulationConfig::builder()
            .algorithm(AlgorithmParams::Integration(IntegralParams {
                function_type: "tanh".to_string(),
                ..IntegralParams::default()
            }))
            .build();
        assert!(matches!(
            SimulationEngine::new(config),
            Err(SimError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_history_downsampled_in_snapshots() {
        let run = SimulationEngine::new(pi_config(30_000, 100, 100))
            .unwrap()
            .run();
        let last = run.last().unwrap().unwrap();
        assert_eq!(last.convergence_history.len(), DEFAULT_MAX_POINTS);
        assert_eq!(last.convergence_history[0].iteration, 100);
        assert_eq!(
            last.convergence_history.last().map(|p| p.iteration),
            Some(30_000)
        );
    }

    #[test]
    fn test_execution_time_and_seed_echoed() {
        let result = SimulationEngine::new(pi_config(2_000, 1_000, 1_000))
            .unwrap()
            .run()
            .run_to_completion()
            .unwrap();
        assert_eq!(result.parameters.seed, 42);
        assert!(result.execution_time.is_some_and(|t| t >= 0.0));
        assert_eq!(result.downsampled_history(1).len(), 1);
    }
}
