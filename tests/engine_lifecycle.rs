#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use montesim::config::{AlgorithmParams, RiskParams};
use montesim::domains::{
    BatchContext, Estimate, Estimator, PiEstimator, PiStatistics, ScatterPlot, Statistics,
    Visualization,
};
use montesim::prelude::*;

/// Counts trials and fails once `fail_at` trials have been simulated.
#[derive(Debug, Clone)]
struct FailingEstimator {
    seen: u64,
    fail_at: u64,
    poison_statistics: bool,
}

impl Estimator for FailingEstimator {
    type Contribution = u64;

    fn kind(&self) -> &'static str {
        "failing"
    }

    fn simulate_batch(&mut self, batch: BatchContext, _rng: &mut SimRng) -> SimResult<u64> {
        if batch.iteration + batch.size > self.fail_at {
            return Err(SimError::config("injected batch failure"));
        }
        Ok(batch.size)
    }

    fn accumulate(&mut self, contribution: u64) -> SimResult<()> {
        self.seen += contribution;
        Ok(())
    }

    fn calculate_statistics(&self, _rng: &mut SimRng) -> SimResult<Statistics> {
        let estimate = if self.poison_statistics {
            f64::NAN
        } else {
            self.seen as f64
        };
        Ok(Statistics::Pi(PiStatistics {
            core: Estimate::new(estimate, 0.0),
            true_value: 0.0,
            error: 0.0,
            relative_error: None,
        }))
    }

    fn visualization_data(&self, _rng: &mut SimRng) -> Visualization {
        Visualization::Scatter(ScatterPlot {
            points: Vec::new(),
            x_range: [-1.0, 1.0],
            y_range: [-1.0, 1.0],
            inside_ratio: 0.0,
        })
    }

    fn parameters(&self) -> AlgorithmParams {
        AlgorithmParams::Pi
    }
}

fn config(n: u64, batch: u64, update: u64) -> SimulationConfig {
    SimulationConfig::builder()
        .n_simulations(n)
        .batch_size(batch)
        .update_frequency(update)
        .seed(42)
        .build()
}

fn failing(fail_at: u64, poison_statistics: bool) -> FailingEstimator {
    FailingEstimator {
        seen: 0,
        fail_at,
        poison_statistics,
    }
}

#[test]
fn batch_failure_aborts_without_final_result() {
    let engine =
        SimulationEngine::with_estimator(config(10_000, 1_000, 1_000), failing(3_500, false))
            .unwrap();
    let mut run = engine.run();

    let items: Vec<_> = run.by_ref().collect();
    assert_eq!(items.len(), 4, "three snapshots then the failure");
    assert!(items[..3].iter().all(Result::is_ok));
    assert!(matches!(
        items[3],
        Err(SimError::SimulationFailure { iteration: 3_000, .. })
    ));

    assert_eq!(run.status(), RunStatus::Failed);
    assert!(run.next().is_none());
    assert!(matches!(run.final_result(), Err(SimError::RunFailed)));
}

#[test]
fn non_finite_statistics_stop_the_line() {
    let engine =
        SimulationEngine::with_estimator(config(5_000, 1_000, 1_000), failing(u64::MAX, true))
            .unwrap();
    let mut run = engine.run();

    let first = run.next().unwrap();
    match first {
        Err(SimError::SimulationFailure { source, .. }) => {
            assert!(source.is_jidoka_violation());
        }
        other => unreachable!("expected a Jidoka failure, got {other:?}"),
    }
    assert!(matches!(run.final_result(), Err(SimError::RunFailed)));
}

#[test]
fn custom_estimator_runs_to_completion() {
    let engine =
        SimulationEngine::with_estimator(config(2_500, 1_000, 1_000), failing(u64::MAX, false))
            .unwrap();
    let result = engine
        .run()
        .run_to_completion()
        .unwrap();
    assert_eq!(result.statistics.estimate(), 2_500.0);
    assert_eq!(result.status, RunStatus::Completed);
}

#[test]
fn stop_from_another_thread_is_seen_at_batch_boundary() {
    let engine =
        SimulationEngine::with_estimator(config(50_000_000, 100, 50_000_000), PiEstimator::new())
            .unwrap();
    let mut run = engine.run();
    let stop = run.stop_handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        stop.stop();
    });

    // no snapshot before the single emission at the total
    assert!(run.next().is_none());
    stopper.join().unwrap();

    let result = run.final_result().unwrap();
    assert_eq!(result.status, RunStatus::Stopped);
    assert_eq!(result.total_iterations % 100, 0, "stops only between batches");
    assert!(result.total_iterations < 50_000_000);
    assert!(result.convergence_history.is_empty());
}

#[test]
fn streamed_run_delivers_snapshots_in_order() {
    let config = SimulationConfig::builder()
        .n_simulations(4_000)
        .batch_size(500)
        .update_frequency(1_000)
        .seed(9)
        .algorithm(AlgorithmParams::Risk(RiskParams::default()))
        .build();
    let handle = SimulationEngine::new(config).unwrap().run().spawn(1).unwrap();

    let mut iterations = Vec::new();
    while let Ok(item) = handle.recv_timeout(Duration::from_secs(30)) {
        iterations.push(item.unwrap().iteration);
    }
    assert_eq!(iterations, vec![1_000, 2_000, 3_000, 4_000]);

    let result = handle.join().unwrap();
    assert!(matches!(result.statistics, Statistics::Risk(_)));
}

#[test]
fn dropping_the_handle_stops_the_worker() {
    let handle = SimulationEngine::new(config(50_000_000, 1_000, 1_000))
        .unwrap()
        .run()
        .spawn(0)
        .unwrap();
    let stop = handle.stop_handle();

    let first = handle.recv().unwrap().unwrap();
    assert_eq!(first.iteration, 1_000);
    drop(handle);

    assert!(!stop.is_running());
}

#[test]
fn streamed_failure_is_delivered_then_join_reports_failed() {
    let handle =
        SimulationEngine::with_estimator(config(5_000, 1_000, 1_000), failing(2_000, false))
            .unwrap()
            .run()
            .spawn(4)
            .unwrap();

    let items: Vec<_> = handle.iter().collect();
    assert_eq!(items.len(), 3);
    assert!(items[2].is_err());
    assert!(matches!(handle.join(), Err(SimError::RunFailed)));
}
