#![allow(clippy::unwrap_used, clippy::expect_used)]

use montesim::config::{
    AlgorithmParams, ChainParams, HypothesisParams, IntegralParams, OptionParams, RiskParams,
};
use montesim::prelude::*;

fn pi_config(seed: u64) -> SimulationConfig {
    SimulationConfig::builder()
        .n_simulations(100_000)
        .batch_size(1_000)
        .update_frequency(10_000)
        .seed(seed)
        .build()
}

fn snapshots(config: SimulationConfig) -> Vec<ProgressSnapshot> {
    SimulationEngine::new(config)
        .unwrap()
        .run()
        .map(Result::unwrap)
        .collect()
}

// H0: The pi scenario does not land near pi
// Falsification: seed 42, 100 000 trials; estimate must be within 0.02
#[test]
fn h0_1_pi_scenario_lands_near_pi() {
    let snaps = snapshots(pi_config(42));
    assert_eq!(snaps.len(), 10, "one snapshot per 10 000 trials");

    let last = snaps.last().unwrap();
    assert!(last.is_final());
    assert!(
        (last.statistics.estimate() - std::f64::consts::PI).abs() < 0.02,
        "estimate {}",
        last.statistics.estimate()
    );
    assert_eq!(last.convergence_history.len(), 10);
}

// H0: Same seed produces different outputs across runs
// Falsification: run the pi scenario twice with seed 42; compare bitwise
#[test]
fn h0_2_same_seed_produces_identical_outputs() {
    let first = snapshots(pi_config(42));
    let second = snapshots(pi_config(42));

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.iteration, b.iteration);
        assert_eq!(
            a.statistics.estimate().to_bits(),
            b.statistics.estimate().to_bits()
        );
        assert_eq!(
            a.statistics.std_error().to_bits(),
            b.statistics.std_error().to_bits()
        );
        assert_eq!(a.visualization, b.visualization);
    }
}

// H0: Different seeds produce identical outputs
// Falsification: seeds 42, 43, 44 must give pairwise different estimates
#[test]
fn h0_3_different_seeds_produce_different_outputs() {
    let estimates: Vec<u64> = [42, 43, 44]
        .into_iter()
        .map(|seed| {
            snapshots(pi_config(seed))
                .last()
                .unwrap()
                .statistics
                .estimate()
                .to_bits()
        })
        .collect();

    assert_ne!(estimates[0], estimates[1]);
    assert_ne!(estimates[1], estimates[2]);
    assert_ne!(estimates[0], estimates[2]);
}

// H0: Final results of seeded runs differ for some algorithm
// Falsification: every algorithm, run twice with the same seed, equal results
#[test]
fn h0_4_every_algorithm_is_reproducible() {
    let algorithms = [
        AlgorithmParams::Pi,
        AlgorithmParams::Integration(IntegralParams::default()),
        AlgorithmParams::OptionPricing(OptionParams::default()),
        AlgorithmParams::Hypothesis(HypothesisParams::default()),
        AlgorithmParams::Risk(RiskParams::default()),
        AlgorithmParams::Markov(ChainParams::default()),
    ];

    for params in algorithms {
        let config = SimulationConfig::builder()
            .n_simulations(3_000)
            .batch_size(500)
            .update_frequency(1_000)
            .seed(2024)
            .algorithm(params.clone())
            .build();

        let first = SimulationEngine::new(config.clone())
            .unwrap()
            .run()
            .run_to_completion()
            .unwrap();
        let second = SimulationEngine::new(config)
            .unwrap()
            .run()
            .run_to_completion()
            .unwrap();

        assert_eq!(first.statistics, second.statistics, "{}", params.name());
        assert_eq!(
            first.convergence_history, second.convergence_history,
            "{}",
            params.name()
        );
        assert_eq!(first.parameters.algorithm, params);
    }
}

// H0: Confidence intervals are not centered on the estimate
// Falsification: every emitted snapshot satisfies lower <= estimate <= upper
// and upper - lower == 2 * 1.96 * se
#[test]
fn h0_5_intervals_are_symmetric() {
    for snapshot in snapshots(pi_config(7)) {
        let core = snapshot.statistics.core();
        assert!(core.lower_ci <= core.estimate && core.estimate <= core.upper_ci);
        let width = core.upper_ci - core.lower_ci;
        assert!((width - 2.0 * 1.96 * core.std_error).abs() < 1e-12);
    }
}

// H0: An unseeded run cannot be replayed
// Falsification: feeding the echoed seed back reproduces the estimate
#[test]
fn h0_6_echoed_seed_replays_run() {
    let config = SimulationConfig::builder()
        .n_simulations(5_000)
        .batch_size(1_000)
        .build();
    let first = SimulationEngine::new(config.clone())
        .unwrap()
        .run()
        .run_to_completion()
        .unwrap();

    let replay = SimulationConfig {
        seed: Some(first.parameters.seed),
        ..config
    };
    let second = SimulationEngine::new(replay)
        .unwrap()
        .run()
        .run_to_completion()
        .unwrap();

    assert_eq!(
        first.statistics.estimate().to_bits(),
        second.statistics.estimate().to_bits()
    );
}

fn chain_statistics(step_size: f64) -> montesim::domains::ChainStatistics {
    let config = SimulationConfig::builder()
        .n_simulations(20_000)
        .batch_size(2_000)
        .update_frequency(20_000)
        .seed(31)
        .algorithm(AlgorithmParams::Markov(ChainParams {
            distribution_type: "normal".to_string(),
            burn_in: 1_000,
            step_size,
            initial_value: 0.0,
        }))
        .build();
    let result = SimulationEngine::new(config)
        .unwrap()
        .run()
        .run_to_completion()
        .unwrap();
    match result.statistics {
        Statistics::Markov(stats) => stats,
        other => unreachable!("expected chain statistics, got {other:?}"),
    }
}

// H0: The sampler's ESS ignores how correlated its chain is
// Falsification: on N(0, 1), a well-tuned step (2.4) must give a far larger
// ESS than a tiny step (0.1); both stay below the pool size, and the reported
// standard error is sqrt(variance / ESS)
#[test]
fn h0_7_chain_ess_tracks_sampler_mixing() {
    let tuned = chain_statistics(2.4);
    let sluggish = chain_statistics(0.1);

    for stats in [&tuned, &sluggish] {
        let n = stats.actual_sample_size as f64;
        assert_eq!(stats.actual_sample_size, 20_000);
        assert!(stats.effective_sample_size >= 1.0);
        assert!(stats.effective_sample_size < n);

        let expected_se = (stats.variance / stats.effective_sample_size).sqrt();
        assert!((stats.core.std_error - expected_se).abs() < 1e-12);
        assert!(stats.core.std_error > (stats.variance / n).sqrt());
    }

    let tuned_ratio = tuned.effective_sample_size / tuned.actual_sample_size as f64;
    assert!(
        (0.1..0.9).contains(&tuned_ratio),
        "tuned chain ESS ratio {tuned_ratio}"
    );
    assert!(
        tuned.effective_sample_size > 5.0 * sluggish.effective_sample_size,
        "tuned ESS {} vs sluggish ESS {}",
        tuned.effective_sample_size,
        sluggish.effective_sample_size
    );
}
