//! Estimator Benchmarks with 95% Confidence Intervals
//!
//! Measures per-batch cost of each estimator and the cost of the statistics
//! that run at every emission boundary (bootstrap VaR, chain ESS).
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use montesim::config::{AlgorithmParams, ChainParams, OptionParams, RiskParams};
use montesim::domains::{Algorithm, BatchContext, Estimator};
use montesim::engine::{SimRng, SimulationEngine};
use montesim::prelude::SimulationConfig;
use montesim::stats::effective_sample_size;

/// One batch of each algorithm at several batch sizes.
fn bench_simulate_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_batch");
    group.sample_size(100);
    group.confidence_level(0.95);

    let algorithms = [
        AlgorithmParams::Pi,
        AlgorithmParams::OptionPricing(OptionParams::default()),
        AlgorithmParams::Markov(ChainParams::default()),
    ];

    for params in &algorithms {
        for size in [100u64, 1_000] {
            group.bench_with_input(BenchmarkId::new(params.name(), size), &size, |b, &size| {
                let Ok(mut estimator) = Algorithm::from_params(params) else {
                    return;
                };
                let mut rng = SimRng::new(42);
                b.iter(|| {
                    black_box(
                        estimator
                            .simulate_batch(BatchContext { size, iteration: 0 }, &mut rng)
                            .is_ok(),
                    )
                });
            });
        }
    }

    group.finish();
}

/// Bootstrap VaR statistics over a growing loss sample.
fn bench_var_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("var_statistics");
    group.sample_size(20);

    for trials in [1_000u64, 10_000] {
        group.bench_with_input(BenchmarkId::new("bootstrap", trials), &trials, |b, &trials| {
            let Ok(mut estimator) = Algorithm::from_params(&AlgorithmParams::Risk(RiskParams::default()))
            else {
                return;
            };
            let mut rng = SimRng::new(7);
            if let Ok(batch) =
                estimator.simulate_batch(BatchContext { size: trials, iteration: 0 }, &mut rng)
            {
                let _ = estimator.accumulate(batch);
            }
            b.iter(|| black_box(estimator.calculate_statistics(&mut rng).is_ok()));
        });
    }

    group.finish();
}

/// ESS over an AR(1) series.
fn bench_effective_sample_size(c: &mut Criterion) {
    let mut rng = SimRng::new(3);
    let mut x = 0.0;
    let series: Vec<f64> = (0..20_000)
        .map(|_| {
            x = 0.9 * x + rng.gen_standard_normal();
            x
        })
        .collect();

    c.bench_function("ess_ar1_20000", |b| {
        b.iter(|| black_box(effective_sample_size(black_box(&series))));
    });
}

/// End-to-end pi scenario.
fn bench_pi_run(c: &mut Criterion) {
    c.bench_function("pi_run_100000", |b| {
        b.iter(|| {
            let config = SimulationConfig::builder()
                .n_simulations(100_000)
                .batch_size(1_000)
                .update_frequency(10_000)
                .seed(42)
                .build();
            SimulationEngine::new(config)
                .and_then(|engine| engine.run().run_to_completion())
                .map(|result| black_box(result.statistics.estimate()))
                .is_ok()
        });
    });
}

criterion_group!(
    benches,
    bench_simulate_batch,
    bench_var_statistics,
    bench_effective_sample_size,
    bench_pi_run,
);

criterion_main!(benches);
