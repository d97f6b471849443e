//! CLI command handlers.
//!
//! Each handler has a `SimResult`-returning core that the tests drive
//! directly, and an `ExitCode` wrapper that prints.

use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

use super::output::{print_banner, print_final_result, print_snapshot, print_verification};
use super::{Args, Command};
use crate::config::SimulationConfig;
use crate::engine::{FinalResult, SimulationEngine};
use crate::error::{SimError, SimResult};

/// Main CLI entry point.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    match args.command {
        Command::Run {
            config,
            seed,
            quiet,
        } => run_simulation(&config, seed, quiet),
        Command::Verify { config, runs } => verify_reproducibility(&config, runs),
    }
}

/// Run a configuration file and print the outcome.
#[must_use]
pub fn run_simulation(path: &Path, seed_override: Option<u64>, quiet: bool) -> ExitCode {
    if !quiet {
        print_banner("montesim - Monte Carlo Run");
    }

    let result = SimulationConfig::load(path).and_then(|mut config| {
        if seed_override.is_some() {
            config.seed = seed_override;
        }
        execute(config, quiet)
    });

    match result {
        Ok(result) => {
            print_final_result(&result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "run failed");
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Run a configuration to the end, printing snapshots unless `quiet`.
///
/// # Errors
///
/// Returns error if the configuration is invalid or the run fails.
pub fn execute(config: SimulationConfig, quiet: bool) -> SimResult<FinalResult> {
    let mut run = SimulationEngine::new(config)?.run();
    for snapshot in run.by_ref() {
        let snapshot = snapshot?;
        if !quiet {
            print_snapshot(&snapshot);
        }
    }
    run.final_result()
}

/// Outcome of a reproducibility check.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifySummary {
    /// Seed every run used.
    pub seed: u64,
    /// Final estimate of each run.
    pub estimates: Vec<f64>,
    /// True if every run matched the first bit for bit.
    pub identical: bool,
}

/// Run the same seeded configuration `runs` times and compare the results.
///
/// # Errors
///
/// Returns [`SimError::Config`] if the configuration has no seed, or the
/// first run failure.
pub fn verify_runs(config: &SimulationConfig, runs: u32) -> SimResult<VerifySummary> {
    let seed = config
        .seed
        .ok_or_else(|| SimError::config("reproducibility check requires an explicit seed"))?;

    let results = (0..runs)
        .map(|_| execute(config.clone(), true))
        .collect::<SimResult<Vec<_>>>()?;

    let identical = results.windows(2).all(|pair| {
        pair[0].total_iterations == pair[1].total_iterations
            && pair[0].statistics == pair[1].statistics
            && pair[0].convergence_history == pair[1].convergence_history
    });
    let estimates = results.iter().map(|r| r.statistics.estimate()).collect();

    info!(seed, runs, identical, "reproducibility check finished");
    Ok(VerifySummary {
        seed,
        estimates,
        identical,
    })
}

/// Verify reproducibility of a configuration file.
#[must_use]
pub fn verify_reproducibility(path: &Path, runs: u32) -> ExitCode {
    print_banner("montesim - Reproducibility Verification");
    println!("Verifying: {}", path.display());
    println!("Runs: {runs}\n");

    match SimulationConfig::load(path).and_then(|config| verify_runs(&config, runs)) {
        Ok(summary) => {
            print_verification(&summary);
            if summary.identical {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}
