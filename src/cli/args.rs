//! CLI argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version string with the build metadata captured by `build.rs`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (git ",
    env!("MONTESIM_GIT_HASH"),
    ", built ",
    env!("MONTESIM_BUILD_TIMESTAMP"),
    ")"
);

/// Batch-driven Monte Carlo estimators.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "montesim", version, long_version = LONG_VERSION, about)]
pub struct Args {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run a simulation from a YAML configuration
    Run {
        /// Path to the configuration file.
        config: PathBuf,
        /// Override the configured seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Print only the final summary.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Check that repeated seeded runs give identical results
    Verify {
        /// Path to the configuration file.
        config: PathBuf,
        /// Number of runs to compare.
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(2..))]
        runs: u32,
    },
}
