//! CLI module for montesim.
//!
//! All CLI logic lives here rather than in main.rs so it can be tested. The
//! entry point `run_cli` is called from main.rs with parsed arguments.

mod args;
mod commands;
mod output;

pub use args::{Args, Command, LONG_VERSION};
pub use commands::{
    execute, run_cli, run_simulation, verify_reproducibility, verify_runs, VerifySummary,
};
pub use output::{format_snapshot, print_final_result, print_snapshot};
