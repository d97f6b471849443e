//! CLI output formatting.

use crate::engine::{FinalResult, ProgressSnapshot};

use super::commands::VerifySummary;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Print a boxed title.
pub fn print_banner(title: &str) {
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║ {title:<61} ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");
}

/// One progress line.
#[must_use]
pub fn format_snapshot(snapshot: &ProgressSnapshot) -> String {
    let core = snapshot.statistics.core();
    format!(
        "[{:>6.2}%] {:>12} / {:<12} estimate {:.6} ± {:.6}  CI [{:.6}, {:.6}]",
        snapshot.progress * 100.0,
        snapshot.iteration,
        snapshot.total,
        core.estimate,
        core.std_error,
        core.lower_ci,
        core.upper_ci,
    )
}

/// Print one progress line.
pub fn print_snapshot(snapshot: &ProgressSnapshot) {
    println!("{}", format_snapshot(snapshot));
}

/// Print the final summary with every named statistic.
pub fn print_final_result(result: &FinalResult) {
    println!("\n{RULE}");
    println!("Algorithm:  {}", result.parameters.algorithm.name());
    println!("Status:     {:?}", result.status);
    println!("Iterations: {}", result.total_iterations);
    println!("Seed:       {}", result.parameters.seed);
    if let Some(secs) = result.execution_time {
        println!("Time:       {secs:.3}s");
    }
    println!("{RULE}\n");

    match result.statistics.to_map() {
        Ok(map) => {
            for (key, value) in &map {
                println!("  {key:<28} {value}");
            }
        }
        Err(e) => eprintln!("Warning: cannot flatten statistics: {e}"),
    }
}

/// Print a reproducibility summary.
pub fn print_verification(summary: &VerifySummary) {
    let (sym, status) = if summary.identical {
        ("✓", "PASSED")
    } else {
        ("✗", "FAILED")
    };

    println!("{RULE}");
    println!("Reproducibility Check");
    println!("{RULE}\n");
    println!("  Seed:      {}", summary.seed);
    println!("  Runs:      {}", summary.estimates.len());
    println!("  Identical: {}", summary.identical);
    for (i, estimate) in summary.estimates.iter().enumerate() {
        println!("    Run {}: {estimate:.12}", i + 1);
    }
    println!("\n{RULE}");
    println!("{sym} Result: {status}");
    println!("{RULE}\n");
}
