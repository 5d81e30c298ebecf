//! End-of-batch summary.

use std::path::Path;
use std::time::Duration;

use marketkit_core::BatchReport;

use crate::style::{Tone, paint};

/// Print one line per target followed by totals.
pub fn print(report: &BatchReport, root: &Path, elapsed: Duration) {
    println!();
    println!("{}", paint(Tone::Heading, format!("Summary ({})", report.action)));

    for outcome in &report.outcomes {
        if outcome.is_success() {
            let detail = outcome
                .artifact
                .as_deref()
                .map(|p| p.strip_prefix(root).unwrap_or(p).display().to_string())
                .unwrap_or_default();
            println!(
                "  {} {} {}",
                paint(Tone::Ok, "✓"),
                outcome.target,
                paint(Tone::Muted, detail)
            );
        } else {
            let stage = outcome
                .stage
                .map(|s| format!(" at {}", s))
                .unwrap_or_default();
            println!(
                "  {} {} failed{} (status {})",
                paint(Tone::Fail, "✗"),
                outcome.target,
                stage,
                outcome.status
            );
        }
    }

    let failed = report.outcomes.len() - report.successes();
    let label = if failed == 0 {
        paint(Tone::Ok, "Done:")
    } else {
        paint(Tone::Fail, "Failed:")
    };
    println!();
    println!("{} {} succeeded, {} failed", label, report.successes(), failed);
    println!(
        "{} {:.2}s",
        paint(Tone::Muted, "Time:"),
        elapsed.as_secs_f64()
    );
}
