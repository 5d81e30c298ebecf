//! Colored progress output for batches.

use marketkit_core::{ProgressCallback, Stage, TargetOutcome};

use crate::style::{self, Tone, paint};

/// Prints one line per target and one step per pipeline stage.
pub struct TerminalProgress;

impl ProgressCallback for TerminalProgress {
    fn on_target_started(&self, target: &str, index: usize, total: usize) {
        println!(
            "{} {}",
            paint(Tone::Muted, format!("[{}/{}]", index + 1, total)),
            paint(Tone::Target, target)
        );
    }

    fn on_stage_started(&self, _target: &str, stage: Stage) {
        print!("{} ... ", paint(Tone::Step, format!("  ◆ {}", stage)));
        style::flush_stdout();
    }

    fn on_stage_completed(&self, _target: &str, _stage: Stage) {
        println!("{}", paint(Tone::Ok, "✓"));
    }

    fn on_target_finished(&self, outcome: &TargetOutcome) {
        if outcome.is_success() {
            return;
        }
        // A failed stage leaves its step line open.
        let error = outcome.error.as_deref().unwrap_or("failed");
        let indent = if outcome.stage.is_some() { "" } else { "  " };
        println!("{}{} {}", indent, paint(Tone::Fail, "✗"), error);
    }
}
