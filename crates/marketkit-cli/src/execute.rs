//! Shared driver for every subcommand.
//!
//! Loads the project, wires the process runner and the sandbox into a
//! batch coordinator, and prints progress plus a summary.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use marketkit_core::{
    BatchCoordinator, BatchRequest, CommandSandbox, ProcessRunner, ProjectConfig, ProjectPaths,
};

use crate::progress::TerminalProgress;
use crate::style::{Tone, paint};
use crate::summary;

/// Run `request` in the project at `project_dir`, returning the batch status.
pub fn execute(project_dir: &Path, request: &BatchRequest) -> anyhow::Result<i32> {
    let root = project_dir
        .canonicalize()
        .with_context(|| format!("Project directory not found: {}", project_dir.display()))?;

    let config = ProjectConfig::load(&root)?;
    let paths = ProjectPaths::resolve(&root, &config.paths);

    let runner = ProcessRunner::new(&root);
    let sandbox = CommandSandbox::new(&runner, config.tools.sandbox.clone());
    let progress = TerminalProgress;
    let coordinator =
        BatchCoordinator::new(&config, &paths, &runner, &sandbox).with_callback(&progress);

    println!(
        "\n{} - {} in {}\n",
        paint(Tone::Heading, "marketkit"),
        request.action,
        paint(Tone::Target, root.display())
    );

    let start = Instant::now();
    let report = coordinator.run(request)?;
    summary::print(&report, &root, start.elapsed());

    Ok(report.status())
}
