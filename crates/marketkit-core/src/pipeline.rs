//! Deploy-function extraction pipeline.
//!
//! For one target the pipeline walks these stages in order:
//!
//! ```text
//! bind-path ─► compile ─► extract ─► bind-code ─► recompile ─► deploy ─► persist
//! ```
//!
//! The function's code is only known after the first compilation, so the
//! probe is compiled twice. The first failing stage aborts the target and is
//! reported as [`Error::Stage`]. Outputs of earlier targets (listing,
//! compiled program) are removed before each compilation so a stage never
//! reads another target's leftovers.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::artifacts::DeployArtifact;
use crate::batch::TargetOutcome;
use crate::config::{BuildTarget, ProbeConfig, ProjectConfig};
use crate::error::{Error, Result};
use crate::listing::AssemblyListing;
use crate::paths::ProjectPaths;
use crate::probe::ProbeModule;
use crate::sandbox::{CompiledProgram, Sandbox};
use crate::toolchain::{OutputMode, ToolCommand, ToolRunner};

/// Pipeline stage, named after the state reached when it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Probe source imports the target's deploy function.
    PathBound,
    /// Probe compiled, listing written.
    Compiled,
    /// Function code extracted from the listing.
    Extracted,
    /// Probe source embeds the extracted code.
    CodeBound,
    /// Code-bound probe compiled.
    Recompiled,
    /// Probe deployed in the sandbox and its getter called.
    Deployed,
    /// Artifact written to the output directory.
    Persisted,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::PathBound,
        Stage::Compiled,
        Stage::Extracted,
        Stage::CodeBound,
        Stage::Recompiled,
        Stage::Deployed,
        Stage::Persisted,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::PathBound => "bind-path",
            Self::Compiled => "compile",
            Self::Extracted => "extract",
            Self::CodeBound => "bind-code",
            Self::Recompiled => "recompile",
            Self::Deployed => "deploy",
            Self::Persisted => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress reporting for batches and pipeline stages.
pub trait ProgressCallback {
    /// Called before a target's constants are prepared.
    fn on_target_started(&self, _target: &str, _index: usize, _total: usize) {}

    /// Called before a pipeline stage runs.
    fn on_stage_started(&self, _target: &str, _stage: Stage) {}

    /// Called after a pipeline stage succeeded.
    fn on_stage_completed(&self, _target: &str, _stage: Stage) {}

    /// Called once a target's constants are restored.
    fn on_target_finished(&self, _outcome: &TargetOutcome) {}
}

/// Runs the extraction pipeline for single targets.
pub struct DeployFunctionPipeline<'a> {
    paths: &'a ProjectPaths,
    probe: &'a ProbeConfig,
    compiler: &'a ToolCommand,
    runner: &'a dyn ToolRunner,
    sandbox: &'a dyn Sandbox,
    callback: Option<&'a dyn ProgressCallback>,
}

impl<'a> DeployFunctionPipeline<'a> {
    pub fn new(
        config: &'a ProjectConfig,
        paths: &'a ProjectPaths,
        runner: &'a dyn ToolRunner,
        sandbox: &'a dyn Sandbox,
    ) -> Self {
        Self {
            paths,
            probe: &config.probe,
            compiler: &config.tools.blueprint,
            runner,
            sandbox,
            callback: None,
        }
    }

    /// Report stage progress to `callback`.
    pub fn with_callback(mut self, callback: &'a dyn ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run every stage for `target`, returning the artifact path.
    ///
    /// The probe module is left in its last written state; the constants
    /// file is not touched here (see [`crate::constants`]).
    pub fn run(&self, target: &BuildTarget) -> Result<PathBuf> {
        let probe = ProbeModule::new(&self.paths.probe_source);

        self.stage(target, Stage::PathBound, || probe.bind_path(&target.path))?;

        self.stage(target, Stage::Compiled, || {
            remove_stale(&self.paths.listing)?;
            self.compile()
        })?;

        let code = self.stage(target, Stage::Extracted, || {
            AssemblyListing::load(&self.paths.listing)?.extract(&target.function_name())
        })?;
        tracing::debug!(
            "Extracted {} bytes of helper code and {} bytes of body for {}",
            code.helpers.len(),
            code.body.len(),
            target.name
        );

        self.stage(target, Stage::CodeBound, || {
            probe.bind_code(&code, &self.probe.accessor)
        })?;

        self.stage(target, Stage::Recompiled, || {
            remove_stale(&self.paths.compiled)?;
            self.compile()
        })?;

        let payload = self.stage(target, Stage::Deployed, || {
            let program = CompiledProgram::load(&self.paths.compiled)?;
            self.sandbox
                .call_getter(&program, &self.probe.accessor, self.probe.deploy_value)
        })?;

        self.stage(target, Stage::Persisted, || {
            let artifact = DeployArtifact::from_hex(&target.name, &payload)?;
            self.paths.artifacts().persist(&artifact)
        })
    }

    fn stage<T>(
        &self,
        target: &BuildTarget,
        stage: Stage,
        step: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        tracing::info!("[{}] {}", target.name, stage);
        if let Some(cb) = self.callback {
            cb.on_stage_started(&target.name, stage);
        }

        let value = step().map_err(|source| Error::Stage {
            target: target.name.clone(),
            stage,
            source: Box::new(source),
        })?;

        if let Some(cb) = self.callback {
            cb.on_stage_completed(&target.name, stage);
        }
        Ok(value)
    }

    fn compile(&self) -> Result<()> {
        let args = vec!["build".to_string(), self.probe.name.clone()];
        self.runner
            .run(self.compiler, &args, OutputMode::Capture)?
            .check(self.compiler)?;
        Ok(())
    }
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::write(path, e)),
    }
}
