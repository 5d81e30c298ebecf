//! Batch coordinator: runs one action over a list of targets.
//!
//! Every target gets its own constants transaction. A failing target is
//! recorded and the batch moves on; the report's status is the first
//! non-zero per-target status. Only failures on the shared constants file
//! itself stop the batch, since a later snapshot would otherwise capture
//! substituted content as the original.

use std::fmt;
use std::path::PathBuf;

use crate::config::{BuildTarget, Profile, ProjectConfig, ReplacementSet};
use crate::constants::ConstantsFile;
use crate::error::{Error, Result};
use crate::paths::ProjectPaths;
use crate::pipeline::{DeployFunctionPipeline, ProgressCallback, Stage};
use crate::sandbox::Sandbox;
use crate::toolchain::{OutputMode, ToolRunner};

/// What to do with each target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `blueprint build <contract>`.
    Build,
    /// `blueprint test [--gas-report] <contract>`.
    Test,
    /// `blueprint run <script>`.
    Run,
    /// Extract and persist deploy functions.
    DeployFunctions,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
            Self::Run => "run",
            Self::DeployFunctions => "get_deploy_functions",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Targets a batch covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelection {
    All,
    Named(String),
}

/// Action-specific switches.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Use testnet addresses (build, run). Forwarded to `run` only.
    pub testnet: bool,

    /// Ask the test runner for a gas report.
    pub gas_report: bool,

    /// Extract deploy functions with test addresses and the override.
    pub test_constants: bool,

    /// Arguments appended to the external command line.
    pub extra_args: Vec<String>,
}

/// A fully described batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub action: Action,
    pub selection: TargetSelection,
    pub options: BatchOptions,
}

impl BatchRequest {
    pub fn new(action: Action, selection: TargetSelection) -> Self {
        Self {
            action,
            selection,
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub target: String,

    /// Process-style status; zero on success.
    pub status: i32,

    /// Pipeline stage that failed, for deploy-function targets.
    pub stage: Option<Stage>,

    /// Failure description.
    pub error: Option<String>,

    /// Persisted artifact, for deploy-function targets.
    pub artifact: Option<PathBuf>,
}

impl TargetOutcome {
    fn succeeded(target: &str, artifact: Option<PathBuf>) -> Self {
        Self {
            target: target.to_string(),
            status: 0,
            stage: None,
            error: None,
            artifact,
        }
    }

    fn failed(target: &str, error: &Error) -> Self {
        Self {
            target: target.to_string(),
            status: error.exit_code(),
            stage: error.stage(),
            error: Some(error.to_string()),
            artifact: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Outcomes of a whole batch, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub action: Action,
    pub outcomes: Vec<TargetOutcome>,
}

impl BatchReport {
    /// First non-zero status, or zero when every target succeeded.
    pub fn status(&self) -> i32 {
        self.outcomes
            .iter()
            .map(|o| o.status)
            .find(|&s| s != 0)
            .unwrap_or(0)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

/// One unit of work.
enum Job<'r> {
    Contract(String),
    DeployFunction(&'r BuildTarget),
}

impl Job<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Contract(name) => name,
            Self::DeployFunction(target) => &target.name,
        }
    }
}

/// Drives targets through an [`Action`].
pub struct BatchCoordinator<'a> {
    config: &'a ProjectConfig,
    paths: &'a ProjectPaths,
    runner: &'a dyn ToolRunner,
    sandbox: &'a dyn Sandbox,
    callback: Option<&'a dyn ProgressCallback>,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(
        config: &'a ProjectConfig,
        paths: &'a ProjectPaths,
        runner: &'a dyn ToolRunner,
        sandbox: &'a dyn Sandbox,
    ) -> Self {
        Self {
            config,
            paths,
            runner,
            sandbox,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: &'a dyn ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run `request` over its targets.
    ///
    /// Target resolution errors are returned before any file is touched.
    /// Per-target failures end up in the report; only a failure to read,
    /// substitute, or restore the constants file is returned as an error.
    pub fn run(&self, request: &BatchRequest) -> Result<BatchReport> {
        let jobs = self.resolve(request)?;
        let base = self.base_set(request);
        let mut constants = ConstantsFile::new(&self.paths.constants);

        tracing::info!("{} {} target(s)", request.action, jobs.len());

        let mut outcomes = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            let name = job.name();
            if let Some(cb) = self.callback {
                cb.on_target_started(name, index, jobs.len());
            }

            let set = self.effective_set(request, &base, name);
            let outcome = constants
                .transaction(&set, || Ok(self.execute(request, job)))
                .inspect_err(|e| tracing::error!("[{}] aborting batch: {}", name, e))?;

            match (&outcome.error, outcome.stage) {
                (Some(error), Some(stage)) => {
                    tracing::error!("[{}] failed at {}: {}", name, stage, error)
                }
                (Some(error), None) => tracing::error!("[{}] failed: {}", name, error),
                (None, _) => tracing::info!("[{}] done", name),
            }

            if let Some(cb) = self.callback {
                cb.on_target_finished(&outcome);
            }
            outcomes.push(outcome);
        }

        Ok(BatchReport {
            action: request.action,
            outcomes,
        })
    }

    fn resolve(&self, request: &BatchRequest) -> Result<Vec<Job<'a>>> {
        let config = self.config;
        let jobs = match (request.action, &request.selection) {
            (Action::Build, TargetSelection::All) => config
                .contracts
                .iter()
                .map(|c| Job::Contract(c.replace('_', "")))
                .collect(),
            (Action::Test, TargetSelection::All) => config
                .contracts
                .iter()
                .map(|c| Job::Contract(c.clone()))
                .collect(),
            (Action::Run, TargetSelection::All) => {
                return Err(Error::Config("run needs a script name".to_string()));
            }
            (Action::Build | Action::Test | Action::Run, TargetSelection::Named(name)) => {
                vec![Job::Contract(name.clone())]
            }
            (Action::DeployFunctions, TargetSelection::All) => {
                config.registry.iter().map(Job::DeployFunction).collect()
            }
            (Action::DeployFunctions, TargetSelection::Named(name)) => {
                vec![Job::DeployFunction(config.registry.get(name)?)]
            }
        };
        Ok(jobs)
    }

    fn base_set(&self, request: &BatchRequest) -> ReplacementSet {
        let config = self.config;
        let network = if request.options.testnet {
            Profile::Testnet
        } else {
            Profile::Mainnet
        };

        match request.action {
            Action::Build | Action::Run => config.replacement_set(network),
            Action::Test => config.replacement_set(Profile::Test),
            Action::DeployFunctions if request.options.test_constants => {
                config.profiles.overridden(&config.replacement_set(Profile::Test))
            }
            Action::DeployFunctions => config.replacement_set(Profile::Mainnet),
        }
    }

    fn effective_set(
        &self,
        request: &BatchRequest,
        base: &ReplacementSet,
        target: &str,
    ) -> ReplacementSet {
        let profiles = &self.config.profiles;
        if request.action == Action::Test && profiles.is_aggregator(target) {
            tracing::debug!("Overriding {} for {}", profiles.override_token, target);
            profiles.overridden(base)
        } else {
            base.clone()
        }
    }

    fn execute(&self, request: &BatchRequest, job: &Job<'_>) -> TargetOutcome {
        match job {
            Job::Contract(name) => self.run_blueprint(request, name),
            Job::DeployFunction(target) => {
                let mut pipeline =
                    DeployFunctionPipeline::new(self.config, self.paths, self.runner, self.sandbox);
                if let Some(cb) = self.callback {
                    pipeline = pipeline.with_callback(cb);
                }
                match pipeline.run(target) {
                    Ok(path) => TargetOutcome::succeeded(&target.name, Some(path)),
                    Err(e) => TargetOutcome::failed(&target.name, &e),
                }
            }
        }
    }

    fn run_blueprint(&self, request: &BatchRequest, name: &str) -> TargetOutcome {
        let command = &self.config.tools.blueprint;
        let args = blueprint_args(request, name);
        tracing::debug!("Running {} {}", command, args.join(" "));

        let result = self
            .runner
            .run(command, &args, OutputMode::Inherit)
            .and_then(|output| output.check(command));

        match result {
            Ok(_) => TargetOutcome::succeeded(name, None),
            Err(e) => TargetOutcome::failed(name, &e),
        }
    }
}

const TESTNET_FLAG: &str = "--testnet";

fn blueprint_args(request: &BatchRequest, name: &str) -> Vec<String> {
    let options = &request.options;
    let mut args = vec![request.action.name().to_string()];

    match request.action {
        Action::Test => {
            if options.gas_report {
                args.push("--gas-report".to_string());
            }
            args.push(name.to_string());
        }
        Action::Run => {
            args.push(name.to_string());
            if options.testnet && !options.extra_args.iter().any(|a| a == TESTNET_FLAG) {
                args.push(TESTNET_FLAG.to_string());
            }
        }
        Action::Build | Action::DeployFunctions => args.push(name.to_string()),
    }

    args.extend(options.extra_args.iter().cloned());
    args
}
