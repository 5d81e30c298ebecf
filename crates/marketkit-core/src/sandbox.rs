//! Sandboxed deployment of the compiled deploy-function module.
//!
//! The module is deployed to a disposable local chain, funded, and its getter
//! is called. The chain emulator is an external node tool; this module only
//! defines the seam and the command-line adapter for it.
//!
//! # Sandbox command contract
//!
//! `tools.sandbox` is invoked from the project root as
//!
//! ```text
//! <command> --program <path/to/X.compiled.json> --getter <name> --value <nanotons>
//! ```
//!
//! The command reads the `hex` field of the compiled program, deploys it to
//! a local emulator funded with `--value` nanotons, calls `--getter`, and
//! prints the returned cell as a hex BoC on the last non-empty stdout line.
//! Any other output before that line is ignored. A non-zero exit status is
//! reported as a tool failure. The project supplies the script; the default
//! command expects it at `scripts/callDeployFunctionGetter.ts`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::toolchain::{OutputMode, ToolCommand, ToolRunner};

/// Compiled program as written by the compiler (`*.compiled.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompiledProgram {
    /// Code cell serialized as a hex BoC.
    pub hex: String,
    /// File the program was loaded from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl CompiledProgram {
    /// Load a compiled program, rejecting files without code.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        let mut program: Self = serde_json::from_str(&text).map_err(|e| {
            Error::Config(format!("{} is not a compiled program: {}", path.display(), e))
        })?;

        if program.hex.trim().is_empty() {
            return Err(Error::Payload(format!(
                "{} contains no code",
                path.display()
            )));
        }
        program.path = path.to_path_buf();
        Ok(program)
    }
}

/// Deploys a program and calls one of its getters.
pub trait Sandbox {
    /// Deploy `program` with `deploy_value` nanotons, call `getter`, and
    /// return the resulting cell as a hex BoC.
    fn call_getter(&self, program: &CompiledProgram, getter: &str, deploy_value: u64)
    -> Result<String>;
}

/// Sandbox driven through an external command.
///
/// See the module docs for the arguments and output it must honor.
pub struct CommandSandbox<'a> {
    runner: &'a dyn ToolRunner,
    command: ToolCommand,
}

impl<'a> CommandSandbox<'a> {
    pub fn new(runner: &'a dyn ToolRunner, command: ToolCommand) -> Self {
        Self { runner, command }
    }
}

impl Sandbox for CommandSandbox<'_> {
    fn call_getter(
        &self,
        program: &CompiledProgram,
        getter: &str,
        deploy_value: u64,
    ) -> Result<String> {
        let args = vec![
            "--program".to_string(),
            program.path.display().to_string(),
            "--getter".to_string(),
            getter.to_string(),
            "--value".to_string(),
            deploy_value.to_string(),
        ];

        let output = self
            .runner
            .run(&self.command, &args, OutputMode::Capture)?
            .check(&self.command)?;

        last_line(&output.stdout)
            .map(str::to_string)
            .ok_or_else(|| Error::Payload(format!("{} printed no result", self.command)))
    }
}

fn last_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rfind(|l| !l.is_empty())
}
