//! External tool invocation.
//!
//! The contract compiler, test runner and sandbox are node tools driven
//! through `npx`. They are invoked synchronously through [`ToolRunner`],
//! which hides how the process is spawned so pipelines can be exercised with
//! scripted runners.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::error::{Error, Result};

/// A configured command line: program plus leading arguments.
///
/// Deserializes from a non-empty TOML array such as `["npx", "blueprint"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl TryFrom<Vec<String>> for ToolCommand {
    type Error = String;

    fn try_from(mut parts: Vec<String>) -> std::result::Result<Self, Self::Error> {
        if parts.is_empty() {
            return Err("tool command must name a program".to_string());
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a tool's stdout/stderr are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream to the terminal; nothing is captured.
    Inherit,
    /// Capture into [`ToolOutput`].
    Capture,
}

/// Exit status and captured output of one tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Convert a non-zero status into [`Error::ExternalTool`].
    pub fn check(self, command: &ToolCommand) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::ExternalTool {
                tool: command.to_string(),
                status: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs external commands to completion.
pub trait ToolRunner {
    /// Run `command` followed by `args` and wait for it to exit.
    ///
    /// A non-zero exit status is reported in [`ToolOutput::status`], not as
    /// an error; errors mean the process could not be run at all.
    fn run(&self, command: &ToolCommand, args: &[String], mode: OutputMode) -> Result<ToolOutput>;
}

/// Runs commands as child processes in the project directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Locate `program` on PATH unless it already names a path, which is
    /// taken relative to the working directory.
    fn resolve(&self, program: &str) -> Result<PathBuf> {
        if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
            return Ok(self.working_dir.join(program));
        }
        which::which(program)
            .map_err(|_| Error::Toolchain(format!("{} not found in PATH", program)))
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand, args: &[String], mode: OutputMode) -> Result<ToolOutput> {
        let program = self.resolve(command.program())?;

        let mut cmd = Command::new(&program);
        cmd.current_dir(&self.working_dir)
            .args(command.args())
            .args(args)
            .stdin(Stdio::null());

        tracing::debug!("Running {} {}", command, args.join(" "));

        let spawn_err = |e: std::io::Error| {
            Error::Toolchain(format!(
                "Failed to run {} (working dir: {}): {}",
                command,
                self.working_dir.display(),
                e
            ))
        };

        match mode {
            OutputMode::Inherit => {
                let status = cmd.status().map_err(spawn_err)?;
                Ok(ToolOutput {
                    // Killed by a signal: no code, report generic failure.
                    status: status.code().unwrap_or(1),
                    ..Default::default()
                })
            }
            OutputMode::Capture => {
                let output = cmd.output().map_err(spawn_err)?;
                Ok(ToolOutput {
                    status: output.status.code().unwrap_or(1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
        }
    }
}
