//! Core engine for marketkit contract tooling.
//!
//! This crate provides:
//! - Project configuration (paths, tools, profiles, target registry)
//! - Transactional rewriting of the shared constants file
//! - Deploy-function extraction from compiler listings
//! - The per-target extraction pipeline and the batch coordinator
//! - Seams for external tools and the deployment sandbox

pub mod artifacts;
pub mod batch;
pub mod config;
pub mod constants;
pub mod error;
pub mod listing;
pub mod paths;
pub mod pipeline;
pub mod probe;
pub mod sandbox;
pub mod toolchain;

pub use artifacts::{DeployArtifact, DeployArtifacts};
pub use batch::{
    Action, BatchCoordinator, BatchOptions, BatchReport, BatchRequest, TargetOutcome,
    TargetSelection,
};
pub use config::{
    BuildTarget, Profile, ProfileEntry, ProfilesConfig, ProjectConfig, ReplacementSet,
    TargetRegistry,
};
pub use constants::{ConstantsFile, ConstantsGuard, ConstantsSnapshot};
pub use error::{Error, Result};
pub use listing::{AssemblyListing, ExtractedFunction, extract_function};
pub use paths::ProjectPaths;
pub use pipeline::{DeployFunctionPipeline, ProgressCallback, Stage};
pub use probe::ProbeModule;
pub use sandbox::{CommandSandbox, CompiledProgram, Sandbox};
pub use toolchain::{OutputMode, ProcessRunner, ToolCommand, ToolOutput, ToolRunner};
