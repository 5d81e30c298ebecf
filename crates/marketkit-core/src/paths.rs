//! Project directory management.
//!
//! Resolves the configured relative paths against the project root so the
//! CLI and the pipeline agree on which files are shared:
//!
//! ```text
//! project/
//! ├── marketkit.toml
//! ├── contracts/
//! │   ├── imports/constants.tolk     # rewritten per profile, then restored
//! │   └── get_deploy_functions.tolk  # probe module, rewritten per target
//! ├── build/                         # compiler output (listing, compiled probe)
//! └── deploy_functions_compiled/     # one <Target>.boc per target
//! ```

use std::path::{Path, PathBuf};

use crate::artifacts::DeployArtifacts;
use crate::config::PathsConfig;

/// Absolute locations of the files a run touches.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Shared constants file.
    pub constants: PathBuf,

    /// Probe module source.
    pub probe_source: PathBuf,

    /// Compiler listing of the probe module.
    pub listing: PathBuf,

    /// Compiled probe program.
    pub compiled: PathBuf,

    /// Artifact output directory.
    pub output_dir: PathBuf,
}

impl ProjectPaths {
    /// Resolve configured paths against `root`.
    ///
    /// Nothing is created here; the output directory is created on first
    /// write.
    pub fn resolve(root: &Path, config: &PathsConfig) -> Self {
        let join = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };

        Self {
            constants: join(&config.constants),
            probe_source: join(&config.probe_source),
            listing: join(&config.listing),
            compiled: join(&config.compiled),
            output_dir: join(&config.output_dir),
        }
    }

    /// Artifact store rooted at the output directory.
    pub fn artifacts(&self) -> DeployArtifacts {
        DeployArtifacts::new(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut config = PathsConfig::default();
        let absolute = temp.path().join("elsewhere/out");
        config.output_dir = absolute.clone();

        let paths = ProjectPaths::resolve(temp.path(), &config);

        assert_eq!(
            paths.constants,
            temp.path().join("contracts/imports/constants.tolk")
        );
        assert_eq!(paths.output_dir, absolute);
    }

    #[test]
    fn test_artifacts_live_in_output_dir() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let paths = ProjectPaths::resolve(temp.path(), &PathsConfig::default());

        assert!(paths
            .artifacts()
            .path_for("TonSimpleSale")
            .ends_with("deploy_functions_compiled/TonSimpleSale.boc"));
        // Nothing is created until an artifact is persisted.
        assert!(!paths.output_dir.exists());
    }
}
