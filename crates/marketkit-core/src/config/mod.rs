//! Project configuration.
//!
//! Settings are read from an optional `marketkit.toml` at the project root.
//! Every section falls back to the layout of the marketplace contracts
//! repository, so a project without the file works out of the box:
//!
//! ```toml
//! contracts = ["TonSimpleSale", "Marketplace"]
//!
//! [paths]
//! constants = "contracts/imports/constants.tolk"
//! output_dir = "deploy_functions_compiled"
//!
//! [tools]
//! blueprint = ["npx", "blueprint"]
//!
//! [[deploy_functions]]
//! name = "TonSimpleSale"
//! path = "fix_price_sales/ton_simple_sale"
//!
//! [[profiles.mainnet]]
//! token = "MARKETPLACE_ADDRESS"
//! env = "MARKETPLACE_ADDRESS"
//! ```
//!
//! Profile entries naming an environment variable are resolved from the
//! process environment first, then from an optional `.env` file next to
//! `marketkit.toml`.

mod profiles;
mod registry;

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::toolchain::ToolCommand;

pub use profiles::{Profile, ProfileEntry, ProfilesConfig, ReplacementSet};
pub use registry::{BuildTarget, TargetRegistry};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "marketkit.toml";

/// Optional dotenv file with address variables.
pub const ENV_FILE: &str = ".env";

/// Locations of the files the tool reads and mutates, relative to the
/// project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Shared constants file rewritten per profile.
    pub constants: PathBuf,

    /// Probe module source compiled to discover deploy function code.
    pub probe_source: PathBuf,

    /// Assembly listing the compiler writes for the probe module.
    pub listing: PathBuf,

    /// Compiled probe program (JSON with a `hex` code field).
    pub compiled: PathBuf,

    /// Directory receiving one `.boc` file per target.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            constants: PathBuf::from("contracts/imports/constants.tolk"),
            probe_source: PathBuf::from("contracts/get_deploy_functions.tolk"),
            listing: PathBuf::from("build/DeployFunctions/DeployFunctions.fif"),
            compiled: PathBuf::from("build/DeployFunctions.compiled.json"),
            output_dir: PathBuf::from("deploy_functions_compiled"),
        }
    }
}

/// External command lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Contract build/test/run front end.
    pub blueprint: ToolCommand,

    /// Sandbox runner that deploys a compiled program and calls a getter.
    ///
    /// Receives `--program <compiled json> --getter <name> --value <nanotons>`
    /// and prints the resulting hex BoC as its last stdout line
    /// (see [`crate::sandbox`]).
    pub sandbox: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            blueprint: ToolCommand::new("npx", ["blueprint"]),
            sandbox: ToolCommand::new("npx", ["ts-node", "scripts/callDeployFunctionGetter.ts"]),
        }
    }
}

/// Probe program settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Build target name of the probe module.
    pub name: String,

    /// Getter exposing the embedded deploy function cell.
    pub accessor: String,

    /// Amount (nanotons) the sandbox funds the probe with on deploy.
    pub deploy_value: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            name: "DeployFunctions".to_string(),
            accessor: "getDeployFunctionCell".to_string(),
            deploy_value: 1_000_000_000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    contracts: Option<Vec<String>>,
    #[serde(default)]
    paths: PathsConfig,
    #[serde(default)]
    tools: ToolsConfig,
    #[serde(default)]
    probe: ProbeConfig,
    #[serde(default)]
    deploy_functions: Option<Vec<BuildTarget>>,
    #[serde(default)]
    profiles: ProfilesConfig,
}

/// Fully loaded project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub probe: ProbeConfig,

    /// Contracts expanded by `--all` for build and test.
    pub contracts: Vec<String>,

    /// Deploy-function targets.
    pub registry: TargetRegistry,

    pub profiles: ProfilesConfig,

    /// Variables read from the project's `.env` file.
    pub dotenv: FxHashMap<String, String>,
}

impl ProjectConfig {
    /// Load configuration for the project rooted at `root`.
    ///
    /// Uses built-in defaults when `marketkit.toml` is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let raw = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
            toml::from_str(&text)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, root.display());
            RawConfig::default()
        };

        let mut config = Self::from_raw(raw)?;
        config.dotenv = load_dotenv(&root.join(ENV_FILE))?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let registry = TargetRegistry::new(
            raw.deploy_functions
                .unwrap_or_else(registry::default_deploy_functions),
        )?;

        Ok(Self {
            paths: raw.paths,
            tools: raw.tools,
            probe: raw.probe,
            contracts: raw.contracts.unwrap_or_else(registry::default_contracts),
            registry,
            profiles: raw.profiles,
            dotenv: FxHashMap::default(),
        })
    }

    /// Value of an environment variable, preferring the process environment
    /// over `.env`.
    pub fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .or_else(|| self.dotenv.get(name).cloned())
    }

    /// Resolve an address profile against the environment.
    pub fn replacement_set(&self, profile: Profile) -> ReplacementSet {
        self.profiles
            .replacement_set_with(profile, &|var| self.env_var(var))
    }
}

fn load_dotenv(path: &Path) -> Result<FxHashMap<String, String>> {
    if !path.exists() {
        return Ok(FxHashMap::default());
    }

    let invalid = |e: dotenvy::Error| Error::Config(format!("{}: {}", path.display(), e));
    let vars = dotenvy::from_path_iter(path)
        .map_err(invalid)?
        .map(|item| item.map_err(invalid))
        .collect::<Result<FxHashMap<_, _>>>()?;

    tracing::debug!("Loaded {} variable(s) from {}", vars.len(), path.display());
    Ok(vars)
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            tools: ToolsConfig::default(),
            probe: ProbeConfig::default(),
            contracts: registry::default_contracts(),
            registry: TargetRegistry::new(registry::default_deploy_functions())
                .expect("built-in targets are unique"),
            profiles: ProfilesConfig::default(),
            dotenv: FxHashMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = ProjectConfig::load(temp.path()).expect("Failed to load config");

        assert_eq!(config.contracts.len(), 13);
        assert!(config.registry.get("MultipleOffer").is_ok());
        assert_eq!(config.probe.accessor, "getDeployFunctionCell");
        assert_eq!(
            config.paths.constants,
            PathBuf::from("contracts/imports/constants.tolk")
        );
    }

    #[test]
    fn test_partial_file_overrides_sections() {
        let config = ProjectConfig::from_toml_str(
            r#"
contracts = ["A", "B"]

[paths]
output_dir = "out"

[tools]
blueprint = ["./bp.sh", "--quiet"]

[[deploy_functions]]
name = "A"
path = "sales/a"

[[profiles.test]]
token = "MARKETPLACE_ADDRESS"
value = "EQtest"
"#,
        )
        .expect("Failed to parse config");

        assert_eq!(config.contracts, vec!["A", "B"]);
        assert_eq!(config.paths.output_dir, PathBuf::from("out"));
        // Unset keys keep their defaults.
        assert_eq!(
            config.paths.listing,
            PathBuf::from("build/DeployFunctions/DeployFunctions.fif")
        );
        assert_eq!(config.tools.blueprint.program(), "./bp.sh");
        assert_eq!(config.registry.len(), 1);
        assert_eq!(config.profiles.test.len(), 1);
        assert_eq!(config.profiles.mainnet.len(), 12);
    }

    #[test]
    fn test_dotenv_feeds_env_profile_entries() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            temp.path().join(CONFIG_FILE),
            r#"
[[profiles.mainnet]]
token = "MARKETPLACE_ADDRESS"
env = "MARKETKIT_DOTENV_MARKETPLACE"

[[profiles.mainnet]]
token = "ADMIN_ADDRESS"
env = "MARKETKIT_DOTENV_UNSET"
"#,
        )
        .unwrap();
        fs::write(
            temp.path().join(ENV_FILE),
            "# addresses\nMARKETKIT_DOTENV_MARKETPLACE=EQfromdotenv\n",
        )
        .unwrap();

        let config = ProjectConfig::load(temp.path()).expect("Failed to load config");
        let set = config.replacement_set(Profile::Mainnet);

        assert_eq!(set.value_of("\"MARKETPLACE_ADDRESS\""), Some("\"EQfromdotenv\""));
        assert_eq!(set.value_of("\"ADMIN_ADDRESS\""), Some("\"\""));
    }

    #[test]
    fn test_malformed_dotenv_is_config_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp.path().join(ENV_FILE), "NOT A VALID LINE\n").unwrap();

        let err = ProjectConfig::load(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let err = ProjectConfig::from_toml_str("[paths]\nconstant = \"x\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_tool_command_rejected() {
        let err = ProjectConfig::from_toml_str("[tools]\nblueprint = []\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
