//! marketkit CLI - build, test and package marketplace contracts.

mod execute;
mod progress;
mod style;
mod summary;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use marketkit_core::{Action, BatchOptions, BatchRequest, TargetSelection};

use crate::style::Tone;

#[derive(Parser)]
#[command(name = "marketkit")]
#[command(about = "Build, test and package marketplace contracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root containing contracts/ and marketkit.toml
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build contracts with mainnet or testnet constants
    Build {
        /// Contract to build
        contract: Option<String>,

        /// Build every contract
        #[arg(long, conflicts_with = "contract")]
        all: bool,

        /// Use testnet addresses
        #[arg(long)]
        testnet: bool,

        /// Extra arguments for the compiler (after `--`)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Run contract tests with test constants
    Test {
        /// Contract to test
        contract: Option<String>,

        /// Test every contract
        #[arg(long, conflicts_with = "contract")]
        all: bool,

        /// Print a gas report
        #[arg(long)]
        gas_report: bool,

        /// Extra arguments for the test runner (after `--`)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Run a script with mainnet or testnet constants
    Run {
        /// Script to run
        script: String,

        /// Use testnet addresses and pass --testnet to the script
        #[arg(long)]
        testnet: bool,

        /// Arguments forwarded to the script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Extract deploy functions into deploy_functions_compiled/
    #[command(alias = "get_deploy_functions")]
    GetDeployFunctions {
        /// Deploy-function target, or `all`
        target: Option<String>,

        /// Process every registered target
        #[arg(long, conflicts_with = "target")]
        all: bool,

        /// Use test constants with the marketplace override
        #[arg(long)]
        test: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = request(cli.command)
        .and_then(|request| execute::execute(&cli.project, &request));

    match result {
        Ok(status) => exit_code(status),
        Err(err) => {
            eprintln!("{} {:#}", style::paint(Tone::Fail, "error:"), err);
            let status = err
                .downcast_ref::<marketkit_core::Error>()
                .map_or(1, marketkit_core::Error::exit_code);
            exit_code(status)
        }
    }
}

fn request(command: Commands) -> anyhow::Result<BatchRequest> {
    let request = match command {
        Commands::Build {
            contract,
            all,
            testnet,
            args,
        } => BatchRequest::new(Action::Build, selection(contract, all)?).with_options(
            BatchOptions {
                testnet,
                extra_args: args,
                ..Default::default()
            },
        ),

        Commands::Test {
            contract,
            all,
            gas_report,
            args,
        } => BatchRequest::new(Action::Test, selection(contract, all)?).with_options(
            BatchOptions {
                gas_report,
                extra_args: args,
                ..Default::default()
            },
        ),

        Commands::Run {
            script,
            testnet,
            args,
        } => {
            // Once forwarding has started clap leaves `--testnet` in `args`.
            let testnet = testnet || args.iter().any(|a| a == "--testnet");
            BatchRequest::new(Action::Run, TargetSelection::Named(script)).with_options(
                BatchOptions {
                    testnet,
                    extra_args: args,
                    ..Default::default()
                },
            )
        }

        Commands::GetDeployFunctions { target, all, test } => {
            let all = all || target.as_deref() == Some("all");
            let target = target.filter(|t| t != "all");
            BatchRequest::new(Action::DeployFunctions, selection(target, all)?).with_options(
                BatchOptions {
                    test_constants: test,
                    ..Default::default()
                },
            )
        }
    };
    Ok(request)
}

fn selection(target: Option<String>, all: bool) -> anyhow::Result<TargetSelection> {
    match (target, all) {
        (_, true) => Ok(TargetSelection::All),
        (Some(name), false) => Ok(TargetSelection::Named(name)),
        (None, false) => anyhow::bail!("Specify a target name, `all`, or --all"),
    }
}

fn exit_code(status: i32) -> ExitCode {
    ExitCode::from(exit_status(status))
}

/// Fit a batch status into a process exit code, keeping failures non-zero.
fn exit_status(status: i32) -> u8 {
    match status {
        0 => 0,
        s => u8::try_from(s).ok().filter(|&c| c != 0).unwrap_or(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> BatchRequest {
        let cli = Cli::try_parse_from(args).expect("Failed to parse arguments");
        request(cli.command).expect("Failed to build request")
    }

    #[test]
    fn test_get_deploy_functions_all_spellings() {
        let spellings: [&[&str]; 2] = [
            &["marketkit", "get-deploy-functions", "all"],
            &["marketkit", "get_deploy_functions", "--all"],
        ];
        for args in spellings {
            let request = parse(args);
            assert_eq!(request.action, Action::DeployFunctions);
            assert_eq!(request.selection, TargetSelection::All);
        }

        let request = parse(&["marketkit", "get_deploy_functions", "Marketplace", "--test"]);
        assert_eq!(request.selection, TargetSelection::Named("Marketplace".into()));
        assert!(request.options.test_constants);
    }

    #[test]
    fn test_get_deploy_functions_requires_target() {
        let cli = Cli::try_parse_from(["marketkit", "get-deploy-functions", "--test"]).unwrap();
        let err = request(cli.command).unwrap_err();
        assert!(err.to_string().contains("`all`"));
    }

    #[test]
    fn test_run_collects_trailing_args() {
        let request = parse(&["marketkit", "run", "deployOffer", "--testnet", "--tonconnect"]);
        assert_eq!(request.selection, TargetSelection::Named("deployOffer".into()));
        assert!(request.options.testnet);
        assert_eq!(request.options.extra_args, vec!["--tonconnect"]);
    }

    #[test]
    fn test_run_testnet_after_forwarded_args() {
        let request = parse(&["marketkit", "run", "deployOffer", "--tonconnect", "--testnet"]);
        assert!(request.options.testnet);
        assert_eq!(request.options.extra_args, vec!["--tonconnect", "--testnet"]);
    }

    #[test]
    fn test_build_requires_target_or_all() {
        let cli = Cli::try_parse_from(["marketkit", "build"]).unwrap();
        assert!(request(cli.command).is_err());

        let request = parse(&["marketkit", "build", "--all", "--testnet", "--", "--verbose"]);
        assert_eq!(request.selection, TargetSelection::All);
        assert_eq!(request.options.extra_args, vec!["--verbose"]);
    }

    #[test]
    fn test_exit_code_keeps_failures_non_zero() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(2), 2);
        assert_eq!(exit_status(256), 1);
        assert_eq!(exit_status(-1), 1);
    }
}
