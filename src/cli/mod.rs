//! Command-line interface

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::errors::DomainError;
use crate::domain::models::Config;
use crate::infrastructure::config::{ConfigError, ConfigLoader};

#[derive(Parser)]
#[command(name = "bisector")]
#[command(about = "Bisector - find the commit that broke a downstream build", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .bisector/
    #[arg(long, global = true, env = "BISECTOR_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default configuration to .bisector/config.yaml
    Init(commands::init::InitArgs),

    /// Run a whole bisection in this process
    Run(commands::run::RunArgs),

    /// Perform one chained bisection step for the current build
    Step(commands::step::StepArgs),

    /// Show the recorded progress of a search
    Status(commands::status::StatusArgs),
}

/// Load and validate configuration for a command.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Exit code for a failed command.
///
/// 2 for setup problems, 3 when the downstream build could not produce a
/// verdict, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let invalid_config = err.chain().any(|cause| {
        cause.is::<ConfigError>() || cause.is::<figment::Error>()
    });
    if invalid_config {
        return 2;
    }

    match err.chain().find_map(|cause| cause.downcast_ref::<DomainError>()) {
        Some(domain) if domain.is_configuration_error() => 2,
        Some(domain) if domain.is_downstream_crash() => 3,
        _ => 1,
    }
}

/// Report `err` and terminate the process.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": causes,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(exit_code(&err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::BuildOutcome;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        let missing: Result<()> =
            Err(DomainError::CommitNotFound("a1".into())).context("Bisection failed");
        assert_eq!(exit_code(&missing.unwrap_err()), 2);

        let crashed = anyhow::Error::new(DomainError::DownstreamCrashed {
            revision: "c5".into(),
            outcome: BuildOutcome::Aborted,
        });
        assert_eq!(exit_code(&crashed), 3);

        let invalid: Result<()> =
            Err(ConfigError::EmptyGitCommand).context("Failed to load configuration");
        assert_eq!(exit_code(&invalid.unwrap_err()), 2);

        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "bisector", "run", "--search-id", "nightly", "--good", "a1", "--bad", "b9",
            "--param", "SUITE=smoke", "--no-continue",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.search_id, "nightly");
                assert_eq!(args.good.as_deref(), Some("a1"));
                assert!(args.no_continue);
                assert_eq!(args.params, vec![("SUITE".to_string(), "smoke".to_string())]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_rejects_malformed_param() {
        assert!(Cli::try_parse_from(["bisector", "run", "--search-id", "x", "--param", "SUITE"])
            .is_err());
    }
}
