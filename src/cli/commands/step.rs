//! Implementation of the `bisector step` command (chained mode).
//!
//! Meant to run at the end of every build of the job under test. Continuation
//! keys are picked up from the environment the previous step exported.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::application::Bisector;
use crate::cli::commands::parse_param;
use crate::cli::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{BuildOutcome, BuildParameters};
use crate::services::continuation_bridge::{is_continuation, CONTINUATION_KEYS};
use crate::services::{ChainOutcome, CurrentBuild};

#[derive(Args, Debug)]
pub struct StepArgs {
    /// Search name; continuation builds carry their own
    #[arg(long, env = "BISECTOR_SEARCH_ID")]
    pub search_id: Option<String>,

    /// Revision this build tested; continuation builds take it from their bundle
    #[arg(long, env = "GIT_COMMIT")]
    pub revision: Option<String>,

    /// Result of this build: success, failure, aborted or unknown
    #[arg(long, env = "BUILD_RESULT", value_parser = parse_outcome)]
    pub result: BuildOutcome,

    /// Last revision that passed, used to start a new search
    #[arg(long, env = "GIT_PREVIOUS_SUCCESSFUL_COMMIT")]
    pub previous_good: Option<String>,

    /// Parameter of this build, passed on to the next one (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

fn parse_outcome(raw: &str) -> Result<BuildOutcome, String> {
    BuildOutcome::from_str(raw).ok_or_else(|| {
        format!("unknown build result '{raw}' (expected success, failure, aborted or unknown)")
    })
}

#[derive(Debug, Serialize)]
pub struct StepOutput {
    #[serde(flatten)]
    pub outcome: ChainOutcome,
}

impl CommandOutput for StepOutput {
    fn to_human(&self) -> String {
        match &self.outcome {
            ChainOutcome::NotBisecting => {
                "Build did not fail and no bisection is running; nothing to do.".to_string()
            }
            ChainOutcome::Found {
                search_identifier,
                culprit,
            } => format!("First bad commit: {culprit}\n\nSearch '{search_identifier}' finished"),
            ChainOutcome::Continued {
                search_identifier,
                candidate,
                frontier,
                remaining,
            } => {
                let mut lines = vec![
                    format!("Next commit to be tested: {candidate}"),
                    format!("Known boundary: {frontier}"),
                    format!("Search: {search_identifier}"),
                ];
                if let Some((failures, successes)) = remaining {
                    lines.push(format!(
                        "Retesting: {failures} more failure(s) or {successes} more success(es) decide"
                    ));
                }
                lines.join("\n")
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// This build's parameters: the continuation keys found in the environment,
/// overridden by explicit `--param` values.
fn current_parameters(revision_parameter_name: &str, params: Vec<(String, String)>) -> BuildParameters {
    let inherited: BuildParameters = CONTINUATION_KEYS
        .iter()
        .copied()
        .chain(std::iter::once(revision_parameter_name))
        .filter_map(|key| std::env::var(key).ok().map(|value| (key, value)))
        .collect();
    let explicit: BuildParameters = params.into_iter().collect();
    BuildParameters::layered([&inherited, &explicit])
}

/// The revision this build tested. A continuation names it in its bundle,
/// which wins over `GIT_COMMIT` inherited from the build that dispatched it.
fn tested_revision(
    explicit: Option<String>,
    parameters: &BuildParameters,
    revision_parameter_name: &str,
) -> Result<String> {
    let from_bundle = parameters
        .get(revision_parameter_name)
        .filter(|_| is_continuation(parameters))
        .map(str::trim)
        .filter(|revision| !revision.is_empty());
    let revision = from_bundle.map(str::to_string).or(explicit).ok_or_else(|| {
        DomainError::MissingParameter("tested revision (--revision or GIT_COMMIT)".to_string())
    })?;
    Ok(revision)
}

pub async fn execute(args: StepArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let bisector = Bisector::from_config(&config)?;

    let revision_parameter_name = &config.continuation.revision_parameter_name;
    let parameters = current_parameters(revision_parameter_name, args.params);
    let revision = tested_revision(args.revision, &parameters, revision_parameter_name)?;

    let build = CurrentBuild {
        search_identifier: args.search_id,
        parameters,
        revision,
        outcome: args.result,
        previous_successful: args.previous_good,
    };

    let outcome = bisector
        .bridge()
        .run(&build)
        .await
        .with_context(|| format!("Bisection step for {} failed", build.revision))?;

    output(&StepOutput { outcome }, json_mode);
    Ok(())
}
