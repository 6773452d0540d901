//! Implementation of the `bisector run` command (loop mode).

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::application::Bisector;
use crate::cli::commands::parse_param;
use crate::cli::load_config;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{BuildParameters, CommitPair};
use crate::services::{BisectOutcome, BisectRequest};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stable name of the search; progress is resumed under this name
    #[arg(long, env = "BISECTOR_SEARCH_ID")]
    pub search_id: String,

    /// Last commit known to pass (required unless resuming)
    #[arg(long, requires = "bad")]
    pub good: Option<String>,

    /// First commit known to fail (required unless resuming)
    #[arg(long, requires = "good")]
    pub bad: Option<String>,

    /// Stop after one recorded step instead of running to the end
    #[arg(long)]
    pub no_continue: bool,

    /// Extra build parameter passed to every test (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub search_identifier: String,
    #[serde(flatten)]
    pub outcome: BisectOutcome,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        match &self.outcome {
            BisectOutcome::Found {
                culprit,
                steps,
                tests_dispatched,
            } => format!(
                "First bad commit: {culprit}\n\nSearch '{}' finished ({steps} step(s), {tests_dispatched} test(s) in this run)",
                self.search_identifier
            ),
            BisectOutcome::Paused {
                next_candidate,
                frontier,
                ..
            } => {
                let mut lines = vec![format!(
                    "Search '{}' paused. Next commit to be tested: {next_candidate}",
                    self.search_identifier
                )];
                if let Some(frontier) = frontier {
                    lines.push(format!("Known boundary: {frontier}"));
                }
                lines.push("Run the same command again to continue.".to_string());
                lines.join("\n")
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RunArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if args.no_continue {
        config.orchestrator.continue_automatically = false;
    }

    let bisector = Bisector::from_config(&config)?;
    let request = BisectRequest {
        search_identifier: args.search_id.clone(),
        endpoints: args.good.zip(args.bad).map(|(good, bad)| CommitPair::new(good, bad)),
        parameters: args.params.into_iter().collect::<BuildParameters>(),
    };

    let outcome = bisector
        .orchestrator()
        .run(&request)
        .await
        .with_context(|| format!("Bisection '{}' failed", args.search_id))?;

    output(
        &RunOutput {
            search_identifier: args.search_id,
            outcome,
        },
        json_mode,
    );
    Ok(())
}
