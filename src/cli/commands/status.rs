//! Implementation of the `bisector status` command.

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use std::path::Path;

use crate::application::{session_status, SessionStatus};
use crate::cli::load_config;
use crate::cli::output::{base_table, output, state_cell, CommandOutput};
use crate::infrastructure::store::FileSessionStore;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Search to inspect
    #[arg(long, env = "BISECTOR_SEARCH_ID")]
    pub search_id: String,
}

impl CommandOutput for SessionStatus {
    fn to_human(&self) -> String {
        if !self.started {
            return format!("No bisection recorded for '{}'.", self.search_identifier);
        }

        let mut table = base_table(&["#", "Revision", "Verdict"]);
        for (index, decision) in self.decisions.iter().enumerate() {
            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(&decision.revision),
                state_cell(decision.state),
            ]);
        }

        let mut lines = vec![format!("Search: {}", self.search_identifier), table.to_string()];
        match (&self.culprit, &self.frontier) {
            (Some(culprit), _) => lines.push(format!("First bad commit: {culprit}")),
            (None, Some(frontier)) => lines.push(format!("In progress, known boundary: {frontier}")),
            (None, None) => lines.push("In progress".to_string()),
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: StatusArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let store = FileSessionStore::from_config(&config.store);

    let status = session_status(&store, &args.search_id).await?;
    output(&status, json_mode);
    Ok(())
}
