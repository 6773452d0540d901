//! Read-only view of a persisted search.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::models::{CommitPair, CommitState};
use crate::infrastructure::git::bisect_log;
use crate::infrastructure::store::FileSessionStore;

/// One recorded verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub revision: String,
    pub state: CommitState,
}

/// What the shared store knows about a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub search_identifier: String,
    pub started: bool,
    pub decisions: Vec<Decision>,
    pub frontier: Option<CommitPair>,
    pub culprit: Option<String>,
}

impl SessionStatus {
    /// Build the view from a log as published by the store.
    pub fn from_log(search_identifier: impl Into<String>, log: Option<&str>) -> Self {
        let log = log.unwrap_or_default();
        Self {
            search_identifier: search_identifier.into(),
            started: !log.trim().is_empty(),
            decisions: bisect_log::decisions(log)
                .into_iter()
                .map(|(revision, state)| Decision { revision, state })
                .collect(),
            frontier: bisect_log::frontier(log),
            culprit: bisect_log::culprit_from_output(log),
        }
    }

    pub const fn is_done(&self) -> bool {
        self.culprit.is_some()
    }
}

/// Load the status of `search_identifier` from the canonical log.
pub async fn session_status(
    store: &FileSessionStore,
    search_identifier: &str,
) -> Result<SessionStatus> {
    let log = store
        .read_canonical(search_identifier)
        .await
        .with_context(|| format!("Failed to read session '{search_identifier}'"))?;
    Ok(SessionStatus::from_log(search_identifier, log.as_deref()))
}
