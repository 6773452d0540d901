//! Continuation Bridge
//!
//! Chained mode: each build performs at most one bisection step on its own
//! result and hands the search to a freshly dispatched build through a small
//! bundle of parameters.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BuildOutcome, BuildParameters, CommitPair};
use crate::domain::ports::{BisectEvent, BisectReporter, BuildDispatcher};
use crate::services::orchestrator::{BisectOrchestrator, SearchSession};
use crate::services::revision_classifier::RevisionClassifier;

/// Marks a build as part of a running search.
pub const CONTINUATION_KEY: &str = "BISECT_CONTINUATION";
pub const GOOD_COMMIT_KEY: &str = "BISECT_GOOD_COMMIT";
pub const BAD_COMMIT_KEY: &str = "BISECT_BAD_COMMIT";
pub const SEARCH_IDENTIFIER_KEY: &str = "BISECT_SEARCH_IDENTIFIER";
pub const REMAINING_FAILURES_KEY: &str = "BISECT_REMAINING_FAILURES";
pub const REMAINING_SUCCESSES_KEY: &str = "BISECT_REMAINING_SUCCESSES";

/// Every key owned by the bundle, apart from the revision parameter.
pub const CONTINUATION_KEYS: [&str; 6] = [
    CONTINUATION_KEY,
    GOOD_COMMIT_KEY,
    BAD_COMMIT_KEY,
    SEARCH_IDENTIFIER_KEY,
    REMAINING_FAILURES_KEY,
    REMAINING_SUCCESSES_KEY,
];

/// Whether `parameters` carry a continuation.
pub fn is_continuation(parameters: &BuildParameters) -> bool {
    parameters
        .get(CONTINUATION_KEY)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Search state handed from one build to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinuationParameters {
    pub revision_parameter_name: String,
    /// Revision the receiving build tests.
    pub candidate: String,
    pub frontier: CommitPair,
    pub search_identifier: Option<String>,
    /// `(remaining_failures, remaining_successes)` of an unfinished classification.
    pub budgets: Option<(u32, u32)>,
}

impl ContinuationParameters {
    pub fn new(
        revision_parameter_name: impl Into<String>,
        candidate: impl Into<String>,
        frontier: CommitPair,
    ) -> Self {
        Self {
            revision_parameter_name: revision_parameter_name.into(),
            candidate: candidate.into(),
            frontier,
            search_identifier: None,
            budgets: None,
        }
    }

    #[must_use]
    pub fn with_search_identifier(mut self, search_identifier: impl Into<String>) -> Self {
        self.search_identifier = Some(search_identifier.into());
        self
    }

    #[must_use]
    pub const fn with_budgets(mut self, budgets: Option<(u32, u32)>) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn to_parameters(&self) -> BuildParameters {
        let mut parameters = BuildParameters::new()
            .with(&self.revision_parameter_name, &self.candidate)
            .with(GOOD_COMMIT_KEY, &self.frontier.good_commit)
            .with(BAD_COMMIT_KEY, &self.frontier.bad_commit)
            .with(CONTINUATION_KEY, "true");
        if let Some(search_identifier) = &self.search_identifier {
            parameters.insert(SEARCH_IDENTIFIER_KEY, search_identifier);
        }
        if let Some((failures, successes)) = self.budgets {
            parameters.insert(REMAINING_FAILURES_KEY, failures.to_string());
            parameters.insert(REMAINING_SUCCESSES_KEY, successes.to_string());
        }
        parameters
    }

    /// Decode the bundle, or `None` when `parameters` are not a continuation.
    pub fn from_parameters(
        parameters: &BuildParameters,
        revision_parameter_name: &str,
    ) -> DomainResult<Option<Self>> {
        if !is_continuation(parameters) {
            return Ok(None);
        }

        let required = |key: &str| {
            parameters
                .get(key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| DomainError::InvalidContinuation(format!("{key} is missing")))
        };

        let candidate = required(revision_parameter_name)?;
        let frontier = CommitPair::new(required(GOOD_COMMIT_KEY)?, required(BAD_COMMIT_KEY)?);
        let search_identifier = parameters
            .get(SEARCH_IDENTIFIER_KEY)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let budgets = match (
            parameters.get(REMAINING_FAILURES_KEY),
            parameters.get(REMAINING_SUCCESSES_KEY),
        ) {
            (None, None) => None,
            (Some(failures), Some(successes)) => Some((
                parse_budget(REMAINING_FAILURES_KEY, failures)?,
                parse_budget(REMAINING_SUCCESSES_KEY, successes)?,
            )),
            _ => {
                return Err(DomainError::InvalidContinuation(format!(
                    "{REMAINING_FAILURES_KEY} and {REMAINING_SUCCESSES_KEY} must be given together"
                )))
            }
        };

        Ok(Some(Self {
            revision_parameter_name: revision_parameter_name.to_string(),
            candidate,
            frontier,
            search_identifier,
            budgets,
        }))
    }

    /// `parameters` without any bundle keys, so a handoff never inherits stale ones.
    pub fn strip(parameters: &BuildParameters, revision_parameter_name: &str) -> BuildParameters {
        parameters
            .iter()
            .filter(|(key, _)| *key != revision_parameter_name && !CONTINUATION_KEYS.contains(key))
            .collect()
    }
}

fn parse_budget(key: &str, raw: &str) -> DomainResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(DomainError::InvalidContinuation(format!(
            "{key} must be positive"
        ))),
        Ok(budget) => Ok(budget),
        Err(err) => Err(DomainError::InvalidContinuation(format!("{key}: {err}"))),
    }
}

/// The build this process belongs to.
#[derive(Debug, Clone)]
pub struct CurrentBuild {
    /// Used when the parameters do not name a search; a fresh identifier is
    /// generated when neither does.
    pub search_identifier: Option<String>,
    /// Revision this build tested.
    pub revision: String,
    pub outcome: BuildOutcome,
    /// Last revision known to pass, required to start a new search.
    pub previous_successful: Option<String>,
    /// This build's own parameters, continuation keys included.
    pub parameters: BuildParameters,
}

/// What a chained step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainOutcome {
    /// Not part of a search and nothing failed.
    NotBisecting,
    Found {
        search_identifier: String,
        culprit: String,
    },
    /// The next build was dispatched.
    Continued {
        search_identifier: String,
        candidate: String,
        frontier: CommitPair,
        remaining: Option<(u32, u32)>,
    },
}

/// Runs one chained step per process.
pub struct ContinuationBridge {
    orchestrator: Arc<BisectOrchestrator>,
    dispatcher: Arc<dyn BuildDispatcher>,
    reporter: Arc<dyn BisectReporter>,
}

impl ContinuationBridge {
    pub fn new(
        orchestrator: Arc<BisectOrchestrator>,
        dispatcher: Arc<dyn BuildDispatcher>,
        reporter: Arc<dyn BisectReporter>,
    ) -> Self {
        Self {
            orchestrator,
            dispatcher,
            reporter,
        }
    }

    #[instrument(skip_all, fields(revision = %build.revision, outcome = %build.outcome))]
    pub async fn run(&self, build: &CurrentBuild) -> DomainResult<ChainOutcome> {
        let revision_parameter_name = &self.orchestrator.settings().revision_parameter_name;
        let bundle =
            ContinuationParameters::from_parameters(&build.parameters, revision_parameter_name)?;

        let start = match &bundle {
            Some(_) => None,
            None if build.outcome == BuildOutcome::Failure => {
                let good = build.previous_successful.clone().ok_or_else(|| {
                    DomainError::MissingParameter(
                        "previous successful commit (you may want to run the bisection from a separate job)"
                            .to_string(),
                    )
                })?;
                Some(CommitPair::new(good, build.revision.clone()))
            }
            None => {
                info!("Build did not fail and no bisection is running");
                return Ok(ChainOutcome::NotBisecting);
            }
        };

        let search_identifier = bundle
            .as_ref()
            .and_then(|bundle| bundle.search_identifier.clone())
            .or_else(|| build.search_identifier.clone())
            .unwrap_or_else(|| format!("chain-{}", Uuid::new_v4()));

        let mut session = self.orchestrator.open(&search_identifier).await?;
        let outcome = match (&bundle, &start) {
            (Some(bundle), _) => self.continue_search(&mut session, bundle, build).await,
            (None, Some(endpoints)) => self.start_search(&mut session, endpoints, build).await,
            (None, None) => Ok(ChainOutcome::NotBisecting),
        };

        if let Err(err) = &outcome {
            self.reporter.report(BisectEvent::Failed {
                reason: err.to_string(),
            });
        }
        if let Err(err) = self.orchestrator.close(session).await {
            warn!(error = %err, "Failed to remove local session copy");
        }
        outcome
    }

    async fn start_search(
        &self,
        session: &mut SearchSession,
        endpoints: &CommitPair,
        build: &CurrentBuild,
    ) -> DomainResult<ChainOutcome> {
        let result = self.orchestrator.initialize(session, Some(endpoints)).await?;
        if result.is_done {
            return Ok(found(session, result.commit));
        }

        let frontier = session.frontier().cloned().unwrap_or_else(|| endpoints.clone());
        self.hand_off(session, &result.commit, frontier, None, build).await
    }

    async fn continue_search(
        &self,
        session: &mut SearchSession,
        bundle: &ContinuationParameters,
        build: &CurrentBuild,
    ) -> DomainResult<ChainOutcome> {
        let result = self.orchestrator.initialize(session, Some(&bundle.frontier)).await?;
        if result.is_done {
            return Ok(found(session, result.commit));
        }

        let candidate = bundle.candidate.as_str();
        if result.commit != candidate {
            warn!(
                expected = %result.commit,
                tested = candidate,
                "Build tested a different revision than the oracle expects"
            );
        }

        let mut classifier = bundle.budgets.map_or_else(
            || self.orchestrator.new_classifier(),
            |(failures, successes)| RevisionClassifier::from_budgets(failures, successes),
        );

        let Some(verdict) = self
            .orchestrator
            .observe(session, candidate, build.outcome, &mut classifier)?
        else {
            let frontier = session
                .frontier()
                .cloned()
                .unwrap_or_else(|| bundle.frontier.clone());
            return self
                .hand_off(session, candidate, frontier, Some(classifier.budgets()), build)
                .await;
        };

        let result = self.orchestrator.record(session, candidate, verdict).await?;
        if result.is_done {
            return Ok(found(session, result.commit));
        }

        let frontier = session
            .frontier()
            .cloned()
            .unwrap_or_else(|| bundle.frontier.narrowed(candidate, verdict));
        self.hand_off(session, &result.commit, frontier, None, build).await
    }

    /// Dispatch the build that continues the search. The log is already published.
    async fn hand_off(
        &self,
        session: &SearchSession,
        candidate: &str,
        frontier: CommitPair,
        budgets: Option<(u32, u32)>,
        build: &CurrentBuild,
    ) -> DomainResult<ChainOutcome> {
        let revision_parameter_name = &self.orchestrator.settings().revision_parameter_name;
        let bundle = ContinuationParameters::new(revision_parameter_name, candidate, frontier)
            .with_search_identifier(session.search_identifier())
            .with_budgets(budgets);

        let own = ContinuationParameters::strip(&build.parameters, revision_parameter_name);
        let parameters = self
            .orchestrator
            .test_parameters(candidate, &BuildParameters::layered([&own, &bundle.to_parameters()]));

        self.reporter.report(BisectEvent::HandedOff {
            revision: candidate.to_string(),
            frontier: bundle.frontier.clone(),
        });
        self.dispatcher.dispatch_detached(&parameters).await?;

        Ok(ChainOutcome::Continued {
            search_identifier: session.search_identifier().to_string(),
            candidate: candidate.to_string(),
            frontier: bundle.frontier,
            remaining: budgets,
        })
    }
}

fn found(session: &SearchSession, culprit: String) -> ChainOutcome {
    ChainOutcome::Found {
        search_identifier: session.search_identifier().to_string(),
        culprit,
    }
}
