//! Bisection Orchestrator
//!
//! Drives one search through `Idle → Initializing → AwaitingTestResult →
//! Recording → (AwaitingTestResult | Done)`:
//! - resumes from the persisted log when one exists
//! - classifies each candidate through repeated downstream builds
//! - marks the verdict and publishes the log before moving on

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    BisectionResult, BuildOutcome, BuildParameters, ClassifierConfig, CommitPair, CommitState,
    Config,
};
use crate::domain::ports::{
    BisectEvent, BisectReporter, BuildDispatcher, OrchestratorState, SessionHandle, SessionStore,
    VcsOracle,
};
use crate::services::revision_classifier::RevisionClassifier;

/// Knobs the orchestrator needs from the loaded configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub classifier: ClassifierConfig,
    pub continue_automatically: bool,
    pub test_timeout: Option<Duration>,
    pub revision_parameter_name: String,
    pub default_parameters: BuildParameters,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            classifier: config.classifier,
            continue_automatically: config.orchestrator.continue_automatically,
            test_timeout: config.orchestrator.test_timeout_secs.map(Duration::from_secs),
            revision_parameter_name: config.continuation.revision_parameter_name.clone(),
            default_parameters: config.dispatcher.default_parameters.clone().into(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Live state of one search inside this process.
#[derive(Debug)]
pub struct SearchSession {
    handle: SessionHandle,
    frontier: Option<CommitPair>,
    state: OrchestratorState,
    next_candidate: Option<String>,
    culprit: Option<String>,
    steps: u32,
    tests_dispatched: u32,
}

impl SearchSession {
    fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            frontier: None,
            state: OrchestratorState::Idle,
            next_candidate: None,
            culprit: None,
            steps: 0,
            tests_dispatched: 0,
        }
    }

    pub fn search_identifier(&self) -> &str {
        self.handle.search_identifier()
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Known good/bad boundary, when it could be established.
    pub fn frontier(&self) -> Option<&CommitPair> {
        self.frontier.as_ref()
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn next_candidate(&self) -> Option<&str> {
        self.next_candidate.as_deref()
    }

    pub fn culprit(&self) -> Option<&str> {
        self.culprit.as_deref()
    }

    /// Verdicts recorded by this process.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn tests_dispatched(&self) -> u32 {
        self.tests_dispatched
    }
}

/// Input for a loop-mode search.
#[derive(Debug, Clone)]
pub struct BisectRequest {
    pub search_identifier: String,
    /// Required unless the store already holds progress for the identifier.
    pub endpoints: Option<CommitPair>,
    /// Parameters of the triggering build, layered under the bisection ones.
    pub parameters: BuildParameters,
}

/// How a loop-mode search ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BisectOutcome {
    Found {
        culprit: String,
        steps: u32,
        tests_dispatched: u32,
    },
    /// Automatic continuation is off; the search stopped after one step.
    Paused {
        next_candidate: String,
        frontier: Option<CommitPair>,
        steps: u32,
        tests_dispatched: u32,
    },
}

impl BisectOutcome {
    pub fn culprit(&self) -> Option<&str> {
        match self {
            Self::Found { culprit, .. } => Some(culprit),
            Self::Paused { .. } => None,
        }
    }
}

/// The resumable bisection state machine.
pub struct BisectOrchestrator {
    oracle: Arc<dyn VcsOracle>,
    store: Arc<dyn SessionStore>,
    dispatcher: Arc<dyn BuildDispatcher>,
    reporter: Arc<dyn BisectReporter>,
    settings: OrchestratorSettings,
}

impl BisectOrchestrator {
    pub fn new(
        oracle: Arc<dyn VcsOracle>,
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn BuildDispatcher>,
        reporter: Arc<dyn BisectReporter>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            oracle,
            store,
            dispatcher,
            reporter,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// A classifier with the configured budgets.
    pub fn new_classifier(&self) -> RevisionClassifier {
        RevisionClassifier::from_config(&self.settings.classifier)
    }

    /// Parameters for a build testing `candidate`: dispatcher defaults, then
    /// `own`, then the revision parameter.
    pub fn test_parameters(&self, candidate: &str, own: &BuildParameters) -> BuildParameters {
        let bisect =
            BuildParameters::new().with(&self.settings.revision_parameter_name, candidate);
        BuildParameters::layered([&self.settings.default_parameters, own, &bisect])
    }

    #[instrument(skip(self))]
    pub async fn open(&self, search_identifier: &str) -> DomainResult<SearchSession> {
        let handle = self.store.open(search_identifier).await?;
        self.reporter.report(BisectEvent::SessionOpened {
            search_identifier: handle.search_identifier().to_string(),
            has_prior_progress: handle.has_prior_progress(),
        });
        Ok(SearchSession::new(handle))
    }

    /// Bring the oracle to the session's current position.
    ///
    /// Prior progress is replayed; otherwise the search starts from
    /// `endpoints`, which must then be given.
    #[instrument(skip_all, fields(search_identifier = %session.search_identifier()))]
    pub async fn initialize(
        &self,
        session: &mut SearchSession,
        endpoints: Option<&CommitPair>,
    ) -> DomainResult<BisectionResult> {
        self.transition(session, OrchestratorState::Initializing);

        let result = if session.handle.has_prior_progress() {
            let result = self.replay(session, endpoints).await?;
            match endpoints {
                // A log cut short before both ends were marked
                Some(endpoints) if result.is_pending() => {
                    warn!("Persisted log has no candidate, starting over from the endpoints");
                    self.start_fresh(session, endpoints).await?
                }
                _ => result,
            }
        } else {
            let endpoints = endpoints.ok_or_else(|| {
                DomainError::MissingParameter("good and bad commits".to_string())
            })?;
            self.start_fresh(session, endpoints).await?
        };

        self.settle(session, &result)?;
        Ok(result)
    }

    async fn replay(
        &self,
        session: &mut SearchSession,
        endpoints: Option<&CommitPair>,
    ) -> DomainResult<BisectionResult> {
        self.reporter.report(BisectEvent::Replaying {
            search_identifier: session.search_identifier().to_string(),
        });
        let log = session.handle.prior_log().unwrap_or_default().to_string();
        let result = self.oracle.replay_log(&log).await?;
        session.frontier = self
            .oracle
            .read_frontier(&log)
            .or_else(|| endpoints.cloned());
        Ok(result)
    }

    async fn start_fresh(
        &self,
        session: &mut SearchSession,
        endpoints: &CommitPair,
    ) -> DomainResult<BisectionResult> {
        self.reporter.report(BisectEvent::StartingFresh {
            endpoints: endpoints.clone(),
        });

        for revision in [&endpoints.good_commit, &endpoints.bad_commit] {
            self.reporter.report(BisectEvent::ValidatingCommit {
                revision: revision.clone(),
            });
            if !self.oracle.check_exists(revision).await? {
                return Err(DomainError::CommitNotFound(revision.clone()));
            }
        }

        self.oracle.reset_session().await?;
        self.oracle.start_session().await?;
        self.mark(&endpoints.good_commit, CommitState::Good).await?;
        let result = self.mark(&endpoints.bad_commit, CommitState::Bad).await?;
        self.persist(session).await?;

        session.frontier = Some(endpoints.clone());
        Ok(result)
    }

    /// Test `candidate` until the classifier reaches a verdict.
    ///
    /// One build is outstanding at a time. A build that neither passes nor
    /// fails ends the search.
    #[instrument(skip(self, session, parameters), fields(search_identifier = %session.search_identifier()))]
    pub async fn classify(
        &self,
        session: &mut SearchSession,
        candidate: &str,
        parameters: &BuildParameters,
    ) -> DomainResult<CommitState> {
        let parameters = self.test_parameters(candidate, parameters);
        let mut classifier = self.new_classifier();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.reporter.report(BisectEvent::TestDispatched {
                revision: candidate.to_string(),
                attempt,
            });
            session.tests_dispatched += 1;

            let outcome = self.run_test(candidate, &parameters).await?;
            if let Some(verdict) = self.observe(session, candidate, outcome, &mut classifier)? {
                return Ok(verdict);
            }
            debug!(candidate, budgets = ?classifier.budgets(), "Revision still undecided");
        }
    }

    async fn run_test(
        &self,
        candidate: &str,
        parameters: &BuildParameters,
    ) -> DomainResult<BuildOutcome> {
        let handle = self.dispatcher.dispatch(parameters).await?;
        let wait = self.dispatcher.await_outcome(handle);

        match self.settings.test_timeout {
            Some(limit) => timeout(limit, wait)
                .await
                .map_err(|_| DomainError::TestTimedOut {
                    revision: candidate.to_string(),
                    seconds: limit.as_secs(),
                })?,
            None => wait.await,
        }
    }

    /// Feed one finished build into `classifier`.
    ///
    /// Returns the verdict once decided. Builds that were aborted or could not
    /// tell are a [`DomainError::DownstreamCrashed`].
    pub fn observe(
        &self,
        session: &mut SearchSession,
        candidate: &str,
        outcome: BuildOutcome,
        classifier: &mut RevisionClassifier,
    ) -> DomainResult<Option<CommitState>> {
        self.transition(session, OrchestratorState::AwaitingTestResult);
        self.reporter.report(BisectEvent::TestCompleted {
            revision: candidate.to_string(),
            outcome,
        });

        let success = outcome
            .as_test_result()
            .ok_or_else(|| DomainError::DownstreamCrashed {
                revision: candidate.to_string(),
                outcome,
            })?;
        classifier.record_outcome(success);

        let verdict = classifier.verdict();
        if let Some(verdict) = verdict {
            self.reporter.report(BisectEvent::VerdictReached {
                revision: candidate.to_string(),
                verdict,
            });
        }
        Ok(verdict)
    }

    /// Mark `candidate` and publish the log before returning.
    #[instrument(skip(self, session), fields(search_identifier = %session.search_identifier()))]
    pub async fn record(
        &self,
        session: &mut SearchSession,
        candidate: &str,
        verdict: CommitState,
    ) -> DomainResult<BisectionResult> {
        self.transition(session, OrchestratorState::Recording);

        let result = self.mark(candidate, verdict).await?;
        self.persist(session).await?;

        session.steps += 1;
        session.frontier = session
            .frontier
            .as_ref()
            .map(|frontier| frontier.narrowed(candidate, verdict));

        self.settle(session, &result)?;
        Ok(result)
    }

    /// Drop this process's working copy of the log.
    pub async fn close(&self, session: SearchSession) -> DomainResult<()> {
        self.store.cleanup(session.handle).await
    }

    /// Loop mode: run the whole search (or one step when automatic
    /// continuation is off) inside this process.
    #[instrument(skip(self, request), fields(search_identifier = %request.search_identifier))]
    pub async fn run(&self, request: &BisectRequest) -> DomainResult<BisectOutcome> {
        let mut session = self.open(&request.search_identifier).await?;
        let outcome = self.drive(&mut session, request).await;

        if let Err(err) = &outcome {
            self.reporter.report(BisectEvent::Failed {
                reason: err.to_string(),
            });
        }
        if let Err(err) = self.close(session).await {
            warn!(error = %err, "Failed to remove local session copy");
        }
        outcome
    }

    async fn drive(
        &self,
        session: &mut SearchSession,
        request: &BisectRequest,
    ) -> DomainResult<BisectOutcome> {
        let mut result = self
            .initialize(session, request.endpoints.as_ref())
            .await?;

        loop {
            if result.is_done {
                return Ok(BisectOutcome::Found {
                    culprit: result.commit,
                    steps: session.steps,
                    tests_dispatched: session.tests_dispatched,
                });
            }

            let candidate = result.commit;
            let verdict = self
                .classify(session, &candidate, &request.parameters)
                .await?;
            result = self.record(session, &candidate, verdict).await?;

            if !result.is_done && !self.settings.continue_automatically {
                return Ok(BisectOutcome::Paused {
                    next_candidate: result.commit,
                    frontier: session.frontier.clone(),
                    steps: session.steps,
                    tests_dispatched: session.tests_dispatched,
                });
            }
        }
    }

    async fn mark(&self, revision: &str, state: CommitState) -> DomainResult<BisectionResult> {
        self.reporter.report(BisectEvent::Marking {
            revision: revision.to_string(),
            state,
        });
        self.oracle.mark_commit(revision, state).await
    }

    async fn persist(&self, session: &mut SearchSession) -> DomainResult<()> {
        let log = self.oracle.fetch_log().await?;
        self.store.save(&mut session.handle, &log).await?;
        self.reporter.report(BisectEvent::LogPersisted {
            search_identifier: session.search_identifier().to_string(),
            bytes: log.len(),
        });
        Ok(())
    }

    /// Move the session to where `result` leaves it.
    fn settle(&self, session: &mut SearchSession, result: &BisectionResult) -> DomainResult<()> {
        if result.is_done {
            session.next_candidate = None;
            session.culprit = Some(result.commit.clone());
            self.reporter.report(BisectEvent::CulpritFound {
                revision: result.commit.clone(),
            });
            self.transition(session, OrchestratorState::Done);
            return Ok(());
        }

        if result.is_pending() {
            return Err(DomainError::OracleOutput(
                "no candidate after both ends of the range were marked".to_string(),
            ));
        }

        session.next_candidate = Some(result.commit.clone());
        self.reporter.report(BisectEvent::NextCandidate {
            revision: result.commit.clone(),
        });
        self.transition(session, OrchestratorState::AwaitingTestResult);
        Ok(())
    }

    fn transition(&self, session: &mut SearchSession, to: OrchestratorState) {
        let from = session.state;
        if from == to {
            return;
        }
        session.state = to;
        self.reporter.report(BisectEvent::StateChanged { from, to });
    }
}
