//! Common test utilities for integration tests
//!
//! Provides fake collaborators for the bisection ports and git repository
//! fixtures shared by the integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use bisector::domain::errors::{DomainError, DomainResult};
use bisector::domain::models::{
    BisectionResult, BuildOutcome, BuildParameters, CommitPair, CommitState,
};
use bisector::domain::ports::{
    BisectEvent, BisectReporter, BuildDispatcher, DispatchHandle, SessionStore, VcsOracle,
};
use bisector::infrastructure::git::bisect_log;
use bisector::infrastructure::store::FileSessionStore;
use bisector::services::{BisectOrchestrator, ContinuationBridge, OrchestratorSettings};

/// Commits `c0..c{len-1}` of a linear history, oldest first.
pub fn linear_history(len: usize) -> Vec<String> {
    (0..len).map(|i| format!("c{i}")).collect()
}

#[derive(Debug, Default)]
struct LinearState {
    good: Option<usize>,
    bad: Option<usize>,
    log: Vec<String>,
    done: bool,
}

/// In-memory stand-in for `git bisect` over a linear history.
///
/// Writes git-shaped log lines so the real log parsing applies, always picks
/// the midpoint as the next candidate, and counts every call that would
/// spawn a process.
pub struct LinearHistoryOracle {
    commits: Vec<String>,
    state: Mutex<LinearState>,
    invocations: AtomicUsize,
}

impl LinearHistoryOracle {
    pub fn new(commits: Vec<String>) -> Self {
        Self {
            commits,
            state: Mutex::new(LinearState::default()),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn invoke(&self) {
        self.invocations.fetch_add(1, Ordering::SeqCst);
    }

    fn index_of(&self, revision: &str) -> DomainResult<usize> {
        self.commits
            .iter()
            .position(|c| c == revision)
            .ok_or_else(|| DomainError::OracleCommandFailed {
                command: format!("git bisect mark {revision}"),
                exit_code: Some(128),
                stderr: format!("fatal: bad revision '{revision}'"),
            })
    }

    fn apply(&self, state: &mut LinearState, revision: &str, verdict: CommitState) -> DomainResult<BisectionResult> {
        let index = self.index_of(revision)?;
        match verdict {
            CommitState::Good => state.good = Some(state.good.map_or(index, |g| g.max(index))),
            CommitState::Bad => state.bad = Some(state.bad.map_or(index, |b| b.min(index))),
        }
        state.log.push(format!("# {verdict}: [{revision}] commit {revision}"));
        state.log.push(format!("git bisect {verdict} {revision}"));

        let (Some(good), Some(bad)) = (state.good, state.bad) else {
            return Ok(BisectionResult::pending());
        };
        if bad <= good + 1 {
            let culprit = &self.commits[bad];
            state.log.push(format!("# first bad commit: [{culprit}] commit {culprit}"));
            state.done = true;
            return Ok(BisectionResult::found(culprit.clone()));
        }
        Ok(BisectionResult::next(self.commits[(good + bad) / 2].clone()))
    }
}

#[async_trait]
impl VcsOracle for LinearHistoryOracle {
    async fn check_exists(&self, revision: &str) -> DomainResult<bool> {
        self.invoke();
        Ok(self.commits.iter().any(|c| c == revision))
    }

    async fn reset_session(&self) -> DomainResult<()> {
        self.invoke();
        *self.state.lock().unwrap() = LinearState::default();
        Ok(())
    }

    async fn start_session(&self) -> DomainResult<()> {
        self.invoke();
        let mut state = self.state.lock().unwrap();
        *state = LinearState::default();
        state.log.push("git bisect start '--no-checkout'".to_string());
        Ok(())
    }

    async fn mark_commit(&self, revision: &str, verdict: CommitState) -> DomainResult<BisectionResult> {
        self.invoke();
        let mut state = self.state.lock().unwrap();
        if state.log.is_empty() {
            return Err(DomainError::OracleCommandFailed {
                command: format!("git bisect {verdict} {revision}"),
                exit_code: Some(1),
                stderr: "You need to start by \"git bisect start\"".to_string(),
            });
        }
        self.apply(&mut state, revision, verdict)
    }

    async fn replay_log(&self, log: &str) -> DomainResult<BisectionResult> {
        if let Some(culprit) = bisect_log::culprit_from_output(log) {
            return Ok(BisectionResult::found(culprit));
        }

        self.invoke();
        let mut state = self.state.lock().unwrap();
        *state = LinearState::default();
        state.log.push("git bisect start '--no-checkout'".to_string());
        let mut result = BisectionResult::pending();
        for (revision, verdict) in bisect_log::decisions(log) {
            result = self.apply(&mut state, &revision, verdict)?;
        }
        Ok(result)
    }

    async fn fetch_log(&self) -> DomainResult<String> {
        self.invoke();
        let state = self.state.lock().unwrap();
        Ok(format!("{}\n", state.log.join("\n")))
    }

    fn read_frontier(&self, log: &str) -> Option<CommitPair> {
        bisect_log::frontier(log)
    }
}

/// Oracle reporting a fixed candidate sequence, regardless of verdicts.
pub struct ScriptedOracle {
    candidates: Mutex<VecDeque<String>>,
    culprit: String,
    missing: Vec<String>,
    marks: Mutex<Vec<(String, CommitState)>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    /// Yields `candidates` after both endpoints are marked, then `culprit`.
    pub fn new(candidates: &[&str], culprit: &str) -> Self {
        Self {
            candidates: Mutex::new(candidates.iter().map(|c| (*c).to_string()).collect()),
            culprit: culprit.to_string(),
            missing: Vec::new(),
            marks: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_missing(mut self, revision: &str) -> Self {
        self.missing.push(revision.to_string());
        self
    }

    pub fn marks(&self) -> Vec<(String, CommitState)> {
        self.marks.lock().unwrap().clone()
    }
}

#[async_trait]
impl VcsOracle for ScriptedOracle {
    async fn check_exists(&self, revision: &str) -> DomainResult<bool> {
        Ok(!self.missing.iter().any(|m| m == revision))
    }

    async fn reset_session(&self) -> DomainResult<()> {
        self.log.lock().unwrap().clear();
        Ok(())
    }

    async fn start_session(&self) -> DomainResult<()> {
        self.log.lock().unwrap().push("git bisect start '--no-checkout'".to_string());
        Ok(())
    }

    async fn mark_commit(&self, revision: &str, verdict: CommitState) -> DomainResult<BisectionResult> {
        let mut marks = self.marks.lock().unwrap();
        marks.push((revision.to_string(), verdict));
        self.log.lock().unwrap().push(format!("git bisect {verdict} {revision}"));

        // the first mark only establishes one end of the range
        if marks.len() == 1 {
            return Ok(BisectionResult::pending());
        }
        match self.candidates.lock().unwrap().pop_front() {
            Some(next) => Ok(BisectionResult::next(next)),
            None => {
                self.log
                    .lock()
                    .unwrap()
                    .push(format!("# first bad commit: [{}] culprit", self.culprit));
                Ok(BisectionResult::found(self.culprit.clone()))
            }
        }
    }

    async fn replay_log(&self, log: &str) -> DomainResult<BisectionResult> {
        Ok(bisect_log::culprit_from_output(log)
            .map_or_else(BisectionResult::pending, BisectionResult::found))
    }

    async fn fetch_log(&self) -> DomainResult<String> {
        Ok(format!("{}\n", self.log.lock().unwrap().join("\n")))
    }

    fn read_frontier(&self, log: &str) -> Option<CommitPair> {
        bisect_log::frontier(log)
    }
}

type OutcomeFn = dyn Fn(&str) -> BuildOutcome + Send + Sync;

/// Dispatcher deciding each build's outcome from the tested revision.
pub struct FnDispatcher {
    revision_parameter_name: String,
    outcome_for: Box<OutcomeFn>,
    pending: Mutex<Vec<(DispatchHandle, String)>>,
    dispatched: Mutex<Vec<BuildParameters>>,
    detached: Mutex<Vec<BuildParameters>>,
}

impl FnDispatcher {
    pub fn new(outcome_for: impl Fn(&str) -> BuildOutcome + Send + Sync + 'static) -> Self {
        Self {
            revision_parameter_name: "COMMIT".to_string(),
            outcome_for: Box::new(outcome_for),
            pending: Mutex::new(Vec::new()),
            dispatched: Mutex::new(Vec::new()),
            detached: Mutex::new(Vec::new()),
        }
    }

    /// Fails every revision from `first_bad` on.
    pub fn regression_at(commits: &[String], first_bad: &str) -> Self {
        let first_bad_index = commits.iter().position(|c| c == first_bad).unwrap();
        let commits = commits.to_vec();
        Self::new(move |revision| {
            let index = commits.iter().position(|c| c == revision).unwrap();
            if index >= first_bad_index {
                BuildOutcome::Failure
            } else {
                BuildOutcome::Success
            }
        })
    }

    /// Revisions tested through `dispatch`, in order.
    pub fn tested(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.get(&self.revision_parameter_name).map(str::to_string))
            .collect()
    }

    pub fn dispatched(&self) -> Vec<BuildParameters> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn detached(&self) -> Vec<BuildParameters> {
        self.detached.lock().unwrap().clone()
    }

    pub fn outcome_for(&self, revision: &str) -> BuildOutcome {
        (self.outcome_for)(revision)
    }
}

#[async_trait]
impl BuildDispatcher for FnDispatcher {
    async fn dispatch(&self, parameters: &BuildParameters) -> DomainResult<DispatchHandle> {
        let revision = parameters
            .get(&self.revision_parameter_name)
            .ok_or_else(|| DomainError::DispatchFailed("no revision parameter".to_string()))?
            .to_string();
        let handle = DispatchHandle::new();
        self.dispatched.lock().unwrap().push(parameters.clone());
        self.pending.lock().unwrap().push((handle.clone(), revision));
        Ok(handle)
    }

    async fn await_outcome(&self, handle: DispatchHandle) -> DomainResult<BuildOutcome> {
        let mut pending = self.pending.lock().unwrap();
        let position = pending
            .iter()
            .position(|(h, _)| *h == handle)
            .ok_or_else(|| DomainError::DispatchFailed("unknown handle".to_string()))?;
        let (_, revision) = pending.remove(position);
        Ok((self.outcome_for)(&revision))
    }

    async fn dispatch_detached(&self, parameters: &BuildParameters) -> DomainResult<DispatchHandle> {
        self.detached.lock().unwrap().push(parameters.clone());
        Ok(DispatchHandle::new())
    }
}

/// Reporter keeping every event.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<BisectEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<BisectEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl BisectReporter for RecordingReporter {
    fn report(&self, event: BisectEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// File store rooted in a temp directory.
pub fn temp_store() -> (TempDir, Arc<FileSessionStore>) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FileSessionStore::new(dir.path().join("sessions"), dir.path().join("scratch"));
    (dir, Arc::new(store))
}

/// Orchestrator over the given fakes with default settings.
pub fn orchestrator(
    oracle: Arc<dyn VcsOracle>,
    store: Arc<dyn SessionStore>,
    dispatcher: Arc<dyn BuildDispatcher>,
    reporter: Arc<dyn BisectReporter>,
    settings: OrchestratorSettings,
) -> Arc<BisectOrchestrator> {
    Arc::new(BisectOrchestrator::new(oracle, store, dispatcher, reporter, settings))
}

/// Bridge sharing `orchestrator`'s dispatcher and reporter.
pub fn bridge(
    orchestrator: Arc<BisectOrchestrator>,
    dispatcher: Arc<dyn BuildDispatcher>,
    reporter: Arc<dyn BisectReporter>,
) -> ContinuationBridge {
    ContinuationBridge::new(orchestrator, dispatcher, reporter)
}

/// Setup a git repository in a temp directory for testing
///
/// Creates an initialized git repo with an initial empty commit.
/// Returns the TempDir (for lifetime management) and the path to the repo.
pub fn setup_test_git_repo() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir for git repo");
    let path = dir.path().to_path_buf();

    git(&path, &["init", "--quiet"]);
    git(&path, &["config", "user.email", "test@test.com"]);
    git(&path, &["config", "user.name", "Test User"]);
    git(&path, &["commit", "--allow-empty", "--quiet", "-m", "initial commit"]);

    (dir, path)
}

/// Add `count` empty commits and return every commit hash, oldest first.
pub fn add_commits(repo: &Path, count: usize) -> Vec<String> {
    for i in 0..count {
        git(repo, &["commit", "--allow-empty", "--quiet", "-m", &format!("change {i}")]);
    }
    let output = git(repo, &["rev-list", "--reverse", "HEAD"]);
    output.lines().map(str::to_string).collect()
}

/// Whether a usable git binary is on PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Run git in `repo`, panicking on failure, and return trimmed stdout.
pub fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
