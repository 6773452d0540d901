use serde::Serialize;

use crate::domain::models::{BuildOutcome, CommitPair, CommitState};

/// Orchestrator state, reported on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Initializing,
    AwaitingTestResult,
    Recording,
    Done,
}

impl OrchestratorState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::AwaitingTestResult => "awaiting_test_result",
            Self::Recording => "recording",
            Self::Done => "done",
        }
    }
}

/// Something worth telling an operator about a running search.
///
/// Events are emitted before the action they describe can fail, so the event
/// stream alone shows where a crashed session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BisectEvent {
    SessionOpened {
        search_identifier: String,
        has_prior_progress: bool,
    },
    StateChanged {
        from: OrchestratorState,
        to: OrchestratorState,
    },
    Replaying {
        search_identifier: String,
    },
    StartingFresh {
        endpoints: CommitPair,
    },
    ValidatingCommit {
        revision: String,
    },
    Marking {
        revision: String,
        state: CommitState,
    },
    TestDispatched {
        revision: String,
        attempt: u32,
    },
    TestCompleted {
        revision: String,
        outcome: BuildOutcome,
    },
    VerdictReached {
        revision: String,
        verdict: CommitState,
    },
    LogPersisted {
        search_identifier: String,
        bytes: usize,
    },
    NextCandidate {
        revision: String,
    },
    HandedOff {
        revision: String,
        frontier: CommitPair,
    },
    CulpritFound {
        revision: String,
    },
    Failed {
        reason: String,
    },
}

/// Explicit progress collaborator passed to the orchestrator.
pub trait BisectReporter: Send + Sync {
    fn report(&self, event: BisectEvent);
}
