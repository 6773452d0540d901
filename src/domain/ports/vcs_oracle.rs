use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{BisectionResult, CommitPair, CommitState};

/// Port for a bisection-capable version control tool.
///
/// The oracle owns the good/bad frontier and computes the next untested
/// commit; callers only drive it through this protocol. All textual parsing of
/// the tool's responses stays behind this trait.
#[async_trait]
pub trait VcsOracle: Send + Sync {
    /// Whether `revision` resolves to a commit.
    ///
    /// A missing revision is `Ok(false)`; the caller decides whether that is fatal.
    async fn check_exists(&self, revision: &str) -> DomainResult<bool>;

    /// Drop any bisection state held by the oracle.
    async fn reset_session(&self) -> DomainResult<()>;

    /// Begin a new bisection without touching the working tree.
    async fn start_session(&self) -> DomainResult<()>;

    /// Record a verdict for `revision`.
    ///
    /// Returns the culprit once the oracle has converged, otherwise the next
    /// candidate to test.
    async fn mark_commit(&self, revision: &str, state: CommitState)
        -> DomainResult<BisectionResult>;

    /// Rebuild oracle state from a previously fetched log.
    ///
    /// A log that already names the culprit is answered from the text alone
    /// without invoking the tool.
    async fn replay_log(&self, log: &str) -> DomainResult<BisectionResult>;

    /// Full serialized decision history.
    async fn fetch_log(&self) -> DomainResult<String>;

    /// Latest good/bad boundary recorded in `log`, if both ends are present.
    fn read_frontier(&self, log: &str) -> Option<CommitPair>;
}
