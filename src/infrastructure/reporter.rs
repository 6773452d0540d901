//! Bisection progress reported through `tracing`.

use tracing::{debug, error, info};

use crate::domain::ports::{BisectEvent, BisectReporter};

/// Forwards bisection events to the tracing subscriber under the `bisect` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl BisectReporter for TracingReporter {
    fn report(&self, event: BisectEvent) {
        match event {
            BisectEvent::SessionOpened {
                search_identifier,
                has_prior_progress,
            } => info!(target: "bisect", %search_identifier, has_prior_progress, "Session opened"),
            BisectEvent::StateChanged { from, to } => {
                debug!(target: "bisect", from = from.as_str(), to = to.as_str(), "State changed");
            }
            BisectEvent::Replaying { search_identifier } => {
                info!(target: "bisect", %search_identifier, "Replaying previous results");
            }
            BisectEvent::StartingFresh { endpoints } => info!(
                target: "bisect",
                good = %endpoints.good_commit,
                bad = %endpoints.bad_commit,
                "Starting bisection"
            ),
            BisectEvent::ValidatingCommit { revision } => {
                debug!(target: "bisect", %revision, "Checking commit exists");
            }
            BisectEvent::Marking { revision, state } => {
                info!(target: "bisect", %revision, state = state.as_str(), "Marking commit");
            }
            BisectEvent::TestDispatched { revision, attempt } => {
                info!(target: "bisect", %revision, attempt, "Running downstream build");
            }
            BisectEvent::TestCompleted { revision, outcome } => {
                info!(target: "bisect", %revision, outcome = outcome.as_str(), "Downstream build finished");
            }
            BisectEvent::VerdictReached { revision, verdict } => {
                info!(target: "bisect", %revision, verdict = verdict.as_str(), "Revision classified");
            }
            BisectEvent::LogPersisted {
                search_identifier,
                bytes,
            } => debug!(target: "bisect", %search_identifier, bytes, "Results copied to shared store"),
            BisectEvent::NextCandidate { revision } => {
                info!(target: "bisect", %revision, "Next commit to be tested");
            }
            BisectEvent::HandedOff { revision, frontier } => info!(
                target: "bisect",
                %revision,
                good = %frontier.good_commit,
                bad = %frontier.bad_commit,
                "Continuing bisection in a new build"
            ),
            BisectEvent::CulpritFound { revision } => {
                info!(target: "bisect", %revision, "Found the first bad commit");
            }
            BisectEvent::Failed { reason } => {
                error!(target: "bisect", %reason, "Bisection failed");
            }
        }
    }
}
