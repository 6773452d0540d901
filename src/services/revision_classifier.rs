//! Revision Classifier
//!
//! Turns repeated, possibly flaky test outcomes for one revision into a single
//! verdict. Two budgets count down independently, one per direction; whichever
//! reaches zero first decides.

use serde::{Deserialize, Serialize};

use crate::domain::models::{ClassifierConfig, CommitState};

/// Dual-countdown classifier for a single candidate revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionClassifier {
    remaining_failures: u32,
    remaining_successes: u32,
}

impl RevisionClassifier {
    /// `retry_count` failures make the revision bad, `min_successful_iterations`
    /// successes make it good.
    ///
    /// A `retry_count` of zero behaves like one: a single failing run decides.
    pub fn new(retry_count: u32, min_successful_iterations: u32) -> Self {
        Self {
            remaining_failures: retry_count.max(1),
            remaining_successes: min_successful_iterations,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.retry_count, config.min_successful_iterations)
    }

    /// Resume a classification whose budgets were carried over from another process.
    pub const fn from_budgets(remaining_failures: u32, remaining_successes: u32) -> Self {
        Self {
            remaining_failures,
            remaining_successes,
        }
    }

    /// `(remaining_failures, remaining_successes)`
    pub const fn budgets(&self) -> (u32, u32) {
        (self.remaining_failures, self.remaining_successes)
    }

    /// Count one test run. Outcomes after a decision are ignored.
    pub fn record_outcome(&mut self, success: bool) {
        if self.is_decided() {
            return;
        }
        if success {
            self.remaining_successes -= 1;
        } else {
            self.remaining_failures -= 1;
        }
    }

    pub const fn is_decided(&self) -> bool {
        self.remaining_failures == 0 || self.remaining_successes == 0
    }

    /// The verdict, once decided.
    pub const fn verdict(&self) -> Option<CommitState> {
        if self.remaining_successes == 0 {
            Some(CommitState::Good)
        } else if self.remaining_failures == 0 {
            Some(CommitState::Bad)
        } else {
            None
        }
    }
}
