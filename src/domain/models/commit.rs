//! Commit-level bisection values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict assigned to a tested commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    Good,
    Bad,
}

impl CommitState {
    /// The word the oracle expects (`good` / `bad`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "good" => Some(Self::Good),
            "bad" => Some(Self::Bad),
            _ => None,
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The known good/bad boundary of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPair {
    pub good_commit: String,
    pub bad_commit: String,
}

impl CommitPair {
    pub fn new(good_commit: impl Into<String>, bad_commit: impl Into<String>) -> Self {
        Self {
            good_commit: good_commit.into(),
            bad_commit: bad_commit.into(),
        }
    }

    /// Frontier after `revision` received `verdict`.
    pub fn narrowed(&self, revision: &str, verdict: CommitState) -> Self {
        match verdict {
            CommitState::Good => Self::new(revision, self.bad_commit.clone()),
            CommitState::Bad => Self::new(self.good_commit.clone(), revision),
        }
    }
}

impl fmt::Display for CommitPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "good {}, bad {}", self.good_commit, self.bad_commit)
    }
}

/// Outcome of a single oracle interaction.
///
/// When `is_done` is set, `commit` is the culprit. Otherwise it is the next
/// candidate to test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BisectionResult {
    pub commit: String,
    pub is_done: bool,
}

impl BisectionResult {
    pub fn next(commit: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            is_done: false,
        }
    }

    pub fn found(culprit: impl Into<String>) -> Self {
        Self {
            commit: culprit.into(),
            is_done: true,
        }
    }

    /// Only one end of the range is known; there is no candidate yet.
    pub fn pending() -> Self {
        Self {
            commit: String::new(),
            is_done: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.is_done && self.commit.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_state_round_trip() {
        assert_eq!(CommitState::from_str("GOOD"), Some(CommitState::Good));
        assert_eq!(CommitState::from_str("bad"), Some(CommitState::Bad));
        assert_eq!(CommitState::from_str("skip"), None);
        assert_eq!(CommitState::Bad.to_string(), "bad");
    }

    #[test]
    fn test_narrowed_frontier() {
        let pair = CommitPair::new("a1", "b9");
        assert_eq!(pair.narrowed("c5", CommitState::Good), CommitPair::new("c5", "b9"));
        assert_eq!(pair.narrowed("c3", CommitState::Bad), CommitPair::new("a1", "c3"));
    }

    #[test]
    fn test_pending_result() {
        assert!(BisectionResult::pending().is_pending());
        assert!(!BisectionResult::next("c5").is_pending());
        assert!(!BisectionResult::found("c3").is_pending());
    }
}
