//! Terminal status of a downstream build.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal result reported by a build dispatcher.
///
/// Only `Success` and `Failure` carry a verdict. `Aborted` and `Unknown` mean the
/// build crashed and the revision could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Success,
    Failure,
    Aborted,
    Unknown,
}

impl BuildOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Aborted => "aborted",
            Self::Unknown => "unknown",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" | "passed" => Some(Self::Success),
            "failure" | "failed" => Some(Self::Failure),
            "aborted" => Some(Self::Aborted),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// `Some(true)` for a passing test, `Some(false)` for a failing one,
    /// `None` when the build crashed.
    pub const fn as_test_result(&self) -> Option<bool> {
        match self {
            Self::Success => Some(true),
            Self::Failure => Some(false),
            Self::Aborted | Self::Unknown => None,
        }
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
