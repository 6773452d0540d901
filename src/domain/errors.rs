//! Domain errors for the bisection engine.

use thiserror::Error;

use super::models::BuildOutcome;

/// Domain-level errors that can occur while driving a bisection.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Commit not found in repository: {0} (did you forget the remote name?)")]
    CommitNotFound(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid search identifier '{0}': must be a non-empty file name")]
    InvalidSearchIdentifier(String),

    #[error("Oracle command '{command}' exited with {}: {stderr}", format_exit(.exit_code))]
    OracleCommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Unexpected oracle output: {0}")]
    OracleOutput(String),

    #[error("Invalid continuation parameters: {0}")]
    InvalidContinuation(String),

    #[error("Downstream build crashed for revision {revision} ({outcome}); you may want to skip it")]
    DownstreamCrashed {
        revision: String,
        outcome: BuildOutcome,
    },

    #[error("Failed to dispatch downstream build: {0}")]
    DispatchFailed(String),

    #[error("Downstream build for revision {revision} did not finish within {seconds}s")]
    TestTimedOut { revision: String, seconds: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Concurrency conflict: session log {0} was modified by another process")]
    ConcurrentModification(String),
}

impl DomainError {
    /// Errors caused by setup or environment; the session is aborted and never retried.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::CommitNotFound(_)
                | Self::MissingParameter(_)
                | Self::InvalidSearchIdentifier(_)
                | Self::OracleCommandFailed { .. }
                | Self::OracleOutput(_)
                | Self::InvalidContinuation(_)
        )
    }

    /// Errors where the downstream test could not produce a verdict.
    pub const fn is_downstream_crash(&self) -> bool {
        matches!(
            self,
            Self::DownstreamCrashed { .. } | Self::DispatchFailed(_) | Self::TestTimedOut { .. }
        )
    }
}

fn format_exit(code: &Option<i32>) -> String {
    code.map_or_else(
        || "no exit status".to_string(),
        |code| format!("exit code {code}"),
    )
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
