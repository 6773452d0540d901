//! Git subprocess invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};

/// Captured result of a git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Runs git in a fixed repository with stdout, stderr and exit status kept apart.
#[derive(Debug, Clone)]
pub struct GitCommandRunner {
    git_command: String,
    repository: PathBuf,
}

impl GitCommandRunner {
    pub fn new(git_command: impl Into<String>, repository: impl Into<PathBuf>) -> Self {
        Self {
            git_command: git_command.into(),
            repository: repository.into(),
        }
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Run git and return whatever it produced, whatever the exit status.
    pub async fn run(&self, args: &[&str]) -> DomainResult<CommandOutput> {
        debug!(command = %self.describe(args), "Running git");

        let output = Command::new(&self.git_command)
            .args(args)
            .current_dir(&self.repository)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| DomainError::OracleCommandFailed {
                command: self.describe(args),
                exit_code: None,
                stderr: format!("failed to launch: {err}"),
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        })
    }

    /// Run git and treat a non-zero exit as a fatal oracle error.
    pub async fn run_checked(&self, args: &[&str]) -> DomainResult<CommandOutput> {
        let output = self.run(args).await?;
        if output.success() {
            return Ok(output);
        }

        warn!(
            command = %self.describe(args),
            exit_code = ?output.exit_code,
            stderr = %output.stderr,
            stdout = %output.stdout,
            "Git command failed"
        );
        Err(DomainError::OracleCommandFailed {
            command: self.describe(args),
            exit_code: output.exit_code,
            stderr: output.stderr,
        })
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.git_command, args.join(" "))
    }
}
