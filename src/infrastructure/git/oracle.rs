//! `git bisect` bound to the [`VcsOracle`] port.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::bisect_log;
use super::command::{CommandOutput, GitCommandRunner};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BisectionResult, CommitPair, CommitState, OracleConfig};
use crate::domain::ports::VcsOracle;

/// Ref git keeps pointing at the current candidate in `--no-checkout` mode.
const BISECT_HEAD: &str = "BISECT_HEAD";

/// Oracle backed by the `git bisect` command line.
pub struct GitBisectOracle {
    runner: GitCommandRunner,
    scratch_dir: PathBuf,
}

impl GitBisectOracle {
    pub fn new(runner: GitCommandRunner, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        let runner = GitCommandRunner::new(&config.git_command, &config.repository);
        let scratch_dir = config
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        info!(git_command = %config.git_command, repository = %config.repository.display(), "Using git oracle");
        Self::new(runner, scratch_dir)
    }

    /// Turn the stdout of a mark/replay into a result.
    ///
    /// A converged search is answered from the completion line. Until both a
    /// good and a bad revision are in the log there is no candidate, even
    /// though `--no-checkout` points `BISECT_HEAD` at `HEAD` from the start.
    async fn interpret(&self, output: &CommandOutput) -> DomainResult<BisectionResult> {
        if let Some(line) = bisect_log::find_completion_line(&output.stdout) {
            let culprit = bisect_log::revision_from_completion_line(line).ok_or_else(|| {
                DomainError::OracleOutput(format!("no revision in completion line '{line}'"))
            })?;
            return Ok(BisectionResult::found(culprit));
        }

        let log = self.runner.run_checked(&["bisect", "log"]).await?;
        if bisect_log::frontier(&log.stdout).is_none() {
            debug!("Waiting for the other end of the range, no candidate yet");
            return Ok(BisectionResult::pending());
        }

        self.current_candidate().await.map(BisectionResult::next)
    }

    async fn current_candidate(&self) -> DomainResult<String> {
        let output = self
            .runner
            .run_checked(&["rev-parse", "--verify", "--quiet", BISECT_HEAD])
            .await?;
        let revision = output.stdout.lines().next().unwrap_or_default().trim();
        if revision.is_empty() {
            return Err(DomainError::OracleOutput(format!(
                "rev-parse {BISECT_HEAD} returned nothing"
            )));
        }
        Ok(revision.to_string())
    }
}

#[async_trait]
impl VcsOracle for GitBisectOracle {
    #[instrument(skip(self))]
    async fn check_exists(&self, revision: &str) -> DomainResult<bool> {
        let object = format!("{revision}^{{commit}}");
        let output = self.runner.run(&["cat-file", "-e", &object]).await?;
        if !output.success() {
            warn!(
                revision,
                exit_code = ?output.exit_code,
                stderr = %output.stderr,
                "Commit does not exist in the repository"
            );
        }
        Ok(output.success())
    }

    #[instrument(skip(self))]
    async fn reset_session(&self) -> DomainResult<()> {
        self.runner.run_checked(&["bisect", "reset"]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn start_session(&self) -> DomainResult<()> {
        self.runner
            .run_checked(&["bisect", "start", "--no-checkout"])
            .await?;
        Ok(())
    }

    #[instrument(skip(self, state), fields(state = %state))]
    async fn mark_commit(
        &self,
        revision: &str,
        state: CommitState,
    ) -> DomainResult<BisectionResult> {
        let output = self
            .runner
            .run_checked(&["bisect", state.as_str(), revision])
            .await?;
        self.interpret(&output).await
    }

    #[instrument(skip(self, log), fields(bytes = log.len()))]
    async fn replay_log(&self, log: &str) -> DomainResult<BisectionResult> {
        if let Some(culprit) = bisect_log::culprit_from_output(log) {
            info!(culprit = %culprit, "Log already names the first bad commit, skipping replay");
            return Ok(BisectionResult::found(culprit));
        }

        fs::create_dir_all(&self.scratch_dir).await?;
        let replay_file = self
            .scratch_dir
            .join(format!("bisector-replay-{}.log", Uuid::new_v4()));
        fs::write(&replay_file, log).await?;

        let replay_path = replay_file.to_string_lossy().into_owned();
        let result = self.runner.run_checked(&["bisect", "replay", &replay_path]).await;

        if let Err(err) = fs::remove_file(&replay_file).await {
            warn!(path = %replay_file.display(), error = %err, "Failed to remove replay file");
        }

        self.interpret(&result?).await
    }

    #[instrument(skip(self))]
    async fn fetch_log(&self) -> DomainResult<String> {
        let output = self.runner.run_checked(&["bisect", "log"]).await?;
        let mut log = output.stdout;
        log.push('\n');
        Ok(log)
    }

    fn read_frontier(&self, log: &str) -> Option<CommitPair> {
        bisect_log::frontier(log)
    }
}
