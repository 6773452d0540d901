//! Downstream builds run as local processes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BuildOutcome, BuildParameters, DispatcherConfig};
use crate::domain::ports::{BuildDispatcher, DispatchHandle};

/// Exit code git reserves for "this revision cannot be tested".
const CANNOT_TEST_EXIT_CODE: i32 = 125;

/// Runs a configured program per test with the build parameters exported as
/// environment variables.
pub struct CommandDispatcher {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    /// Variables of this process the build must not inherit.
    scrubbed_env: Vec<String>,
    running: Mutex<HashMap<uuid::Uuid, Child>>,
}

impl CommandDispatcher {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir,
            scrubbed_env: Vec::new(),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Keep `keys` of this process's environment away from spawned builds.
    /// Build parameters are exported afterwards and still apply.
    #[must_use]
    pub fn without_inherited<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scrubbed_env.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn scrubbed_env(&self) -> &[String] {
        &self.scrubbed_env
    }

    pub fn from_config(config: &DispatcherConfig) -> DomainResult<Self> {
        let program = config.program.clone().ok_or_else(|| {
            DomainError::MissingParameter("dispatcher.program".to_string())
        })?;
        Ok(Self::new(program, config.args.clone(), config.working_dir.clone()))
    }

    /// Awaited builds are killed when their wait is abandoned; detached ones
    /// outlive this process.
    fn spawn(&self, parameters: &BuildParameters, detached: bool) -> DomainResult<Child> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .kill_on_drop(!detached)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        for key in &self.scrubbed_env {
            command.env_remove(key);
        }
        for (key, value) in parameters.iter() {
            command.env(key, value);
        }

        command
            .spawn()
            .map_err(|err| DomainError::DispatchFailed(format!("{}: {err}", self.program)))
    }
}

/// Map a process exit status onto a build outcome.
pub fn outcome_from_status(status: ExitStatus) -> BuildOutcome {
    match status.code() {
        Some(0) => BuildOutcome::Success,
        Some(CANNOT_TEST_EXIT_CODE) => BuildOutcome::Unknown,
        Some(_) => BuildOutcome::Failure,
        None => terminated_outcome(status),
    }
}

#[cfg(unix)]
fn terminated_outcome(status: ExitStatus) -> BuildOutcome {
    use std::os::unix::process::ExitStatusExt;

    if status.signal().is_some() {
        BuildOutcome::Aborted
    } else {
        BuildOutcome::Unknown
    }
}

#[cfg(not(unix))]
fn terminated_outcome(_status: ExitStatus) -> BuildOutcome {
    BuildOutcome::Unknown
}

#[async_trait]
impl BuildDispatcher for CommandDispatcher {
    #[instrument(skip(self, parameters), fields(program = %self.program, parameters = parameters.len()))]
    async fn dispatch(&self, parameters: &BuildParameters) -> DomainResult<DispatchHandle> {
        let child = self.spawn(parameters, false)?;
        let handle = DispatchHandle::new();
        debug!(dispatch_id = %handle.id, pid = ?child.id(), "Downstream build started");
        self.running.lock().await.insert(handle.id, child);
        Ok(handle)
    }

    #[instrument(skip(self, handle), fields(dispatch_id = %handle.id))]
    async fn await_outcome(&self, handle: DispatchHandle) -> DomainResult<BuildOutcome> {
        let mut child = self.running.lock().await.remove(&handle.id).ok_or_else(|| {
            DomainError::DispatchFailed(format!("unknown dispatch {}", handle.id))
        })?;

        let status = child
            .wait()
            .await
            .map_err(|err| DomainError::DispatchFailed(err.to_string()))?;
        let outcome = outcome_from_status(status);
        info!(status = %status, outcome = %outcome, "Downstream build finished");
        Ok(outcome)
    }

    #[instrument(skip(self, parameters), fields(program = %self.program))]
    async fn dispatch_detached(&self, parameters: &BuildParameters) -> DomainResult<DispatchHandle> {
        let child = self.spawn(parameters, true)?;
        let handle = DispatchHandle::new();
        match child.id() {
            Some(pid) => info!(dispatch_id = %handle.id, pid, "Handed off to detached build"),
            None => warn!(dispatch_id = %handle.id, "Detached build exited immediately"),
        }
        Ok(handle)
    }
}
