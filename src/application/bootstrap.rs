//! Wiring of the concrete adapters into the bisection services.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::domain::models::Config;
use crate::domain::ports::{BisectReporter, BuildDispatcher, SessionStore, VcsOracle};
use crate::infrastructure::dispatcher::CommandDispatcher;
use crate::infrastructure::git::GitBisectOracle;
use crate::infrastructure::store::FileSessionStore;
use crate::infrastructure::TracingReporter;
use crate::services::continuation_bridge::CONTINUATION_KEYS;
use crate::services::{BisectOrchestrator, ContinuationBridge, OrchestratorSettings};

/// A fully wired bisection engine.
pub struct Bisector {
    orchestrator: Arc<BisectOrchestrator>,
    dispatcher: Arc<dyn BuildDispatcher>,
    reporter: Arc<dyn BisectReporter>,
}

impl Bisector {
    /// Wire the git oracle, file store, command dispatcher and tracing reporter
    /// from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let dispatcher = command_dispatcher(config)?;
        Ok(Self::with_dispatcher(config, Arc::new(dispatcher)))
    }

    /// Same as [`Bisector::from_config`] with a caller-provided dispatcher.
    pub fn with_dispatcher(config: &Config, dispatcher: Arc<dyn BuildDispatcher>) -> Self {
        let oracle: Arc<dyn VcsOracle> = Arc::new(GitBisectOracle::from_config(&config.oracle));
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::from_config(&config.store));
        let reporter: Arc<dyn BisectReporter> = Arc::new(TracingReporter);
        Self::from_parts(oracle, store, dispatcher, reporter, OrchestratorSettings::from_config(config))
    }

    pub fn from_parts(
        oracle: Arc<dyn VcsOracle>,
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn BuildDispatcher>,
        reporter: Arc<dyn BisectReporter>,
        settings: OrchestratorSettings,
    ) -> Self {
        let orchestrator = Arc::new(BisectOrchestrator::new(
            oracle,
            store,
            Arc::clone(&dispatcher),
            Arc::clone(&reporter),
            settings,
        ));
        Self {
            orchestrator,
            dispatcher,
            reporter,
        }
    }

    pub fn orchestrator(&self) -> &BisectOrchestrator {
        &self.orchestrator
    }

    /// Chained-mode entry point sharing this engine's collaborators.
    pub fn bridge(&self) -> ContinuationBridge {
        ContinuationBridge::new(
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.reporter),
        )
    }
}

/// Bundle keys this build received must not leak into the next one.
fn command_dispatcher(config: &Config) -> Result<CommandDispatcher> {
    let dispatcher = CommandDispatcher::from_config(&config.dispatcher)
        .context("A downstream build program is required (set dispatcher.program)")?;
    let revision_parameter_name = config.continuation.revision_parameter_name.as_str();
    Ok(dispatcher.without_inherited(
        CONTINUATION_KEYS
            .iter()
            .copied()
            .chain(std::iter::once(revision_parameter_name)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_dispatcher_program() {
        let err = Bisector::from_config(&Config::default()).err().unwrap();
        assert!(err.to_string().contains("dispatcher.program"));
    }

    #[test]
    fn test_wires_settings_from_config() {
        let mut config = Config::default();
        config.dispatcher.program = Some("true".to_string());
        config.continuation.revision_parameter_name = "REVISION".to_string();
        config.orchestrator.test_timeout_secs = Some(90);

        let bisector = Bisector::from_config(&config).unwrap();
        let settings = bisector.orchestrator().settings();
        assert_eq!(settings.revision_parameter_name, "REVISION");
        assert_eq!(settings.test_timeout, Some(std::time::Duration::from_secs(90)));
    }

    #[test]
    fn test_dispatcher_drops_inherited_bundle_keys() {
        let mut config = Config::default();
        config.dispatcher.program = Some("true".to_string());
        config.continuation.revision_parameter_name = "REVISION".to_string();

        let dispatcher = command_dispatcher(&config).unwrap();
        let scrubbed = dispatcher.scrubbed_env();
        for key in CONTINUATION_KEYS.iter().chain(&["REVISION"]) {
            assert!(scrubbed.iter().any(|k| k == key), "{key} is inherited");
        }
    }
}
