use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Git command cannot be empty")]
    EmptyGitCommand,

    #[error("Invalid min_successful_iterations: {0}. Must be at least 1")]
    InvalidMinSuccessfulIterations(u32),

    #[error("Revision parameter name cannot be empty")]
    EmptyRevisionParameterName,

    #[error("Session store root directory cannot be empty")]
    EmptyStoreRoot,

    #[error("Invalid test_timeout_secs: {0}. Must be positive when set")]
    InvalidTestTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .bisector/config.yaml (project config, created by init)
    /// 3. .bisector/local.yaml (project local overrides, optional)
    /// 4. Environment variables (BISECTOR_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".bisector/config.yaml"))
            .merge(Yaml::file(".bisector/local.yaml"))
            .merge(Env::prefixed("BISECTOR_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.oracle.git_command.trim().is_empty() {
            return Err(ConfigError::EmptyGitCommand);
        }

        if config.store.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoreRoot);
        }

        // A zero success budget would declare every revision good untested
        if config.classifier.min_successful_iterations == 0 {
            return Err(ConfigError::InvalidMinSuccessfulIterations(
                config.classifier.min_successful_iterations,
            ));
        }

        if let Some(0) = config.orchestrator.test_timeout_secs {
            return Err(ConfigError::InvalidTestTimeout(0));
        }

        if config.continuation.revision_parameter_name.trim().is_empty() {
            return Err(ConfigError::EmptyRevisionParameterName);
        }

        if let Some(program) = &config.dispatcher.program {
            if program.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "dispatcher program cannot be empty".to_string(),
                ));
            }
        }

        if config
            .dispatcher
            .default_parameters
            .keys()
            .any(|key| key.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed(
                "dispatcher default parameter names cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
