//! Project initialization for `bisector init`
//!
//! Creates the `.bisector/` directory with a commented default config and the
//! session store directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration template content
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Bisector Configuration
# Override settings by editing this file, adding .bisector/local.yaml, or setting
# environment variables with the BISECTOR_ prefix (use __ for nesting)
#
# Example environment variables:
#   export BISECTOR_CLASSIFIER__RETRY_COUNT=3
#   export BISECTOR_DISPATCHER__PROGRAM=./ci/run-tests.sh
#   export BISECTOR_LOGGING__LEVEL=debug

# Bisection oracle
oracle:
  # Git executable
  git_command: "git"

  # Repository the search runs in
  repository: "."

# Persisted search progress, one log per search identifier
store:
  root_dir: ".bisector/sessions"

  # Refuse to publish a log another process changed in the meantime
  detect_conflicts: false

# How often a revision is tested before it gets a verdict
classifier:
  # Failing runs before a revision is bad (0 behaves like 1)
  retry_count: 1

  # Passing runs before a revision is good
  min_successful_iterations: 1

orchestrator:
  # Keep testing until the culprit is found; false stops after one step
  continue_automatically: true

  # Upper bound for a single downstream build in seconds (unbounded when unset)
  # test_timeout_secs: 3600

# Chained mode
continuation:
  # Parameter telling a dispatched build which revision to test
  revision_parameter_name: "COMMIT"

# Downstream build, run once per test with parameters as environment variables
# Exit 0 = pass, 125 = cannot test, anything else = fail
dispatcher:
  # program: "./ci/run-tests.sh"
  args: []
  default_parameters: {}

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"

  # Log format: json, pretty
  format: "pretty"

  # Rolling JSON log files (stderr only when unset)
  # log_dir: ".bisector/logs"

  # Rotation: daily, hourly, never
  rotation: "daily"
"#;

/// Setup paths for a bisector project
#[derive(Debug, Clone)]
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub sessions_dir: PathBuf,
}

impl SetupPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let config_dir = root.as_ref().join(".bisector");
        Self {
            config_file: config_dir.join("config.yaml"),
            sessions_dir: config_dir.join("sessions"),
            config_dir,
        }
    }

    /// Check if the project is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

/// Create the configuration and session directories
pub fn create_dirs(paths: &SetupPaths) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for dir in [&paths.config_dir, &paths.sessions_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            created.push(dir.clone());
        }
    }
    Ok(created)
}

/// Create the default configuration file
///
/// Returns whether the file was written.
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    if paths.config_file.exists() && !force {
        return Ok(false);
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE)
        .context("Failed to write config file")?;

    Ok(true)
}
