use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for Bisector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Bisection oracle (git) configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Session log persistence
    #[serde(default)]
    pub store: StoreConfig,

    /// Retry policy for classifying a single revision
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Loop-mode behavior
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Chained-mode parameter names
    #[serde(default)]
    pub continuation: ContinuationConfig,

    /// Downstream build command
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// Git executable
    #[serde(default = "default_git_command")]
    pub git_command: String,

    /// Repository the bisection runs in
    #[serde(default = "default_repository")]
    pub repository: PathBuf,

    /// Where replay files are written (defaults to the system temp dir)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn default_git_command() -> String {
    "git".to_string()
}

fn default_repository() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            git_command: default_git_command(),
            repository: default_repository(),
            scratch_dir: None,
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Directory holding one canonical log per search identifier
    #[serde(default = "default_store_root")]
    pub root_dir: PathBuf,

    /// Where process-local working copies live (defaults to the system temp dir)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Refuse to publish when the canonical log changed since it was read
    #[serde(default)]
    pub detect_conflicts: bool,
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".bisector/sessions")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: default_store_root(),
            scratch_dir: None,
            detect_conflicts: false,
        }
    }
}

/// Revision classifier configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassifierConfig {
    /// Failures tolerated before a revision is declared bad
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Successes required before a revision is declared good (>= 1)
    #[serde(default = "default_min_successful_iterations")]
    pub min_successful_iterations: u32,
}

const fn default_retry_count() -> u32 {
    1
}

const fn default_min_successful_iterations() -> u32 {
    1
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            min_successful_iterations: default_min_successful_iterations(),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Keep testing until the culprit is found; when false, stop after one step
    #[serde(default = "default_true")]
    pub continue_automatically: bool,

    /// Upper bound on a single downstream test, unbounded when unset
    #[serde(default)]
    pub test_timeout_secs: Option<u64>,
}

const fn default_true() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            continue_automatically: true,
            test_timeout_secs: None,
        }
    }
}

/// Continuation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContinuationConfig {
    /// Parameter carrying the revision a dispatched build must check out
    #[serde(default = "default_revision_parameter_name")]
    pub revision_parameter_name: String,
}

fn default_revision_parameter_name() -> String {
    "COMMIT".to_string()
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            revision_parameter_name: default_revision_parameter_name(),
        }
    }
}

/// Downstream build command configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatcherConfig {
    /// Program run once per test; parameters are exported as environment variables
    #[serde(default)]
    pub program: Option<String>,

    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory of the program
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Parameters every dispatched build receives unless overridden
    #[serde(default)]
    pub default_parameters: BTreeMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
