//! Git integration
//!
//! - Subprocess runner with separated stdout/stderr/exit status
//! - Bisect output and log parsing
//! - The `git bisect` oracle adapter

pub mod bisect_log;
pub mod command;
pub mod oracle;

pub use command::{CommandOutput, GitCommandRunner};
pub use oracle::GitBisectOracle;
