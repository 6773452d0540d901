//! CLI command implementations.

pub mod init;
pub mod run;
pub mod status;
pub mod step;

use crate::domain::models::BuildParameters;

/// clap value parser for `KEY=VALUE` pairs.
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    BuildParameters::parse_pair(raw)
}
