//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports and the ambient
//! plumbing:
//! - git bisect oracle (subprocess)
//! - File-backed session store
//! - Command-line build dispatcher
//! - Tracing reporter
//! - Configuration management
//! - Logging infrastructure
//! - Project setup
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod dispatcher;
pub mod git;
pub mod logging;
pub mod reporter;
pub mod setup;
pub mod store;

pub use reporter::TracingReporter;
