//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces infrastructure adapters implement:
//! - VcsOracle: the bisection-capable version control tool
//! - SessionStore: durable per-search decision logs
//! - BuildDispatcher: the downstream job runner
//! - BisectReporter: operator-facing progress events

pub mod build_dispatcher;
pub mod reporter;
pub mod session_store;
pub mod vcs_oracle;

pub use build_dispatcher::{BuildDispatcher, DispatchHandle};
pub use reporter::{BisectEvent, BisectReporter, OrchestratorState};
pub use session_store::{SessionHandle, SessionStore};
pub use vcs_oracle::VcsOracle;
