//! Bisector - resumable git bisection driven by downstream builds
//!
//! Bisector finds the first commit that breaks a downstream build when the
//! only way to judge a commit is to run the full build for it. It drives
//! `git bisect`, retries flaky results, and persists progress so a search
//! survives restarts or spans a chain of independent builds.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Bisection model, errors, and port traits
//! - **Service Layer** (`services`): Classifier, orchestrator, continuation bridge
//! - **Application Layer** (`application`): Adapter wiring and read models
//! - **Infrastructure Layer** (`infrastructure`): git, file store, build dispatcher, config, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use bisector::application::Bisector;
//! use bisector::domain::models::{BuildParameters, CommitPair};
//! use bisector::services::BisectRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = bisector::ConfigLoader::load()?;
//!     let engine = Bisector::from_config(&config)?;
//!     let outcome = engine
//!         .orchestrator()
//!         .run(&BisectRequest {
//!             search_identifier: "nightly".into(),
//!             endpoints: Some(CommitPair::new("v1.2.0", "main")),
//!             parameters: BuildParameters::new(),
//!         })
//!         .await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::Bisector;
pub use domain::models::{
    BisectionResult, BuildOutcome, BuildParameters, CommitPair, CommitState, Config,
};
pub use domain::ports::{BisectReporter, BuildDispatcher, SessionStore, VcsOracle};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BisectOrchestrator, BisectOutcome, BisectRequest, ChainOutcome, ContinuationBridge,
    RevisionClassifier,
};
