pub mod commit;
pub mod config;
pub mod outcome;
pub mod parameters;

pub use commit::{BisectionResult, CommitPair, CommitState};
pub use config::{
    ClassifierConfig, Config, ContinuationConfig, DispatcherConfig, LoggingConfig,
    OracleConfig, OrchestratorConfig, StoreConfig,
};
pub use outcome::BuildOutcome;
pub use parameters::BuildParameters;
