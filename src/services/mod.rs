pub mod continuation_bridge;
pub mod orchestrator;
pub mod revision_classifier;

pub use continuation_bridge::{
    is_continuation, ChainOutcome, ContinuationBridge, ContinuationParameters, CurrentBuild,
};
pub use orchestrator::{
    BisectOrchestrator, BisectOutcome, BisectRequest, OrchestratorSettings, SearchSession,
};
pub use revision_classifier::RevisionClassifier;
