use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{BuildOutcome, BuildParameters};

/// Reference to a dispatched downstream build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchHandle {
    pub id: Uuid,
    pub dispatched_at: DateTime<Utc>,
}

impl DispatchHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            dispatched_at: Utc::now(),
        }
    }
}

impl Default for DispatchHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Port for the system that runs a downstream test job.
#[async_trait]
pub trait BuildDispatcher: Send + Sync {
    /// Schedule a build with `parameters`.
    async fn dispatch(&self, parameters: &BuildParameters) -> DomainResult<DispatchHandle>;

    /// Wait for a dispatched build to reach a terminal state.
    async fn await_outcome(&self, handle: DispatchHandle) -> DomainResult<BuildOutcome>;

    /// Schedule a build nobody will wait for, used to hand a search off to the
    /// next independent process.
    async fn dispatch_detached(&self, parameters: &BuildParameters) -> DomainResult<DispatchHandle> {
        self.dispatch(parameters).await
    }
}
