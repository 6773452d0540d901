use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::errors::DomainResult;

/// A process-local view of one search's persisted log.
///
/// Obtained from [`SessionStore::open`]; the canonical copy is shared by every
/// process taking part in the same search, the local copy belongs to this one.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    search_identifier: String,
    canonical_path: PathBuf,
    local_path: PathBuf,
    prior_log: Option<String>,
    last_published: Option<String>,
}

impl SessionHandle {
    pub fn new(
        search_identifier: impl Into<String>,
        canonical_path: PathBuf,
        local_path: PathBuf,
        prior_log: Option<String>,
    ) -> Self {
        Self {
            search_identifier: search_identifier.into(),
            canonical_path,
            local_path,
            last_published: prior_log.clone(),
            prior_log,
        }
    }

    pub fn search_identifier(&self) -> &str {
        &self.search_identifier
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical_path
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// True iff a canonical log existed at open time and was not blank.
    pub fn has_prior_progress(&self) -> bool {
        self.prior_log
            .as_deref()
            .is_some_and(|log| !log.trim().is_empty())
    }

    /// The canonical log as read at open time.
    pub fn prior_log(&self) -> Option<&str> {
        self.prior_log.as_deref()
    }

    /// Canonical content this handle expects to find before its next publish.
    pub fn last_published(&self) -> Option<&str> {
        self.last_published.as_deref()
    }

    pub fn set_last_published(&mut self, log: impl Into<String>) {
        self.last_published = Some(log.into());
    }
}

/// Port for durable bisection logs addressed by search identifier.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open (or implicitly create) the session named `search_identifier`.
    async fn open(&self, search_identifier: &str) -> DomainResult<SessionHandle>;

    /// Overwrite the local copy, then publish it as the canonical copy.
    async fn save(&self, handle: &mut SessionHandle, log: &str) -> DomainResult<()>;

    /// Remove the local copy. The canonical copy is never touched.
    async fn cleanup(&self, handle: SessionHandle) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(prior: Option<&str>) -> SessionHandle {
        SessionHandle::new(
            "nightly",
            PathBuf::from("/sessions/nightly"),
            PathBuf::from("/tmp/nightly.log"),
            prior.map(str::to_string),
        )
    }

    #[test]
    fn test_prior_progress_requires_content() {
        assert!(!handle(None).has_prior_progress());
        assert!(!handle(Some("")).has_prior_progress());
        assert!(!handle(Some("\n")).has_prior_progress());
        assert!(handle(Some("git bisect start\n")).has_prior_progress());
    }
}
