//! File-backed session store.
//!
//! One canonical log file per search identifier under a shared root directory,
//! plus a scratch copy per process.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::StoreConfig;
use crate::domain::ports::{SessionHandle, SessionStore};

/// Session store keeping canonical logs in `root_dir`.
///
/// Publishing is a plain overwrite. Two processes saving the same identifier at
/// once race, and the last writer wins unless `detect_conflicts` is enabled.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root_dir: PathBuf,
    scratch_dir: PathBuf,
    detect_conflicts: bool,
}

impl FileSessionStore {
    pub fn new(root_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            scratch_dir: scratch_dir.into(),
            detect_conflicts: false,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        let scratch_dir = config
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        Self::new(&config.root_dir, scratch_dir).with_conflict_detection(config.detect_conflicts)
    }

    #[must_use]
    pub const fn with_conflict_detection(mut self, enabled: bool) -> Self {
        self.detect_conflicts = enabled;
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Read the canonical log for `search_identifier` without opening a session.
    pub async fn read_canonical(&self, search_identifier: &str) -> DomainResult<Option<String>> {
        validate_identifier(search_identifier)?;
        read_optional(&self.canonical_path(search_identifier)).await
    }

    fn canonical_path(&self, search_identifier: &str) -> PathBuf {
        self.root_dir.join(search_identifier)
    }
}

fn validate_identifier(search_identifier: &str) -> DomainResult<()> {
    let trimmed = search_identifier.trim();
    let invalid = trimmed.is_empty()
        || trimmed != search_identifier
        || search_identifier == "."
        || search_identifier == ".."
        || search_identifier.contains(['/', '\\', '\0']);
    if invalid {
        return Err(DomainError::InvalidSearchIdentifier(
            search_identifier.to_string(),
        ));
    }
    Ok(())
}

async fn read_optional(path: &Path) -> DomainResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(DomainError::Storage(format!(
            "failed to read {}: {err}",
            path.display()
        ))),
    }
}

async fn write_file(path: &Path, content: &str) -> DomainResult<()> {
    fs::write(path, content).await.map_err(|err| {
        DomainError::Storage(format!("failed to write {}: {err}", path.display()))
    })
}

#[async_trait]
impl SessionStore for FileSessionStore {
    #[instrument(skip(self))]
    async fn open(&self, search_identifier: &str) -> DomainResult<SessionHandle> {
        validate_identifier(search_identifier)?;

        let canonical_path = self.canonical_path(search_identifier);
        let prior_log = read_optional(&canonical_path).await?;

        fs::create_dir_all(&self.scratch_dir).await.map_err(|err| {
            DomainError::Storage(format!(
                "failed to create scratch dir {}: {err}",
                self.scratch_dir.display()
            ))
        })?;
        let local_path = self
            .scratch_dir
            .join(format!("bisector-{search_identifier}-{}.log", Uuid::new_v4()));

        match prior_log.as_deref() {
            Some(log) => {
                info!(
                    canonical = %canonical_path.display(),
                    local = %local_path.display(),
                    "Copying latest results file to local working copy"
                );
                write_file(&local_path, log).await?;
            }
            None => {
                info!(
                    canonical = %canonical_path.display(),
                    "No previous results file, bisection will start from scratch"
                );
                write_file(&local_path, "").await?;
            }
        }

        Ok(SessionHandle::new(
            search_identifier,
            canonical_path,
            local_path,
            prior_log,
        ))
    }

    #[instrument(skip(self, handle, log), fields(search_identifier = handle.search_identifier(), bytes = log.len()))]
    async fn save(&self, handle: &mut SessionHandle, log: &str) -> DomainResult<()> {
        write_file(handle.local_path(), log).await?;

        if self.detect_conflicts {
            let current = read_optional(handle.canonical_path()).await?;
            if current.as_deref() != handle.last_published() {
                warn!("Canonical log changed since it was last read, refusing to publish");
                return Err(DomainError::ConcurrentModification(
                    handle.search_identifier().to_string(),
                ));
            }
        }

        if let Some(parent) = handle.canonical_path().parent() {
            fs::create_dir_all(parent).await.map_err(|err| {
                DomainError::Storage(format!("failed to create {}: {err}", parent.display()))
            })?;
        }
        fs::copy(handle.local_path(), handle.canonical_path())
            .await
            .map_err(|err| {
                DomainError::Storage(format!(
                    "failed to publish {}: {err}",
                    handle.canonical_path().display()
                ))
            })?;

        handle.set_last_published(log);
        debug!(canonical = %handle.canonical_path().display(), "Published session log");
        Ok(())
    }

    #[instrument(skip(self, handle), fields(search_identifier = handle.search_identifier()))]
    async fn cleanup(&self, handle: SessionHandle) -> DomainResult<()> {
        match fs::remove_file(handle.local_path()).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DomainError::Storage(format!(
                "failed to remove {}: {err}",
                handle.local_path().display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FileSessionStore {
        FileSessionStore::new(dir.path().join("sessions"), dir.path().join("scratch"))
    }

    #[tokio::test]
    async fn test_open_fresh_session() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let handle = store.open("nightly").await.unwrap();
        assert!(!handle.has_prior_progress());
        assert_eq!(std::fs::read_to_string(handle.local_path()).unwrap(), "");
        assert!(!handle.canonical_path().exists());
    }

    #[tokio::test]
    async fn test_save_publishes_and_reopen_sees_progress() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut handle = store.open("nightly").await.unwrap();
        store
            .save(&mut handle, "git bisect good a1\ngit bisect bad b9\n")
            .await
            .unwrap();

        let reopened = store.open("nightly").await.unwrap();
        assert!(reopened.has_prior_progress());
        assert_eq!(
            reopened.prior_log(),
            Some("git bisect good a1\ngit bisect bad b9\n")
        );
        assert_eq!(
            std::fs::read_to_string(reopened.local_path()).unwrap(),
            "git bisect good a1\ngit bisect bad b9\n"
        );
        assert_ne!(handle.local_path(), reopened.local_path());
    }

    #[tokio::test]
    async fn test_empty_canonical_is_not_progress() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(dir.path().join("sessions")).unwrap();
        std::fs::write(dir.path().join("sessions/nightly"), "").unwrap();

        let handle = store.open("nightly").await.unwrap();
        assert!(!handle.has_prior_progress());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_canonical() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut handle = store.open("nightly").await.unwrap();
        store.save(&mut handle, "git bisect bad b9\n").await.unwrap();
        let local = handle.local_path().to_path_buf();
        let canonical = handle.canonical_path().to_path_buf();

        store.cleanup(handle).await.unwrap();
        assert!(!local.exists());
        assert!(canonical.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_scratch() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let handle = store.open("nightly").await.unwrap();
        std::fs::remove_file(handle.local_path()).unwrap();
        store.cleanup(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_like_identifiers() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        for bad in ["", " ", "..", "a/b", "a\\b", " padded"] {
            let err = store.open(bad).await.unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidSearchIdentifier(_)),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_last_writer_wins_without_conflict_detection() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut first = store.open("nightly").await.unwrap();
        let mut second = store.open("nightly").await.unwrap();
        store.save(&mut first, "first\n").await.unwrap();
        store.save(&mut second, "second\n").await.unwrap();

        assert_eq!(
            store.read_canonical("nightly").await.unwrap().as_deref(),
            Some("second\n")
        );
    }

    #[tokio::test]
    async fn test_conflict_detection_rejects_stale_publish() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).with_conflict_detection(true);

        let mut first = store.open("nightly").await.unwrap();
        let mut second = store.open("nightly").await.unwrap();
        store.save(&mut first, "first\n").await.unwrap();

        let err = store.save(&mut second, "second\n").await.unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification(ref id) if id == "nightly"));

        // The writer that saw the latest content may keep publishing.
        store.save(&mut first, "first\nmore\n").await.unwrap();
        assert_eq!(
            store.read_canonical("nightly").await.unwrap().as_deref(),
            Some("first\nmore\n")
        );
    }
}
