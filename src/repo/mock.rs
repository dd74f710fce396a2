//! repo::mock
//!
//! In-memory backend for deterministic tests.
//!
//! # Design
//!
//! [`MockBackend`] implements [`Backend`] without touching a real VCS. It
//! records every call in order, can be told to fail `open` or `push_lfs`,
//! and notes whether the side's lock was held at the moment `push_lfs` ran.
//! Clones share state, so a test can keep one clone and hand another to
//! the code under test.
//!
//! # Example
//!
//! ```
//! use shipsync::core::lock::SharedLock;
//! use shipsync::core::types::BranchName;
//! use shipsync::repo::mock::{MockBackend, MockCall};
//! use shipsync::repo::Backend;
//! use std::time::Duration;
//!
//! let temp = tempfile::TempDir::new().unwrap();
//! let checkout = temp.path().join("repo");
//! let lock = SharedLock::for_checkout(&checkout, Duration::from_secs(1));
//! let backend = MockBackend::new();
//!
//! let handle = backend.open(&lock, &checkout, &BranchName::new("main").unwrap()).unwrap();
//! assert!(handle.head_changeset().unwrap().is_none());
//! drop(handle);
//!
//! assert_eq!(backend.calls().len(), 2);
//! assert!(matches!(backend.calls()[0], MockCall::Open { .. }));
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Backend, Changeset, Diff, RepoError, RepoHandle, Repository, VcsKind};
use crate::auth::SecretUrl;
use crate::core::lock::SharedLock;
use crate::core::types::{BranchName, ChangesetId};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open {
        path: PathBuf,
        branch: String,
    },
    HeadChangeset,
    Diffs {
        id: ChangesetId,
    },
    PushLfs {
        pull: String,
        /// Full push URL including credentials, for assertions.
        push: String,
        /// Whether the side's lock was held while pushing.
        lock_held: bool,
    },
}

/// Mock backend for testing.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    head: Option<Changeset>,
    fail_open: bool,
    fail_push: Option<String>,
}

impl MockBackend {
    /// Create a backend whose repositories are empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `changeset` as the head of every opened repository.
    pub fn with_head(self, changeset: Changeset) -> Self {
        self.state().head = Some(changeset);
        self
    }

    /// Make every `open` fail with [`RepoError::NotARepo`].
    pub fn failing_open(self) -> Self {
        self.state().fail_open = true;
        self
    }

    /// Make every `push_lfs` fail with a transfer error.
    pub fn failing_push(self, message: impl Into<String>) -> Self {
        self.state().fail_push = Some(message.into());
        self
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Recorded `push_lfs` calls.
    pub fn pushes(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::PushLfs { .. }))
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test may poison the mutex; the data is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: MockCall) {
        self.state().calls.push(call);
    }

    fn repository(&self, lock: Option<SharedLock>) -> MockRepository {
        MockRepository {
            backend: self.clone(),
            lock,
        }
    }
}

impl Backend for MockBackend {
    fn open_unlocked(
        &self,
        path: &Path,
        branch: &BranchName,
    ) -> Result<Box<dyn Repository>, RepoError> {
        self.record(MockCall::Open {
            path: path.to_path_buf(),
            branch: branch.to_string(),
        });
        if self.state().fail_open {
            return Err(RepoError::NotARepo {
                path: path.to_path_buf(),
            });
        }
        Ok(Box::new(self.repository(None)))
    }

    fn open(
        &self,
        lock: &SharedLock,
        path: &Path,
        branch: &BranchName,
    ) -> Result<RepoHandle, RepoError> {
        let guard = lock.acquire()?;
        self.open_unlocked(path, branch)?;
        Ok(RepoHandle::new(
            Box::new(self.repository(Some(lock.clone()))),
            guard,
            path,
            branch,
        ))
    }
}

/// Repository handed out by [`MockBackend`].
#[derive(Debug)]
struct MockRepository {
    backend: MockBackend,
    lock: Option<SharedLock>,
}

impl Repository for MockRepository {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn head_changeset(&self) -> Result<Option<Changeset>, RepoError> {
        self.backend.record(MockCall::HeadChangeset);
        Ok(self.backend.state().head.clone())
    }

    fn diffs(&self, id: &ChangesetId) -> Result<Vec<Diff>, RepoError> {
        self.backend.record(MockCall::Diffs { id: id.clone() });
        match &self.backend.state().head {
            Some(head) if head.id() == id => Ok(head.diffs().to_vec()),
            _ => Err(RepoError::ChangesetNotFound { id: id.to_string() }),
        }
    }

    fn push_lfs(&self, pull: &str, push: &SecretUrl) -> Result<(), RepoError> {
        let lock_held = match &self.lock {
            Some(lock) => lock.try_acquire()?.is_none(),
            None => false,
        };
        self.backend.record(MockCall::PushLfs {
            pull: pull.to_string(),
            push: push.expose_secret().to_string(),
            lock_held,
        });

        let failure = self.backend.state().fail_push.clone();
        match failure {
            Some(message) => Err(RepoError::Transfer {
                endpoint: push.redacted(),
                message: push.redact_in(&message),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{ChangeKind, Diff};
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SharedLock, PathBuf, BranchName) {
        let temp = TempDir::new().unwrap();
        let checkout = temp.path().join("repo");
        let lock = SharedLock::for_checkout(&checkout, Duration::from_millis(200));
        (temp, lock, checkout, BranchName::new("main").unwrap())
    }

    #[test]
    fn serves_configured_head() {
        let (_temp, lock, path, branch) = setup();
        let head = Changeset::builder(ChangesetId::new("1".repeat(40)).unwrap())
            .diff(Diff::new("x", ChangeKind::Added, ""))
            .build();
        let backend = MockBackend::new().with_head(head.clone());

        let handle = backend.open(&lock, &path, &branch).unwrap();
        assert_eq!(handle.head_changeset().unwrap(), Some(head.clone()));
        assert_eq!(handle.diffs(head.id()).unwrap(), head.diffs());
    }

    #[test]
    fn failing_open_releases_lock() {
        let (_temp, lock, path, branch) = setup();
        let backend = MockBackend::new().failing_open();

        assert!(backend.open(&lock, &path, &branch).is_err());
        assert!(lock.try_acquire().unwrap().is_some());
    }

    #[test]
    fn push_records_lock_state() {
        let (_temp, lock, path, branch) = setup();
        let backend = MockBackend::new();
        let push = SecretUrl::with_userinfo("https://example.com/x", "tok", None).unwrap();

        let handle = backend.open(&lock, &path, &branch).unwrap();
        handle.push_lfs("https://pull", &push).unwrap();

        match &backend.pushes()[0] {
            MockCall::PushLfs { lock_held, push, .. } => {
                assert!(*lock_held);
                assert!(push.contains("tok@"));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn failing_push_is_transfer_error() {
        let (_temp, lock, path, branch) = setup();
        let backend = MockBackend::new().failing_push("connection refused");
        let push = SecretUrl::with_userinfo("https://example.com/x", "tok", None).unwrap();

        let handle = backend.open(&lock, &path, &branch).unwrap();
        let err = handle.push_lfs("https://pull", &push).unwrap_err();
        assert!(matches!(err, RepoError::Transfer { .. }));
        assert!(!err.to_string().contains("tok"));
    }
}
